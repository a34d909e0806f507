//! Privilege list canonicalization
//!
//! Privileges come from two places: the declared configuration and the
//! database's own `SHOW GRANTS` output. Both are run through [`canonicalize`]
//! so that they can be compared token for token.

use lazy_static::lazy_static;
use regex::Regex;

/// The literal the database uses for "every privilege".
pub const ALL_PRIVILEGES: &str = "ALL PRIVILEGES";
/// The database's "no privileges" placeholder.
pub const USAGE: &str = "USAGE";

lazy_static! {
    static ref COLUMN_LIST: Regex = Regex::new(r"^([^(]*)\((.*)\)$").unwrap();
}

/// Normalize a list of raw privilege tokens into their canonical form.
///
/// Spaces and back-ticks are dropped, privilege names are upper-cased, `ALL`
/// becomes `ALL PRIVILEGES`, column lists are sorted and `USAGE` is removed.
/// Token order is preserved.
///
/// Column names keep their case, so `select(Name)` and `SELECT(name)` are
/// different tokens even though MySQL matches columns case-insensitively.
/// Declare columns with the case the server reports them in.
pub fn canonicalize<S: AsRef<str>>(privileges: &[S]) -> Vec<String> {
    privileges
        .iter()
        .map(|p| canonicalize_one(p.as_ref()))
        .filter(|p| p != USAGE)
        .collect()
}

fn canonicalize_one(privilege: &str) -> String {
    let stripped = privilege.replace([' ', '`'], "");
    if let Some(captures) = COLUMN_LIST.captures(&stripped) {
        let name = captures[1].to_uppercase();
        format!("{name}({})", sort_columns(&captures[2]))
    } else {
        let upper = stripped.to_uppercase();
        if upper == "ALL" || upper == "ALLPRIVILEGES" {
            ALL_PRIVILEGES.to_owned()
        } else {
            upper
        }
    }
}

fn sort_columns(columns: &str) -> String {
    let mut parts = columns
        .split(',')
        .map(|c| c.trim_matches(['`', ' ']))
        .collect::<Vec<_>>();
    parts.sort_unstable();
    parts.join(", ")
}

/// Split a comma-joined privilege string into tokens.
///
/// Commas inside a parenthesized column list do not separate tokens, and
/// leading whitespace is dropped from every token. Column lists never nest.
pub fn split_privileges(privileges: &str) -> Vec<String> {
    let mut tokens = vec![];
    let mut in_parens = false;
    let mut current = String::new();

    for c in privileges.chars() {
        match c {
            ',' if !in_parens => tokens.push(std::mem::take(&mut current)),
            '(' => {
                in_parens = true;
                current.push(c);
            }
            ')' => {
                in_parens = false;
                current.push(c);
            }
            c if c.is_whitespace() && current.is_empty() => (),
            c => current.push(c),
        }
    }
    tokens.push(current);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_keep_their_case() {
        assert_eq!(canonicalize(&["select(Name)"]), vec!["SELECT(Name)"]);
        assert_ne!(canonicalize(&["select(Name)"]), canonicalize(&["SELECT (`name`)"]));
    }

    #[test]
    fn strips_spaces_and_backticks_and_uppercases() {
        assert_eq!(
            canonicalize(&["select", " `insert` ", "Lock Tables"]),
            vec!["SELECT", "INSERT", "LOCKTABLES"]
        );
    }

    #[test]
    fn all_aliases_become_all_privileges() {
        assert_eq!(canonicalize(&["all"]), vec![ALL_PRIVILEGES]);
        assert_eq!(canonicalize(&["ALL PRIVILEGES"]), vec![ALL_PRIVILEGES]);
        assert_eq!(canonicalize(&["allprivileges"]), vec![ALL_PRIVILEGES]);
    }

    #[test]
    fn column_lists_are_sorted() {
        assert_eq!(canonicalize(&["SELECT(b,a,c)"]), vec!["SELECT(a, b, c)"]);
        assert_eq!(canonicalize(&["SELECT(c,a,b)"]), vec!["SELECT(a, b, c)"]);
        assert_eq!(
            canonicalize(&["update (`z`, `y`)"]),
            vec!["UPDATE(y, z)"]
        );
    }

    #[test]
    fn usage_is_removed() {
        assert_eq!(canonicalize(&["SELECT", "USAGE"]), vec!["SELECT"]);
        assert!(canonicalize(&["usage"]).is_empty());
    }

    #[test]
    fn token_order_is_kept() {
        assert_eq!(canonicalize(&["INSERT", "SELECT"]), vec!["INSERT", "SELECT"]);
        assert_ne!(
            canonicalize(&["INSERT", "SELECT"]),
            canonicalize(&["SELECT", "INSERT"])
        );
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["select(b, a)", "all", "usage"],
            vec!["ALL PRIVILEGES", "Insert (`x`,`w`)"],
            vec!["grant option", "execute"],
        ];
        for input in inputs {
            let once = canonicalize(&input);
            assert_eq!(canonicalize(&once), once);
        }
    }

    #[test]
    fn split_respects_column_lists() {
        assert_eq!(
            split_privileges("SELECT (`a`, `b`), INSERT, UPDATE (c)"),
            vec!["SELECT (`a`, `b`)", "INSERT", "UPDATE (c)"]
        );
    }

    #[test]
    fn split_single_token() {
        assert_eq!(split_privileges("ALL PRIVILEGES"), vec!["ALL PRIVILEGES"]);
    }
}
