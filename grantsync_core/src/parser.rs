//! Parse rows of `SHOW GRANTS` output into [`Grant`]s.
//!
//! Statement bodies are classified in a fixed order, first match wins:
//! role membership, then routine privileges, then table privileges. The
//! role membership shape is tried first because the table shape is loose
//! enough to swallow it on malformed input.

use anyhow::{bail, Result};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    error::GrantError,
    grant::{Grant, RoleMembershipGrant, RoutineKind, RoutinePrivilegeGrant, TablePrivilegeGrant},
    identity::Identity,
    privileges::{canonicalize, split_privileges},
};

lazy_static! {
    static ref REQUIRE: Regex = Regex::new(r".*REQUIRE\s+(.*)").unwrap();
    static ref GRANT_OPTION: Regex = Regex::new(r"\bGRANT OPTION\b|\bADMIN OPTION\b").unwrap();

    static ref USER_IDENTITY: Regex =
        Regex::new(r"^['`]([^'`]*)['`]@['`]([^'`]*)['`]").unwrap();
    static ref ROLE_IDENTITY: Regex = Regex::new(r"^['`]([^'`]+)['`]").unwrap();

    static ref ROLE_GRANT: Regex =
        Regex::new(r"^GRANT\s+([^\s,()]+(?:\s*,\s*[^\s,()]+)*)\s+TO\s+(.+)$").unwrap();
    // Object references are runs of back-ticked names or unquoted non-space
    // characters, so a quoted name may hold spaces or ` TO `.
    static ref ROUTINE_GRANT: Regex = Regex::new(
        r"^GRANT\s+(.+?)\s+ON\s+(FUNCTION|PROCEDURE)\s+((?:`[^`]*`|[^\s`])+)\s+TO\s+(.+)$"
    )
    .unwrap();
    static ref TABLE_GRANT: Regex =
        Regex::new(r"^GRANT\s+(.+?)\s+ON\s+((?:`[^`]*`|[^\s`])+)\s+TO\s+(.+)$").unwrap();
}

const NAME_QUOTES: [char; 3] = ['`', '"', '\''];
const ROLE_TRIM: [char; 6] = ['`', '@', '%', '"', '\'', ' '];

/// The outcome of parsing a single grant listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantRow {
    /// The row describes a grant.
    Grant(Grant),
    /// The row is a server-side partial revoke (`REVOKE ...`). These are not
    /// modelled and should be skipped.
    PartialRevoke,
}

/// Parse one row of `SHOW GRANTS FOR ...` output.
pub fn parse_grant_row(line: &str) -> Result<GrantRow> {
    let line = line.trim();
    if line.starts_with("REVOKE") {
        return Ok(GrantRow::PartialRevoke);
    }

    let tls_option = REQUIRE
        .captures(line)
        .map(|c| c[1].to_owned())
        .unwrap_or_default();
    let grant_option = GRANT_OPTION.is_match(line);

    let grant: Grant = if let Some(c) = ROLE_GRANT.captures(line) {
        RoleMembershipGrant {
            roles: c[1]
                .split(',')
                .map(|r| r.trim_matches(ROLE_TRIM).to_owned())
                .collect(),
            grant_option,
            identity: parse_identity(&c[2], line)?,
            tls_option,
        }
        .into()
    } else if let Some(c) = ROUTINE_GRANT.captures(line) {
        let (database, routine) = split_object(&c[3]);
        RoutinePrivilegeGrant {
            routine: routine.unwrap_or_else(|| database.clone()),
            database,
            kind: c[2].parse::<RoutineKind>()?,
            privileges: canonicalize(&split_privileges(&c[1])),
            grant_option,
            identity: parse_identity(&c[4], line)?,
            tls_option,
        }
        .into()
    } else if let Some(c) = TABLE_GRANT.captures(line) {
        let (database, table) = split_object(&c[2]);
        TablePrivilegeGrant {
            database,
            table: table.unwrap_or_default(),
            privileges: canonicalize(&split_privileges(&c[1])),
            grant_option,
            identity: parse_identity(&c[3], line)?,
            tls_option,
        }
        .into()
    } else {
        bail!(GrantError::Parse {
            line: line.to_owned()
        })
    };
    Ok(GrantRow::Grant(grant))
}

/// Read the identity at the start of the text following `TO`.
fn parse_identity(text: &str, line: &str) -> Result<Identity> {
    if let Some(c) = USER_IDENTITY.captures(text) {
        Ok(Identity::user(&c[1], &c[2]))
    } else if let Some(c) = ROLE_IDENTITY.captures(text) {
        Ok(Identity::role(&c[1]))
    } else {
        bail!(GrantError::Parse {
            line: line.to_owned()
        })
    }
}

/// Split `db.object` on the first `.` outside back-ticks and strip quoting
/// from both halves. A reference without a separator only has a database.
fn split_object(object: &str) -> (String, Option<String>) {
    let mut quoted = false;
    let separator = object.char_indices().find_map(|(i, c)| match c {
        '`' => {
            quoted = !quoted;
            None
        }
        '.' if !quoted => Some(i),
        _ => None,
    });
    let unquote = |s: &str| s.trim_matches(NAME_QUOTES).to_owned();
    match separator {
        Some(i) => (unquote(&object[..i]), Some(unquote(&object[i + 1..]))),
        None => (unquote(object), None),
    }
}
