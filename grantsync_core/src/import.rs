//! Import identifiers: `user@host@database@table`, with an optional trailing
//! `@` to request the grant-option flavour of the grant.

use std::str::FromStr;

use anyhow::{bail, Result};

use crate::{error::GrantError, grant::Grant, identity::Identity};

/// A parsed import identifier. Any part may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    /// Login user name
    pub user: String,
    /// Login host
    pub host: String,
    /// Database filter, empty for grants without a database
    pub database: String,
    /// Table filter, empty for grants without a table
    pub table: String,
    /// Whether the grant option flag must be set
    pub grant_option: bool,
}

impl FromStr for ImportId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts = s.split('@').collect::<Vec<_>>();
        if parts.len() != 4 && parts.len() != 5 {
            bail!(GrantError::Validation(format!(
                "wrong ID format {s} - expected user@host@database@table (and optionally ending @ to signify grant option) where some parts can be empty"
            )));
        }
        Ok(ImportId {
            user: parts[0].to_owned(),
            host: parts[1].to_owned(),
            database: parts[2].to_owned(),
            table: parts[3].to_owned(),
            grant_option: parts.len() == 5,
        })
    }
}

impl ImportId {
    /// Imports always target a login identity.
    pub fn identity(&self) -> Identity {
        Identity::user(&self.user, &self.host)
    }

    /// Whether `grant` is the one this identifier points at. Variants without
    /// a database (or table) only match an empty database (or table) filter.
    pub fn matches(&self, grant: &Grant) -> bool {
        grant.grant_option() == self.grant_option
            && filter_matches(grant.database(), &self.database)
            && filter_matches(grant.table(), &self.table)
    }
}

fn filter_matches(value: Option<&str>, filter: &str) -> bool {
    match value {
        Some(v) => v == filter,
        None => filter.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::{RoleMembershipGrant, TablePrivilegeGrant};

    fn table_grant(table: &str, grant_option: bool) -> Grant {
        TablePrivilegeGrant {
            database: "app".to_owned(),
            table: table.to_owned(),
            privileges: vec!["SELECT".to_owned()],
            grant_option,
            identity: Identity::user("bob", "%"),
            tls_option: String::new(),
        }
        .into()
    }

    #[test]
    fn four_parts_parse() -> Result<()> {
        let id: ImportId = "bob@%@app@users".parse()?;
        assert_eq!(
            id,
            ImportId {
                user: "bob".to_owned(),
                host: "%".to_owned(),
                database: "app".to_owned(),
                table: "users".to_owned(),
                grant_option: false,
            }
        );
        assert_eq!(id.identity(), Identity::user("bob", "%"));
        Ok(())
    }

    #[test]
    fn trailing_at_sets_grant_option() -> Result<()> {
        let id: ImportId = "bob@%@app@users@".parse()?;
        assert!(id.grant_option);
        Ok(())
    }

    #[test]
    fn wrong_segment_count_fails() {
        for bad in ["bob@%@app", "bob", "a@b@c@d@e@f"] {
            let err = bad.parse::<ImportId>().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<GrantError>(),
                Some(GrantError::Validation(_))
            ));
        }
    }

    #[test]
    fn matches_database_table_and_flag() -> Result<()> {
        let id: ImportId = "bob@%@app@users".parse()?;
        assert!(id.matches(&table_grant("users", false)));
        assert!(!id.matches(&table_grant("users", true)));
        assert!(!id.matches(&table_grant("orders", false)));
        Ok(())
    }

    #[test]
    fn role_grants_match_empty_filters_only() -> Result<()> {
        let role: Grant = RoleMembershipGrant {
            roles: vec!["editor".to_owned()],
            grant_option: false,
            identity: Identity::user("bob", "%"),
            tls_option: String::new(),
        }
        .into();
        assert!("bob@%@@".parse::<ImportId>()?.matches(&role));
        assert!(!"bob@%@app@".parse::<ImportId>()?.matches(&role));
        Ok(())
    }
}
