//! Declared grant configuration
//!
//! [`DeclaredGrant`] holds the flat field values a grant is declared with.
//! [`DeclaredGrant::to_grant`] turns them into a [`Grant`] and
//! [`DeclaredGrant::from_grant`] projects a [`Grant`] back into fields, e.g.
//! after an import.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use yaml_peg::serde as yaml;

use crate::{
    error::GrantError,
    grant::{Grant, RoleMembershipGrant, RoutineKind, RoutinePrivilegeGrant, TablePrivilegeGrant},
    identity::Identity,
    privileges::canonicalize,
};

lazy_static! {
    static ref ROUTINE_WITHOUT_DATABASE: Regex =
        Regex::new(r"(?i)^(function|procedure) ([^.]*)$").unwrap();
    static ref ROUTINE_WITH_DATABASE: Regex =
        Regex::new(r"(?i)^(function|procedure) ([^.]*)\.([^.]*)$").unwrap();
}

/// The field values a grant is declared with.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeclaredGrant {
    /// Login user name. Takes precedence over `role` when `host` is also set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Login host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Role name, used when no user is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Database name, or `FUNCTION [db.]name` / `PROCEDURE [db.]name` for
    /// routine grants.
    pub database: String,
    /// Table name, or the routine name when `database` is `FUNCTION db`.
    #[serde(default = "default_table")]
    pub table: String,
    /// Privileges to grant.
    #[serde(default)]
    pub privileges: Vec<String>,
    /// Roles to grant. When present the grant is a role membership grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Grant (or admin) option.
    #[serde(default)]
    pub grant: bool,
    /// TLS requirement, `NONE` for no `REQUIRE` clause.
    #[serde(default = "default_tls_option")]
    pub tls_option: String,
}

fn default_host() -> String {
    "localhost".to_owned()
}

fn default_table() -> String {
    "*".to_owned()
}

fn default_tls_option() -> String {
    "NONE".to_owned()
}

impl Default for DeclaredGrant {
    fn default() -> Self {
        Self {
            user: None,
            host: default_host(),
            role: None,
            database: String::new(),
            table: default_table(),
            privileges: vec![],
            roles: None,
            grant: false,
            tls_option: default_tls_option(),
        }
    }
}

impl DeclaredGrant {
    /// The declared identity. A user needs a non-empty host; otherwise a
    /// non-empty role is required.
    pub fn identity(&self) -> Result<Identity> {
        match (&self.user, &self.role) {
            (Some(user), _) if !user.is_empty() && !self.host.is_empty() => {
                Ok(Identity::user(user, &self.host))
            }
            (_, Some(role)) if !role.is_empty() => Ok(Identity::role(role)),
            _ => bail!(GrantError::Validation(
                "One of user/host or role is required".to_owned()
            )),
        }
    }

    /// Build the grant these fields describe.
    ///
    /// Roles win over everything else. A `database` naming a function or
    /// procedure yields a routine grant; anything else is a table grant.
    pub fn to_grant(&self) -> Result<Grant> {
        let identity = self.identity()?;

        if let Some(roles) = self.roles.as_ref().filter(|r| !r.is_empty()) {
            return Ok(RoleMembershipGrant {
                roles: roles.to_owned(),
                grant_option: self.grant,
                identity,
                tls_option: self.tls_option.to_owned(),
            }
            .into());
        }

        let privileges = canonicalize(&self.privileges);

        let routine = if let Some(c) = ROUTINE_WITH_DATABASE.captures(&self.database) {
            Some((c[1].parse::<RoutineKind>()?, c[2].to_owned(), c[3].to_owned()))
        } else if let Some(c) = ROUTINE_WITHOUT_DATABASE.captures(&self.database) {
            Some((c[1].parse::<RoutineKind>()?, c[2].to_owned(), self.table.to_owned()))
        } else {
            None
        };

        Ok(match routine {
            Some((kind, database, routine)) => RoutinePrivilegeGrant {
                database,
                kind,
                routine,
                privileges,
                grant_option: self.grant,
                identity,
                tls_option: self.tls_option.to_owned(),
            }
            .into(),
            None => TablePrivilegeGrant {
                database: self.database.to_owned(),
                table: self.table.to_owned(),
                privileges,
                grant_option: self.grant,
                identity,
                tls_option: self.tls_option.to_owned(),
            }
            .into(),
        })
    }

    /// Project a grant back into declared fields.
    pub fn from_grant(grant: &Grant) -> Self {
        let mut declared = DeclaredGrant::default();
        match grant {
            Grant::Table(t) => {
                declared.database = t.database.to_owned();
                declared.table = t.table.to_owned();
                declared.privileges = t.privileges.to_owned();
            }
            Grant::Routine(r) => {
                declared.database = format!("{} {}.{}", r.kind, r.database, r.routine);
                declared.table = String::new();
                declared.privileges = r.privileges.to_owned();
            }
            Grant::Role(r) => {
                declared.roles = Some(r.roles.to_owned());
            }
        }
        declared.grant = grant.grant_option();
        declared.tls_option = grant.tls_option().to_owned();

        match grant.identity() {
            Identity::User { name, host } => {
                declared.user = Some(name.to_owned());
                declared.host = host.to_owned();
            }
            Identity::Role { name } => declared.role = Some(name.to_owned()),
        }
        declared
    }
}

/// Parse a yaml document holding a list of declared grants.
pub fn declared_grants_from_str(config: &str) -> Result<Vec<DeclaredGrant>> {
    let mut docs =
        yaml::from_str::<Vec<DeclaredGrant>>(config).context("Deserializing grant config")?;
    if docs.is_empty() {
        return Ok(vec![]);
    }
    Ok(docs.swap_remove(0))
}

/// Read declared grants from a yaml file.
pub fn read_declared_grants<P: AsRef<Path>>(path: P) -> Result<Vec<DeclaredGrant>> {
    debug!("Trying to read grant config from {:?}", path.as_ref());
    let config = fs::read_to_string(&path).context("Reading file")?;
    declared_grants_from_str(&config)
}
