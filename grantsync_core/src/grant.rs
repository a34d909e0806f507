//! The grant entity model and its statement generator.

use std::{fmt::Display, str::FromStr};

use anyhow::{bail, Result};

use crate::{error::GrantError, identity::Identity};

/// The kind of stored routine a routine grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutineKind {
    /// `PROCEDURE`
    Procedure,
    /// `FUNCTION`
    Function,
}

impl Display for RoutineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoutineKind::Procedure => write!(f, "PROCEDURE"),
            RoutineKind::Function => write!(f, "FUNCTION"),
        }
    }
}

impl FromStr for RoutineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "PROCEDURE" => Ok(RoutineKind::Procedure),
            "FUNCTION" => Ok(RoutineKind::Function),
            other => bail!(GrantError::Validation(format!(
                "unknown routine type: {other}"
            ))),
        }
    }
}

/// Discriminator for the three grant variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantKind {
    /// Privileges on a database or table
    Table,
    /// Privileges on a procedure or function
    Routine,
    /// Membership in one or more roles
    Role,
}

/// Privileges held on a database (`table == "*"`) or a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePrivilegeGrant {
    /// Database name, `*` for all databases
    pub database: String,
    /// Table name, `*` (or empty) for all tables
    pub table: String,
    /// Canonical privilege strings
    pub privileges: Vec<String>,
    /// Whether the grant carries `WITH GRANT OPTION`
    pub grant_option: bool,
    /// Who holds the grant
    pub identity: Identity,
    /// TLS requirement rendered into a `REQUIRE` clause
    pub tls_option: String,
}

impl TablePrivilegeGrant {
    fn object(&self) -> String {
        format!("{}.{}", quote_database(&self.database), quote_table(&self.table))
    }

    /// The `GRANT` statement for this grant.
    pub fn grant_statement(&self) -> String {
        format!(
            "GRANT {} ON {} TO {}{}{}",
            self.privileges.join(", "),
            self.object(),
            self.identity.sql(),
            require_clause(&self.tls_option),
            grant_option_clause(self.grant_option),
        )
    }

    /// The `REVOKE` statement for every privilege in this grant.
    pub fn revoke_statement(&self) -> String {
        self.partial_revoke_statement(&self.privileges)
    }

    /// A `REVOKE` statement for just `privileges`, leaving the rest intact.
    pub fn partial_revoke_statement<S: AsRef<str>>(&self, privileges: &[S]) -> String {
        format!(
            "REVOKE {} ON {} FROM {}{}",
            join(privileges),
            self.object(),
            self.identity.sql(),
            grant_option_clause(self.grant_option),
        )
    }
}

/// Privileges held on a stored procedure or function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutinePrivilegeGrant {
    /// The database holding the routine
    pub database: String,
    /// Procedure or function
    pub kind: RoutineKind,
    /// The routine's name
    pub routine: String,
    /// Canonical privilege strings
    pub privileges: Vec<String>,
    /// Whether the grant carries `WITH GRANT OPTION`
    pub grant_option: bool,
    /// Who holds the grant
    pub identity: Identity,
    /// TLS requirement rendered into a `REQUIRE` clause
    pub tls_option: String,
}

impl RoutinePrivilegeGrant {
    fn object(&self) -> String {
        format!("{} {}.{}", self.kind, quote_database(&self.database), self.routine)
    }

    /// The `GRANT` statement for this grant.
    pub fn grant_statement(&self) -> String {
        format!(
            "GRANT {} ON {} TO {}{}{}",
            self.privileges.join(", "),
            self.object(),
            self.identity.sql(),
            require_clause(&self.tls_option),
            grant_option_clause(self.grant_option),
        )
    }

    /// The `REVOKE` statement for every privilege in this grant.
    pub fn revoke_statement(&self) -> String {
        self.partial_revoke_statement(&self.privileges)
    }

    /// A `REVOKE` statement for just `privileges`, leaving the rest intact.
    pub fn partial_revoke_statement<S: AsRef<str>>(&self, privileges: &[S]) -> String {
        format!(
            "REVOKE {} ON {} FROM {}{}",
            join(privileges),
            self.object(),
            self.identity.sql(),
            grant_option_clause(self.grant_option),
        )
    }
}

/// Membership of an identity in a set of roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMembershipGrant {
    /// Granted role names
    pub roles: Vec<String>,
    /// Whether the grant carries `WITH ADMIN OPTION`
    pub grant_option: bool,
    /// Who holds the grant
    pub identity: Identity,
    /// TLS requirement rendered into a `REQUIRE` clause
    pub tls_option: String,
}

impl RoleMembershipGrant {
    /// The `GRANT` statement for this grant.
    pub fn grant_statement(&self) -> String {
        let admin = if self.grant_option {
            " WITH ADMIN OPTION"
        } else {
            ""
        };
        format!(
            "GRANT {} TO {}{}{admin}",
            self.roles.join(", "),
            self.identity.sql(),
            require_clause(&self.tls_option),
        )
    }

    /// The `REVOKE` statement for the whole membership set.
    pub fn revoke_statement(&self) -> String {
        format!("REVOKE {} FROM {}", self.roles.join(", "), self.identity.sql())
    }
}

/// A single grant, either declared or read back from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// See [`TablePrivilegeGrant`]
    Table(TablePrivilegeGrant),
    /// See [`RoutinePrivilegeGrant`]
    Routine(RoutinePrivilegeGrant),
    /// See [`RoleMembershipGrant`]
    Role(RoleMembershipGrant),
}

impl Grant {
    /// Which variant this is.
    pub fn kind(&self) -> GrantKind {
        match self {
            Grant::Table(_) => GrantKind::Table,
            Grant::Routine(_) => GrantKind::Routine,
            Grant::Role(_) => GrantKind::Role,
        }
    }

    /// The stable identifier: `user@host:database`, `role:database`, or
    /// just the identity for role membership grants.
    pub fn id(&self) -> String {
        let prefix = self.identity().id_prefix();
        match self {
            Grant::Table(t) => format!("{prefix}:{}", quote_database(&t.database)),
            Grant::Routine(r) => format!("{prefix}:{}", quote_database(&r.database)),
            Grant::Role(_) => prefix,
        }
    }

    /// The identity holding the grant.
    pub fn identity(&self) -> &Identity {
        match self {
            Grant::Table(t) => &t.identity,
            Grant::Routine(r) => &r.identity,
            Grant::Role(r) => &r.identity,
        }
    }

    /// Whether the grant carries the grant (or admin) option.
    pub fn grant_option(&self) -> bool {
        match self {
            Grant::Table(t) => t.grant_option,
            Grant::Routine(r) => r.grant_option,
            Grant::Role(r) => r.grant_option,
        }
    }

    /// The TLS requirement attached to the grant.
    pub fn tls_option(&self) -> &str {
        match self {
            Grant::Table(t) => &t.tls_option,
            Grant::Routine(r) => &r.tls_option,
            Grant::Role(r) => &r.tls_option,
        }
    }

    /// The unquoted database, for the variants that target one.
    pub fn database(&self) -> Option<&str> {
        match self {
            Grant::Table(t) => Some(t.database.as_str()),
            Grant::Routine(r) => Some(r.database.as_str()),
            Grant::Role(_) => None,
        }
    }

    /// The unquoted table, for table grants only.
    pub fn table(&self) -> Option<&str> {
        match self {
            Grant::Table(t) => Some(t.table.as_str()),
            _ => None,
        }
    }

    /// The privilege list, for the variants that carry one.
    pub fn privileges(&self) -> Option<&[String]> {
        match self {
            Grant::Table(t) => Some(t.privileges.as_slice()),
            Grant::Routine(r) => Some(r.privileges.as_slice()),
            Grant::Role(_) => None,
        }
    }

    /// Render the `GRANT` statement.
    pub fn grant_statement(&self) -> String {
        match self {
            Grant::Table(t) => t.grant_statement(),
            Grant::Routine(r) => r.grant_statement(),
            Grant::Role(r) => r.grant_statement(),
        }
    }

    /// Render the `REVOKE` statement.
    pub fn revoke_statement(&self) -> String {
        match self {
            Grant::Table(t) => t.revoke_statement(),
            Grant::Routine(r) => r.revoke_statement(),
            Grant::Role(r) => r.revoke_statement(),
        }
    }

    /// Render a `REVOKE` for a subset of privileges. Role membership grants
    /// are always revoked as a whole and fail here.
    pub fn partial_revoke_statement<S: AsRef<str>>(&self, privileges: &[S]) -> Result<String> {
        match self {
            Grant::Table(t) => Ok(t.partial_revoke_statement(privileges)),
            Grant::Routine(r) => Ok(r.partial_revoke_statement(privileges)),
            Grant::Role(_) => bail!(GrantError::Unsupported(
                "grant does not support partial privilege revokes".to_owned()
            )),
        }
    }
}

impl From<TablePrivilegeGrant> for Grant {
    fn from(g: TablePrivilegeGrant) -> Self {
        Grant::Table(g)
    }
}

impl From<RoutinePrivilegeGrant> for Grant {
    fn from(g: RoutinePrivilegeGrant) -> Self {
        Grant::Routine(g)
    }
}

impl From<RoleMembershipGrant> for Grant {
    fn from(g: RoleMembershipGrant) -> Self {
        Grant::Role(g)
    }
}

/// `*` and already-quoted names pass through, anything else is back-ticked.
pub fn quote_database(database: &str) -> String {
    if database == "*" || database.ends_with('`') {
        database.to_owned()
    } else {
        format!("`{database}`")
    }
}

/// `*` or empty means every table; anything else is back-ticked.
pub fn quote_table(table: &str) -> String {
    if table == "*" || table.is_empty() {
        "*".to_owned()
    } else {
        format!("`{table}`")
    }
}

fn require_clause(tls_option: &str) -> String {
    if tls_option.is_empty() || tls_option.eq_ignore_ascii_case("none") {
        String::new()
    } else {
        format!(" REQUIRE {tls_option}")
    }
}

fn grant_option_clause(grant_option: bool) -> &'static str {
    if grant_option {
        " WITH GRANT OPTION"
    } else {
        ""
    }
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
