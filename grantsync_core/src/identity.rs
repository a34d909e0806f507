//! Who a grant is held by.

use std::fmt::Display;

/// A login (user + originating host) or a role that can hold grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// A login identity, rendered as `'name'@'host'`.
    User {
        /// The user name
        name: String,
        /// The host the user connects from. `%` is the wildcard.
        host: String,
    },
    /// A role identity, rendered as `'name'`.
    Role {
        /// The role name
        name: String,
    },
}

impl Identity {
    /// Convenience constructor for a login identity.
    pub fn user(name: impl Into<String>, host: impl Into<String>) -> Self {
        Identity::User {
            name: name.into(),
            host: host.into(),
        }
    }

    /// Convenience constructor for a role identity.
    pub fn role(name: impl Into<String>) -> Self {
        Identity::Role { name: name.into() }
    }

    /// The quoted form used in GRANT, REVOKE and SHOW GRANTS statements.
    /// The host is always rendered, even when it is the wildcard.
    pub fn sql(&self) -> String {
        match self {
            Identity::User { name, host } => format!("'{name}'@'{host}'"),
            Identity::Role { name } => format!("'{name}'"),
        }
    }

    /// The unquoted prefix of a grant identifier: `name@host` or `name`.
    pub(crate) fn id_prefix(&self) -> String {
        match self {
            Identity::User { name, host } => format!("{name}@{host}"),
            Identity::Role { name } => name.to_owned(),
        }
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql())
    }
}
