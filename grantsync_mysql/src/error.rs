//! Errors reported by the database.

use thiserror::Error;

/// `ER_NONEXISTING_GRANT`
pub const ER_NONEXISTING_GRANT: u16 = 1141;
/// `ER_NONEXISTING_TABLE_GRANT`
pub const ER_NONEXISTING_TABLE_GRANT: u16 = 1147;
/// `ER_NONEXISTING_PROC_GRANT`
pub const ER_NONEXISTING_PROC_GRANT: u16 = 1403;

/// Categories of database errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// There is no such grant to show or revoke
    NonexistentGrant,
    /// Anything else
    Other,
}

impl ErrorCategory {
    /// Whether this error can be safely ignored (the grant is already gone).
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::NonexistentGrant)
    }
}

/// An error returned by the server for a query or statement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DbError {
    /// The server error number, if the failure came from the server
    pub code: Option<u16>,
    /// The server's message
    pub message: String,
}

impl DbError {
    /// Error with a server error number.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Error without a server error number, e.g. a dropped connection.
    pub fn other(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Classify the error by its server error number.
    pub fn category(&self) -> ErrorCategory {
        match self.code {
            Some(ER_NONEXISTING_GRANT | ER_NONEXISTING_TABLE_GRANT | ER_NONEXISTING_PROC_GRANT) => {
                ErrorCategory::NonexistentGrant
            }
            _ => ErrorCategory::Other,
        }
    }
}
