//! Error kinds raised while modelling and reconciling grants.
//!
//! These are raised through `anyhow` like everything else in the workspace.
//! Callers that need to react to a specific kind can
//! `downcast_ref::<GrantError>()` the returned error.

use thiserror::Error;

/// The classified failures of the grant model and the reconciliation engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    /// The declared input or an import identifier is malformed.
    #[error("invalid grant definition: {0}")]
    Validation(String),

    /// A line from the live grant listing matched no known statement shape.
    #[error("failed to parse grant statement: {line}")]
    Parse {
        /// The raw line as returned by the database
        line: String,
    },

    /// The requested operation is not available for this grant or server.
    #[error("{0}")]
    Unsupported(String),

    /// An unmanaged grant of the same shape already exists for the identity.
    #[error("user/role {identity} already has unmanaged grant - import it first")]
    Conflict {
        /// The rendered identity holding the conflicting grant
        identity: String,
    },

    /// The database rejected a statement.
    #[error("error running SQL ({statement}): {message}")]
    Execution {
        /// The statement that failed
        statement: String,
        /// The database's error message
        message: String,
    },
}
