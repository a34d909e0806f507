//! The database capability the reconciliation engine drives.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::DbError;

/// Query and execute access to a live MySQL server.
///
/// Connection handling, retries and timeouts all belong to the implementor.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GrantClient {
    /// Run a query whose rows are a single string column, such as
    /// `SHOW GRANTS FOR ...`.
    async fn query(&self, sql: &str) -> Result<Vec<String>, DbError>;

    /// Execute a statement, dropping any result.
    async fn execute(&self, sql: &str) -> Result<(), DbError>;

    /// Whether the server supports role membership grants. Implementors
    /// typically fetch `SELECT VERSION()` and pass it to
    /// [`crate::version::supports_roles`].
    async fn supports_roles(&self) -> Result<bool, DbError>;
}
