//! MySQL grant reconciliation
//!
//! Drives [`grantsync_core`] grant values against a live server: reading the
//! grants an identity holds, detecting unmanaged grants before creating new
//! ones, updating privileges in place and revoking idempotently. Talking to
//! the server is left to a [`GrantClient`] implementation.
#![deny(missing_docs)]

pub use client::GrantClient;
pub use diff::{diff_privileges, PrivilegeDiff};
pub use error::{DbError, ErrorCategory};
pub use manager::GrantManager;
pub use version::supports_roles;

pub mod client;
pub mod diff;
pub mod error;
pub mod manager;
pub mod version;
