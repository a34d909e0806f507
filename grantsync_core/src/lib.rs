//!
//! Grant modelling for MySQL-style access control
//!
//! Represents user, role and routine grants as values, renders them to
//! `GRANT`/`REVOKE` statements, and parses them back out of `SHOW GRANTS`
//! output so that declared and live state can be compared.
#![deny(missing_docs)]

pub use declared::DeclaredGrant;
pub use error::GrantError;
pub use grant::{
    Grant, GrantKind, RoleMembershipGrant, RoutineKind, RoutinePrivilegeGrant,
    TablePrivilegeGrant,
};
pub use identity::Identity;
pub use import::ImportId;
pub use parser::{parse_grant_row, GrantRow};

pub mod declared;
pub mod error;
pub mod grant;
pub mod identity;
pub mod import;
pub mod logging;
pub mod parser;
pub mod privileges;

#[macro_export]
/// Time the code inside the macro. Write the elapsed time to debug logs.
/// Derived from https://notes.iveselov.info/programming/time_it-a-case-study-in-rust-macros
macro_rules! log_runtime {
    ($context:expr, $($tt:tt)+) => {
        {
            $crate::logging::debug!("{}: starting", $context);
            let timer = std::time::Instant::now();
            let x =
            $(
                $tt
            )+;
            $crate::logging::debug!("{}: {:?}", $context, timer.elapsed());
            x
        }
    }
}
