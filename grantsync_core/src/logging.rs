//! Log output for grantsync.
//!
//! Library code only emits `tracing` events. Binaries and tests that want
//! them printed call [`setup`] once.

pub use tracing::metadata::LevelFilter;
pub use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "grantsync_core=debug,grantsync_mysql=debug";

/// Install a global subscriber printing to stdout at `level` (INFO when
/// `None`), filtered by `RUST_LOG` or [`DEFAULT_FILTER`].
///
/// Returns false and leaves the existing subscriber alone if one is already
/// installed.
pub fn setup(level: Option<LevelFilter>) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let output =
        tracing_subscriber::fmt::layer().with_filter(level.unwrap_or(LevelFilter::INFO));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()
        .is_ok();
    if installed {
        debug!("logging set up");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_setup_keeps_first_subscriber() {
        setup(Some(LevelFilter::DEBUG));
        assert!(!setup(None));
        debug!("still logging");
    }
}
