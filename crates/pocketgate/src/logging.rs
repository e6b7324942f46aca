//! Logging bootstrap.
//!
//! Every crate logs through `tracing`; this installs the subscriber that
//! prints it. `RUST_LOG` wins over the filter passed in, so operators can
//! turn up one module without a rebuild:
//!
//! ```text
//! RUST_LOG=pocketgate_session=debug,info ./server
//! ```

use tracing_subscriber::EnvFilter;

use crate::PocketgateError;

/// Installs the global fmt subscriber.
///
/// # Errors
/// [`PocketgateError::Config`] if `default_filter` does not parse or a
/// subscriber is already installed.
pub fn try_init(default_filter: &str) -> Result<(), PocketgateError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| PocketgateError::Config(format!("log filter: {e}")))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| PocketgateError::Config(format!("logging: {e}")))
}

/// Like [`try_init`], but a second call is a no-op.
pub fn init(default_filter: &str) {
    if let Err(e) = try_init(default_filter) {
        tracing::debug!(error = %e, "logging already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init("info");
        init("debug");
        assert!(try_init("info").is_err());
    }
}
