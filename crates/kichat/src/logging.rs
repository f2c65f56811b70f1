//! Logging setup
//!
//! Diagnostics go to stderr so they never interleave with streamed replies on
//! stdout. `RUST_LOG` takes precedence over the default level.

use tracing_subscriber::EnvFilter;

use crate::error::{ChatError, ChatResult};

/// Build the filter used by [`init_logging`]
pub fn env_filter(default_level: &str) -> ChatResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| ChatError::config(format!("invalid log level '{}': {}", default_level, e))),
    }
}

/// Install the global subscriber
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging(default_level: &str) -> ChatResult<()> {
    let filter = env_filter(default_level)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}
