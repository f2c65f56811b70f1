//! Network timeouts
//!
//! Connect and request timeouts go to the HTTP client. The idle timeout
//! bounds the wait for each chunk of a streamed body.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// Timeout configuration (milliseconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection establishment
    #[serde(default = "default_connect_timeout")]
    pub connect: u64,
    /// Whole non-streaming request
    #[serde(default = "default_request_timeout")]
    pub request: u64,
    /// Gap between two chunks of a streamed body
    #[serde(default = "default_idle_timeout")]
    pub idle: u64,
}

fn default_connect_timeout() -> u64 {
    30000
}
fn default_request_timeout() -> u64 {
    120000
}
fn default_idle_timeout() -> u64 {
    60000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        DEFAULT_TIMEOUTS
    }
}

/// Default timeouts
pub const DEFAULT_TIMEOUTS: TimeoutConfig = TimeoutConfig {
    connect: 30000,  // 30s
    request: 120000, // 2min
    idle: 60000,     // 1min
};

impl TimeoutConfig {
    pub fn connect_duration(&self) -> Duration {
        Duration::from_millis(self.connect)
    }

    pub fn request_duration(&self) -> Duration {
        Duration::from_millis(self.request)
    }
}

/// Timeout error
#[derive(Debug, Error)]
#[error("Operation timed out after {timeout_ms}ms")]
pub struct TimeoutError {
    pub timeout_ms: u64,
}

/// Run a future with a timeout
pub async fn with_timeout<T, F>(future: F, timeout_ms: u64) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    match timeout(Duration::from_millis(timeout_ms), future).await {
        Ok(result) => Ok(result),
        Err(_) => Err(TimeoutError { timeout_ms }),
    }
}
