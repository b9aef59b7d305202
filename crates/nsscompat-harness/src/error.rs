//! Harness error type.

use nsscompat_core::LookupError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("worker thread {0} panicked")]
    WorkerPanicked(String),
}
