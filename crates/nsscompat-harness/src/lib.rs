//! # nsscompat-harness
//!
//! Tooling around the lookup library: the `nsscompat` CLI, JSONL structured
//! logging, JSON reports, the multi-thread stress runner and the
//! files-backend cross-check.

pub mod crosscheck;
pub mod error;
pub mod query;
pub mod report;
pub mod stress;
pub mod structured_log;

pub use error::HarnessError;
pub use query::Query;
pub use report::LookupReport;
pub use structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
