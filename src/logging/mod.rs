//! Logging for the chronolog daemon
//!
//! Sets up tracing output to stderr, optionally mirrored to a timestamped
//! log file, and cleans up old log files.

mod file_writer;
mod retention;

pub use file_writer::{init_logging, LogFileInfo, LoggingGuard};
pub use retention::{cleanup_old_logs, cleanup_old_logs_with_retention, DEFAULT_RETENTION_DAYS};
