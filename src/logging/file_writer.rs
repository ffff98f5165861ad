//! Tracing subscriber setup with optional file output
//!
//! Logs always go to stderr. When file logging is enabled they are also
//! appended to a timestamped file under the logs directory.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Prefix shared by every log file this daemon writes
pub(crate) const LOG_FILE_PREFIX: &str = "chronolog-";

/// Information about the current log file
#[derive(Debug, Clone)]
pub struct LogFileInfo {
    /// Full path to the log file
    pub path: PathBuf,
}

/// Generate a timestamped log file path
pub fn create_log_file_path(logs_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    logs_dir.join(format!("{}{}.log", LOG_FILE_PREFIX, timestamp))
}

/// A writer that appends to the shared log file
struct FileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut file) = self.file.lock() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut file) = self.file.lock() {
            file.flush()
        } else {
            Ok(())
        }
    }
}

/// Writer factory for tracing-subscriber
struct FileWriterMaker {
    file: Arc<Mutex<File>>,
}

impl<'a> MakeWriter<'a> for FileWriterMaker {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Guard that keeps the log file open
pub struct LoggingGuard {
    _file: Option<Arc<Mutex<File>>>,
}

fn open_log_file(logs_dir: &Path) -> Result<(PathBuf, Arc<Mutex<File>>)> {
    fs::create_dir_all(logs_dir).context("Failed to create logs directory")?;

    let log_path = create_log_file_path(logs_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    Ok((log_path, Arc::new(Mutex::new(file))))
}

/// Initialize the global tracing subscriber
///
/// `RUST_LOG` overrides the default `chronolog=info` filter. When `logs_dir`
/// is given, output is mirrored into a new file there. The returned guard
/// must be kept alive for the duration of logging.
pub fn init_logging(logs_dir: Option<&Path>) -> Result<(Option<LogFileInfo>, LoggingGuard)> {
    let opened = logs_dir.map(open_log_file).transpose()?;

    let file_layer = opened.as_ref().map(|(_, file)| {
        tracing_subscriber::fmt::layer()
            .with_writer(FileWriterMaker {
                file: Arc::clone(file),
            })
            .with_ansi(false)
            .with_target(true)
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chronolog=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    let (info, file) = match opened {
        Some((path, file)) => (Some(LogFileInfo { path }), Some(file)),
        None => (None, None),
    };

    Ok((info, LoggingGuard { _file: file }))
}
