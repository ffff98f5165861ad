use std::sync::Arc;

use anyhow::{Context, Result};

use chronolog::api;
use chronolog::config::{logs_dir, Config};
use chronolog::logging;
use chronolog::store::{sweep, LogStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    // Initialize logging BEFORE any tracing calls
    let file_logs_dir = config.log_to_file.then(logs_dir);
    let (log_file_info, _guard) = logging::init_logging(file_logs_dir.as_deref())?;

    if let Some(info) = &log_file_info {
        tracing::info!("Logging to: {}", info.path.display());
        match logging::cleanup_old_logs_with_retention(
            &logs_dir(),
            config.log_retention_days,
        ) {
            Ok(count) if count > 0 => tracing::info!("Cleaned up {} old log files", count),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to clean up old log files"),
        }
    }

    let store = Arc::new(LogStore::new());
    let sweeper = sweep::spawn(Arc::clone(&store), config.sweep());

    let server = api::start(config.socket_addr()?, Arc::clone(&store)).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    server.shutdown();
    sweeper.shutdown().await;

    Ok(())
}
