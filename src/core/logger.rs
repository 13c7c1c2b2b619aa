//! Logging setup
//!
//! Structured logging via `tracing`; level controlled through `RUST_LOG`.
//! When `LOG_DIR` names an existing directory, output goes to a daily
//! rolling file there instead of stderr.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Ok(dir) = std::env::var("LOG_DIR")
        && Path::new(&dir).exists()
    {
        let file_appender = tracing_appender::rolling::daily(dir, "courier-server");
        subscriber.with_writer(file_appender).init();
        return;
    }

    subscriber.init();
}
