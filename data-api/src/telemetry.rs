use std::sync::Once;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static INIT: Once = Once::new();

/// Installs the stdout and the hourly rolling file log layers. `RUST_LOG`
/// overrides the default `info` filter.
pub fn setup_telemetry(log_dir: &str) {
    INIT.call_once(|| {
        let file_appender = match RollingFileAppender::builder()
            .rotation(Rotation::HOURLY)
            .filename_prefix("data-api")
            .filename_suffix("log")
            .max_log_files(48)
            .build(log_dir)
        {
            Ok(appender) => Some(appender),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to create log file appender: {}. Logging to stdout only.",
                    e
                );
                None
            }
        };

        let stdout_layer = fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_filter(default_filter());

        if let Some(file_appender) = file_appender {
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let file_layer = fmt::Layer::new()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(EnvFilter::new("info"));

            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .init();

            // Flushes on drop, so it has to live as long as the process.
            std::mem::forget(guard);
        } else {
            tracing_subscriber::registry().with(stdout_layer).init();
        }
    });
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,data_api=debug,data_account_client=debug"))
}
