//! Structured logging setup using `tracing-subscriber` and `tracing-appender`.
//!
//! Two modes:
//! - **Host** ([`init_host`]): JSON file layer (daily rotation) + console layer,
//!   for a bridge embedded in a long-running host process
//! - **CLI** ([`init_cli`]): console-only for the `chat-bridge` binary

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the non-blocking writer guard for file logging.
///
/// The [`WorkerGuard`] must be kept alive for as long as the bridge logs.
/// Dropping it flushes pending log entries and closes the file.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise logging for an embedding host.
///
/// Meant for the application that embeds the bridge as a plugin: call it
/// once from the plugin's registration entry point, before building the
/// [`Bridge`](crate::bridge::Bridge), and keep the returned guard for as long
/// as the plugin is loaded. The `chat-bridge` binary calls it when run with
/// `--log-dir`, and uses [`init_cli`] otherwise.
///
/// Writes JSON logs to `{logs_dir}/chat-bridge.log.YYYY-MM-DD` with daily
/// rotation, plus human-readable output on stderr. Both honour `RUST_LOG`
/// (default: `info`).
///
/// # Errors
///
/// Returns an error if the logs directory cannot be created or a global
/// subscriber is already installed.
pub fn init_host(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir).map_err(|e| {
        anyhow::anyhow!(
            "failed to create logs directory {}: {e}",
            logs_dir.display()
        )
    })?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "chat-bridge.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(LoggingGuard { _guard: guard })
}

/// Initialise stderr-only logging for the CLI.
///
/// Stdout is left for command output. Controlled by `RUST_LOG` (default: `info`).
pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}
