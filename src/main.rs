//! chat-bridge CLI entry point.
//!
//! Provides `replay` for driving the bridge from a scripted sequence of
//! native callbacks, and `check-config` for printing the effective config.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use chat_bridge::config::{self, BridgeConfig};
use chat_bridge::{logging, replay};

/// chat-bridge: native chat SDK observers as event streams.
#[derive(Parser)]
#[command(name = "chat-bridge", version, about)]
struct Cli {
    /// Config file (default: ~/.chat-bridge/config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs with daily rotation into this directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Replay a JSON script of native callbacks and print delivered events.
    Replay {
        /// Path to the script file.
        #[arg(long)]
        script: PathBuf,
    },
    /// Parse the config and print it as TOML.
    CheckConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = match cli.log_dir.as_deref() {
        Some(dir) => Some(logging::init_host(dir)?),
        None => {
            logging::init_cli();
            None
        }
    };

    let config = resolve_config(cli.config.as_deref())?;

    match cli.command {
        Command::Replay { script } => handle_replay(&script, config),
        Command::CheckConfig => handle_check_config(&config),
    }
}

/// Load the explicit config, else the default file if it exists, else defaults.
fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    if let Some(path) = explicit {
        return config::load_config(path);
    }
    match config::default_config_path() {
        Ok(path) if path.is_file() => config::load_config(&path),
        _ => Ok(BridgeConfig::default()),
    }
}

fn handle_replay(script_path: &Path, config: BridgeConfig) -> anyhow::Result<()> {
    let script = replay::load_script(script_path)?;
    let delivered = replay::run(&script, config)?;
    info!(events = delivered.len(), "replay finished");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for item in &delivered {
        let line = serde_json::to_string(item).context("failed to encode delivered event")?;
        writeln!(out, "{line}").context("failed to write to stdout")?;
    }
    Ok(())
}

fn handle_check_config(config: &BridgeConfig) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(config).context("failed to render config")?;
    print!("{text}");
    Ok(())
}
