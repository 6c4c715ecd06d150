//! Configuration loading and validation.
//!
//! Every field has a default, so an empty file (or no file) yields a usable
//! [`BridgeConfig`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::channel::DEFAULT_CHANNEL_PREFIX;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Channel lifecycle policy.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Pull-stream settings.
    #[serde(default)]
    pub stream: StreamConfig,
}

/// What `attach` does when a subscriber is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachPolicy {
    /// Close the current subscriber and attach the new one.
    #[default]
    Replace,
    /// Keep the current subscriber and close the new one.
    Reject,
}

/// When native observer registrations are created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    /// On first attach.
    #[default]
    Lazy,
    /// For every channel as soon as the session is initialised.
    Eager,
}

/// Channel lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Second-attach policy.
    #[serde(default)]
    pub attach_policy: AttachPolicy,

    /// Token creation timing.
    #[serde(default)]
    pub registration: Registration,

    /// Prefix of fully-qualified event channel names.
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            attach_policy: AttachPolicy::default(),
            registration: Registration::default(),
            prefix: default_prefix(),
        }
    }
}

/// Settings for [`EventStream`](crate::sink::EventStream) subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Undelivered events buffered per stream before dropping.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
        }
    }
}

fn default_prefix() -> String {
    DEFAULT_CHANNEL_PREFIX.to_owned()
}
fn default_buffer() -> usize {
    64
}

impl BridgeConfig {
    /// Check value ranges serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero stream buffer or an empty channel prefix.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stream.buffer == 0 {
            anyhow::bail!("stream.buffer must be at least 1");
        }
        if self.channels.prefix.is_empty() || self.channels.prefix.contains('/') {
            anyhow::bail!(
                "channels.prefix must be non-empty and contain no '/': '{}'",
                self.channels.prefix
            );
        }
        Ok(())
    }
}

/// Parse and validate a config from TOML text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML or fails validation.
pub fn parse_config(contents: &str) -> anyhow::Result<BridgeConfig> {
    let config: BridgeConfig = toml::from_str(contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;
    config.validate()?;
    Ok(config)
}

/// Load the config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> anyhow::Result<BridgeConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    parse_config(&contents).map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))
}

/// Resolve the default config directory (`~/.chat-bridge/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".chat-bridge"))
}

/// Default config file path (`~/.chat-bridge/config.toml`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}
