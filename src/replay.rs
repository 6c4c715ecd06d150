//! Scripted replay of native callbacks through a [`Bridge`].
//!
//! A script names the account, the channels to attach up front, and a list
//! of steps. Each step either fires a native payload on a channel or
//! attaches/detaches one. Events are collected through [`EventStream`]s in
//! delivery order.
//!
//! ```json
//! {
//!   "account_id": "acct-1",
//!   "attach": ["connection"],
//!   "steps": [
//!     {"channel": "connection", "payload": "CONNECTED"},
//!     {"detach": "connection"},
//!     {"channel": "connection", "payload": "DISCONNECTED"}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::adapter::AttachOutcome;
use crate::bridge::Bridge;
use crate::channel::Channel;
use crate::config::BridgeConfig;
use crate::native::loopback::LoopbackSdk;
use crate::native::NativeSdk;
use crate::sink::{self, EventStream};

/// A replay script.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Account identifier passed to `initialize`.
    pub account_id: String,
    /// Channels attached before the first step.
    #[serde(default)]
    pub attach: Vec<String>,
    /// Steps, in order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One replay step.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    /// Fire a native payload on a channel.
    Emit {
        /// Channel name.
        channel: String,
        /// Raw native payload.
        payload: Value,
    },
    /// Attach a subscriber.
    Attach {
        /// Channel name.
        attach: String,
    },
    /// Detach the subscriber.
    Detach {
        /// Channel name.
        detach: String,
    },
}

/// One event as it reached a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivered {
    /// Channel that delivered the event.
    pub channel: Channel,
    /// Event in the host encoding.
    pub event: Value,
}

/// Read a script from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid script.
pub fn load_script(path: &Path) -> anyhow::Result<Script> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse script at {}", path.display()))
}

/// Run `script` against an in-process SDK and return every delivered event.
///
/// # Errors
///
/// Returns an error for unknown channel names, or when the bridge refuses
/// initialisation or an attach.
pub fn run(script: &Script, config: BridgeConfig) -> anyhow::Result<Vec<Delivered>> {
    let sdk = Arc::new(LoopbackSdk::new());
    let bridge = Bridge::new(Arc::clone(&sdk) as Arc<dyn NativeSdk>, config);
    bridge
        .initialize(&script.account_id)
        .context("failed to initialise bridge")?;

    let mut streams: BTreeMap<Channel, EventStream> = BTreeMap::new();
    let mut delivered = Vec::new();

    for name in &script.attach {
        if let Some(stream) = attach_stream(&bridge, name)? {
            streams.insert(stream.channel(), stream);
        }
    }
    drain(&mut streams, &mut delivered);

    for step in &script.steps {
        match step {
            Step::Emit { channel, payload } => {
                let channel = bridge.resolve(channel)?;
                let fired = sdk.emit(channel, payload.clone());
                debug!(channel = %channel, fired, "replayed native callback");
            }
            Step::Attach { attach } => {
                let Some(stream) = attach_stream(&bridge, attach)? else {
                    continue;
                };
                // Buffered events of a replaced stream are still reported.
                if let Some(mut previous) = streams.insert(stream.channel(), stream) {
                    while let Some(event) = previous.try_next_event() {
                        delivered.push(Delivered {
                            channel: previous.channel(),
                            event,
                        });
                    }
                }
            }
            Step::Detach { detach } => {
                let channel = bridge.resolve(detach)?;
                bridge.detach(channel);
            }
        }
        drain(&mut streams, &mut delivered);
    }

    bridge.teardown();
    Ok(delivered)
}

/// Attach a fresh stream; `None` when the attach policy rejected it.
fn attach_stream(bridge: &Bridge, name: &str) -> anyhow::Result<Option<EventStream>> {
    let channel = bridge.resolve(name)?;
    let (push, pull) = sink::stream(channel, bridge.config().stream.buffer);
    let outcome = bridge
        .attach(channel, Box::new(push))
        .with_context(|| format!("failed to attach '{name}'"))?;
    Ok((outcome != AttachOutcome::Rejected).then_some(pull))
}

fn drain(streams: &mut BTreeMap<Channel, EventStream>, delivered: &mut Vec<Delivered>) {
    for (channel, stream) in streams.iter_mut() {
        while let Some(event) = stream.try_next_event() {
            delivered.push(Delivered {
                channel: *channel,
                event,
            });
        }
    }
}
