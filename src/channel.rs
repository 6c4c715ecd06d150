//! Channel identity: the fixed set of four signal paths exposed to the host.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default event-channel prefix used by the host plugin registration.
pub const DEFAULT_CHANNEL_PREFIX: &str = "plugins.flutter.zendesk_chat_api";

/// One of the four named signal paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Network connection state.
    Connection,
    /// Account configuration.
    Account,
    /// Agent roster.
    Agents,
    /// Chat transcript items.
    ChatItems,
}

impl Channel {
    /// Every channel, in routing order.
    pub const ALL: [Channel; 4] = [
        Channel::Connection,
        Channel::Account,
        Channel::Agents,
        Channel::ChatItems,
    ];

    /// Short name used by the host runtime (`connection`, `chatItems`, ...).
    pub fn name(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Account => "account",
            Self::Agents => "agents",
            Self::ChatItems => "chatItems",
        }
    }

    /// Suffix of the fully-qualified event channel name.
    pub fn event_suffix(self) -> &'static str {
        match self {
            Self::Connection => "connection_status_events",
            Self::Account => "account_status_events",
            Self::Agents => "agent_events",
            Self::ChatItems => "chat_items_events",
        }
    }

    /// Fully-qualified event channel name under `prefix`.
    pub fn qualified_name(self, prefix: &str) -> String {
        format!("{prefix}/{}", self.event_suffix())
    }

    /// Resolve a host channel name.
    ///
    /// Accepts the short name or the qualified name under `prefix`.
    /// Returns `None` for anything outside the fixed set.
    pub fn resolve(name: &str, prefix: &str) -> Option<Self> {
        let short = match name.split_once('/') {
            Some((head, tail)) if head == prefix => {
                return Self::ALL.into_iter().find(|c| c.event_suffix() == tail);
            }
            Some(_) => return None,
            None => name,
        };
        Self::ALL.into_iter().find(|c| c.name() == short)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
