//! Error taxonomy for the bridge.
//!
//! [`BridgeError`] is returned synchronously to host callers.
//! [`ConversionError`] only ever appears on the native callback path, where it
//! is logged and the offending event dropped.

use crate::channel::Channel;

/// Failures reported by a [`NativeSdk`](crate::native::NativeSdk) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The SDK session has not been initialised yet.
    #[error("native chat session is not initialised")]
    SessionNotInitialized,

    /// The SDK refused to register an observer.
    #[error("native SDK rejected observer registration: {reason}")]
    Rejected {
        /// Reason reported by the SDK.
        reason: String,
    },

    /// The SDK failed to initialise a session.
    #[error("native SDK failed to initialise session: {reason}")]
    InitFailed {
        /// Reason reported by the SDK.
        reason: String,
    },
}

/// Caller-facing bridge errors.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Channel name outside the fixed set of four.
    #[error("unknown channel '{name}'")]
    UnknownChannel {
        /// Name the caller supplied.
        name: String,
    },

    /// `initialize` called again with a different account identifier.
    #[error("bridge already initialised for account '{current}', refusing '{requested}'")]
    AlreadyInitialized {
        /// Identifier the bridge was initialised with.
        current: String,
        /// Conflicting identifier from the repeated call.
        requested: String,
    },

    /// Account identifier was empty.
    #[error("account identifier must not be empty")]
    InvalidAccountId,

    /// Attach attempted before the native session exists.
    #[error("cannot attach '{channel}': native session is not initialised")]
    NotInitialized {
        /// Channel the caller tried to attach.
        channel: Channel,
    },

    /// Native SDK refused to register an observer for the channel.
    #[error("failed to register native observer for '{channel}'")]
    Registration {
        /// Channel being attached.
        channel: Channel,
        /// Underlying SDK failure.
        #[source]
        source: NativeError,
    },

    /// Native session initialisation failed.
    #[error(transparent)]
    Native(#[from] NativeError),
}

impl BridgeError {
    /// Map a registration failure, folding session errors into [`BridgeError::NotInitialized`].
    pub(crate) fn from_registration(channel: Channel, err: NativeError) -> Self {
        match err {
            NativeError::SessionNotInitialized => Self::NotInitialized { channel },
            source => Self::Registration { channel, source },
        }
    }
}

/// Native payload could not be converted into the channel's event shape.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// Payload did not match the native model for the channel.
    #[error("malformed {channel} payload: {source}")]
    Malformed {
        /// Channel the callback belongs to.
        channel: Channel,
        /// Deserialisation failure.
        #[source]
        source: serde_json::Error,
    },

    /// Event could not be encoded into the host value representation.
    #[error("failed to encode {channel} event: {source}")]
    Encode {
        /// Channel the event belongs to.
        channel: Channel,
        /// Serialisation failure.
        #[source]
        source: serde_json::Error,
    },
}
