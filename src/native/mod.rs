//! Boundary contract with the native chat SDK.
//!
//! The SDK is push-style: registering an observer yields an
//! [`ObservationToken`], and the SDK invokes the callback from its own
//! thread until the token is released. [`loopback::LoopbackSdk`] is an
//! in-process implementation used by tests and the `replay` command.

pub mod loopback;

use std::fmt;
use std::sync::Arc;

use crate::channel::Channel;
use crate::error::NativeError;

/// Untyped payload handed to an observer callback by the native binding.
pub type RawPayload = serde_json::Value;

/// Observer callback registered with the native SDK.
pub type NativeCallback = Arc<dyn Fn(RawPayload) + Send + Sync>;

/// Opaque handle for one live observer registration.
///
/// Deliberately not `Clone`: exactly one owner may release it.
#[derive(PartialEq, Eq, Hash)]
pub struct ObservationToken {
    channel: Channel,
    id: u64,
}

impl ObservationToken {
    /// Create a token. Called by SDK implementations only.
    pub fn new(channel: Channel, id: u64) -> Self {
        Self { channel, id }
    }

    /// Channel the registration observes.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// SDK-assigned registration identifier.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for ObservationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservationToken({}#{})", self.channel, self.id)
    }
}

/// Native chat SDK as seen by the bridge.
///
/// Implementations may invoke callbacks from any thread, including
/// synchronously from inside [`observe`](NativeSdk::observe).
pub trait NativeSdk: Send + Sync {
    /// Initialise the SDK session for `account_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError::InitFailed`] if the SDK cannot start a session.
    fn init_session(&self, account_id: &str) -> Result<(), NativeError>;

    /// Register `callback` for `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError::SessionNotInitialized`] when no session exists,
    /// or [`NativeError::Rejected`] for any other refusal.
    fn observe(
        &self,
        channel: Channel,
        callback: NativeCallback,
    ) -> Result<ObservationToken, NativeError>;

    /// Release a registration. The SDK stops invoking its callback.
    fn release(&self, token: ObservationToken);
}
