//! In-process native SDK.
//!
//! Keeps observers in memory and fires them on demand via
//! [`LoopbackSdk::emit`]. Counts registrations and releases per channel so
//! lifecycle behaviour can be asserted. Callbacks are always invoked with the
//! internal lock released, from the caller's thread.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{NativeCallback, NativeSdk, ObservationToken, RawPayload};
use crate::channel::Channel;
use crate::error::NativeError;

#[derive(Default)]
struct LoopbackState {
    session: Option<String>,
    next_id: u64,
    live: HashMap<u64, (Channel, NativeCallback)>,
    /// Most recently released callback per channel.
    released: HashMap<Channel, NativeCallback>,
    registrations: HashMap<Channel, usize>,
    releases: HashMap<Channel, usize>,
    fail_next_observe: Option<NativeError>,
    fail_observe_on: HashMap<Channel, NativeError>,
    fail_init: Option<NativeError>,
    emit_on_observe: HashMap<Channel, RawPayload>,
}

/// Native SDK double backed by in-memory observer tables.
#[derive(Default)]
pub struct LoopbackSdk {
    state: Mutex<LoopbackState>,
}

impl LoopbackSdk {
    /// Create an SDK with no session.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Fire every live observer of `channel` with `payload`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, channel: Channel, payload: RawPayload) -> usize {
        let callbacks: Vec<NativeCallback> = self
            .state()
            .live
            .values()
            .filter(|(c, _)| *c == channel)
            .map(|(_, cb)| NativeCallback::clone(cb))
            .collect();
        fire(&callbacks, payload)
    }

    /// Fire the most recently released callback of `channel`, if any.
    ///
    /// Models an SDK that delivers a late callback racing with release. Only
    /// the latest release per channel is kept.
    pub fn emit_released(&self, channel: Channel, payload: RawPayload) -> usize {
        let callbacks: Vec<NativeCallback> = self
            .state()
            .released
            .get(&channel)
            .map(NativeCallback::clone)
            .into_iter()
            .collect();
        fire(&callbacks, payload)
    }

    /// Make the next `observe` call fail with `err`.
    pub fn fail_next_observe(&self, err: NativeError) {
        self.state().fail_next_observe = Some(err);
    }

    /// Make the next `observe` call for `channel` fail with `err`.
    pub fn fail_observe_on(&self, channel: Channel, err: NativeError) {
        self.state().fail_observe_on.insert(channel, err);
    }

    /// Make the next `init_session` call fail with `err`.
    pub fn fail_init(&self, err: NativeError) {
        self.state().fail_init = Some(err);
    }

    /// Invoke new observers of `channel` with `payload` before `observe` returns.
    ///
    /// Real SDKs push the current value to a fresh observer immediately.
    pub fn emit_on_observe(&self, channel: Channel, payload: RawPayload) {
        self.state().emit_on_observe.insert(channel, payload);
    }

    /// Total registrations ever made for `channel`.
    pub fn registrations(&self, channel: Channel) -> usize {
        self.state().registrations.get(&channel).copied().unwrap_or(0)
    }

    /// Total releases ever made for `channel`.
    pub fn releases(&self, channel: Channel) -> usize {
        self.state().releases.get(&channel).copied().unwrap_or(0)
    }

    /// Registrations for `channel` that are currently live.
    pub fn live_tokens(&self, channel: Channel) -> usize {
        self.state()
            .live
            .values()
            .filter(|(c, _)| *c == channel)
            .count()
    }

    /// Account identifier of the current session, if any.
    pub fn session(&self) -> Option<String> {
        self.state().session.clone()
    }
}

fn fire(callbacks: &[NativeCallback], payload: RawPayload) -> usize {
    for callback in callbacks {
        callback(payload.clone());
    }
    callbacks.len()
}

impl NativeSdk for LoopbackSdk {
    fn init_session(&self, account_id: &str) -> Result<(), NativeError> {
        let mut state = self.state();
        if let Some(err) = state.fail_init.take() {
            return Err(err);
        }
        state.session = Some(account_id.to_owned());
        debug!(account_id, "loopback session initialised");
        Ok(())
    }

    fn observe(
        &self,
        channel: Channel,
        callback: NativeCallback,
    ) -> Result<ObservationToken, NativeError> {
        let (token, initial) = {
            let mut state = self.state();
            if let Some(err) = state.fail_next_observe.take() {
                return Err(err);
            }
            if let Some(err) = state.fail_observe_on.remove(&channel) {
                return Err(err);
            }
            if state.session.is_none() {
                return Err(NativeError::SessionNotInitialized);
            }
            let id = state.next_id;
            state.next_id = id.saturating_add(1);
            state
                .live
                .insert(id, (channel, NativeCallback::clone(&callback)));
            let count = state.registrations.entry(channel).or_insert(0);
            *count = count.saturating_add(1);
            (
                ObservationToken::new(channel, id),
                state.emit_on_observe.get(&channel).cloned(),
            )
        };
        if let Some(payload) = initial {
            callback(payload);
        }
        Ok(token)
    }

    fn release(&self, token: ObservationToken) {
        let mut state = self.state();
        if let Some((channel, callback)) = state.live.remove(&token.id()) {
            state.released.insert(channel, callback);
            let count = state.releases.entry(token.channel()).or_insert(0);
            *count = count.saturating_add(1);
        }
    }
}
