//! Signal adapter: one native observer registration feeding one subscriber.
//!
//! Two locks per adapter:
//! - `lifecycle` owns the [`ObservationToken`] and serialises attach, detach
//!   and the native register/release calls;
//! - `delivery` owns the [`SinkSlot`] and the id of the live registration,
//!   and is held across `accept`, so a subscriber must not re-enter the
//!   adapter from [`EventSink::accept`].
//!
//! Native callbacks only take `delivery`, and no native call is made while it
//! is held, so an SDK that fires synchronously inside `observe` or `release`
//! cannot deadlock. A callback whose registration id is not the live one is
//! dropped, which keeps late callbacks of a released token away from a
//! subscriber attached afterwards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::config::AttachPolicy;
use crate::error::{BridgeError, ConversionError, NativeError};
use crate::events::decoder_for;
use crate::native::{NativeCallback, NativeSdk, ObservationToken, RawPayload};
use crate::sink::{EventSink, SinkSlot};

type Decoder = fn(RawPayload) -> Result<Value, ConversionError>;

/// Result of a successful [`SignalAdapter::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The slot was empty; the subscriber is now attached.
    Attached,
    /// The previous subscriber was closed and replaced.
    Replaced,
    /// A subscriber was already attached; the new one was closed.
    Rejected,
}

#[derive(Default)]
struct Delivery {
    slot: SinkSlot,
    live: Option<u64>,
}

struct Inner {
    channel: Channel,
    sdk: Arc<dyn NativeSdk>,
    decode: Decoder,
    policy: AttachPolicy,
    lifecycle: Mutex<Option<ObservationToken>>,
    delivery: Mutex<Delivery>,
    next_registration: AtomicU64,
}

impl Inner {
    fn lifecycle(&self) -> MutexGuard<'_, Option<ObservationToken>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delivery(&self) -> MutexGuard<'_, Delivery> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_native_callback(&self, registration: u64, raw: RawPayload) {
        let event = match (self.decode)(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!(channel = %self.channel, error = %e, "dropping unconvertible native payload");
                return;
            }
        };

        let mut delivery = self.delivery();
        if delivery.live != Some(registration) {
            debug!(channel = %self.channel, registration, "dropping event from released registration");
            return;
        }
        if delivery.slot.push(event) {
            debug!(channel = %self.channel, "event delivered");
        } else {
            debug!(channel = %self.channel, "no subscriber attached, dropping event");
        }
    }
}

/// Adapter for one channel.
pub struct SignalAdapter {
    inner: Arc<Inner>,
}

impl SignalAdapter {
    /// Create an adapter for `channel` with no registration and no subscriber.
    pub fn new(channel: Channel, sdk: Arc<dyn NativeSdk>, policy: AttachPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                channel,
                sdk,
                decode: decoder_for(channel),
                policy,
                lifecycle: Mutex::new(None),
                delivery: Mutex::new(Delivery::default()),
                next_registration: AtomicU64::new(0),
            }),
        }
    }

    /// Channel served by this adapter.
    pub fn channel(&self) -> Channel {
        self.inner.channel
    }

    /// Whether a subscriber is attached.
    pub fn is_attached(&self) -> bool {
        !self.inner.delivery().slot.is_empty()
    }

    /// Whether a native registration is live.
    pub fn has_token(&self) -> bool {
        self.inner.lifecycle().is_some()
    }

    /// Attach `subscriber`, registering with the native SDK if needed.
    ///
    /// The subscriber is in place before the SDK is called, so a value the
    /// SDK pushes from inside `observe` reaches it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotInitialized`] or [`BridgeError::Registration`]
    /// when the SDK refuses the registration. The subscriber is closed and no
    /// token is kept.
    pub fn attach(&self, mut subscriber: Box<dyn EventSink>) -> Result<AttachOutcome, BridgeError> {
        let channel = self.inner.channel;
        let mut token = self.inner.lifecycle();

        let (displaced, registration) = {
            let mut delivery = self.inner.delivery();
            if !delivery.slot.is_empty() && self.inner.policy == AttachPolicy::Reject {
                drop(delivery);
                subscriber.close();
                info!(channel = %channel, "subscriber already attached, rejecting new one");
                return Ok(AttachOutcome::Rejected);
            }
            let displaced = delivery.slot.set(subscriber);
            if token.is_some() {
                (displaced, None)
            } else {
                let id = self.inner.next_registration.fetch_add(1, Ordering::Relaxed);
                delivery.live = Some(id);
                (displaced, Some(id))
            }
        };

        let outcome = match displaced {
            Some(mut previous) => {
                previous.close();
                info!(channel = %channel, "replaced attached subscriber");
                AttachOutcome::Replaced
            }
            None => AttachOutcome::Attached,
        };

        let Some(registration) = registration else {
            info!(channel = %channel, "subscriber attached to live registration");
            return Ok(outcome);
        };

        match self.register(registration) {
            Ok(fresh) => {
                info!(channel = %channel, token = ?fresh, "native observer registered");
                *token = Some(fresh);
                Ok(outcome)
            }
            Err(e) => {
                let removed = {
                    let mut delivery = self.inner.delivery();
                    if delivery.live == Some(registration) {
                        delivery.live = None;
                    }
                    delivery.slot.clear()
                };
                if let Some(mut removed) = removed {
                    removed.close();
                }
                warn!(channel = %channel, error = %e, "native observer registration failed");
                Err(BridgeError::from_registration(channel, e))
            }
        }
    }

    /// Register with no subscriber attached; events are dropped until one attaches.
    ///
    /// No-op when a registration is already live.
    ///
    /// # Errors
    ///
    /// Same as [`attach`](Self::attach).
    pub fn prime(&self) -> Result<(), BridgeError> {
        let channel = self.inner.channel;
        let mut token = self.inner.lifecycle();
        if token.is_some() {
            return Ok(());
        }
        let registration = self.inner.next_registration.fetch_add(1, Ordering::Relaxed);
        self.inner.delivery().live = Some(registration);

        match self.register(registration) {
            Ok(fresh) => {
                info!(channel = %channel, token = ?fresh, "native observer registered eagerly");
                *token = Some(fresh);
                Ok(())
            }
            Err(e) => {
                let mut delivery = self.inner.delivery();
                if delivery.live == Some(registration) {
                    delivery.live = None;
                }
                Err(BridgeError::from_registration(channel, e))
            }
        }
    }

    fn register(&self, registration: u64) -> Result<ObservationToken, NativeError> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let callback: NativeCallback = Arc::new(move |raw: RawPayload| {
            if let Some(inner) = weak.upgrade() {
                inner.on_native_callback(registration, raw);
            }
        });
        self.inner.sdk.observe(self.inner.channel, callback)
    }

    /// Detach the subscriber and release the native registration.
    ///
    /// Idempotent. The removed subscriber is closed and receives nothing
    /// after this returns. Returns whether a subscriber was attached.
    pub fn detach(&self) -> bool {
        let channel = self.inner.channel;
        let mut token = self.inner.lifecycle();

        let removed = {
            let mut delivery = self.inner.delivery();
            delivery.live = None;
            delivery.slot.clear()
        };

        if let Some(released) = token.take() {
            info!(channel = %channel, token = ?released, "releasing native observer");
            self.inner.sdk.release(released);
        }
        drop(token);

        match removed {
            Some(mut subscriber) => {
                subscriber.close();
                info!(channel = %channel, "subscriber detached");
                true
            }
            None => false,
        }
    }
}

impl Drop for SignalAdapter {
    fn drop(&mut self) {
        self.detach();
    }
}
