//! Bridge facade: the single entry point the host registration talks to.
//!
//! Owns the four [`SignalAdapter`]s and the session state. It is an explicit
//! context object; the host integration constructs one and passes it where
//! routing is needed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::adapter::{AttachOutcome, SignalAdapter};
use crate::channel::Channel;
use crate::config::{BridgeConfig, Registration};
use crate::error::BridgeError;
use crate::native::NativeSdk;
use crate::sink::{self, EventSink, EventStream};

/// Routes host channel operations to per-channel adapters.
pub struct Bridge {
    config: BridgeConfig,
    sdk: Arc<dyn NativeSdk>,
    account_id: Mutex<Option<String>>,
    connection: SignalAdapter,
    account: SignalAdapter,
    agents: SignalAdapter,
    chat_items: SignalAdapter,
}

impl Bridge {
    /// Build a bridge over `sdk`. No native call is made until [`initialize`](Self::initialize).
    pub fn new(sdk: Arc<dyn NativeSdk>, config: BridgeConfig) -> Self {
        let policy = config.channels.attach_policy;
        let adapter = |channel| SignalAdapter::new(channel, Arc::clone(&sdk), policy);
        Self {
            connection: adapter(Channel::Connection),
            account: adapter(Channel::Account),
            agents: adapter(Channel::Agents),
            chat_items: adapter(Channel::ChatItems),
            account_id: Mutex::new(None),
            sdk,
            config,
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    fn account_id_guard(&self) -> MutexGuard<'_, Option<String>> {
        self.account_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Account identifier the session was initialised with.
    pub fn account_id(&self) -> Option<String> {
        self.account_id_guard().clone()
    }

    /// Initialise the native session for `account_id`.
    ///
    /// Repeating the call with the same identifier does not restart the
    /// session. With [`Registration::Eager`] every channel without a live
    /// registration is registered, on the first call and on repeats. If a
    /// first call fails to register a channel, the channels registered so far
    /// are released and the bridge stays uninitialised, so the call can be
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::InvalidAccountId`] for an empty identifier
    /// - [`BridgeError::AlreadyInitialized`] for a different identifier
    /// - [`BridgeError::Native`] if the SDK cannot start the session
    /// - a registration error from eager registration
    pub fn initialize(&self, account_id: &str) -> Result<(), BridgeError> {
        if account_id.is_empty() {
            return Err(BridgeError::InvalidAccountId);
        }
        // Held through eager registration so no attach observes a session
        // that is about to be rolled back.
        let mut current = self.account_id_guard();
        let fresh = match current.as_deref() {
            Some(existing) if existing == account_id => false,
            Some(existing) => {
                return Err(BridgeError::AlreadyInitialized {
                    current: existing.to_owned(),
                    requested: account_id.to_owned(),
                });
            }
            None => {
                self.sdk.init_session(account_id)?;
                *current = Some(account_id.to_owned());
                info!(account_id, "chat session initialised");
                true
            }
        };

        if self.config.channels.registration == Registration::Eager {
            if let Err(e) = self.prime_all() {
                if fresh {
                    for channel in Channel::ALL {
                        self.detach(channel);
                    }
                    *current = None;
                    warn!(
                        account_id,
                        error = %e,
                        "eager registration failed, initialisation rolled back"
                    );
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn prime_all(&self) -> Result<(), BridgeError> {
        for channel in Channel::ALL {
            self.adapter(channel).prime()?;
        }
        Ok(())
    }

    /// Resolve a host channel name.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownChannel`] for names outside the fixed set.
    pub fn resolve(&self, name: &str) -> Result<Channel, BridgeError> {
        Channel::resolve(name, &self.config.channels.prefix).ok_or_else(|| {
            BridgeError::UnknownChannel {
                name: name.to_owned(),
            }
        })
    }

    /// Adapter serving `channel`.
    pub fn adapter(&self, channel: Channel) -> &SignalAdapter {
        match channel {
            Channel::Connection => &self.connection,
            Channel::Account => &self.account,
            Channel::Agents => &self.agents,
            Channel::ChatItems => &self.chat_items,
        }
    }

    /// Attach `subscriber` to the channel named `name`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownChannel`] for unrecognised names, otherwise as
    /// [`attach`](Self::attach). A refused subscriber is closed.
    pub fn attach_channel(
        &self,
        name: &str,
        mut subscriber: Box<dyn EventSink>,
    ) -> Result<AttachOutcome, BridgeError> {
        match self.resolve(name) {
            Ok(channel) => self.attach(channel, subscriber),
            Err(e) => {
                warn!(name, "attach to unknown channel");
                subscriber.close();
                Err(e)
            }
        }
    }

    /// Attach `subscriber` to `channel`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotInitialized`] before [`initialize`](Self::initialize)
    /// has succeeded, or a registration error from the SDK.
    pub fn attach(
        &self,
        channel: Channel,
        mut subscriber: Box<dyn EventSink>,
    ) -> Result<AttachOutcome, BridgeError> {
        if self.account_id_guard().is_none() {
            subscriber.close();
            return Err(BridgeError::NotInitialized { channel });
        }
        self.adapter(channel).attach(subscriber)
    }

    /// Attach a pull-stream subscriber to the channel named `name`.
    ///
    /// If the attach policy rejects it, the returned stream ends immediately.
    ///
    /// # Errors
    ///
    /// Same as [`attach_channel`](Self::attach_channel).
    pub fn subscribe(&self, name: &str) -> Result<EventStream, BridgeError> {
        let channel = self.resolve(name)?;
        let (push, pull) = sink::stream(channel, self.config.stream.buffer);
        self.attach(channel, Box::new(push))?;
        Ok(pull)
    }

    /// Detach the channel named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownChannel`] for unrecognised names.
    pub fn detach_channel(&self, name: &str) -> Result<bool, BridgeError> {
        let channel = self.resolve(name)?;
        Ok(self.detach(channel))
    }

    /// Detach `channel`. Returns whether a subscriber was attached.
    pub fn detach(&self, channel: Channel) -> bool {
        self.adapter(channel).detach()
    }

    /// Whether `channel` has a subscriber.
    pub fn is_attached(&self, channel: Channel) -> bool {
        self.adapter(channel).is_attached()
    }

    /// Whether `channel` holds a live native registration.
    pub fn has_token(&self, channel: Channel) -> bool {
        self.adapter(channel).has_token()
    }

    /// Detach every channel and release every registration. Idempotent.
    pub fn teardown(&self) {
        for channel in Channel::ALL {
            self.detach(channel);
        }
        info!("bridge torn down");
    }
}
