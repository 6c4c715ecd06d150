//! chat-bridge: native chat SDK observers as single-subscriber event streams.
//!
//! Four channels (connection, account, agents, chat items) each get a
//! [`adapter::SignalAdapter`] that owns one native observation token and one
//! subscriber slot. The [`bridge::Bridge`] routes host channel names to them.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod native;
pub mod replay;
pub mod sink;

pub use adapter::{AttachOutcome, SignalAdapter};
pub use bridge::Bridge;
pub use channel::Channel;
pub use error::{BridgeError, ConversionError, NativeError};
pub use sink::{EventSink, EventStream};
