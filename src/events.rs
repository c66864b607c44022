//! Relay event inbox.
//!
//! Events are produced by:
//! - the GATT adapter (subscribe, unsubscribe, characteristic writes)
//! - the bus connection thread (connect, inbound messages)
//! - local code asking to forward a publish to the peer
//!
//! and consumed one at a time by the relay loop.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GATT adapter│────▶│              │     │              │
//! │ Bus thread  │────▶│    Inbox     │────▶│  Relay loop  │
//! │ Local code  │────▶│ (embassy ch.)│     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use std::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::ports::LinkWriter;

/// Maximum number of pending events.
pub const INBOX_DEPTH: usize = 64;

/// Everything the relay loop reacts to.
pub enum RelayEvent {
    // ── Link ──────────────────────────────────────────────
    /// A peer subscribed to notifications.
    Subscribed {
        max_value_size: usize,
        writer: Box<dyn LinkWriter>,
    },
    /// The peer unsubscribed.
    Unsubscribed,
    /// Raw characteristic write (one fragment).
    LinkWrite(Vec<u8>),

    // ── Bus ───────────────────────────────────────────────
    /// The bus connection (re)established.
    BusConnected,
    /// A message arrived on any subscribed topic.
    BusMessage { topic: String, payload: Vec<u8> },

    // ── Local ─────────────────────────────────────────────
    /// Forward a bus publish to the peer as an `mqtt` envelope.
    ForwardToPeer { topic: String, message: Vec<u8> },
}

impl fmt::Debug for RelayEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscribed { max_value_size, .. } => f
                .debug_struct("Subscribed")
                .field("max_value_size", max_value_size)
                .finish_non_exhaustive(),
            Self::Unsubscribed => f.write_str("Unsubscribed"),
            Self::LinkWrite(raw) => write!(f, "LinkWrite({} bytes)", raw.len()),
            Self::BusConnected => f.write_str("BusConnected"),
            Self::BusMessage { topic, payload } => {
                write!(f, "BusMessage({topic}, {} bytes)", payload.len())
            }
            Self::ForwardToPeer { topic, message } => {
                write!(f, "ForwardToPeer({topic}, {} bytes)", message.len())
            }
        }
    }
}

/// Bounded MPSC channel feeding the relay loop. `Sync`, so producers on
/// other threads share it through an `Arc`.
pub type Inbox = Channel<CriticalSectionRawMutex, RelayEvent, INBOX_DEPTH>;

/// Non-blocking push. Returns `false` (and logs) if the inbox is full.
pub fn push_event(inbox: &Inbox, event: RelayEvent) -> bool {
    match inbox.try_send(event) {
        Ok(()) => true,
        Err(embassy_sync::channel::TrySendError::Full(dropped)) => {
            warn!("Inbox full, dropping {:?}", dropped);
            false
        }
    }
}
