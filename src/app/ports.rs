//! Port traits: the hexagonal boundary between the relay core and the
//! outside world.
//!
//! ```text
//!   GATT adapter ──▶ LinkWriter ◀── Relay ──▶ BusPort ──▶ MQTT adapter
//!                                    │
//!                                  Clock
//! ```
//!
//! The [`Relay`](super::relay::Relay) consumes these via generics or boxed
//! trait objects, so the core never touches the radio or the broker.

use crate::error::{BusError, LinkError};

// ───────────────────────────────────────────────────────────────
// Link write capability (driven adapter: relay → peer)
// ───────────────────────────────────────────────────────────────

/// Write capability handed over by the transport when a peer subscribes.
///
/// Each call sends one encoded fragment as one characteristic notification.
/// `Send` because the radio stack hands it over from its own thread.
pub trait LinkWriter: Send {
    fn write(&mut self, fragment: &[u8]) -> Result<(), LinkError>;
}

impl<F> LinkWriter for F
where
    F: FnMut(&[u8]) -> Result<(), LinkError> + Send,
{
    fn write(&mut self, fragment: &[u8]) -> Result<(), LinkError> {
        self(fragment)
    }
}

// ───────────────────────────────────────────────────────────────
// Bus port (driven adapter: relay ↔ pub/sub bus)
// ───────────────────────────────────────────────────────────────

/// Publish side of the topic bus. Inbound bus messages reach the relay as
/// [`RelayEvent`](crate::events::RelayEvent)s, not through this trait.
pub trait BusPort {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BusError>;

    fn subscribe(&mut self, pattern: &str) -> Result<(), BusError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds, used to age out reassembly groups.
pub trait Clock {
    fn now_ms(&self) -> u64;
}
