//! Relay orchestrator: the link state machine and envelope router.
//!
//! ```text
//!            on_subscribe(mtu, writer)
//!   ┌──────┐ ─────────────────────────▶ ┌────────┐
//!   │ Idle │                            │ Active │
//!   └──────┘ ◀───────────────────────── └────────┘
//!                  on_unsubscribe()
//! ```
//!
//! In `Idle` every outbound send is a logged no-op. In `Active` envelopes
//! are serialized, tagged with the next key, fragmented to the negotiated
//! payload size and written fragment by fragment before the next send.
//!
//! Inbound writes are decoded and reassembled; completed buffers are
//! classified and routed to the bus or to the RPC dispatcher. Dispatched
//! calls come back as [`PendingCall`]s for the event loop to drive, since
//! a handler may take a while (e.g. `shell`).

use std::sync::{Mutex, PoisonError};

use futures_lite::future::BoxedLocal;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::RelayConfig;
use crate::envelope::{self, Classified, Inbound, Outbound, SpeechText, Telemetry};
use crate::error::{Error, Result};
use crate::events::RelayEvent;
use crate::link::{Fragment, KeyAllocator, Reassembler, fragment, payload_size_for};
use crate::rpc::RpcDispatcher;

use super::ports::{BusPort, Clock, LinkWriter};

// ── Bus topics ───────────────────────────────────────────────

pub const TOPIC_SUBSCRIBED: &str = "ble/subscribed";
pub const TOPIC_UNSUBSCRIBED: &str = "ble/unsubscribed";
pub const TOPIC_PHRASES: &str = "speech/phrases";
pub const TOPIC_KEYWORD: &str = "speech/keyword";
pub const TOPIC_SPEECH_TEXT: &str = "speech/text";
/// Subscribed on every bus connect; filtering happens per message.
pub const SUBSCRIBE_ALL: &str = "#";

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateId {
    Idle,
    Active,
}

struct Subscriber {
    payload_size: usize,
    writer: Box<dyn LinkWriter>,
}

enum LinkState {
    Idle,
    Active(Subscriber),
}

// ───────────────────────────────────────────────────────────────
// Pending RPC call
// ───────────────────────────────────────────────────────────────

/// An RPC invocation in flight, correlated by the peer's `id`.
pub struct PendingCall {
    pub id: Value,
    pub method: String,
    call: BoxedLocal<Result<Value>>,
}

impl PendingCall {
    /// Await the handler and wrap the outcome as an `rpcResponse` envelope.
    pub async fn finish(self) -> Outbound {
        match self.call.await {
            Ok(response) => Outbound::rpc_response(self.id, response),
            Err(e) => {
                warn!("RPC '{}' failed: {}", self.method, e);
                Outbound::rpc_error(self.id, &e)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Status blob for characteristic reads
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStatus {
    pub state: StateId,
    /// Reassembly groups awaiting fragments.
    pub pending: usize,
}

impl RelayStatus {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Latest [`RelayStatus`], written by the relay loop and read from the
/// radio thread when the peer reads the characteristic.
pub struct StatusBoard {
    inner: Mutex<RelayStatus>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            inner: Mutex::new(RelayStatus {
                state: StateId::Idle,
                pending: 0,
            }),
        }
    }
}

impl StatusBoard {
    pub fn publish(&self, status: RelayStatus) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    pub fn snapshot(&self) -> RelayStatus {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// Relay
// ───────────────────────────────────────────────────────────────

/// Owns the link state, the reassembler, the key allocator and the RPC
/// table. All methods are synchronous and never panic on peer input.
pub struct Relay<B, C> {
    link: LinkState,
    keys: KeyAllocator,
    reassembler: Reassembler,
    rpc: RpcDispatcher,
    bus: B,
    clock: C,
    forward_topics: Vec<String>,
}

impl<B: BusPort, C: Clock> Relay<B, C> {
    pub fn new(config: &RelayConfig, bus: B, clock: C, rpc: RpcDispatcher) -> Self {
        Self {
            link: LinkState::Idle,
            keys: KeyAllocator::new(),
            reassembler: Reassembler::new(config.reassembly_idle_timeout_ms),
            rpc,
            bus,
            clock,
            forward_topics: config.forward_topics.clone(),
        }
    }

    pub fn state(&self) -> StateId {
        match self.link {
            LinkState::Idle => StateId::Idle,
            LinkState::Active(_) => StateId::Active,
        }
    }

    pub fn status(&self) -> RelayStatus {
        RelayStatus {
            state: self.state(),
            pending: self.reassembler.pending(),
        }
    }

    /// Apply one inbox event. Returns an RPC call to drive, if one was
    /// dispatched.
    pub fn handle(&mut self, event: RelayEvent) -> Option<PendingCall> {
        match event {
            RelayEvent::Subscribed {
                max_value_size,
                writer,
            } => {
                if let Err(e) = self.on_subscribe(max_value_size, writer) {
                    error!("Subscribe refused: {}", e);
                }
                None
            }
            RelayEvent::Unsubscribed => {
                self.on_unsubscribe();
                None
            }
            RelayEvent::LinkWrite(raw) => self.on_inbound_fragment(&raw),
            RelayEvent::BusConnected => {
                self.on_bus_connected();
                None
            }
            RelayEvent::BusMessage { topic, payload } => {
                self.on_bus_message(&topic, &payload);
                None
            }
            RelayEvent::ForwardToPeer { topic, message } => {
                self.forward_to_peer(&topic, &message);
                None
            }
        }
    }

    // ── Link transitions ──────────────────────────────────────

    /// `Idle → Active`. A value size too small to carry any payload is
    /// refused and the relay stays where it was.
    pub fn on_subscribe(&mut self, max_value_size: usize, writer: Box<dyn LinkWriter>) -> Result<()> {
        let payload_size = payload_size_for(max_value_size)?;
        if matches!(self.link, LinkState::Active(_)) {
            warn!("Device re-subscribed, replacing write capability");
        }
        info!("Device subscribed");
        debug!(
            "Fragment max size: {} (payload {})",
            max_value_size, payload_size
        );
        self.link = LinkState::Active(Subscriber {
            payload_size,
            writer,
        });
        self.publish(TOPIC_SUBSCRIBED, b"");
        Ok(())
    }

    /// `Active → Idle`. Partial inbound messages are discarded.
    pub fn on_unsubscribe(&mut self) {
        if matches!(self.link, LinkState::Idle) {
            debug!("Unsubscribe while idle, ignoring");
            return;
        }
        info!("Device unsubscribed");
        self.link = LinkState::Idle;
        self.reassembler.reset();
        self.publish(TOPIC_UNSUBSCRIBED, b"");
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Feed one raw characteristic write. Bad fragments are dropped and
    /// logged; a completed message is routed immediately.
    pub fn on_inbound_fragment(&mut self, raw: &[u8]) -> Option<PendingCall> {
        let fragment = match Fragment::decode(raw) {
            Ok(f) => f,
            Err(e) => {
                warn!("Dropping fragment: {}", e);
                return None;
            }
        };
        let now = self.clock.now_ms();
        match self.reassembler.on_fragment(fragment, now) {
            Ok(Some(message)) => self.route(&message),
            Ok(None) => None,
            Err(e) => {
                warn!("Dropping fragment: {}", Error::from(e));
                None
            }
        }
    }

    /// Classify a reassembled buffer and act on it.
    pub fn route(&mut self, buffer: &[u8]) -> Option<PendingCall> {
        let inbound = match envelope::classify(buffer) {
            Ok(Classified::Known(inbound)) => inbound,
            Ok(Classified::Unrecognized(value)) => {
                debug!("Ignoring unrecognized envelope: {}", value);
                return None;
            }
            Err(e) => {
                warn!("Discarding message: {}", e);
                return None;
            }
        };

        match inbound {
            Inbound::Telemetry(Telemetry::Phrases(phrases)) => {
                debug!("Received message for: phrases");
                self.publish(TOPIC_PHRASES, phrases.join(",").as_bytes());
                None
            }
            Inbound::Telemetry(Telemetry::Keyword(keyword)) => {
                debug!("Received message for: keyword");
                self.publish(TOPIC_KEYWORD, keyword.as_bytes());
                None
            }
            Inbound::Rpc(request) => {
                info!("RPC call '{}' (id {})", request.method, request.id);
                let call = self.rpc.invoke(&request.method, request.argument);
                Some(PendingCall {
                    id: request.id,
                    method: request.method,
                    call,
                })
            }
        }
    }

    // ── Bus side ──────────────────────────────────────────────

    pub fn on_bus_connected(&mut self) {
        info!("Bus connected, subscribing to '{}'", SUBSCRIBE_ALL);
        if let Err(e) = self.bus.subscribe(SUBSCRIBE_ALL) {
            error!("Bus subscribe failed: {}", e);
        }
    }

    pub fn on_bus_message(&mut self, topic: &str, payload: &[u8]) {
        debug!("topic: {}, {} bytes", topic, payload.len());

        if topic.starts_with(TOPIC_SPEECH_TEXT) {
            match serde_json::from_slice::<SpeechText>(payload) {
                Ok(text) => {
                    info!(
                        "Speech-to-text result '{}', final: {}",
                        text.message, text.is_final
                    );
                    self.send(&Outbound::text(text.message.as_bytes(), text.is_final));
                }
                Err(e) => warn!("Bad {} payload: {}", topic, e),
            }
            return;
        }

        if self.forward_topics.iter().any(|p| topic.starts_with(p.as_str())) {
            self.forward_to_peer(topic, payload);
        }
    }

    /// Wrap a bus publish as an `mqtt` envelope for the peer.
    pub fn forward_to_peer(&mut self, topic: &str, message: &[u8]) -> usize {
        self.send(&Outbound::mqtt(topic, message))
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Serialize, fragment and write one envelope. Returns the number of
    /// fragments written; `0` while idle.
    pub fn send(&mut self, envelope: &Outbound) -> usize {
        match self.write_envelope(envelope) {
            Ok(written) => written,
            Err(Error::NoSubscriber) => {
                warn!("Can't send message, no devices subscribed.");
                0
            }
            Err(e) => {
                error!("Send failed: {}", e);
                0
            }
        }
    }

    fn write_envelope(&mut self, envelope: &Outbound) -> Result<usize> {
        let LinkState::Active(sub) = &mut self.link else {
            return Err(Error::NoSubscriber);
        };

        let message = envelope.to_bytes();
        let key = self.keys.next();
        let fragments = fragment(&message, sub.payload_size, key)?;

        let mut written = 0;
        for frag in &fragments {
            let result = frag
                .encode()
                .and_then(|wire| sub.writer.write(&wire));
            if let Err(e) = result {
                warn!(
                    "Link write failed at fragment {}/{} (key {}): {}",
                    frag.index, frag.total, key, e
                );
                break;
            }
            written += 1;
        }
        debug!(
            "Sent {} bytes as {} fragments (key {})",
            message.len(),
            written,
            key
        );
        Ok(written)
    }

    /// Age out stale reassembly groups.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now_ms();
        let evicted = self.reassembler.evict_idle(now);
        if evicted > 0 {
            debug!(
                "Sweep evicted {} groups, {} pending ({} bytes)",
                evicted,
                self.reassembler.pending(),
                self.reassembler.buffered_bytes()
            );
        }
        evicted
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) {
        if let Err(e) = self.bus.publish(topic, payload) {
            warn!("Bus publish to '{}' failed: {}", topic, e);
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
