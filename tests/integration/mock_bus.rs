//! Mock adapters for integration tests.
//!
//! `MockBus` records every publish and subscribe; `Peer` plays the phone:
//! it fragments what it sends and reassembles what the relay writes back.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use blerelay::adapters::time::ManualClock;
use blerelay::app::ports::{BusPort, LinkWriter};
use blerelay::app::relay::Relay;
use blerelay::config::RelayConfig;
use blerelay::error::{BusError, LinkError};
use blerelay::events::RelayEvent;
use blerelay::link::{Fragment, KeyAllocator, Reassembler, fragment, payload_size_for};
use blerelay::rpc::RpcDispatcher;
use serde_json::Value;

// ── MockBus ───────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockBus {
    pub published: Rc<RefCell<Vec<(String, Vec<u8>)>>>,
    pub subscriptions: Rc<RefCell<Vec<String>>>,
    pub offline: Rc<RefCell<bool>>,
}

#[allow(dead_code)]
impl MockBus {
    pub fn topics(&self) -> Vec<String> {
        self.published.borrow().iter().map(|(t, _)| t.clone()).collect()
    }

    pub fn last(&self) -> Option<(String, Vec<u8>)> {
        self.published.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.published.borrow_mut().clear();
    }
}

impl BusPort for MockBus {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        if *self.offline.borrow() {
            return Err(BusError::NotConnected);
        }
        self.published
            .borrow_mut()
            .push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn subscribe(&mut self, pattern: &str) -> Result<(), BusError> {
        self.subscriptions.borrow_mut().push(pattern.to_owned());
        Ok(())
    }
}

// ── Peer ──────────────────────────────────────────────────────

/// The device on the far side of the link.
pub struct Peer {
    pub max_value_size: usize,
    wire: Arc<Mutex<Vec<Vec<u8>>>>,
    keys: KeyAllocator,
}

#[allow(dead_code)]
impl Peer {
    pub fn new(max_value_size: usize) -> Self {
        Self {
            max_value_size,
            wire: Arc::default(),
            keys: KeyAllocator::new(),
        }
    }

    /// Notification capability handed to the relay on subscribe.
    pub fn writer(&self) -> Box<dyn LinkWriter> {
        let wire = self.wire.clone();
        Box::new(move |f: &[u8]| -> Result<(), LinkError> {
            wire.lock().unwrap().push(f.to_vec());
            Ok(())
        })
    }

    pub fn subscribe_event(&self) -> RelayEvent {
        RelayEvent::Subscribed {
            max_value_size: self.max_value_size,
            writer: self.writer(),
        }
    }

    /// Raw fragments written by the relay so far.
    pub fn raw(&self) -> Vec<Vec<u8>> {
        self.wire.lock().unwrap().clone()
    }

    /// Reassemble everything received into JSON values, in completion order.
    pub fn received(&self) -> Vec<Value> {
        let mut reassembler = Reassembler::new(u64::MAX);
        self.raw()
            .iter()
            .filter_map(|raw| {
                let f = Fragment::decode(raw).unwrap();
                reassembler.on_fragment(f, 0).unwrap()
            })
            .map(|buf| serde_json::from_slice(&buf).unwrap())
            .collect()
    }

    /// Encoded fragments for one message from the peer.
    pub fn fragments_for(&mut self, message: &[u8]) -> Vec<Vec<u8>> {
        let size = payload_size_for(self.max_value_size).unwrap();
        fragment(message, size, self.keys.next())
            .unwrap()
            .iter()
            .map(|f| f.encode().unwrap().to_vec())
            .collect()
    }
}

// ── Relay fixture ─────────────────────────────────────────────

pub fn relay_with(config: &RelayConfig, rpc: RpcDispatcher) -> (Relay<MockBus, ManualClock>, MockBus, ManualClock) {
    blerelay::logging::init_for_tests();
    let bus = MockBus::default();
    let clock = ManualClock::new();
    let relay = Relay::new(config, bus.clone(), clock.clone(), rpc);
    (relay, bus, clock)
}

pub fn relay() -> (Relay<MockBus, ManualClock>, MockBus, ManualClock) {
    relay_with(&RelayConfig::default(), RpcDispatcher::new())
}
