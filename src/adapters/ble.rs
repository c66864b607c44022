//! GATT characteristic adapter.
//!
//! Bridges the radio stack's characteristic callbacks onto the relay
//! inbox. The stack itself (advertising, service registration) lives
//! outside this crate; whatever drives it calls the `on_*` methods below
//! from its own thread.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID (default)                           | Perms              |
//! |----------------|------------------------------------------|--------------------|
//! | Relay          | `81D97A06-7A2D-4A98-A2E2-41688E3D8283`   | Read+Write+Notify  |
//!
//! Service `13EA4259-9D9E-42D1-A78B-638ED22CC768`, advertised as `Bobbycom`.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::app::ports::LinkWriter;
use crate::app::relay::StatusBoard;
use crate::config::BleConfig;
use crate::events::{Inbox, RelayEvent, push_event};

pub const PROPERTIES: [&str; 3] = ["notify", "read", "write"];

/// Result codes handed back to the GATT stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattResult {
    Success,
    InvalidOffset,
    UnlikelyError,
}

impl GattResult {
    /// ATT protocol error code.
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::InvalidOffset => 0x07,
            Self::UnlikelyError => 0x0e,
        }
    }
}

/// The single read/write/notify characteristic the peer talks to.
pub struct RelayCharacteristic {
    config: BleConfig,
    inbox: Arc<Inbox>,
    status: Arc<StatusBoard>,
}

impl RelayCharacteristic {
    pub fn new(config: BleConfig, inbox: Arc<Inbox>, status: Arc<StatusBoard>) -> Self {
        Self {
            config,
            inbox,
            status,
        }
    }

    pub fn device_name(&self) -> &str {
        &self.config.device_name
    }

    pub fn service_uuid(&self) -> &str {
        &self.config.service_uuid
    }

    pub fn characteristic_uuid(&self) -> &str {
        &self.config.characteristic_uuid
    }

    /// Peer enabled notifications. `notify` pushes one value to the peer.
    pub fn on_subscribe(&self, max_value_size: usize, notify: Box<dyn LinkWriter>) {
        info!("Device subscribed");
        debug!("Datagram max size: {}", max_value_size);
        push_event(
            &self.inbox,
            RelayEvent::Subscribed {
                max_value_size,
                writer: notify,
            },
        );
    }

    pub fn on_unsubscribe(&self) {
        info!("Device unsubscribed");
        push_event(&self.inbox, RelayEvent::Unsubscribed);
    }

    /// One fragment written by the peer.
    pub fn on_write_request(&self, data: &[u8]) -> GattResult {
        debug!("Write request: {} bytes", data.len());
        if push_event(&self.inbox, RelayEvent::LinkWrite(data.to_vec())) {
            GattResult::Success
        } else {
            GattResult::UnlikelyError
        }
    }

    /// Status blob, sliced at `offset` for long reads.
    pub fn on_read_request(&self, offset: usize) -> (GattResult, Vec<u8>) {
        info!("Read request received");
        let blob = self.status.snapshot().to_bytes();
        match blob.get(offset..) {
            Some(rest) => (GattResult::Success, rest.to_vec()),
            None => {
                warn!("Read offset {} past status length {}", offset, blob.len());
                (GattResult::InvalidOffset, Vec::new())
            }
        }
    }
}
