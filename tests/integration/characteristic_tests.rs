//! GATT characteristic callbacks feeding the relay through the inbox.

use std::sync::Arc;

use blerelay::adapters::ble::{GattResult, RelayCharacteristic};
use blerelay::adapters::time::ManualClock;
use blerelay::app::relay::{Relay, StateId, StatusBoard};
use blerelay::config::BleConfig;
use blerelay::events::Inbox;

use crate::mock_bus::{MockBus, Peer, relay};

/// Drain the inbox into the relay the way the serve task does.
fn drain(inbox: &Inbox, relay: &mut Relay<MockBus, ManualClock>, status: &StatusBoard) {
    while let Ok(event) = inbox.try_receive() {
        relay.handle(event);
        status.publish(relay.status());
    }
}

#[test]
fn peer_session_through_characteristic() {
    let inbox = Arc::new(Inbox::new());
    let status = Arc::new(StatusBoard::default());
    let characteristic = RelayCharacteristic::new(BleConfig::default(), inbox.clone(), status.clone());
    let (mut relay, bus, _) = relay();
    let mut peer = Peer::new(23);

    characteristic.on_subscribe(peer.max_value_size, peer.writer());
    for raw in peer.fragments_for(br#"{"message":"keyword","data":"bobby"}"#) {
        assert_eq!(characteristic.on_write_request(&raw), GattResult::Success);
    }
    drain(&inbox, &mut relay, &status);

    assert_eq!(status.snapshot().state, StateId::Active);
    let (result, blob) = characteristic.on_read_request(0);
    assert_eq!(result, GattResult::Success);
    assert_eq!(blob, br#"{"state":"active","pending":0}"#);
    assert!(bus.topics().contains(&"speech/keyword".to_owned()));

    characteristic.on_unsubscribe();
    drain(&inbox, &mut relay, &status);
    assert_eq!(status.snapshot().state, StateId::Idle);
}

#[test]
fn read_reports_pending_groups() {
    let inbox = Arc::new(Inbox::new());
    let status = Arc::new(StatusBoard::default());
    let characteristic = RelayCharacteristic::new(BleConfig::default(), inbox.clone(), status.clone());
    let (mut relay, _, _) = relay();
    let mut peer = Peer::new(23);

    characteristic.on_subscribe(peer.max_value_size, peer.writer());
    let frags = peer.fragments_for(br#"{"message":"keyword","data":"half"}"#);
    characteristic.on_write_request(&frags[0]);
    drain(&inbox, &mut relay, &status);

    let (_, blob) = characteristic.on_read_request(0);
    assert_eq!(blob, br#"{"state":"active","pending":1}"#);
}
