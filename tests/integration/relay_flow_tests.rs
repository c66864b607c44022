//! End-to-end relay flows: link lifecycle, inbound telemetry, outbound
//! speech text and bus forwarding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blerelay::app::relay::StateId;
use blerelay::config::RelayConfig;
use blerelay::envelope::Outbound;
use blerelay::events::RelayEvent;
use blerelay::link::{Fragment, fragment};
use blerelay::rpc::RpcDispatcher;
use serde_json::json;

use crate::mock_bus::{Peer, relay, relay_with};

// ── Link lifecycle ────────────────────────────────────────────

#[test]
fn subscribe_unsubscribe_publishes_lifecycle_topics() {
    let (mut relay, bus, _) = relay();
    let peer = Peer::new(185);

    assert_eq!(relay.state(), StateId::Idle);
    assert!(relay.handle(peer.subscribe_event()).is_none());
    assert_eq!(relay.state(), StateId::Active);

    relay.handle(RelayEvent::Unsubscribed);
    assert_eq!(relay.state(), StateId::Idle);
    assert_eq!(bus.topics(), ["ble/subscribed", "ble/unsubscribed"]);

    // A second unsubscribe is a no-op.
    relay.handle(RelayEvent::Unsubscribed);
    assert_eq!(bus.topics().len(), 2);
}

#[test]
fn value_size_without_room_for_payload_is_refused() {
    let (mut relay, bus, _) = relay();
    let peer = Peer::new(5);
    relay.handle(peer.subscribe_event());
    assert_eq!(relay.state(), StateId::Idle);
    assert!(bus.topics().is_empty());
}

#[test]
fn idle_send_writes_nothing() {
    let (mut relay, _, _) = relay();
    assert_eq!(relay.send(&Outbound::text(b"hello", true)), 0);
    relay.on_bus_message("speech/text", br#"{"message":"hello","final":true}"#);
    assert_eq!(relay.state(), StateId::Idle);
}

// ── Outbound ──────────────────────────────────────────────────

#[test]
fn speech_text_reaches_peer_as_text_envelope() {
    let (mut relay, _, _) = relay();
    let peer = Peer::new(20);
    relay.handle(peer.subscribe_event());

    relay.handle(RelayEvent::BusMessage {
        topic: "speech/text".into(),
        payload: br#"{"message":"turn on the lights","final":true}"#.to_vec(),
    });

    let received = peer.received();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0],
        json!({"text": {"message": STANDARD.encode("turn on the lights"), "final": true}})
    );
    // Every fragment respects the negotiated value size.
    assert!(peer.raw().len() > 1);
    assert!(peer.raw().iter().all(|f| f.len() <= 20));
}

#[test]
fn speech_text_without_final_defaults_to_false() {
    let (mut relay, _, _) = relay();
    let peer = Peer::new(100);
    relay.handle(peer.subscribe_event());
    relay.on_bus_message("speech/text", br#"{"message":"partial"}"#);
    assert_eq!(peer.received()[0]["text"]["final"], json!(false));
}

#[test]
fn malformed_speech_text_is_dropped() {
    let (mut relay, _, _) = relay();
    let peer = Peer::new(100);
    relay.handle(peer.subscribe_event());
    relay.on_bus_message("speech/text", b"not json");
    assert!(peer.raw().is_empty());
}

#[test]
fn successive_sends_rotate_keys() {
    let (mut relay, _, _) = relay();
    let peer = Peer::new(100);
    relay.handle(peer.subscribe_event());
    for _ in 0..3 {
        relay.send(&Outbound::text(b"x", false));
    }
    let keys: Vec<u8> = peer.raw().iter().map(|raw| raw[0]).collect();
    assert_eq!(keys, [0, 1, 2]);
}

#[test]
fn configured_topics_are_forwarded_to_peer() {
    let config = RelayConfig {
        forward_topics: vec!["lights/".into()],
        ..RelayConfig::default()
    };
    let (mut relay, _, _) = relay_with(&config, RpcDispatcher::new());
    let peer = Peer::new(100);
    relay.handle(peer.subscribe_event());

    relay.on_bus_message("lights/kitchen", b"on");
    relay.on_bus_message("heating/boiler", b"on");

    let received = peer.received();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0],
        json!({"mqtt": {"topic": "lights/kitchen", "message": STANDARD.encode("on")}})
    );
}

#[test]
fn forward_event_wraps_bus_publish() {
    let (mut relay, _, _) = relay();
    let peer = Peer::new(100);
    relay.handle(peer.subscribe_event());
    relay.handle(RelayEvent::ForwardToPeer {
        topic: "alerts".into(),
        message: vec![0xff, 0x00],
    });
    assert_eq!(
        peer.received()[0],
        json!({"mqtt": {"topic": "alerts", "message": "/wA="}})
    );
}

#[test]
fn bus_connect_subscribes_to_everything() {
    let (mut relay, bus, _) = relay();
    relay.handle(RelayEvent::BusConnected);
    assert_eq!(*bus.subscriptions.borrow(), ["#"]);
}

// ── Inbound ───────────────────────────────────────────────────

#[test]
fn phrases_are_joined_and_published() {
    let (mut relay, bus, _) = relay();
    let mut peer = Peer::new(20);
    relay.handle(peer.subscribe_event());
    bus.clear();

    let msg = br#"{"message":"phrases","data":["lights on","lights off"]}"#;
    for raw in peer.fragments_for(msg) {
        relay.handle(RelayEvent::LinkWrite(raw));
    }
    assert_eq!(
        bus.last(),
        Some(("speech/phrases".to_owned(), b"lights on,lights off".to_vec()))
    );
}

#[test]
fn keyword_is_published_verbatim() {
    let (mut relay, bus, _) = relay();
    let mut peer = Peer::new(512);
    relay.handle(peer.subscribe_event());
    bus.clear();

    for raw in peer.fragments_for(br#"{"message":"keyword","data":"bobby"}"#) {
        relay.handle(RelayEvent::LinkWrite(raw));
    }
    assert_eq!(bus.last(), Some(("speech/keyword".to_owned(), b"bobby".to_vec())));
}

#[test]
fn interleaved_messages_complete_independently() {
    let (mut relay, bus, _) = relay();
    let peer = Peer::new(20);
    relay.handle(peer.subscribe_event());
    bus.clear();

    let a = br#"{"message":"keyword","data":"alpha"}"#;
    let b = br#"{"message":"keyword","data":"bravo"}"#;
    let fa = fragment(a, 15, 7).unwrap();
    let fb = fragment(b, 15, 8).unwrap();
    for (x, y) in fa.iter().zip(fb.iter().rev()) {
        relay.handle(RelayEvent::LinkWrite(x.encode().unwrap().to_vec()));
        relay.handle(RelayEvent::LinkWrite(y.encode().unwrap().to_vec()));
    }
    let mut payloads: Vec<Vec<u8>> = bus.published.borrow().iter().map(|(_, p)| p.clone()).collect();
    payloads.sort();
    assert_eq!(payloads, [b"alpha".to_vec(), b"bravo".to_vec()]);
}

#[test]
fn garbage_and_unknown_envelopes_are_ignored() {
    let (mut relay, bus, _) = relay();
    let mut peer = Peer::new(100);
    relay.handle(peer.subscribe_event());
    bus.clear();

    relay.handle(RelayEvent::LinkWrite(vec![1, 2]));
    for raw in peer.fragments_for(b"{not json") {
        relay.handle(RelayEvent::LinkWrite(raw));
    }
    for raw in peer.fragments_for(br#"{"message":"weather","data":1}"#) {
        relay.handle(RelayEvent::LinkWrite(raw));
    }
    assert!(bus.published.borrow().is_empty());
    assert_eq!(relay.state(), StateId::Active);
}

#[test]
fn unsubscribe_discards_partial_messages() {
    let (mut relay, bus, _) = relay();
    let mut peer = Peer::new(20);
    relay.handle(peer.subscribe_event());

    let frags = peer.fragments_for(br#"{"message":"keyword","data":"lost"}"#);
    relay.handle(RelayEvent::LinkWrite(frags[0].clone()));
    assert_eq!(relay.status().pending, 1);

    relay.handle(RelayEvent::Unsubscribed);
    assert_eq!(relay.status().pending, 0);

    relay.handle(peer.subscribe_event());
    for raw in &frags[1..] {
        relay.handle(RelayEvent::LinkWrite(raw.clone()));
    }
    assert!(!bus.topics().contains(&"speech/keyword".to_owned()));
}

#[test]
fn stale_partial_is_swept_after_idle_timeout() {
    let (mut relay, _, clock) = relay();
    let peer = Peer::new(100);
    relay.handle(peer.subscribe_event());

    let f = Fragment {
        key: 3,
        index: 0,
        total: 2,
        payload: b"{",
    };
    relay.handle(RelayEvent::LinkWrite(f.encode().unwrap().to_vec()));
    assert_eq!(relay.status().pending, 1);

    clock.advance(30_000);
    assert_eq!(relay.sweep(), 0);
    clock.advance(1);
    assert_eq!(relay.sweep(), 1);
    assert_eq!(relay.status().pending, 0);
}

// ── Bus failures ──────────────────────────────────────────────

#[test]
fn rejected_publishes_do_not_stall_the_link() {
    let (mut relay, bus, _) = relay();
    let mut peer = Peer::new(20);
    *bus.offline.borrow_mut() = true;

    relay.handle(peer.subscribe_event());
    assert_eq!(relay.state(), StateId::Active);

    for word in ["red", "green"] {
        let msg = format!(r#"{{"message":"keyword","data":"{word}"}}"#);
        for raw in peer.fragments_for(msg.as_bytes()) {
            relay.handle(RelayEvent::LinkWrite(raw));
        }
    }
    assert!(bus.published.borrow().is_empty());
    assert_eq!(relay.status().pending, 0);

    // Outbound still works while the bus is down.
    relay.on_bus_message("speech/text", br#"{"message":"hello","final":true}"#);
    assert_eq!(peer.received().len(), 1);

    *bus.offline.borrow_mut() = false;
    for raw in peer.fragments_for(br#"{"message":"keyword","data":"blue"}"#) {
        relay.handle(RelayEvent::LinkWrite(raw));
    }
    assert_eq!(bus.last(), Some(("speech/keyword".to_owned(), b"blue".to_vec())));
}
