//! RPC round trips over the fragmented link with the standard handlers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use blerelay::config::RelayConfig;
use blerelay::events::RelayEvent;
use blerelay::rpc::RpcDispatcher;
use blerelay::rpc::handlers::register_standard;
use futures_lite::future::block_on;
use serde_json::{Value, json};

use crate::mock_bus::{MockBus, Peer, relay_with};

/// Send `request` from the peer, drive the resulting call, return the
/// response envelope the peer received.
fn call(request: Value, bus: &MockBus) -> Value {
    let mut rpc = RpcDispatcher::new();
    register_standard(&mut rpc, bus.clone());
    let (mut relay, _, _) = relay_with(&RelayConfig::default(), rpc);
    let mut peer = Peer::new(64);
    relay.handle(peer.subscribe_event());

    let mut pending = None;
    for raw in peer.fragments_for(request.to_string().as_bytes()) {
        if let Some(c) = relay.handle(RelayEvent::LinkWrite(raw)) {
            pending = Some(c);
        }
    }
    let envelope = block_on(pending.expect("request dispatched").finish());
    relay.send(&envelope);

    let received = peer.received();
    assert_eq!(received.len(), 1);
    received.into_iter().next().unwrap()
}

#[test]
fn post_mqtt_publishes_decoded_message() {
    let bus = MockBus::default();
    let response = call(
        json!({"id": 1, "method": "postMQTT", "argument": {
            "topic": "lights/hall", "message": STANDARD.encode("on")
        }}),
        &bus,
    );
    assert_eq!(
        response,
        json!({"rpcResponse": {"id": 1, "response": {"success": "success"}}})
    );
    assert!(
        bus.published
            .borrow()
            .contains(&("lights/hall".to_owned(), b"on".to_vec()))
    );
}

#[test]
fn post_mqtt_reports_bus_failure_in_response() {
    let bus = MockBus::default();
    *bus.offline.borrow_mut() = true;
    let response = call(
        json!({"id": "a", "method": "postMQTT", "argument": {"topic": "t", "message": ""}}),
        &bus,
    );
    assert_eq!(response["rpcResponse"]["id"], json!("a"));
    assert!(response["rpcResponse"]["response"]["error"].is_string());
}

#[test]
fn print_answers_null() {
    let response = call(
        json!({"id": 2, "method": "print", "argument": {"hello": "world"}}),
        &MockBus::default(),
    );
    assert_eq!(response, json!({"rpcResponse": {"id": 2, "response": null}}));
}

#[test]
fn shell_captures_stdout() {
    let response = call(
        json!({"id": 3, "method": "shell", "argument": "echo relay"}),
        &MockBus::default(),
    );
    let result = &response["rpcResponse"]["response"];
    assert_eq!(result["error"], Value::Null);
    assert_eq!(result["stdout"], json!("relay\n"));
}

#[test]
fn unknown_method_gets_correlated_error() {
    let response = call(
        json!({"id": 4, "method": "reboot", "argument": null}),
        &MockBus::default(),
    );
    assert_eq!(
        response,
        json!({"rpcResponse": {"id": 4, "response": {"error": "unknown method: reboot"}}})
    );
}

#[test]
fn missing_argument_defaults_to_null() {
    let response = call(json!({"id": 5, "method": "print"}), &MockBus::default());
    assert_eq!(response["rpcResponse"]["response"], Value::Null);
}
