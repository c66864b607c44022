//! BLE ⇄ MQTT relay: main entry point.
//!
//! Hexagonal layout with a single-threaded relay loop fed by an inbox.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RelayCharacteristic   MqttBus (+ conn thread)   MonotonicClock│
//! │  (GATT callbacks)      (BusPort)                 (Clock)       │
//! │  Internet monitor thread                                       │
//! │                                                                │
//! │  ──────────────── Inbox (embassy-sync Channel) ──────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Relay (pure logic)                        │    │
//! │  │  Link state · Fragmenter · Reassembler · RPC           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  edge-executor loop: serve · sweep · RPC calls                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use blerelay::adapters::ble::RelayCharacteristic;
use blerelay::adapters::time::MonotonicClock;
use blerelay::adapters::{internet, mqtt};
use blerelay::app::io_task;
use blerelay::app::relay::{Relay, StatusBoard};
use blerelay::config::RelayConfig;
use blerelay::events::Inbox;
use blerelay::logging;
use blerelay::rpc::RpcDispatcher;
use blerelay::rpc::handlers::register_standard;

const CONFIG_ENV: &str = "BLE_RELAY_CONFIG";

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    logging::init();
    info!("ble-relay v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let mut config =
        RelayConfig::load(config_path().as_deref()).context("loading relay configuration")?;
    config.apply_overrides(|name| std::env::var(name).ok());
    config.validate().context("validating relay configuration")?;

    // ── 3. Shared inbox + status ──────────────────────────────
    let inbox = Arc::new(Inbox::new());
    let status = Arc::new(StatusBoard::default());

    // ── 4. Bus ────────────────────────────────────────────────
    let (bus, _conn) = mqtt::connect(&config.mqtt, inbox.clone()).context("starting MQTT client")?;
    info!("MQTT client for {}:{}", config.mqtt.host, config.mqtt.port);

    let _monitor =
        internet::spawn(&config.internet, bus.clone()).context("starting internet monitor")?;

    // ── 5. RPC table ──────────────────────────────────────────
    let mut rpc = RpcDispatcher::new();
    register_standard(&mut rpc, bus.clone());
    info!("RPC methods: {:?}", rpc.methods());

    // ── 6. GATT characteristic ────────────────────────────────
    let characteristic =
        RelayCharacteristic::new(config.ble.clone(), inbox.clone(), status.clone());
    info!(
        "GATT service {} / characteristic {} as '{}'",
        characteristic.service_uuid(),
        characteristic.characteristic_uuid(),
        characteristic.device_name()
    );

    // ── 7. Relay loop (never returns) ─────────────────────────
    let relay = Relay::new(&config, bus, MonotonicClock::new(), rpc);
    info!("System ready. Entering relay loop.");
    io_task::run(
        relay,
        &inbox,
        &status,
        Duration::from_millis(config.sweep_interval_ms),
    );

    Ok(())
}
