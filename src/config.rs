//! Relay configuration parameters
//!
//! All tunable parameters for the relay. Defaults match the deployed
//! hub; a JSON file can override any subset and a handful of environment
//! variables override the file.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// BLE GATT identity advertised to the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    pub device_name: String,
    pub service_uuid: String,
    pub characteristic_uuid: String,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            device_name: "Bobbycom".into(),
            service_uuid: "13EA4259-9D9E-42D1-A78B-638ED22CC768".into(),
            characteristic_uuid: "81D97A06-7A2D-4A98-A2E2-41688E3D8283".into(),
        }
    }
}

/// Broker connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Keep-alive interval (seconds)
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 1883,
            client_id: "ble-relay".into(),
            keep_alive_secs: 30,
        }
    }
}

/// Internet reachability probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InternetCheckConfig {
    pub enabled: bool,
    /// Host name resolved on every check
    pub domain: String,
    pub check_secs: u64,
}

impl Default for InternetCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            domain: "www.bbc.co.uk".into(),
            check_secs: 30,
        }
    }
}

/// Core relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub ble: BleConfig,
    pub mqtt: MqttConfig,
    pub internet: InternetCheckConfig,

    // --- Transport ---
    /// Partial inbound messages idle longer than this are dropped (ms)
    pub reassembly_idle_timeout_ms: u64,
    /// How often stale reassembly groups are swept (ms)
    pub sweep_interval_ms: u64,

    // --- Routing ---
    /// Bus topic prefixes forwarded to the peer as `mqtt` envelopes
    pub forward_topics: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ble: BleConfig::default(),
            mqtt: MqttConfig::default(),
            internet: InternetCheckConfig::default(),
            reassembly_idle_timeout_ms: 30_000,
            sweep_interval_ms: 1_000,
            forward_topics: Vec::new(),
        }
    }
}

impl RelayConfig {
    /// Parse a (possibly partial) JSON config; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| {
            warn!("Config parse error: {}", e);
            Error::InvalidConfiguration("config file is not valid relay JSON")
        })
    }

    /// Load from `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file, using defaults");
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| {
            warn!("Cannot read {}: {}", path.display(), e);
            Error::InvalidConfiguration("config file unreadable")
        })?;
        info!("Config loaded from {}", path.display());
        Self::from_json(&text)
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    ///
    /// Recognised: `MQTT_HOST`, `MQTT_PORT`, `CHECK_SECONDS`, `DOMAIN`.
    /// Unparseable numbers are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("MQTT_HOST") {
            self.mqtt.host = host;
        }
        if let Some(port) = lookup("MQTT_PORT") {
            match port.parse() {
                Ok(p) => self.mqtt.port = p,
                Err(_) => warn!("Ignoring MQTT_PORT={}", port),
            }
        }
        if let Some(secs) = lookup("CHECK_SECONDS") {
            match secs.parse() {
                Ok(s) => self.internet.check_secs = s,
                Err(_) => warn!("Ignoring CHECK_SECONDS={}", secs),
            }
        }
        if let Some(domain) = lookup("DOMAIN") {
            self.internet.domain = domain;
        }
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.reassembly_idle_timeout_ms == 0 {
            return Err(Error::InvalidConfiguration(
                "reassembly_idle_timeout_ms must be positive",
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(Error::InvalidConfiguration("sweep_interval_ms must be positive"));
        }
        if self.mqtt.host.is_empty() {
            return Err(Error::InvalidConfiguration("mqtt.host is empty"));
        }
        if self.internet.enabled && self.internet.check_secs == 0 {
            return Err(Error::InvalidConfiguration("internet.check_secs must be positive"));
        }
        if self.forward_topics.iter().any(String::is_empty) {
            return Err(Error::InvalidConfiguration(
                "forward_topics entries must be non-empty",
            ));
        }
        Ok(())
    }
}
