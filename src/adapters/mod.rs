//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements  | Connects to                    |
//! |------------|-------------|--------------------------------|
//! | `ble`      | none        | GATT characteristic callbacks  |
//! | `internet` | none        | DNS resolver (reachability)    |
//! | `mqtt`     | BusPort     | MQTT broker (`rumqttc`)        |
//! | `time`     | Clock       | Monotonic host clock           |

pub mod ble;
pub mod internet;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod time;
