//! MQTT bus adapter backed by `rumqttc`'s synchronous client.
//!
//! The client handle implements [`BusPort`] and is cheap to clone; the
//! connection event loop runs on its own thread and turns broker traffic
//! into inbox events.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};

use crate::app::ports::BusPort;
use crate::config::MqttConfig;
use crate::error::BusError;
use crate::events::{Inbox, RelayEvent, push_event};

const REQUEST_CAPACITY: usize = 32;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Bus handle. Publishes and subscribes are queued without waiting: a full
/// request queue (broker unreachable) fails the call instead of stalling the
/// relay loop.
#[derive(Clone)]
pub struct MqttBus {
    client: Client,
}

impl BusPort for MqttBus {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload.to_vec())
            .map_err(|e| BusError::PublishFailed(e.to_string()))
    }

    fn subscribe(&mut self, pattern: &str) -> Result<(), BusError> {
        self.client
            .try_subscribe(pattern, QoS::AtMostOnce)
            .map_err(|e| BusError::SubscribeFailed(e.to_string()))
    }
}

fn client(config: &MqttConfig, capacity: usize) -> (MqttBus, Connection) {
    let mut options = MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
    let (client, connection) = Client::new(options, capacity);
    (MqttBus { client }, connection)
}

/// Create the client and start the connection thread.
///
/// Every `ConnAck` (first connect and each reconnect) becomes
/// [`RelayEvent::BusConnected`], every incoming publish a
/// [`RelayEvent::BusMessage`].
pub fn connect(config: &MqttConfig, inbox: Arc<Inbox>) -> std::io::Result<(MqttBus, JoinHandle<()>)> {
    let (bus, mut connection) = client(config, REQUEST_CAPACITY);
    let endpoint = format!("{}:{}", config.host, config.port);

    let handle = thread::Builder::new()
        .name("mqtt-conn".into())
        .spawn(move || {
            for notification in connection.iter() {
                match notification {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected to broker at {}", endpoint);
                        push_event(&inbox, RelayEvent::BusConnected);
                    }
                    Ok(Event::Incoming(Packet::Publish(p))) => {
                        debug!("Bus message on {} ({} bytes)", p.topic, p.payload.len());
                        push_event(
                            &inbox,
                            RelayEvent::BusMessage {
                                topic: p.topic,
                                payload: p.payload.to_vec(),
                            },
                        );
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Broker connection error: {}", e);
                        thread::sleep(RECONNECT_DELAY);
                    }
                }
            }
        })?;

    Ok((bus, handle))
}
