//! Internet reachability monitor.
//!
//! Every `check_secs` resolves the configured domain and publishes
//! `wifi/connected` or `wifi/disconnected` (empty payload) on the bus.

use std::net::ToSocketAddrs;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::app::ports::BusPort;
use crate::config::InternetCheckConfig;

pub const TOPIC_CONNECTED: &str = "wifi/connected";
pub const TOPIC_DISCONNECTED: &str = "wifi/disconnected";

/// True when `domain` resolves to at least one address.
pub fn check(domain: &str) -> bool {
    (domain, 80)
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false)
}

pub fn topic_for(reachable: bool) -> &'static str {
    if reachable {
        TOPIC_CONNECTED
    } else {
        TOPIC_DISCONNECTED
    }
}

/// Run one check and publish the outcome.
pub fn report(domain: &str, bus: &mut impl BusPort) -> bool {
    let reachable = check(domain);
    if reachable {
        info!("Internet connection");
    } else {
        error!("No Internet connection");
    }
    if let Err(e) = bus.publish(topic_for(reachable), &[]) {
        warn!("Internet status not published: {}", e);
    }
    reachable
}

/// Start the monitor thread. Returns `None` when disabled.
pub fn spawn<B>(config: &InternetCheckConfig, mut bus: B) -> std::io::Result<Option<JoinHandle<()>>>
where
    B: BusPort + Send + 'static,
{
    if !config.enabled {
        info!("Internet check disabled");
        return Ok(None);
    }
    let domain = config.domain.clone();
    let period = Duration::from_secs(config.check_secs);
    info!("Internet check every {}s against {}", config.check_secs, domain);

    let handle = thread::Builder::new()
        .name("internet-check".into())
        .spawn(move || {
            loop {
                thread::sleep(period);
                report(&domain, &mut bus);
            }
        })?;
    Ok(Some(handle))
}
