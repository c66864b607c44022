//! Relay event loop: single-threaded, executor-driven.
//!
//! Runs on one thread using `edge-executor` for cooperative scheduling and
//! `async-io-mini` for reactor-driven timers. Concurrent futures:
//!
//! 1. **Serve**: awaits the inbox and applies each event to the relay
//! 2. **Sweep**: evicts stale reassembly groups every `sweep_interval`
//! 3. **RPC calls**: one detached task per dispatched call; on completion
//!    the `rpcResponse` envelope goes out through the same send path
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  Relay thread                                            │
//!  │  futures_lite::block_on                                  │
//!  │  ┌──────────────────────────────────────────────────────┐│
//!  │  │  edge_executor::LocalExecutor                        ││
//!  │  │  ┌─────────┐  ┌──────────┐  ┌──────────────────────┐ ││
//!  │  │  │ Serve   │  │ Sweep ⏱  │  │ RPC call … RPC call  │ ││
//!  │  │  └─────────┘  └──────────┘  └──────────────────────┘ ││
//!  │  └──────────────────────────────────────────────────────┘│
//!  └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The relay lives in an `Rc<RefCell<_>>`; no borrow is held across an
//! `.await`, so tasks never observe each other mid-update. Each outbound
//! envelope is fully fragmented and written inside one borrow, which keeps
//! sends serialized per message.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use edge_executor::LocalExecutor;
use log::{debug, info};

use crate::events::{Inbox, RelayEvent};

use super::ports::{BusPort, Clock};
use super::relay::{PendingCall, Relay, StatusBoard};

type SharedRelay<B, C> = Rc<RefCell<Relay<B, C>>>;

/// Apply one event and spawn its RPC call, if any.
fn process<B, C>(
    executor: &LocalExecutor<'_>,
    relay: &SharedRelay<B, C>,
    status: &StatusBoard,
    event: RelayEvent,
) where
    B: BusPort + 'static,
    C: Clock + 'static,
{
    debug!("Relay event: {:?}", event);
    let call = relay.borrow_mut().handle(event);
    if let Some(call) = call {
        executor.spawn(complete_call(relay.clone(), call)).detach();
    }
    status.publish(relay.borrow().status());
}

async fn complete_call<B: BusPort, C: Clock>(relay: SharedRelay<B, C>, call: PendingCall) {
    let response = call.finish().await;
    relay.borrow_mut().send(&response);
}

/// Serve task: waits on the inbox forever.
pub async fn serve<B, C>(
    executor: &LocalExecutor<'_>,
    relay: SharedRelay<B, C>,
    inbox: &Inbox,
    status: &StatusBoard,
) where
    B: BusPort + 'static,
    C: Clock + 'static,
{
    loop {
        let event = inbox.receive().await;
        process(executor, &relay, status, event);
    }
}

/// Sweep task: reactor timer, no busy polling.
pub async fn sweep_loop<B: BusPort, C: Clock>(
    relay: SharedRelay<B, C>,
    status: &StatusBoard,
    interval: Duration,
) {
    loop {
        async_io_mini::Timer::after(interval).await;
        let evicted = relay.borrow_mut().sweep();
        if evicted > 0 {
            status.publish(relay.borrow().status());
        }
    }
}

/// Entry point for the relay thread. Never returns.
pub fn run<B, C>(relay: Relay<B, C>, inbox: &Inbox, status: &StatusBoard, sweep_interval: Duration)
where
    B: BusPort + 'static,
    C: Clock + 'static,
{
    let executor: LocalExecutor<'_> = LocalExecutor::new();
    let relay = Rc::new(RefCell::new(relay));
    status.publish(relay.borrow().status());

    info!(
        "Relay loop started (sweep every {}ms)",
        sweep_interval.as_millis()
    );

    futures_lite::future::block_on(executor.run(futures_lite::future::zip(
        serve(&executor, relay.clone(), inbox, status),
        sweep_loop(relay, status, sweep_interval),
    )));
}

// ── Tests ────────────────────────────────────────────────────
