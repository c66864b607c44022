//! RPC subsystem the peer uses to invoke local actions.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  {"id","method","argument"}                                │
//! │        │                                                   │
//! │        ▼                                                   │
//! │  ┌────────────┐   ┌───────────────────────────┐            │
//! │  │ Dispatcher │──▶│ handler future (postMQTT, │            │
//! │  │ name→fn    │   │ print, shell, …)          │            │
//! │  └────────────┘   └───────────────────────────┘            │
//! │        │                                                   │
//! │        ▼                                                   │
//! │  {"rpcResponse":{"id","response"}}                         │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod dispatcher;
pub mod handlers;

pub use dispatcher::RpcDispatcher;
