//! BLE ⇄ MQTT relay library.
//!
//! Exposes the link codec, envelope model, relay state machine and RPC
//! dispatcher for integration testing. The broker client is behind the
//! `mqtt` feature so host tests build without it.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod envelope;
pub mod error;
pub mod events;
pub mod link;
pub mod logging;
pub mod rpc;
