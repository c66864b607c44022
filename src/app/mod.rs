//! Application core: relay logic behind port traits.
//!
//! The [`relay`] state machine decides what crosses the link and the bus;
//! [`io_task`] drives it from the event inbox on a single thread. All
//! interaction with the radio and the broker goes through [`ports`].

pub mod io_task;
pub mod ports;
pub mod relay;
