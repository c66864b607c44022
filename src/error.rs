//! Unified error types for the relay.
//!
//! A single `Error` enum that every subsystem converts into, so the event
//! loop handles failures uniformly: each variant maps to one of the
//! documented outcomes (refuse the call, drop-and-log, or answer the peer
//! with a correlated error response). Nothing here is fatal to the process.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level relay error
// ---------------------------------------------------------------------------

/// Every fallible relay operation funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Fragmentation parameters are unusable (payload size zero, too many
    /// fragments for the header, bad config value).
    InvalidConfiguration(&'static str),
    /// Fragment metadata is inconsistent with its reassembly group.
    ProtocolViolation(ProtocolViolation),
    /// RPC dispatch miss.
    UnknownMethod(String),
    /// A registered RPC handler reported a failure.
    HandlerFailure(String),
    /// A reassembled buffer is not valid JSON.
    MalformedEnvelope(String),
    /// Attempted send while no peer is subscribed.
    NoSubscriber,
    /// The link write capability rejected a fragment.
    Link(LinkError),
    /// The bus rejected a publish or subscribe.
    Bus(BusError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfiguration(msg) => write!(f, "invalid configuration: {msg}"),
            Self::ProtocolViolation(e) => write!(f, "protocol violation: {e}"),
            Self::UnknownMethod(name) => write!(f, "unknown method: {name}"),
            Self::HandlerFailure(msg) => write!(f, "handler failure: {msg}"),
            Self::MalformedEnvelope(msg) => write!(f, "malformed envelope: {msg}"),
            Self::NoSubscriber => write!(f, "no subscriber"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Protocol violations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolViolation {
    /// Raw write shorter than the fragment header.
    Truncated { len: usize },
    /// A fragment announced zero total fragments.
    ZeroTotal { key: u8 },
    /// Fragment index outside `[0, total)`.
    IndexOutOfRange { key: u8, index: u16, total: u16 },
    /// `total` differs from the value learned from the group's first fragment.
    TotalMismatch { key: u8, expected: u16, got: u16 },
    /// Key outside the allocator range.
    KeyOutOfRange { key: u8 },
}

impl fmt::Display for ProtocolViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { len } => write!(f, "fragment truncated ({len} bytes)"),
            Self::ZeroTotal { key } => write!(f, "key {key}: total fragments is zero"),
            Self::IndexOutOfRange { key, index, total } => {
                write!(f, "key {key}: index {index} out of range (total {total})")
            }
            Self::TotalMismatch { key, expected, got } => {
                write!(f, "key {key}: total {got} does not match {expected}")
            }
            Self::KeyOutOfRange { key } => write!(f, "key {key} outside allocator range"),
        }
    }
}

impl From<ProtocolViolation> for Error {
    fn from(e: ProtocolViolation) -> Self {
        Self::ProtocolViolation(e)
    }
}

// ---------------------------------------------------------------------------
// Port errors
// ---------------------------------------------------------------------------

/// Failure reported by a [`LinkWriter`](crate::app::ports::LinkWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The peer went away between subscribe and write.
    Disconnected,
    /// The encoded fragment does not fit the negotiated value size.
    MtuExceeded,
    /// Generic GATT notify failure.
    Io,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "peer disconnected"),
            Self::MtuExceeded => write!(f, "fragment exceeds MTU"),
            Self::Io => write!(f, "GATT I/O error"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

/// Failure reported by a [`BusPort`](crate::app::ports::BusPort).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    NotConnected,
    PublishFailed(String),
    SubscribeFailed(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed(msg) => write!(f, "publish failed: {msg}"),
            Self::SubscribeFailed(msg) => write!(f, "subscribe failed: {msg}"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Relay-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
