//! Message transport over the constrained link.
//!
//! ```text
//!  outbound:  message ──▶ KeyAllocator ──▶ fragment() ──▶ encode ──▶ notify
//!  inbound:   write   ──▶ Fragment::decode ──▶ Reassembler ──▶ message
//! ```
//!
//! Outbound keys and inbound keys live in separate namespaces: the
//! allocator only tags what this side sends, the reassembler only groups
//! what the peer sends.

pub mod fragment;
pub mod keys;
pub mod reassembly;

pub use fragment::{Fragment, fragment, payload_size_for};
pub use keys::KeyAllocator;
pub use reassembly::Reassembler;
