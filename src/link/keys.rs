//! Rotating message keys.
//!
//! Every outbound message is tagged with a key so the peer can tell its
//! fragments apart from any other message in flight. Keys cycle through
//! `[0, KEY_SPACE)`; the first key handed out is `0`.
//!
//! Only one outbound message is fragmented at a time, so a key can never be
//! live twice: by the time the allocator wraps, the message that last used
//! it has long been written.

/// Number of distinct keys. `255` itself is never issued.
pub const KEY_SPACE: u8 = 255;

/// Cyclic key allocator owned by the relay's send path.
#[derive(Debug, Clone)]
pub struct KeyAllocator {
    last: u8,
}

impl KeyAllocator {
    pub const fn new() -> Self {
        // Seeded one step "before" zero so the first `next()` yields 0.
        Self {
            last: KEY_SPACE - 1,
        }
    }

    /// Start the rotation so that the next key issued is `first`.
    pub const fn starting_at(first: u8) -> Self {
        let first = first % KEY_SPACE;
        Self {
            last: if first == 0 { KEY_SPACE - 1 } else { first - 1 },
        }
    }

    /// Issue the next key, wrapping from `KEY_SPACE - 1` back to `0`.
    pub fn next(&mut self) -> u8 {
        self.last = if self.last >= KEY_SPACE - 1 {
            0
        } else {
            self.last + 1
        };
        self.last
    }
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self::new()
    }
}
