//! Message fragmentation for MTU-bounded GATT notifications.
//!
//! A message of any size is split into fragments that each fit one
//! characteristic value. Every fragment carries a small header:
//!
//! ```text
//! ┌──────┬────────────┬────────────┬──────────────────────────┐
//! │ Key  │ Index      │ Total      │  Payload slice            │
//! │ (1B) │ (2B LE u16)│ (2B LE u16)│  (≤ max payload size)     │
//! └──────┴────────────┴────────────┴──────────────────────────┘
//! ```
//!
//! `total = ceil(len / max_payload)`, except that an empty message still
//! produces one fragment with an empty payload.

use heapless::Vec as FixedVec;

use crate::error::{Error, LinkError, ProtocolViolation, Result};

use super::keys::KEY_SPACE;

/// Fragment header size in bytes.
pub const HEADER_SIZE: usize = 5;

/// Largest characteristic value a GATT server can notify (ATT limit).
pub const MAX_VALUE_SIZE: usize = 512;

/// An encoded fragment, ready to hand to the link writer.
pub type EncodedFragment = FixedVec<u8, MAX_VALUE_SIZE>;

/// One size-bounded slice of a message, tagged with its key and position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    pub key: u8,
    pub index: u16,
    pub total: u16,
    pub payload: &'a [u8],
}

impl<'a> Fragment<'a> {
    /// Serialize header + payload into a fixed-capacity buffer.
    pub fn encode(&self) -> core::result::Result<EncodedFragment, LinkError> {
        let mut out = EncodedFragment::new();
        out.push(self.key).map_err(|_| LinkError::MtuExceeded)?;
        out.extend_from_slice(&self.index.to_le_bytes())
            .map_err(|()| LinkError::MtuExceeded)?;
        out.extend_from_slice(&self.total.to_le_bytes())
            .map_err(|()| LinkError::MtuExceeded)?;
        out.extend_from_slice(self.payload)
            .map_err(|()| LinkError::MtuExceeded)?;
        Ok(out)
    }

    /// Parse a raw characteristic write.
    ///
    /// Only the header's own consistency is checked here; agreement with
    /// other fragments of the same key is the reassembler's job.
    pub fn decode(raw: &'a [u8]) -> core::result::Result<Self, ProtocolViolation> {
        if raw.len() < HEADER_SIZE {
            return Err(ProtocolViolation::Truncated { len: raw.len() });
        }
        let key = raw[0];
        let index = u16::from_le_bytes([raw[1], raw[2]]);
        let total = u16::from_le_bytes([raw[3], raw[4]]);

        if key >= KEY_SPACE {
            return Err(ProtocolViolation::KeyOutOfRange { key });
        }
        if total == 0 {
            return Err(ProtocolViolation::ZeroTotal { key });
        }
        if index >= total {
            return Err(ProtocolViolation::IndexOutOfRange { key, index, total });
        }

        Ok(Self {
            key,
            index,
            total,
            payload: &raw[HEADER_SIZE..],
        })
    }
}

/// Largest fragment payload that fits a negotiated characteristic value size.
pub fn payload_size_for(max_value_size: usize) -> Result<usize> {
    let usable = max_value_size.min(MAX_VALUE_SIZE);
    match usable.checked_sub(HEADER_SIZE) {
        Some(size) if size > 0 => Ok(size),
        _ => Err(Error::InvalidConfiguration(
            "max value size leaves no room for fragment payload",
        )),
    }
}

/// Split `message` into ordered fragments of at most `max_payload` bytes.
pub fn fragment(message: &[u8], max_payload: usize, key: u8) -> Result<Vec<Fragment<'_>>> {
    if max_payload == 0 {
        return Err(Error::InvalidConfiguration(
            "max fragment payload size must be positive",
        ));
    }
    if key >= KEY_SPACE {
        return Err(Error::InvalidConfiguration("key outside allocator range"));
    }

    if message.is_empty() {
        return Ok(vec![Fragment {
            key,
            index: 0,
            total: 1,
            payload: &[],
        }]);
    }

    let total = message.len().div_ceil(max_payload);
    let total = u16::try_from(total)
        .map_err(|_| Error::InvalidConfiguration("message needs more than 65535 fragments"))?;

    Ok(message
        .chunks(max_payload)
        .enumerate()
        .map(|(i, payload)| Fragment {
            key,
            index: i as u16,
            total,
            payload,
        })
        .collect())
}

// ── Tests ────────────────────────────────────────────────────
