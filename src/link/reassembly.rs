//! Reassembly of inbound fragments into whole messages.
//!
//! Fragments are grouped by key and slotted by index, so arrival order and
//! duplicates do not matter; fragments of different keys may interleave.
//! A group completes once every index in `[0, total)` is filled, at which
//! point the payloads are concatenated in index order and the group freed.
//!
//! Groups that stop receiving fragments (peer vanished mid-message) are
//! evicted after an idle timeout so partial state cannot accumulate.
//! A group only ever holds the payloads actually received; the header's
//! `total` is never used to size anything.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use crate::error::ProtocolViolation;

use super::fragment::Fragment;

/// Callback invoked with `(key, message)` whenever a group completes.
pub type CompleteFn = Box<dyn FnMut(u8, &[u8])>;

/// Per-key accumulator.
struct ReassemblyGroup {
    total: u16,
    /// index → payload
    received: BTreeMap<u16, Vec<u8>>,
    last_seen_ms: u64,
}

impl ReassemblyGroup {
    fn new(total: u16, now_ms: u64) -> Self {
        Self {
            total,
            received: BTreeMap::new(),
            last_seen_ms: now_ms,
        }
    }

    fn is_complete(&self) -> bool {
        self.received.len() == usize::from(self.total)
    }

    fn bytes(&self) -> usize {
        self.received.values().map(Vec::len).sum()
    }

    fn concat(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.bytes());
        for payload in self.received.into_values() {
            out.extend_from_slice(&payload);
        }
        out
    }
}

/// Groups inbound fragments by key and emits completed messages.
pub struct Reassembler {
    groups: HashMap<u8, ReassemblyGroup>,
    idle_timeout_ms: u64,
    on_complete: Option<CompleteFn>,
}

impl Reassembler {
    pub fn new(idle_timeout_ms: u64) -> Self {
        Self {
            groups: HashMap::new(),
            idle_timeout_ms,
            on_complete: None,
        }
    }

    /// Register a callback run for every completed message, in addition to
    /// the buffer returned from [`Self::on_fragment`].
    pub fn set_on_complete(&mut self, f: CompleteFn) {
        self.on_complete = Some(f);
    }

    /// Feed one decoded fragment observed at `now_ms`.
    ///
    /// Returns the reassembled message when this fragment completes its
    /// group. A fragment whose `total` disagrees with its group is rejected
    /// and the group is left untouched.
    pub fn on_fragment(
        &mut self,
        fragment: Fragment<'_>,
        now_ms: u64,
    ) -> Result<Option<Vec<u8>>, ProtocolViolation> {
        self.evict_idle(now_ms);

        let key = fragment.key;
        if fragment.total == 0 {
            return Err(ProtocolViolation::ZeroTotal { key });
        }
        if fragment.index >= fragment.total {
            return Err(ProtocolViolation::IndexOutOfRange {
                key,
                index: fragment.index,
                total: fragment.total,
            });
        }

        let group = self
            .groups
            .entry(key)
            .or_insert_with(|| ReassemblyGroup::new(fragment.total, now_ms));

        if group.total != fragment.total {
            return Err(ProtocolViolation::TotalMismatch {
                key,
                expected: group.total,
                got: fragment.total,
            });
        }

        if group
            .received
            .insert(fragment.index, fragment.payload.to_vec())
            .is_some()
        {
            debug!("Reassembly: key {} duplicate index {}", key, fragment.index);
        }
        group.last_seen_ms = now_ms;

        if !group.is_complete() {
            return Ok(None);
        }

        let Some(group) = self.groups.remove(&key) else {
            return Ok(None);
        };
        let message = group.concat();
        if let Some(cb) = self.on_complete.as_mut() {
            cb(key, &message);
        }
        Ok(Some(message))
    }

    /// Drop groups that have not seen a fragment for longer than the idle
    /// timeout. Returns how many were evicted.
    pub fn evict_idle(&mut self, now_ms: u64) -> usize {
        let timeout = self.idle_timeout_ms;
        let before = self.groups.len();
        self.groups.retain(|key, group| {
            let idle = now_ms.saturating_sub(group.last_seen_ms);
            let keep = idle <= timeout;
            if !keep {
                warn!(
                    "Reassembly: evicting key {} after {}ms idle ({}/{} fragments)",
                    key,
                    idle,
                    group.received.len(),
                    group.total
                );
            }
            keep
        });
        before - self.groups.len()
    }

    /// Discard every partial group (e.g. the peer unsubscribed).
    pub fn reset(&mut self) {
        self.groups.clear();
    }

    /// Number of groups awaiting more fragments.
    pub fn pending(&self) -> usize {
        self.groups.len()
    }

    /// Payload bytes held across all partial groups.
    pub fn buffered_bytes(&self) -> usize {
        self.groups.values().map(ReassemblyGroup::bytes).sum()
    }
}

// ── Tests ────────────────────────────────────────────────────
