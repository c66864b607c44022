//! Fuzz target: `Fragment::decode` + `Reassembler::on_fragment`
//!
//! Splits arbitrary input into characteristic writes and feeds them to the
//! reassembler. It must never panic, and anything it completes must be
//! no larger than the payload bytes it was fed.
//!
//! cargo fuzz run fuzz_fragment_decoder

#![no_main]

use blerelay::link::{Fragment, Reassembler};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reassembler = Reassembler::new(1_000);
    let mut fed = 0usize;

    // First byte of each chunk is its length; the rest is the raw write.
    let mut rest = data;
    let mut now = 0u64;
    while let Some((&len, tail)) = rest.split_first() {
        let n = usize::from(len).min(tail.len());
        let (raw, next) = tail.split_at(n);
        rest = next;
        now += u64::from(len);

        if let Ok(fragment) = Fragment::decode(raw) {
            fed += fragment.payload.len();
            if let Ok(Some(message)) = reassembler.on_fragment(fragment, now) {
                assert!(message.len() <= fed, "completed more bytes than were fed");
            }
        }
        reassembler.evict_idle(now);
    }

    reassembler.reset();
    assert_eq!(reassembler.pending(), 0);
});
