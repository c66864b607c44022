//! Fuzz target: `envelope::classify`
//!
//! Arbitrary reassembled buffers must classify or fail cleanly.
//!
//! cargo fuzz run fuzz_envelope_classify

#![no_main]

use blerelay::envelope::{Classified, classify};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(Classified::Known(inbound)) = classify(data) {
        let _ = format!("{inbound:?}");
    }
});
