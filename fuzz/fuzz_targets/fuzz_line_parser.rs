//! Fuzz target: `LineAccumulator::feed` + `parse_line`
//!
//! Drives arbitrary byte sequences through the serial line decoder and
//! parses every line it yields, asserting that neither step panics and
//! that no line exceeds the configured limit.
//!
//! cargo fuzz run fuzz_line_parser

#![no_main]

use libfuzzer_sys::fuzz_target;
use motionboard::protocol::codec::{LineAccumulator, MAX_LINE_LEN};
use motionboard::protocol::command::parse_line;

fuzz_target!(|data: &[u8]| {
    // First byte picks the limit so short limits get exercised too.
    let limit = data.first().map_or(MAX_LINE_LEN, |b| usize::from(*b).max(1));
    let mut acc = LineAccumulator::new(limit);

    for &b in data {
        if let Some(line) = acc.feed(b) {
            assert!(line.len() <= limit.min(MAX_LINE_LEN), "line exceeds limit");
            let _ = parse_line(&line);
        }
    }

    // After a reset the decoder must accept bytes cleanly again.
    acc.reset();
    assert_eq!(acc.pending(), 0);
});
