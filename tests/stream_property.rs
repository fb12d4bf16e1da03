mod common;
use crate::common::init_tracing;

use std::io::Write;

use proptest::prelude::*;
use runcmd_test_utils::capture::LineCollector;

// Strategy: text made of short printable lines joined by newlines.
// The last element is an unterminated tail (possibly empty).
fn text_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec("[ -~]{0,12}", 1..8).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn test_chunking_does_not_change_emitted_lines(
        text in text_strategy(),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        init_tracing();
        let bytes = text.as_bytes();

        let whole = LineCollector::new();
        let mut stream = whole.stream();
        stream.write_all(bytes).unwrap();

        let chunked = LineCollector::new();
        let mut stream = chunked.stream();
        let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
        offsets.push(0);
        offsets.push(bytes.len());
        offsets.sort_unstable();
        for pair in offsets.windows(2) {
            stream.write_all(&bytes[pair[0]..pair[1]]).unwrap();
        }

        prop_assert_eq!(whole.snapshot(), chunked.snapshot());

        // Every line before the final unterminated tail is emitted, the
        // tail itself stays buffered.
        let mut expected: Vec<String> = text.split('\n').map(str::to_string).collect();
        let tail = expected.pop().unwrap_or_default();
        prop_assert_eq!(chunked.snapshot(), expected);
        prop_assert_eq!(stream.buffered(), tail.len());
    }
}
