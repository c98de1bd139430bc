//! Fuzz target for `Range` header parsing
//!
//! Any header against any content length must either be rejected or yield
//! a range that lies inside the content and respects the chunk cap for
//! open-ended requests.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use oxserve_http::parse_range;

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    header: Option<&'a str>,
    len: u64,
    chunk_cap: u64,
}

fuzz_target!(|input: Input<'_>| {
    let Ok(range) = parse_range(input.header, input.len, input.chunk_cap) else {
        return;
    };

    assert!(range.start <= range.end, "start past end: {range:?}");
    assert!(range.end < input.len, "range outside content: {range:?}");
    assert_eq!(range.len(), range.end - range.start + 1);

    let open_ended = input
        .header
        .is_some_and(|h| h.trim_end().ends_with('-'));
    if open_ended && input.chunk_cap > 0 {
        assert!(range.len() <= input.chunk_cap, "cap ignored: {range:?}");
    }
});
