//! Fuzz target for the WQL filter parser.
//!
//! Feeds arbitrary text through the whole compile pipeline. Parsing may
//! fail, but nothing may panic, and any filter that parses must encode.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_filter_parser
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use wql_query::{Query, TagEncoder, query_to_tagquery};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(query) = Query::parse_str(input) else {
        return;
    };

    let _ = Query::parse(&query.to_json());
    let _ = query.keys();

    let tag_query = query_to_tagquery(&query.optimise().unwrap_or(Query::And(Vec::new())));
    let encoder = TagEncoder::postgres();
    encoder
        .encode_query(&tag_query)
        .expect("parsed filter encodes");
});
