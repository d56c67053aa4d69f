//! Fuzz target for the tag encoder.
//!
//! Builds arbitrary tag query trees and encodes them in every dialect and
//! storage mode, checking that placeholders and parameters line up.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_tag_encoder
//! ```

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use wql_query::sql::count_placeholders;
use wql_query::{CompareOp, Dialect, TagEncoder, TagName, TagQuery};

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl From<FuzzOp> for CompareOp {
    fn from(op: FuzzOp) -> Self {
        match op {
            FuzzOp::Eq => CompareOp::Eq,
            FuzzOp::Neq => CompareOp::Neq,
            FuzzOp::Gt => CompareOp::Gt,
            FuzzOp::Gte => CompareOp::Gte,
            FuzzOp::Lt => CompareOp::Lt,
            FuzzOp::Lte => CompareOp::Lte,
            FuzzOp::Like => CompareOp::Like,
        }
    }
}

#[derive(Debug, Arbitrary)]
enum FuzzQuery {
    And(Vec<FuzzQuery>),
    Or(Vec<FuzzQuery>),
    Not(Box<FuzzQuery>),
    Compare(FuzzOp, String, String),
    In(String, Vec<String>),
    Exist(Vec<String>),
}

impl FuzzQuery {
    fn into_tag_query(self, depth: usize) -> TagQuery {
        if depth > 12 {
            return TagQuery::And(Vec::new());
        }
        let children = |items: Vec<FuzzQuery>| -> Vec<TagQuery> {
            items
                .into_iter()
                .take(8)
                .map(|q| q.into_tag_query(depth + 1))
                .collect()
        };
        match self {
            FuzzQuery::And(items) => TagQuery::And(children(items)),
            FuzzQuery::Or(items) => TagQuery::Or(children(items)),
            FuzzQuery::Not(inner) => TagQuery::not(inner.into_tag_query(depth + 1)),
            FuzzQuery::Compare(op, name, value) => {
                TagQuery::compare(op.into(), TagName::new(name), value)
            }
            FuzzQuery::In(name, values) => TagQuery::in_list(name, values),
            FuzzQuery::Exist(names) => TagQuery::exist(names),
        }
    }
}

fn check<D: Dialect>(encoder: &TagEncoder<D>, query: &TagQuery, negate: bool) {
    let (sql, params) = encoder
        .encode_query_with(query, negate)
        .expect("tag queries always encode");
    assert_eq!(
        count_placeholders(&sql, encoder.dialect().placeholder()),
        params.len()
    );
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(fuzz_query) = FuzzQuery::arbitrary(&mut unstructured) else {
        return;
    };
    let negate = bool::arbitrary(&mut unstructured).unwrap_or(false);
    let query = fuzz_query.into_tag_query(0);

    check(&TagEncoder::postgres(), &query, negate);
    check(&TagEncoder::sqlite(), &query, negate);
    check(&TagEncoder::postgres().normalized(Some("t")), &query, negate);
    check(&TagEncoder::sqlite().normalized(Some("t")), &query, negate);

    // The tagged form must decode back to the same tree.
    let tagged = query.to_tagged();
    assert_eq!(TagQuery::from_tagged(&tagged).expect("tagged form decodes"), query);
});
