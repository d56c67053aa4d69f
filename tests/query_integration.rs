//! Integration tests for the public compiler API.
//!
//! These tests cover:
//! - Filter parsing and its error cases
//! - Optimisation and conversion between the two query trees
//! - Encoder configuration
//! - Error formatting

use pretty_assertions::assert_eq;
use serde_json::json;
use wql::prelude::*;
use wql::{CompareOp, ErrorCode, MAX_DEPTH, StorageMode};

#[test]
fn test_parse_implicit_and() {
    let q = Query::parse(&json!({"name": "alice", "age": {"$gte": "21"}})).unwrap();
    assert_eq!(q, Query::and([Query::eq("name", "alice"), Query::gte("age", "21")]));
}

#[test]
fn test_parse_top_level_array_is_or() {
    let q = Query::parse(&json!([{"a": "1"}, {"b": "2"}])).unwrap();
    assert_eq!(q, Query::or([Query::eq("a", "1"), Query::eq("b", "2")]));

    assert_eq!(Query::parse(&json!([])).unwrap(), Query::And(vec![]));
}

#[test]
fn test_parse_skips_nulls_and_empty_groups() {
    let q = Query::parse(&json!({"a": null, "$and": [], "b": "2"})).unwrap();
    assert_eq!(q, Query::eq("b", "2"));

    assert_eq!(Query::parse(&json!({})).unwrap(), Query::And(vec![]));
}

#[test]
fn test_parse_exist_forms() {
    assert_eq!(
        Query::parse(&json!({"$exist": "a"})).unwrap(),
        Query::exist(["a"])
    );
    assert_eq!(
        Query::parse(&json!({"$exist": ["a", "b"]})).unwrap(),
        Query::exist(["a", "b"])
    );
}

#[test]
fn test_parse_errors() {
    let cases = [
        (json!({"a": {"$regex": "x"}}), ErrorCode::UnsupportedOperator),
        (json!({"a": {"$gt": 5}}), ErrorCode::InvalidOperand),
        (json!({"a": {"$in": "x"}}), ErrorCode::InvalidOperand),
        (json!({"a": {"$in": ["x", 1]}}), ErrorCode::InvalidOperand),
        (json!({"$not": ["x"]}), ErrorCode::InvalidOperand),
        (json!({"$and": {"a": "1"}}), ErrorCode::InvalidOperand),
        (json!({"a": 1}), ErrorCode::InvalidOperand),
        (json!({"a": {"$gt": "1", "$lt": "5"}}), ErrorCode::InvalidOperand),
        (json!("a"), ErrorCode::InvalidFilter),
        (json!(42), ErrorCode::InvalidFilter),
    ];
    for (filter, code) in cases {
        let err = Query::parse(&filter).unwrap_err();
        assert_eq!(err.code, code, "filter {}", filter);
        assert!(err.is_user_error());
        assert!(!err.is_retryable());
    }
}

#[test]
fn test_parse_rejects_deep_nesting() {
    let mut filter = json!({"a": "1"});
    for _ in 0..=MAX_DEPTH {
        filter = json!({ "$not": filter });
    }
    let err = Query::parse(&filter).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFilter);
}

#[test]
fn test_unsupported_operator_context() {
    let err = Query::parse_str(r#"{"name": {"$regex": "^a"}}"#).unwrap_err();
    assert_eq!(err.context.key.as_deref(), Some("name"));
    assert_eq!(err.context.operator.as_deref(), Some("$regex"));
    assert!(err.to_string().starts_with("[W1003]"));
    assert!(err.display_full().contains("$regex"));
}

#[test]
fn test_invalid_json() {
    let err: WqlError = "{not json".parse::<Query>().unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidJson);
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_optimise() {
    let q = Query::and([
        Query::or([Query::in_list("a", ["1"])]),
        Query::And(vec![]),
        Query::not(Query::not(Query::eq("b", "2"))),
    ]);
    assert_eq!(
        q.optimise(),
        Some(Query::and([Query::eq("a", "1"), Query::eq("b", "2")]))
    );
    assert_eq!(Query::Or(vec![Query::And(vec![])]).optimise(), None);
}

#[test]
fn test_conversion_strips_marker() {
    let q = Query::and([Query::eq("~a", "1"), Query::exist(["~b", "c"])]);
    assert_eq!(
        query_to_tagquery(&q),
        TagQuery::and([TagQuery::eq("a", "1"), TagQuery::exist(["b", "c"])])
    );
    assert_eq!(q.keys(), vec!["~a", "~b", "c"]);
}

#[test]
fn test_tagged_form() {
    let tq = TagQuery::not(TagQuery::compare(CompareOp::Lt, TagName::new("n"), "3"));
    let tagged = tq.to_tagged();
    assert_eq!(
        tagged,
        json!({"variant": "Not", "data": {"variant": "Lt", "data": {"name": "n", "value": "3"}}})
    );
    assert_eq!(TagQuery::from_tagged(&tagged).unwrap(), tq);

    let err = TagQuery::from_tagged(&json!({"variant": "Xor", "data": []})).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownVariant);
    assert!(err.is_fatal());
    assert!(err.message.contains("Xor"));
}

#[test]
fn test_encoder_from_toml() {
    let config = EncoderConfig::from_toml_str(
        r#"
        dialect = "postgres"
        mode = "normalized"
        table_alias = "c"
        "#,
    )
    .unwrap();
    assert_eq!(config.mode, StorageMode::Normalized);

    let encoder = TagEncoder::from_config(&config).unwrap();
    let (sql, params) = compile(&json!({"$exist": ["email", "user"]}), &encoder).unwrap();
    assert_eq!(sql, "(c.email IS NOT NULL AND c.\"user\" IS NOT NULL)");
    assert!(params.is_empty());
}

#[test]
fn test_bad_config_is_fatal() {
    let err = EncoderConfig::from_toml_str("tags_table = \"items tags\"").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    assert!(err.is_fatal());
}

#[test]
fn test_display() {
    let q = Query::not(Query::eq("a", "1"));
    assert_eq!(q.to_string(), r#"{"$not":{"a":"1"}}"#);
    assert_eq!(
        TagQuery::eq("a", "1").to_string(),
        r#"{"variant":"Eq","data":{"name":"a","value":"1"}}"#
    );
}

#[test]
fn test_postgres_and_sqlite_differ_only_in_spelling() {
    let filter = json!({"$or": [{"a": {"$neq": "1"}}, {"$and": []}]});
    let (pg, pg_params) = compile(&filter, &TagEncoder::postgres()).unwrap();
    let (lite, lite_params) = compile(&filter, &TagEncoder::sqlite()).unwrap();
    assert_eq!(pg.replace("%s", "?"), lite);
    assert_eq!(pg_params, lite_params);
}
