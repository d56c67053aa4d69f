//! JSON filter grammar → [`Query`].

use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::debug;

use super::Query;
use crate::error::{WqlError, WqlResult};
use crate::operator::{CompareOp, ConjunctionOp};
use crate::tag_query::PLAINTEXT_MARKER;

/// Maximum nesting depth accepted from untrusted filter input.
pub const MAX_DEPTH: usize = 64;

impl Query {
    /// Parse an already-decoded JSON filter.
    ///
    /// An object is a set of constraints combined with AND; an array is a
    /// list of such objects combined with OR. Non-object array elements are
    /// skipped.
    pub fn parse(value: &Value) -> WqlResult<Query> {
        let query = match value {
            Value::Object(map) => parse_object(map, 0)?,
            Value::Array(items) => {
                let children = parse_object_list(items, 0)?;
                if children.is_empty() {
                    Query::And(Vec::new())
                } else {
                    Query::Or(children)
                }
            }
            other => {
                return Err(WqlError::invalid_filter(format!(
                    "Filter must be an object or an array, found {}",
                    json_kind(other)
                )));
            }
        };
        debug!(
            variant = query.variant_name(),
            depth = query.depth(),
            "Parsed WQL filter"
        );
        Ok(query)
    }

    /// Decode a JSON string and parse it as a filter.
    pub fn parse_str(filter: &str) -> WqlResult<Query> {
        let value: Value = serde_json::from_str(filter).map_err(WqlError::invalid_json)?;
        Self::parse(&value)
    }
}

impl FromStr for Query {
    type Err = WqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl TryFrom<&Value> for Query {
    type Error = WqlError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

fn parse_object(map: &Map<String, Value>, depth: usize) -> WqlResult<Query> {
    if depth > MAX_DEPTH {
        return Err(WqlError::invalid_filter(format!(
            "Filter nesting exceeds the maximum depth of {}",
            MAX_DEPTH
        )));
    }

    let mut operators = Vec::with_capacity(map.len());
    for (key, value) in map {
        if let Some(op) = parse_entry(key, value, depth)? {
            operators.push(op);
        }
    }

    if operators.len() == 1 {
        Ok(operators.remove(0))
    } else {
        Ok(Query::And(operators))
    }
}

fn parse_object_list(items: &[Value], depth: usize) -> WqlResult<Vec<Query>> {
    items
        .iter()
        .filter_map(Value::as_object)
        .map(|map| parse_object(map, depth + 1))
        .collect()
}

fn parse_entry(key: &str, value: &Value, depth: usize) -> WqlResult<Option<Query>> {
    if value.is_null() {
        return Ok(None);
    }

    match key {
        "$and" | "$or" => {
            let op = if key == "$and" {
                ConjunctionOp::And
            } else {
                ConjunctionOp::Or
            };
            let Value::Array(items) = value else {
                return Err(WqlError::invalid_operand(key, key, "an array of objects"));
            };
            let children = parse_object_list(items, depth)?;
            if children.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Query::conjunction(op, children)))
            }
        }
        "$not" => {
            let Value::Object(map) = value else {
                return Err(WqlError::invalid_operand(key, key, "an object"));
            };
            Ok(Some(Query::not(parse_object(map, depth + 1)?)))
        }
        "$exist" => parse_exist(value),
        _ => parse_field(key, value).map(Some),
    }
}

fn parse_exist(value: &Value) -> WqlResult<Option<Query>> {
    let keys: Vec<String> = match value {
        Value::String(name) => vec![require_key(name)?],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(require_key)
            .collect::<WqlResult<_>>()?,
        _ => {
            return Err(WqlError::invalid_operand(
                "$exist",
                "$exist",
                "a string or an array of strings",
            ));
        }
    };

    if keys.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Query::Exist { keys }))
    }
}

fn parse_field(key: &str, value: &Value) -> WqlResult<Query> {
    let key = require_key(key)?;
    match value {
        Value::String(s) => Ok(Query::eq(key, s.as_str())),
        Value::Object(map) if map.len() == 1 => {
            let Some((op, operand)) = map.iter().next() else {
                return Err(WqlError::internal("single-entry map yielded no entry"));
            };
            parse_operator(key, op, operand)
        }
        Value::Object(_) => Err(WqlError::invalid_operand(
            key,
            "operator",
            "an object with exactly one operator",
        )),
        _ => Err(WqlError::invalid_operand(
            key,
            "$eq",
            "a string or an operator object",
        )),
    }
}

fn parse_operator(key: String, op: &str, operand: &Value) -> WqlResult<Query> {
    if op == "$in" {
        let Value::Array(items) = operand else {
            return Err(WqlError::invalid_operand(key, op, "an array of strings"));
        };
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(s) => values.push(s.to_string()),
                None => {
                    return Err(WqlError::invalid_operand(key, op, "an array of strings"));
                }
            }
        }
        return Ok(Query::In { key, values });
    }

    let Some(compare) = CompareOp::from_grammar_key(op) else {
        return Err(WqlError::unsupported_operator(key, op));
    };
    match operand.as_str() {
        Some(s) => Ok(Query::compare(compare, key, s)),
        None => Err(WqlError::invalid_operand(key, op, "a string")),
    }
}

// The key must still name something once the plaintext marker is removed.
fn require_key(key: &str) -> WqlResult<String> {
    if key.strip_prefix(PLAINTEXT_MARKER).unwrap_or(key).is_empty() {
        Err(WqlError::invalid_filter("Tag keys must be non-empty strings"))
    } else {
        Ok(key.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
