//! Encoder-facing query tree.
//!
//! [`TagQuery`] mirrors [`Query`] node for node, but every leaf key is a
//! [`TagName`]. A `TagName` can only be obtained through
//! [`query_to_tagquery`] (or by explicitly stating that a name is already
//! stripped), so the encoders can never see a raw, unconverted key.
//!
//! ```rust
//! use wql_query::{Query, TagQuery, query_to_tagquery};
//!
//! let q = Query::eq("~name", "alice");
//! let tq = query_to_tagquery(&q);
//! assert_eq!(tq, TagQuery::eq("name", "alice"));
//! ```

use std::fmt;

use serde_json::{Map, Value, json};
use smol_str::SmolStr;

use crate::error::{WqlError, WqlResult};
use crate::operator::{CompareOp, ConjunctionOp};
use crate::query::{MAX_DEPTH, Query};

/// Legacy marker that once flagged a tag as stored in plaintext.
pub const PLAINTEXT_MARKER: char = '~';

/// A tag name with the legacy plaintext marker removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagName(SmolStr);

impl TagName {
    /// Build a tag name from a source key, removing one leading `~`.
    pub fn from_key(key: &str) -> Self {
        Self(SmolStr::new(key.strip_prefix(PLAINTEXT_MARKER).unwrap_or(key)))
    }

    /// Wrap a name that is already free of the plaintext marker.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(SmolStr::new(name.as_ref()))
    }

    /// A source key that converts back into this name.
    pub fn to_key(&self) -> String {
        if self.0.starts_with(PLAINTEXT_MARKER) {
            format!("{}{}", PLAINTEXT_MARKER, self.0)
        } else {
            self.0.to_string()
        }
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the tag query tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagQuery {
    /// All children must hold.
    And(Vec<TagQuery>),
    /// At least one child must hold.
    Or(Vec<TagQuery>),
    /// The child must not hold.
    Not(Box<TagQuery>),
    /// Tag equals value.
    Eq {
        /// Tag name.
        name: TagName,
        /// Compared value.
        value: String,
    },
    /// Tag differs from value.
    Neq {
        /// Tag name.
        name: TagName,
        /// Compared value.
        value: String,
    },
    /// Tag greater than value.
    Gt {
        /// Tag name.
        name: TagName,
        /// Compared value.
        value: String,
    },
    /// Tag greater than or equal to value.
    Gte {
        /// Tag name.
        name: TagName,
        /// Compared value.
        value: String,
    },
    /// Tag less than value.
    Lt {
        /// Tag name.
        name: TagName,
        /// Compared value.
        value: String,
    },
    /// Tag less than or equal to value.
    Lte {
        /// Tag name.
        name: TagName,
        /// Compared value.
        value: String,
    },
    /// Tag matches a `LIKE` pattern.
    Like {
        /// Tag name.
        name: TagName,
        /// Pattern.
        value: String,
    },
    /// Tag equals one of the values.
    In {
        /// Tag name.
        name: TagName,
        /// Candidate values.
        values: Vec<String>,
    },
    /// Every listed tag is present.
    Exist {
        /// Tag names.
        names: Vec<TagName>,
    },
}

impl TagQuery {
    /// Create an AND node.
    pub fn and(children: impl IntoIterator<Item = TagQuery>) -> Self {
        Self::And(children.into_iter().collect())
    }

    /// Create an OR node.
    pub fn or(children: impl IntoIterator<Item = TagQuery>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    /// Create a NOT node.
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: TagQuery) -> Self {
        Self::Not(Box::new(child))
    }

    /// Create a comparison node for `op`.
    pub fn compare(op: CompareOp, name: TagName, value: impl Into<String>) -> Self {
        let value = value.into();
        match op {
            CompareOp::Eq => Self::Eq { name, value },
            CompareOp::Neq => Self::Neq { name, value },
            CompareOp::Gt => Self::Gt { name, value },
            CompareOp::Gte => Self::Gte { name, value },
            CompareOp::Lt => Self::Lt { name, value },
            CompareOp::Lte => Self::Lte { name, value },
            CompareOp::Like => Self::Like { name, value },
        }
    }

    /// Create an equality node on an already-stripped name.
    pub fn eq(name: impl AsRef<str>, value: impl Into<String>) -> Self {
        Self::compare(CompareOp::Eq, TagName::new(name), value)
    }

    /// Create a membership node on an already-stripped name.
    pub fn in_list<I, S>(name: impl AsRef<str>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In {
            name: TagName::new(name),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an existence node on already-stripped names.
    pub fn exist<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Exist {
            names: names.into_iter().map(TagName::new).collect(),
        }
    }

    /// The variant name of this node.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::And(_) => "And",
            Self::Or(_) => "Or",
            Self::Not(_) => "Not",
            Self::Eq { .. } => "Eq",
            Self::Neq { .. } => "Neq",
            Self::Gt { .. } => "Gt",
            Self::Gte { .. } => "Gte",
            Self::Lt { .. } => "Lt",
            Self::Lte { .. } => "Lte",
            Self::Like { .. } => "Like",
            Self::In { .. } => "In",
            Self::Exist { .. } => "Exist",
        }
    }

    /// View a comparison node as `(operator, name, value)`.
    pub fn as_comparison(&self) -> Option<(CompareOp, &TagName, &str)> {
        let (op, name, value) = match self {
            Self::Eq { name, value } => (CompareOp::Eq, name, value),
            Self::Neq { name, value } => (CompareOp::Neq, name, value),
            Self::Gt { name, value } => (CompareOp::Gt, name, value),
            Self::Gte { name, value } => (CompareOp::Gte, name, value),
            Self::Lt { name, value } => (CompareOp::Lt, name, value),
            Self::Lte { name, value } => (CompareOp::Lte, name, value),
            Self::Like { name, value } => (CompareOp::Like, name, value),
            Self::And(_) | Self::Or(_) | Self::Not(_) | Self::In { .. } | Self::Exist { .. } => {
                return None;
            }
        };
        Some((op, name, value.as_str()))
    }

    /// View a conjunction node as `(operator, children)`.
    pub fn as_conjunction(&self) -> Option<(ConjunctionOp, &[TagQuery])> {
        match self {
            Self::And(children) => Some((ConjunctionOp::And, children)),
            Self::Or(children) => Some((ConjunctionOp::Or, children)),
            _ => None,
        }
    }

    /// Convert back into a source query.
    ///
    /// Names that themselves begin with `~` get a marker prepended, so that
    /// [`query_to_tagquery`] restores exactly this tree.
    pub fn to_query(&self) -> Query {
        match self {
            Self::And(children) => Query::And(children.iter().map(TagQuery::to_query).collect()),
            Self::Or(children) => Query::Or(children.iter().map(TagQuery::to_query).collect()),
            Self::Not(child) => Query::not(child.to_query()),
            Self::In { name, values } => Query::in_list(name.to_key(), values.iter().cloned()),
            Self::Exist { names } => Query::exist(names.iter().map(TagName::to_key)),
            other => match other.as_comparison() {
                Some((op, name, value)) => Query::compare(op, name.to_key(), value),
                None => Query::And(Vec::new()),
            },
        }
    }

    /// Serialize to the variant-tagged interchange form,
    /// `{"variant": "Eq", "data": {...}}`.
    pub fn to_tagged(&self) -> Value {
        let data = match self {
            Self::And(children) | Self::Or(children) => {
                Value::Array(children.iter().map(TagQuery::to_tagged).collect())
            }
            Self::Not(child) => child.to_tagged(),
            Self::Eq { name, value }
            | Self::Neq { name, value }
            | Self::Gt { name, value }
            | Self::Gte { name, value }
            | Self::Lt { name, value }
            | Self::Lte { name, value }
            | Self::Like { name, value } => json!({ "name": name.as_str(), "value": value }),
            Self::In { name, values } => json!({ "name": name.as_str(), "values": values }),
            Self::Exist { names } => {
                Value::Array(names.iter().map(|n| Value::from(n.as_str())).collect())
            }
        };
        json!({ "variant": self.variant_name(), "data": data })
    }

    /// Decode the variant-tagged interchange form.
    ///
    /// Fails with [`ErrorCode::UnknownVariant`](crate::ErrorCode::UnknownVariant)
    /// when the variant tag is not one of the closed set.
    ///
    /// Nesting deeper than [`MAX_DEPTH`] fails with
    /// [`ErrorCode::InvalidFilter`](crate::ErrorCode::InvalidFilter).
    pub fn from_tagged(value: &Value) -> WqlResult<TagQuery> {
        Self::from_tagged_at(value, 0)
    }

    fn from_tagged_at(value: &Value, depth: usize) -> WqlResult<TagQuery> {
        if depth > MAX_DEPTH {
            return Err(WqlError::invalid_filter(format!(
                "Tagged query nesting exceeds the maximum depth of {}",
                MAX_DEPTH
            )));
        }
        let Some(map) = value.as_object() else {
            return Err(WqlError::invalid_filter("Tagged query must be an object"));
        };
        let Some(variant) = map.get("variant").and_then(Value::as_str) else {
            return Err(WqlError::invalid_filter("Tagged query is missing its variant"));
        };
        let data = map.get("data").unwrap_or(&Value::Null);

        match variant {
            "And" | "Or" => {
                let children = tagged_array(variant, data)?
                    .iter()
                    .map(|child| Self::from_tagged_at(child, depth + 1))
                    .collect::<WqlResult<Vec<_>>>()?;
                Ok(if variant == "And" {
                    Self::And(children)
                } else {
                    Self::Or(children)
                })
            }
            "Not" => Ok(Self::not(Self::from_tagged_at(data, depth + 1)?)),
            "In" => {
                let fields = tagged_object(variant, data)?;
                let name = tagged_string(variant, field(fields, "name"))?;
                let values = tagged_array(variant, field(fields, "values"))?
                    .iter()
                    .map(|v| tagged_string(variant, v))
                    .collect::<WqlResult<Vec<_>>>()?;
                Ok(Self::In {
                    name: TagName::new(name),
                    values,
                })
            }
            "Exist" => {
                let names = tagged_array(variant, data)?
                    .iter()
                    .map(|v| tagged_string(variant, v).map(TagName::new))
                    .collect::<WqlResult<Vec<_>>>()?;
                Ok(Self::Exist { names })
            }
            other => {
                let Some(op) = CompareOp::from_variant_name(other) else {
                    return Err(WqlError::unknown_variant(other));
                };
                let fields = tagged_object(variant, data)?;
                let name = tagged_string(variant, field(fields, "name"))?;
                let value = tagged_string(variant, field(fields, "value"))?;
                Ok(Self::compare(op, TagName::new(name), value))
            }
        }
    }
}

fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a Value {
    fields.get(key).unwrap_or(&Value::Null)
}

fn tagged_array<'a>(variant: &str, data: &'a Value) -> WqlResult<&'a Vec<Value>> {
    data.as_array()
        .ok_or_else(|| WqlError::invalid_operand(variant, variant, "an array"))
}

fn tagged_object<'a>(variant: &str, data: &'a Value) -> WqlResult<&'a Map<String, Value>> {
    data.as_object()
        .ok_or_else(|| WqlError::invalid_operand(variant, variant, "an object"))
}

fn tagged_string(variant: &str, data: &Value) -> WqlResult<String> {
    data.as_str()
        .map(str::to_string)
        .ok_or_else(|| WqlError::invalid_operand(variant, variant, "a string"))
}

impl fmt::Display for TagQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tagged())
    }
}

/// Convert a source query into the encoder-facing tree.
///
/// Every leaf key loses at most one leading `~`; conjunctions and negations
/// are mapped structurally.
pub fn query_to_tagquery(query: &Query) -> TagQuery {
    let leaf = |op, key: &str, value: &str| TagQuery::compare(op, TagName::from_key(key), value);

    match query {
        Query::And(children) => TagQuery::And(children.iter().map(query_to_tagquery).collect()),
        Query::Or(children) => TagQuery::Or(children.iter().map(query_to_tagquery).collect()),
        Query::Not(child) => TagQuery::not(query_to_tagquery(child)),
        Query::Eq { key, value } => leaf(CompareOp::Eq, key, value),
        Query::Neq { key, value } => leaf(CompareOp::Neq, key, value),
        Query::Gt { key, value } => leaf(CompareOp::Gt, key, value),
        Query::Gte { key, value } => leaf(CompareOp::Gte, key, value),
        Query::Lt { key, value } => leaf(CompareOp::Lt, key, value),
        Query::Lte { key, value } => leaf(CompareOp::Lte, key, value),
        Query::Like { key, value } => leaf(CompareOp::Like, key, value),
        Query::In { key, values } => TagQuery::In {
            name: TagName::from_key(key),
            values: values.clone(),
        },
        Query::Exist { keys } => TagQuery::Exist {
            names: keys.iter().map(|key| TagName::from_key(key)).collect(),
        },
    }
}

impl From<&Query> for TagQuery {
    fn from(query: &Query) -> Self {
        query_to_tagquery(query)
    }
}

impl From<Query> for TagQuery {
    fn from(query: Query) -> Self {
        query_to_tagquery(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_marker_stripped_once() {
        assert_eq!(TagName::from_key("~name").as_str(), "name");
        assert_eq!(TagName::from_key("~~name").as_str(), "~name");
        assert_eq!(TagName::from_key("name").as_str(), "name");
        assert_eq!(TagName::from_key("na~me").as_str(), "na~me");
    }

    #[test]
    fn test_conversion_is_structural() {
        let q = Query::and([
            Query::eq("~a", "1"),
            Query::not(Query::or([Query::like("b", "x%"), Query::in_list("~c", ["y"])])),
            Query::exist(["~d", "e"]),
        ]);
        let expected = TagQuery::and([
            TagQuery::eq("a", "1"),
            TagQuery::not(TagQuery::or([
                TagQuery::compare(CompareOp::Like, TagName::new("b"), "x%"),
                TagQuery::in_list("c", ["y"]),
            ])),
            TagQuery::exist(["d", "e"]),
        ]);
        assert_eq!(query_to_tagquery(&q), expected);
        assert_eq!(TagQuery::from(q), expected);
    }

    #[test]
    fn test_every_comparison_converts() {
        for op in CompareOp::ALL {
            let tq = query_to_tagquery(&Query::compare(op, "~k", "v"));
            assert_eq!(tq.as_comparison(), Some((op, &TagName::new("k"), "v")));
            assert_eq!(tq.variant_name(), op.variant_name());
        }
    }

    #[test]
    fn test_to_query_inverts_conversion_for_unmarked_keys() {
        let q = Query::or([Query::gte("a", "1"), Query::exist(["b"])]);
        assert_eq!(query_to_tagquery(&q).to_query(), q);
    }

    #[test]
    fn test_to_query_protects_leading_marker() {
        let tq = TagQuery::eq("~odd", "1");
        assert_eq!(tq.to_query(), Query::eq("~~odd", "1"));
        assert_eq!(query_to_tagquery(&tq.to_query()), tq);
    }

    #[test]
    fn test_tagged_round_trip() {
        let tq = TagQuery::and([
            TagQuery::not(TagQuery::eq("a", "1")),
            TagQuery::in_list("b", ["x", "y"]),
            TagQuery::exist(["c"]),
            TagQuery::Or(vec![]),
        ]);
        let tagged = tq.to_tagged();
        assert_eq!(tagged["variant"], "And");
        assert_eq!(TagQuery::from_tagged(&tagged).unwrap(), tq);
    }

    #[test]
    fn test_tagged_unknown_variant() {
        let err = TagQuery::from_tagged(&json!({"variant": "Xor", "data": []})).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownVariant);
        assert!(err.message.contains("Xor"));
    }

    #[test]
    fn test_tagged_depth_limit() {
        let mut tq = TagQuery::eq("a", "1");
        for _ in 0..MAX_DEPTH {
            tq = TagQuery::not(tq);
        }
        assert_eq!(TagQuery::from_tagged(&tq.to_tagged()).unwrap(), tq);

        let mut tagged = tq.to_tagged();
        tagged = json!({"variant": "And", "data": [tagged]});
        let err = TagQuery::from_tagged(&tagged).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
        assert!(err.message.contains("depth"));
    }

    #[test]
    fn test_tagged_malformed() {
        let err = TagQuery::from_tagged(&json!({"data": []})).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFilter);
        let err = TagQuery::from_tagged(&json!({"variant": "Eq", "data": {"name": "a"}}))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOperand);
    }
}
