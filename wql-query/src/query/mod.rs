//! Source query AST for the WQL filter grammar.
//!
//! A [`Query`] is the front-end representation of a filter: leaf keys are
//! the raw strings found in the JSON input, including any legacy `~`
//! plaintext marker. Queries are immutable values; build them with the
//! constructor functions or parse them from JSON:
//!
//! ```rust
//! use wql_query::Query;
//!
//! let parsed = Query::parse_str(r#"{"name": "alice", "age": {"$gt": "30"}}"#).unwrap();
//! let built = Query::and([Query::eq("name", "alice"), Query::gt("age", "30")]);
//! assert_eq!(parsed, built);
//! ```

mod parser;
mod serialize;

pub use parser::MAX_DEPTH;

use std::fmt;

use crate::operator::{CompareOp, ConjunctionOp};

/// A node of the source query tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    /// All children must hold.
    And(Vec<Query>),
    /// At least one child must hold.
    Or(Vec<Query>),
    /// The child must not hold.
    Not(Box<Query>),
    /// Tag equals value.
    Eq {
        /// Tag key.
        key: String,
        /// Compared value.
        value: String,
    },
    /// Tag differs from value.
    Neq {
        /// Tag key.
        key: String,
        /// Compared value.
        value: String,
    },
    /// Tag greater than value.
    Gt {
        /// Tag key.
        key: String,
        /// Compared value.
        value: String,
    },
    /// Tag greater than or equal to value.
    Gte {
        /// Tag key.
        key: String,
        /// Compared value.
        value: String,
    },
    /// Tag less than value.
    Lt {
        /// Tag key.
        key: String,
        /// Compared value.
        value: String,
    },
    /// Tag less than or equal to value.
    Lte {
        /// Tag key.
        key: String,
        /// Compared value.
        value: String,
    },
    /// Tag matches a `LIKE` pattern.
    Like {
        /// Tag key.
        key: String,
        /// Pattern.
        value: String,
    },
    /// Tag equals one of the values. The list may be empty.
    In {
        /// Tag key.
        key: String,
        /// Candidate values.
        values: Vec<String>,
    },
    /// Every listed tag is present.
    Exist {
        /// Tag keys.
        keys: Vec<String>,
    },
}

impl Query {
    /// Create an AND node.
    pub fn and(children: impl IntoIterator<Item = Query>) -> Self {
        Self::And(children.into_iter().collect())
    }

    /// Create an OR node.
    pub fn or(children: impl IntoIterator<Item = Query>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    /// Create a NOT node.
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Query) -> Self {
        Self::Not(Box::new(child))
    }

    /// Create a conjunction node for `op`.
    pub fn conjunction(op: ConjunctionOp, children: Vec<Query>) -> Self {
        match op {
            ConjunctionOp::And => Self::And(children),
            ConjunctionOp::Or => Self::Or(children),
        }
    }

    /// Create a comparison node for `op`.
    pub fn compare(op: CompareOp, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match op {
            CompareOp::Eq => Self::Eq { key, value },
            CompareOp::Neq => Self::Neq { key, value },
            CompareOp::Gt => Self::Gt { key, value },
            CompareOp::Gte => Self::Gte { key, value },
            CompareOp::Lt => Self::Lt { key, value },
            CompareOp::Lte => Self::Lte { key, value },
            CompareOp::Like => Self::Like { key, value },
        }
    }

    /// Create an equality node.
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(CompareOp::Eq, key, value)
    }

    /// Create an inequality node.
    pub fn neq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(CompareOp::Neq, key, value)
    }

    /// Create a greater-than node.
    pub fn gt(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(CompareOp::Gt, key, value)
    }

    /// Create a greater-than-or-equal node.
    pub fn gte(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(CompareOp::Gte, key, value)
    }

    /// Create a less-than node.
    pub fn lt(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(CompareOp::Lt, key, value)
    }

    /// Create a less-than-or-equal node.
    pub fn lte(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(CompareOp::Lte, key, value)
    }

    /// Create a `LIKE` node.
    pub fn like(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(CompareOp::Like, key, pattern)
    }

    /// Create a membership node.
    pub fn in_list<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an existence node.
    pub fn exist<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exist {
            keys: keys.into_iter().map(Into::into).collect(),
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

    /// View a comparison node as `(operator, key, value)`.
    pub fn as_comparison(&self) -> Option<(CompareOp, &str, &str)> {
        let (op, key, value) = match self {
            Self::Eq { key, value } => (CompareOp::Eq, key, value),
            Self::Neq { key, value } => (CompareOp::Neq, key, value),
            Self::Gt { key, value } => (CompareOp::Gt, key, value),
            Self::Gte { key, value } => (CompareOp::Gte, key, value),
            Self::Lt { key, value } => (CompareOp::Lt, key, value),
            Self::Lte { key, value } => (CompareOp::Lte, key, value),
            Self::Like { key, value } => (CompareOp::Like, key, value),
            Self::And(_) | Self::Or(_) | Self::Not(_) | Self::In { .. } | Self::Exist { .. } => {
                return None;
            }
        };
        Some((op, key.as_str(), value.as_str()))
    }

    /// Check if this node is an AND or OR.
    pub fn is_conjunction(&self) -> bool {
        matches!(self, Self::And(_) | Self::Or(_))
    }

    /// Simplify the tree without changing which items it matches.
    ///
    /// Returns `None` when the query places no constraint at all (an empty
    /// conjunction), in which case a parent should omit it.
    ///
    /// - empty AND/OR collapse to `None`
    /// - AND/OR with a single surviving child collapse to that child
    /// - `Not(Not(x))` collapses to `x`
    /// - `In` with a single value becomes `Eq`
    pub fn optimise(self) -> Option<Query> {
        match self {
            Self::And(children) => Self::optimise_conjunction(ConjunctionOp::And, children),
            Self::Or(children) => Self::optimise_conjunction(ConjunctionOp::Or, children),
            Self::Not(child) => match child.optimise() {
                Some(Self::Not(inner)) => Some(*inner),
                Some(inner) => Some(Self::Not(Box::new(inner))),
                // NOT of "no constraint" matches nothing; keep it explicit
                None => Some(Self::Not(Box::new(Self::And(Vec::new())))),
            },
            Self::In { key, mut values } if values.len() == 1 => {
                let value = values.pop().unwrap_or_default();
                Some(Self::Eq { key, value })
            }
            other => Some(other),
        }
    }

    fn optimise_conjunction(op: ConjunctionOp, children: Vec<Query>) -> Option<Query> {
        let mut children: Vec<Query> = children.into_iter().filter_map(Query::optimise).collect();
        match children.len() {
            0 => None,
            1 => children.pop(),
            _ => Some(Self::conjunction(op, children)),
        }
    }

    /// All tag keys referenced by the tree, in textual order.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_keys(keys);
                }
            }
            Self::Not(child) => child.collect_keys(keys),
            Self::In { key, .. } => keys.push(key),
            Self::Exist { keys: names } => keys.extend(names.iter().map(String::as_str)),
            other => {
                if let Some((_, key, _)) = other.as_comparison() {
                    keys.push(key);
                }
            }
        }
    }

    /// Nesting depth; leaves have depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(Query::depth).max().unwrap_or(0)
            }
            Self::Not(child) => 1 + child.depth(),
            _ => 1,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
