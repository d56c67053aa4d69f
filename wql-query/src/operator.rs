//! Comparison and conjunction operators shared by every compilation stage.

use std::fmt;

/// A binary comparison between a tag and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// SQL `LIKE` pattern match.
    Like,
}

impl CompareOp {
    /// All comparison operators, in grammar order.
    pub const ALL: [CompareOp; 7] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Like,
    ];

    /// SQL infix operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
        }
    }

    /// The operator whose result is the logical negation of this one.
    ///
    /// `Like` has no negated variant; see [`CompareOp::as_negated_sql`].
    pub fn negate(&self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Neq),
            Self::Neq => Some(Self::Eq),
            Self::Gt => Some(Self::Lte),
            Self::Gte => Some(Self::Lt),
            Self::Lt => Some(Self::Gte),
            Self::Lte => Some(Self::Gt),
            Self::Like => None,
        }
    }

    /// SQL infix operator for the negated comparison.
    pub fn as_negated_sql(&self) -> &'static str {
        match self.negate() {
            Some(negated) => negated.as_sql(),
            None => "NOT LIKE",
        }
    }

    /// The `$`-prefixed operator key used by the filter grammar.
    ///
    /// `Eq` has no operator key of its own; it is written as `{"key": "value"}`.
    pub fn grammar_key(&self) -> Option<&'static str> {
        match self {
            Self::Eq => None,
            Self::Neq => Some("$neq"),
            Self::Gt => Some("$gt"),
            Self::Gte => Some("$gte"),
            Self::Lt => Some("$lt"),
            Self::Lte => Some("$lte"),
            Self::Like => Some("$like"),
        }
    }

    /// Look up an operator by its grammar key.
    pub fn from_grammar_key(key: &str) -> Option<Self> {
        match key {
            "$neq" => Some(Self::Neq),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            "$like" => Some(Self::Like),
            _ => None,
        }
    }

    /// The node variant name carrying this operator.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Eq => "Eq",
            Self::Neq => "Neq",
            Self::Gt => "Gt",
            Self::Gte => "Gte",
            Self::Lt => "Lt",
            Self::Lte => "Lte",
            Self::Like => "Like",
        }
    }

    /// Look up an operator by its node variant name.
    pub fn from_variant_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.variant_name() == name)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A logical connective over a list of sub-queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConjunctionOp {
    /// All children must hold.
    And,
    /// At least one child must hold.
    Or,
}

impl ConjunctionOp {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    /// Separator placed between encoded children.
    pub fn joiner(&self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }

    /// De Morgan dual.
    pub fn negate(&self) -> Self {
        match self {
            Self::And => Self::Or,
            Self::Or => Self::And,
        }
    }

    /// The `$`-prefixed key used by the filter grammar.
    pub fn grammar_key(&self) -> &'static str {
        match self {
            Self::And => "$and",
            Self::Or => "$or",
        }
    }
}

impl fmt::Display for ConjunctionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}
