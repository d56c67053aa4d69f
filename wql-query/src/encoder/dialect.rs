//! SQL dialects supported by the tag encoder.
//!
//! The encoder core is shared; a dialect only decides how placeholders and
//! constant predicates are spelled.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operator::ConjunctionOp;

/// Textual details that differ between relational backends.
pub trait Dialect: fmt::Debug + Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &'static str;

    /// Bind parameter marker, emitted once per parameter.
    fn placeholder(&self) -> &'static str;

    /// A predicate that is always true.
    fn true_literal(&self) -> &'static str;

    /// A predicate that is always false.
    fn false_literal(&self) -> &'static str;

    /// Rendering of a conjunction with no children.
    fn empty_conjunction(&self, op: ConjunctionOp) -> &'static str {
        match op {
            ConjunctionOp::And => self.true_literal(),
            ConjunctionOp::Or => self.false_literal(),
        }
    }

    /// Escape text spliced into an identifier so the driver cannot read it
    /// as a parameter marker.
    fn escape_identifier_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }

    /// `count` comma-separated placeholders.
    fn placeholders(&self, count: usize) -> String {
        vec![self.placeholder(); count].join(", ")
    }
}

/// PostgreSQL, driven through a `%s`-style positional parameter API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self) -> &'static str {
        "%s"
    }

    fn true_literal(&self) -> &'static str {
        "TRUE"
    }

    fn false_literal(&self) -> &'static str {
        "FALSE"
    }

    // pyformat drivers scan the whole statement, quoted identifiers included.
    fn escape_identifier_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if text.contains('%') {
            Cow::Owned(text.replace('%', "%%"))
        } else {
            Cow::Borrowed(text)
        }
    }
}

/// SQLite, using `?` parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sqlite;

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn placeholder(&self) -> &'static str {
        "?"
    }

    fn true_literal(&self) -> &'static str {
        "1=1"
    }

    fn false_literal(&self) -> &'static str {
        "1=0"
    }
}

/// Dialect chosen at runtime, e.g. from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// PostgreSQL.
    #[default]
    #[serde(alias = "postgresql")]
    Postgres,
    /// SQLite.
    #[serde(alias = "sqlite3")]
    Sqlite,
}

impl DatabaseType {
    fn dialect(&self) -> &'static dyn Dialect {
        match self {
            Self::Postgres => &Postgres,
            Self::Sqlite => &Sqlite,
        }
    }
}

impl Dialect for DatabaseType {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn placeholder(&self) -> &'static str {
        self.dialect().placeholder()
    }

    fn true_literal(&self) -> &'static str {
        self.dialect().true_literal()
    }

    fn false_literal(&self) -> &'static str {
        self.dialect().false_literal()
    }

    fn escape_identifier_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.dialect().escape_identifier_text(text)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
