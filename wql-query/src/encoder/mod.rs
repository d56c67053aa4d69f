//! Tag query → SQL encoding.
//!
//! A [`TagEncoder`] walks a [`TagQuery`] and produces a predicate for a
//! `WHERE` clause together with its bind parameters in placeholder order.
//! One encoder core serves every dialect; a [`Dialect`] only spells
//! placeholders and constant predicates.
//!
//! In non-normalized mode every predicate is a subquery against the shared
//! tag table, keyed by the item alias:
//!
//! ```rust
//! use wql_query::{TagEncoder, TagQuery};
//!
//! let encoder = TagEncoder::postgres();
//! let (sql, params) = encoder.encode_query(&TagQuery::eq("field", "value")).unwrap();
//! assert_eq!(
//!     sql,
//!     "i.id IN (SELECT item_id FROM items_tags WHERE name = %s AND value = %s)"
//! );
//! assert_eq!(params, vec!["field", "value"]);
//! ```
//!
//! In normalized mode each tag is a column:
//!
//! ```rust
//! use wql_query::{TagEncoder, TagQuery};
//!
//! let encoder = TagEncoder::sqlite().normalized(Some("t"));
//! let (sql, params) = encoder
//!     .encode_query(&TagQuery::in_list("color", ["red", "blue"]))
//!     .unwrap();
//! assert_eq!(sql, "t.color IN (?, ?)");
//! assert_eq!(params, vec!["red", "blue"]);
//! ```
//!
//! Encoders hold no per-call state: parameters are collected in an
//! [`Arguments`] value owned by each top-level call, so one encoder can be
//! shared between threads.

mod dialect;

pub use dialect::{DatabaseType, Dialect, Postgres, Sqlite};

use tracing::{debug, trace, warn};

use crate::config::{DEFAULT_ITEM_ALIAS, DEFAULT_TAGS_TABLE, EncoderConfig, StorageMode};
use crate::error::{WqlError, WqlResult};
use crate::operator::{CompareOp, ConjunctionOp};
use crate::query::Query;
use crate::sql::{Arguments, quote_identifier};
use crate::tag_query::{TagName, TagQuery, query_to_tagquery};

/// Hooks applied to tag names and values before they become parameters.
///
/// Both default to the identity.
pub trait TagCodec: std::fmt::Debug + Send + Sync {
    /// Encode a tag name.
    fn encode_name(&self, name: &TagName) -> WqlResult<String> {
        Ok(name.as_str().to_string())
    }

    /// Encode a tag value.
    fn encode_value(&self, value: &str) -> WqlResult<String> {
        Ok(value.to_string())
    }
}

/// Identity codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlainCodec;

impl TagCodec for PlainCodec {}

/// Compiles tag queries into SQL predicates for one dialect and layout.
#[derive(Debug, Clone)]
pub struct TagEncoder<D: Dialect = DatabaseType, C: TagCodec = PlainCodec> {
    dialect: D,
    codec: C,
    mode: StorageMode,
    table_alias: Option<String>,
    tags_table: String,
    item_alias: String,
}

impl TagEncoder<Postgres> {
    /// Non-normalized PostgreSQL encoder over `items_tags`.
    pub fn postgres() -> Self {
        Self::new(Postgres)
    }
}

impl TagEncoder<Sqlite> {
    /// Non-normalized SQLite encoder over `items_tags`.
    pub fn sqlite() -> Self {
        Self::new(Sqlite)
    }
}

impl TagEncoder<DatabaseType> {
    /// Build an encoder from validated configuration.
    pub fn from_config(config: &EncoderConfig) -> WqlResult<Self> {
        config.validate()?;
        Ok(Self {
            dialect: config.dialect,
            codec: PlainCodec,
            mode: config.mode,
            table_alias: config.table_alias.clone(),
            tags_table: config.tags_table.clone(),
            item_alias: config.item_alias.clone(),
        })
    }
}

impl<D: Dialect> TagEncoder<D> {
    /// Create a non-normalized encoder for `dialect` with default table names.
    pub fn new(dialect: D) -> Self {
        Self {
            dialect,
            codec: PlainCodec,
            mode: StorageMode::NonNormalized,
            table_alias: None,
            tags_table: DEFAULT_TAGS_TABLE.to_string(),
            item_alias: DEFAULT_ITEM_ALIAS.to_string(),
        }
    }
}

impl<D: Dialect, C: TagCodec> TagEncoder<D, C> {
    /// Switch to normalized mode, qualifying columns with `table_alias`.
    pub fn normalized(mut self, table_alias: Option<&str>) -> Self {
        self.mode = StorageMode::Normalized;
        self.table_alias = table_alias.map(str::to_string);
        self
    }

    /// Set the shared tag table used in non-normalized mode.
    ///
    /// The name is spliced into SQL verbatim; prefer
    /// [`TagEncoder::from_config`] for names that are not compile-time
    /// constants.
    pub fn with_tags_table(mut self, table: impl Into<String>) -> Self {
        self.tags_table = table.into();
        self
    }

    /// Replace the name/value codec.
    pub fn with_codec<C2: TagCodec>(self, codec: C2) -> TagEncoder<D, C2> {
        TagEncoder {
            dialect: self.dialect,
            codec,
            mode: self.mode,
            table_alias: self.table_alias,
            tags_table: self.tags_table,
            item_alias: self.item_alias,
        }
    }

    /// The dialect.
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// The storage layout.
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Encode a query; returns the predicate and its parameters.
    pub fn encode_query(&self, query: &TagQuery) -> WqlResult<(String, Vec<String>)> {
        self.encode_query_with(query, false)
    }

    /// Encode a query, optionally negated as a whole.
    pub fn encode_query_with(
        &self,
        query: &TagQuery,
        negate: bool,
    ) -> WqlResult<(String, Vec<String>)> {
        let mut args = Arguments::new();
        let sql = match self.encode(query, negate, &mut args)? {
            Some(sql) => sql,
            None => self.constant(!negate).to_string(),
        };
        debug!(
            dialect = self.dialect.name(),
            mode = ?self.mode,
            params = args.len(),
            "Encoded tag query"
        );
        Ok((sql, args.into_vec()))
    }

    /// Encode one node, appending its parameters to `args`.
    ///
    /// Returns `None` for a node that constrains nothing (an existence
    /// check over zero names); conjunctions skip such children.
    pub fn encode(
        &self,
        query: &TagQuery,
        negate: bool,
        args: &mut Arguments,
    ) -> WqlResult<Option<String>> {
        trace!(variant = query.variant_name(), negate, "Encoding node");
        match query {
            TagQuery::And(children) => self
                .encode_conj(ConjunctionOp::And, children, negate, args)
                .map(Some),
            TagQuery::Or(children) => self
                .encode_conj(ConjunctionOp::Or, children, negate, args)
                .map(Some),
            TagQuery::Not(child) => self.encode_not(child, negate, args),
            TagQuery::Eq { name, value } => self.encode_op(CompareOp::Eq, name, value, negate, args),
            TagQuery::Neq { name, value } => self.encode_op(CompareOp::Neq, name, value, negate, args),
            TagQuery::Gt { name, value } => self.encode_op(CompareOp::Gt, name, value, negate, args),
            TagQuery::Gte { name, value } => self.encode_op(CompareOp::Gte, name, value, negate, args),
            TagQuery::Lt { name, value } => self.encode_op(CompareOp::Lt, name, value, negate, args),
            TagQuery::Lte { name, value } => self.encode_op(CompareOp::Lte, name, value, negate, args),
            TagQuery::Like { name, value } => {
                self.encode_op(CompareOp::Like, name, value, negate, args)
            }
            TagQuery::In { name, values } => self.encode_in(name, values, negate, args).map(Some),
            TagQuery::Exist { names } => self.encode_exist(names, negate, args),
        }
    }

    fn encode_not(
        &self,
        child: &TagQuery,
        negate: bool,
        args: &mut Arguments,
    ) -> WqlResult<Option<String>> {
        // A child that constrains nothing is true, so its negation is a
        // constant rather than a skippable `None`.
        let vacuous = || Some(self.constant(negate).to_string());

        if negate {
            return Ok(self.encode(child, false, args)?.or_else(vacuous));
        }

        let push_down = match child {
            TagQuery::Exist { .. } | TagQuery::In { .. } | TagQuery::Not(_) => true,
            TagQuery::And(_) | TagQuery::Or(_) => false,
            comparison => comparison.as_comparison().is_some() && !self.mode.is_normalized(),
        };
        if push_down {
            return Ok(self.encode(child, true, args)?.or_else(vacuous));
        }

        let reuse_parens = matches!(child, TagQuery::And(c) | TagQuery::Or(c) if !c.is_empty());
        Ok(match self.encode(child, false, args)? {
            Some(inner) if reuse_parens => Some(format!("NOT {}", inner)),
            Some(inner) => Some(format!("NOT ({})", inner)),
            None => vacuous(),
        })
    }

    /// Encode a comparison through the name/value hooks.
    pub fn encode_op(
        &self,
        op: CompareOp,
        name: &TagName,
        value: &str,
        negate: bool,
        args: &mut Arguments,
    ) -> WqlResult<Option<String>> {
        let enc_name = self.codec.encode_name(name)?;
        let enc_value = self.codec.encode_value(value)?;
        Ok(Some(self.encode_op_clause(op, &enc_name, &enc_value, negate, args)))
    }

    /// Render a comparison on already-encoded operands.
    ///
    /// Normalized mode negates the operator itself; non-normalized mode
    /// negates membership of the item id.
    pub fn encode_op_clause(
        &self,
        op: CompareOp,
        enc_name: &str,
        enc_value: &str,
        negate: bool,
        args: &mut Arguments,
    ) -> String {
        let ph = self.dialect.placeholder();
        if self.mode.is_normalized() {
            let sql_op = if negate { op.as_negated_sql() } else { op.as_sql() };
            args.push(enc_value);
            format!("{} {} {}", self.column(enc_name), sql_op, ph)
        } else {
            args.push(enc_name).push(enc_value);
            format!(
                "{}.id {} (SELECT item_id FROM {} WHERE name = {} AND value {} {})",
                self.item_alias,
                membership(negate),
                self.tags_table,
                ph,
                op.as_sql(),
                ph
            )
        }
    }

    /// Encode a membership test through the name/value hooks.
    pub fn encode_in(
        &self,
        name: &TagName,
        values: &[String],
        negate: bool,
        args: &mut Arguments,
    ) -> WqlResult<String> {
        let enc_name = self.codec.encode_name(name)?;
        let enc_values = values
            .iter()
            .map(|value| self.codec.encode_value(value))
            .collect::<WqlResult<Vec<_>>>()?;
        Ok(self.encode_in_clause(&enc_name, &enc_values, negate, args))
    }

    /// Render a membership test on already-encoded operands.
    ///
    /// An empty value list is rendered as a constant predicate instead of
    /// `IN ()`, which not every backend accepts.
    pub fn encode_in_clause(
        &self,
        enc_name: &str,
        enc_values: &[String],
        negate: bool,
        args: &mut Arguments,
    ) -> String {
        if enc_values.is_empty() {
            warn!(tag = enc_name, negate, "Encoding $in with an empty value list");
        }
        let value_list = |args: &mut Arguments, subject: &str| {
            if enc_values.is_empty() {
                self.constant(negate).to_string()
            } else {
                args.extend(enc_values.iter().cloned());
                format!(
                    "{} {} ({})",
                    subject,
                    membership(negate),
                    self.dialect.placeholders(enc_values.len())
                )
            }
        };

        if self.mode.is_normalized() {
            value_list(args, &self.column(enc_name))
        } else {
            args.push(enc_name);
            let name_ph = self.dialect.placeholder();
            let values = value_list(args, "value");
            format!(
                "{}.id IN (SELECT item_id FROM {} WHERE name = {} AND {})",
                self.item_alias, self.tags_table, name_ph, values
            )
        }
    }

    /// Encode an existence check over every name.
    ///
    /// Several names become a conjunction of single-name checks (a
    /// disjunction of negated checks when `negate` is set). Zero names
    /// yield `None`.
    pub fn encode_exist(
        &self,
        names: &[TagName],
        negate: bool,
        args: &mut Arguments,
    ) -> WqlResult<Option<String>> {
        let mut clauses = Vec::with_capacity(names.len());
        for name in names {
            let enc_name = self.codec.encode_name(name)?;
            clauses.push(self.encode_exist_clause(&enc_name, negate, args));
        }
        Ok(match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => {
                let op = if negate {
                    ConjunctionOp::Or
                } else {
                    ConjunctionOp::And
                };
                Some(self.encode_conj_clause(op, clauses))
            }
        })
    }

    /// Render an existence check on one already-encoded name.
    pub fn encode_exist_clause(&self, enc_name: &str, negate: bool, args: &mut Arguments) -> String {
        if self.mode.is_normalized() {
            let null_check = if negate { "IS NULL" } else { "IS NOT NULL" };
            format!("{} {}", self.column(enc_name), null_check)
        } else {
            args.push(enc_name);
            format!(
                "{}.id {} (SELECT item_id FROM {} WHERE name = {})",
                self.item_alias,
                membership(negate),
                self.tags_table,
                self.dialect.placeholder()
            )
        }
    }

    /// Encode a conjunction; `negate` applies De Morgan and is passed to
    /// every child.
    pub fn encode_conj(
        &self,
        op: ConjunctionOp,
        children: &[TagQuery],
        negate: bool,
        args: &mut Arguments,
    ) -> WqlResult<String> {
        let op = if negate { op.negate() } else { op };
        let mut clauses = Vec::with_capacity(children.len());
        for child in children {
            if let Some(clause) = self.encode(child, negate, args)? {
                clauses.push(clause);
            }
        }
        Ok(self.encode_conj_clause(op, clauses))
    }

    /// Join encoded children; no children yields the dialect's constant.
    pub fn encode_conj_clause(&self, op: ConjunctionOp, clauses: Vec<String>) -> String {
        if clauses.is_empty() {
            return self.dialect.empty_conjunction(op).to_string();
        }
        format!("({})", clauses.join(op.joiner()))
    }

    fn column(&self, enc_name: &str) -> String {
        let quoted = quote_identifier(enc_name);
        let column = self.dialect.escape_identifier_text(&quoted);
        match self.table_alias.as_deref() {
            Some(alias) => format!("{}.{}", alias, column),
            None => column.into_owned(),
        }
    }

    fn constant(&self, value: bool) -> &'static str {
        if value {
            self.dialect.true_literal()
        } else {
            self.dialect.false_literal()
        }
    }
}

fn membership(negate: bool) -> &'static str {
    if negate { "NOT IN" } else { "IN" }
}

/// Parse, optimise, convert and encode a JSON filter in one step.
///
/// A filter that optimises away entirely encodes as the dialect's true
/// literal.
pub fn compile<D: Dialect, C: TagCodec>(
    filter: &serde_json::Value,
    encoder: &TagEncoder<D, C>,
) -> WqlResult<(String, Vec<String>)> {
    let query = Query::parse(filter)?
        .optimise()
        .unwrap_or_else(|| Query::And(Vec::new()));
    encoder.encode_query(&query_to_tagquery(&query))
}

/// [`compile`] on filter text.
pub fn compile_str<D: Dialect, C: TagCodec>(
    filter: &str,
    encoder: &TagEncoder<D, C>,
) -> WqlResult<(String, Vec<String>)> {
    let value: serde_json::Value = serde_json::from_str(filter).map_err(WqlError::invalid_json)?;
    compile(&value, encoder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::sql::count_placeholders;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const EQ_FIELD: &str = "i.id IN (SELECT item_id FROM items_tags WHERE name = %s AND value = %s)";

    fn sub(membership: &str, op: &str) -> String {
        format!(
            "i.id {} (SELECT item_id FROM items_tags WHERE name = %s AND value {} %s)",
            membership, op
        )
    }

    #[test]
    fn test_eq_non_normalized() {
        let (sql, params) = TagEncoder::postgres()
            .encode_query(&TagQuery::eq("field", "value"))
            .unwrap();
        assert_eq!(sql, EQ_FIELD);
        assert_eq!(params, vec!["field", "value"]);
    }

    #[test]
    fn test_not_eq_flips_membership() {
        let (sql, params) = TagEncoder::postgres()
            .encode_query(&TagQuery::not(TagQuery::eq("field", "value")))
            .unwrap();
        assert_eq!(sql, sub("NOT IN", "="));
        assert_eq!(params, vec!["field", "value"]);
    }

    #[test]
    fn test_and_of_comparisons() {
        let q = TagQuery::and([
            TagQuery::eq("f1", "v1"),
            TagQuery::compare(CompareOp::Gt, TagName::new("f2"), "10"),
        ]);
        let (sql, params) = TagEncoder::postgres().encode_query(&q).unwrap();
        assert_eq!(sql, format!("({} AND {})", sub("IN", "="), sub("IN", ">")));
        assert_eq!(params, vec!["f1", "v1", "f2", "10"]);
    }

    #[test]
    fn test_sqlite_placeholders() {
        let (sql, _) = TagEncoder::sqlite()
            .encode_query(&TagQuery::eq("field", "value"))
            .unwrap();
        assert_eq!(
            sql,
            "i.id IN (SELECT item_id FROM items_tags WHERE name = ? AND value = ?)"
        );
    }

    #[test]
    fn test_in_non_normalized() {
        let encoder = TagEncoder::postgres();
        let q = TagQuery::in_list("field", ["a", "b"]);
        let (sql, params) = encoder.encode_query(&q).unwrap();
        assert_eq!(
            sql,
            "i.id IN (SELECT item_id FROM items_tags WHERE name = %s AND value IN (%s, %s))"
        );
        assert_eq!(params, vec!["field", "a", "b"]);

        let (sql, _) = encoder.encode_query(&TagQuery::not(q)).unwrap();
        assert_eq!(
            sql,
            "i.id IN (SELECT item_id FROM items_tags WHERE name = %s AND value NOT IN (%s, %s))"
        );
    }

    #[test]
    fn test_empty_in_uses_literals() {
        let encoder = TagEncoder::sqlite();
        let q = TagQuery::in_list("field", Vec::<String>::new());
        let (sql, params) = encoder.encode_query(&q).unwrap();
        assert_eq!(
            sql,
            "i.id IN (SELECT item_id FROM items_tags WHERE name = ? AND 1=0)"
        );
        assert_eq!(params, vec!["field"]);

        let (sql, _) = encoder.encode_query(&TagQuery::not(q.clone())).unwrap();
        assert_eq!(
            sql,
            "i.id IN (SELECT item_id FROM items_tags WHERE name = ? AND 1=1)"
        );

        let normalized = TagEncoder::sqlite().normalized(None);
        assert_eq!(normalized.encode_query(&q).unwrap().0, "1=0");
        assert_eq!(normalized.encode_query_with(&q, true).unwrap().0, "1=1");
    }

    #[test]
    fn test_empty_conjunction_literals() {
        let pg = TagEncoder::postgres();
        assert_eq!(pg.encode_query(&TagQuery::And(vec![])).unwrap(), ("TRUE".into(), vec![]));
        assert_eq!(pg.encode_query(&TagQuery::Or(vec![])).unwrap(), ("FALSE".into(), vec![]));

        let lite = TagEncoder::sqlite();
        assert_eq!(lite.encode_query(&TagQuery::And(vec![])).unwrap().0, "1=1");
        assert_eq!(lite.encode_query(&TagQuery::Or(vec![])).unwrap().0, "1=0");
        // De Morgan: a negated empty AND is an empty OR.
        assert_eq!(lite.encode_query_with(&TagQuery::And(vec![]), true).unwrap().0, "1=0");
    }

    #[test]
    fn test_exist_equals_conjunction() {
        let encoder = TagEncoder::postgres();
        let multi = encoder.encode_query(&TagQuery::exist(["a", "b"])).unwrap();
        let conj = encoder
            .encode_query(&TagQuery::and([TagQuery::exist(["a"]), TagQuery::exist(["b"])]))
            .unwrap();
        assert_eq!(multi, conj);
        assert_eq!(
            multi.0,
            "(i.id IN (SELECT item_id FROM items_tags WHERE name = %s) AND \
             i.id IN (SELECT item_id FROM items_tags WHERE name = %s))"
        );
        assert_eq!(multi.1, vec!["a", "b"]);
    }

    #[test]
    fn test_negated_exist() {
        let encoder = TagEncoder::postgres();
        let (sql, _) = encoder
            .encode_query(&TagQuery::not(TagQuery::exist(["a", "b"])))
            .unwrap();
        assert_eq!(
            sql,
            "(i.id NOT IN (SELECT item_id FROM items_tags WHERE name = %s) OR \
             i.id NOT IN (SELECT item_id FROM items_tags WHERE name = %s))"
        );
    }

    #[test]
    fn test_empty_exist_is_skipped() {
        let encoder = TagEncoder::postgres();
        let q = TagQuery::and([TagQuery::exist(Vec::<String>::new()), TagQuery::eq("field", "value")]);
        let (sql, params) = encoder.encode_query(&q).unwrap();
        assert_eq!(sql, format!("({})", EQ_FIELD));
        assert_eq!(params, vec!["field", "value"]);

        let (sql, params) = encoder.encode_query(&TagQuery::exist(Vec::<String>::new())).unwrap();
        assert_eq!(sql, "TRUE");
        assert!(params.is_empty());
    }

    #[test]
    fn test_negated_empty_exist_is_false() {
        let encoder = TagEncoder::postgres();
        let empty = TagQuery::exist(Vec::<String>::new());
        let not_empty = TagQuery::not(empty.clone());

        assert_eq!(encoder.encode_query(&not_empty).unwrap(), ("FALSE".into(), vec![]));
        assert_eq!(
            encoder.encode_query(&not_empty).unwrap(),
            encoder.encode_query_with(&empty, true).unwrap()
        );
        assert_eq!(encoder.encode_query_with(&not_empty, true).unwrap().0, "TRUE");
        assert_eq!(
            encoder.encode_query(&TagQuery::not(not_empty.clone())).unwrap().0,
            "TRUE"
        );

        // Only a bare empty existence check is skipped inside a conjunction.
        let (sql, params) = encoder
            .encode_query(&TagQuery::and([not_empty, TagQuery::eq("field", "value")]))
            .unwrap();
        assert_eq!(sql, format!("(FALSE AND {})", EQ_FIELD));
        assert_eq!(params, vec!["field", "value"]);

        let normalized = TagEncoder::sqlite().normalized(None);
        assert_eq!(
            normalized.encode_query(&TagQuery::not(TagQuery::exist(Vec::<String>::new()))).unwrap().0,
            "1=0"
        );
    }

    #[test]
    fn test_not_and_reuses_parens() {
        let q = TagQuery::not(TagQuery::and([
            TagQuery::eq("a", "1"),
            TagQuery::eq("b", "2"),
        ]));
        let (sql, params) = TagEncoder::sqlite().normalized(Some("t")).encode_query(&q).unwrap();
        assert_eq!(sql, "NOT (t.a = ? AND t.b = ?)");
        assert_eq!(params, vec!["1", "2"]);
    }

    #[test]
    fn test_normalized_comparisons_are_wrapped() {
        let encoder = TagEncoder::postgres().normalized(Some("t"));
        let (sql, _) = encoder
            .encode_query(&TagQuery::not(TagQuery::eq("a", "1")))
            .unwrap();
        assert_eq!(sql, "NOT (t.a = %s)");

        let (sql, _) = encoder
            .encode_query(&TagQuery::not(TagQuery::exist(["a"])))
            .unwrap();
        assert_eq!(sql, "t.a IS NULL");

        let (sql, params) = encoder
            .encode_query(&TagQuery::not(TagQuery::in_list("a", ["x", "y"])))
            .unwrap();
        assert_eq!(sql, "t.a NOT IN (%s, %s)");
        assert_eq!(params, vec!["x", "y"]);
    }

    #[test]
    fn test_normalized_de_morgan_negates_operators() {
        let q = TagQuery::and([
            TagQuery::compare(CompareOp::Gt, TagName::new("age"), "30"),
            TagQuery::compare(CompareOp::Like, TagName::new("name"), "a%"),
        ]);
        let (sql, params) = TagEncoder::sqlite()
            .normalized(None)
            .encode_query_with(&q, true)
            .unwrap();
        assert_eq!(sql, "(age <= ? OR name NOT LIKE ?)");
        assert_eq!(params, vec!["30", "a%"]);
    }

    #[test]
    fn test_normalized_quotes_columns() {
        let (sql, _) = TagEncoder::sqlite()
            .normalized(None)
            .encode_query(&TagQuery::eq("order", "1"))
            .unwrap();
        assert_eq!(sql, "\"order\" = ?");
    }

    #[test]
    fn test_normalized_names_cannot_add_placeholders() {
        let pg = TagEncoder::postgres().normalized(Some("t"));
        let (sql, params) = pg.encode_query(&TagQuery::eq("a%s", "x")).unwrap();
        assert_eq!(sql, "t.\"a%%s\" = %s");
        assert_eq!(count_placeholders(&sql, "%s"), params.len());

        let q = TagQuery::and([
            TagQuery::exist(["100%"]),
            TagQuery::in_list("%s%s", ["a", "b"]),
        ]);
        let (sql, params) = pg.encode_query(&q).unwrap();
        assert_eq!(sql, "(t.\"100%%\" IS NOT NULL AND t.\"%%s%%s\" IN (%s, %s))");
        assert_eq!(count_placeholders(&sql, "%s"), params.len());

        let (sql, params) = TagEncoder::sqlite()
            .normalized(None)
            .encode_query(&TagQuery::eq("a?\"b", "x"))
            .unwrap();
        assert_eq!(sql, "\"a?\"\"b\" = ?");
        assert_eq!(count_placeholders(&sql, "?"), params.len());
    }

    #[test]
    fn test_double_negation_matches_child() {
        let encoder = TagEncoder::postgres();
        let x = TagQuery::or([TagQuery::eq("a", "1"), TagQuery::in_list("b", ["2", "3"])]);
        assert_eq!(
            encoder.encode_query(&TagQuery::not(TagQuery::not(x.clone()))).unwrap(),
            encoder.encode_query(&x).unwrap()
        );
    }

    #[test]
    fn test_placeholder_count_matches_params() {
        let q = TagQuery::not(TagQuery::and([
            TagQuery::or([TagQuery::eq("a", "1"), TagQuery::exist(["b", "c"])]),
            TagQuery::not(TagQuery::in_list("d", ["1", "2", "3"])),
            TagQuery::compare(CompareOp::Lte, TagName::new("e"), "9"),
        ]));
        for encoder in [TagEncoder::sqlite(), TagEncoder::sqlite().normalized(Some("t"))] {
            let (sql, params) = encoder.encode_query(&q).unwrap();
            assert_eq!(count_placeholders(&sql, "?"), params.len());
        }
    }

    #[derive(Debug)]
    struct UpperCodec;

    impl TagCodec for UpperCodec {
        fn encode_value(&self, value: &str) -> WqlResult<String> {
            Ok(value.to_uppercase())
        }
    }

    #[derive(Debug)]
    struct RejectingCodec;

    impl TagCodec for RejectingCodec {
        fn encode_name(&self, name: &TagName) -> WqlResult<String> {
            Err(WqlError::internal(format!("cannot encode {}", name)))
        }
    }

    #[test]
    fn test_codec_hooks() {
        let encoder = TagEncoder::postgres().with_codec(UpperCodec);
        let (_, params) = encoder
            .encode_query(&TagQuery::in_list("field", ["a", "b"]))
            .unwrap();
        assert_eq!(params, vec!["field", "A", "B"]);

        let err = TagEncoder::postgres()
            .with_codec(RejectingCodec)
            .encode_query(&TagQuery::exist(["a"]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
    }

    #[test]
    fn test_from_config() {
        let config = EncoderConfig::new(DatabaseType::Sqlite)
            .with_tags_table("credential_tags")
            .with_item_alias("c");
        let encoder = TagEncoder::from_config(&config).unwrap();
        let (sql, _) = encoder.encode_query(&TagQuery::exist(["a"])).unwrap();
        assert_eq!(sql, "c.id IN (SELECT item_id FROM credential_tags WHERE name = ?)");

        let bad = EncoderConfig::default().with_item_alias("i; --");
        assert_eq!(
            TagEncoder::from_config(&bad).unwrap_err().code,
            ErrorCode::InvalidConfiguration
        );
    }

    #[test]
    fn test_shared_between_threads() {
        let encoder = std::sync::Arc::new(TagEncoder::postgres());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let encoder = encoder.clone();
                std::thread::spawn(move || {
                    let value = n.to_string();
                    let q = TagQuery::and([TagQuery::eq("n", value.clone()), TagQuery::exist(["x"])]);
                    (value, encoder.encode_query(&q).unwrap().1)
                })
            })
            .collect();
        for handle in handles {
            let (value, params) = handle.join().unwrap();
            assert_eq!(params, vec!["n".to_string(), value, "x".to_string()]);
        }
    }

    #[test]
    fn test_compile_pipeline() {
        let (sql, params) = compile(&json!({"~field": {"$in": ["value"]}}), &TagEncoder::postgres()).unwrap();
        assert_eq!(sql, EQ_FIELD);
        assert_eq!(params, vec!["field", "value"]);

        let (sql, params) = compile_str("{}", &TagEncoder::sqlite()).unwrap();
        assert_eq!(sql, "1=1");
        assert!(params.is_empty());

        let err = compile_str("{\"a\": {\"$gt\": 1}}", &TagEncoder::sqlite()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOperand);
        assert_eq!(compile_str("{", &TagEncoder::sqlite()).unwrap_err().code, ErrorCode::InvalidJson);
    }
}
