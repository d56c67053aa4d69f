//! Serialization of [`Query`] back to the JSON grammar, and the legacy
//! direct SQL rendering used for simple normalized-table lookups.

use serde_json::{Map, Value, json};

use super::Query;
use crate::error::{WqlError, WqlResult};
use crate::operator::{CompareOp, ConjunctionOp};
use crate::sql::{Arguments, quote_identifier};

/// Placeholder emitted by [`Query::to_sql`].
pub const LEGACY_PLACEHOLDER: &str = "?";

const LEGACY_TRUE: &str = "1=1";
const LEGACY_FALSE: &str = "1=0";

impl Query {
    /// Serialize back to the JSON filter grammar.
    ///
    /// This is the inverse of [`Query::parse`] for trees whose conjunctions
    /// and existence lists are non-empty (empty ones are dropped on parse)
    /// and whose leaf keys are not `$and`, `$or`, `$not` or `$exist`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::And(children) => conjunction_json(ConjunctionOp::And, children),
            Self::Or(children) => conjunction_json(ConjunctionOp::Or, children),
            Self::Not(child) => json!({ "$not": child.to_json() }),
            Self::In { key, values } => single(key, json!({ "$in": values })),
            Self::Exist { keys } => json!({ "$exist": keys }),
            other => match other.as_comparison() {
                Some((CompareOp::Eq, key, value)) => single(key, Value::from(value)),
                Some((op, key, value)) => {
                    let operator = op.grammar_key().unwrap_or("$eq");
                    single(key, single(operator, Value::from(value)))
                }
                None => Value::Object(Map::new()),
            },
        }
    }

    /// Render directly as SQL against normalized columns.
    ///
    /// Every comparison becomes `<alias>.<column> <op> ?`. When
    /// `valid_columns` is given, any key outside it is rejected. This path
    /// is independent of the dialect encoders and always uses `?`.
    pub fn to_sql(
        &self,
        table_alias: Option<&str>,
        valid_columns: Option<&[&str]>,
    ) -> WqlResult<(String, Vec<String>)> {
        let mut args = Arguments::new();
        let sql = self.to_sql_with_args(table_alias, valid_columns, &mut args)?;
        Ok((sql, args.into_vec()))
    }

    fn to_sql_with_args(
        &self,
        alias: Option<&str>,
        valid_columns: Option<&[&str]>,
        args: &mut Arguments,
    ) -> WqlResult<String> {
        let column = |key: &str| -> WqlResult<String> {
            if let Some(valid) = valid_columns {
                if !valid.contains(&key) {
                    return Err(WqlError::invalid_column(key));
                }
            }
            let quoted = quote_identifier(key);
            Ok(match alias {
                Some(alias) => format!("{}.{}", alias, quoted),
                None => quoted,
            })
        };

        match self {
            Self::And(children) | Self::Or(children) => {
                let (op, empty) = match self {
                    Self::Or(_) => (ConjunctionOp::Or, LEGACY_FALSE),
                    _ => (ConjunctionOp::And, LEGACY_TRUE),
                };
                if children.is_empty() {
                    return Ok(empty.to_string());
                }
                let parts = children
                    .iter()
                    .map(|child| child.to_sql_with_args(alias, valid_columns, args))
                    .collect::<WqlResult<Vec<_>>>()?;
                Ok(format!("({})", parts.join(op.joiner())))
            }
            Self::Not(child) => {
                let inner = child.to_sql_with_args(alias, valid_columns, args)?;
                Ok(format!("NOT ({})", inner))
            }
            Self::In { key, values } => {
                let column = column(key)?;
                if values.is_empty() {
                    return Ok(LEGACY_FALSE.to_string());
                }
                args.extend(values.iter().cloned());
                let placeholders = vec![LEGACY_PLACEHOLDER; values.len()].join(", ");
                Ok(format!("{} IN ({})", column, placeholders))
            }
            Self::Exist { keys } => {
                let parts = keys
                    .iter()
                    .map(|key| Ok(format!("{} IS NOT NULL", column(key)?)))
                    .collect::<WqlResult<Vec<_>>>()?;
                Ok(match parts.len() {
                    0 => LEGACY_TRUE.to_string(),
                    1 => parts.concat(),
                    _ => format!("({})", parts.join(" AND ")),
                })
            }
            other => {
                let Some((op, key, value)) = other.as_comparison() else {
                    return Err(WqlError::unknown_variant(other.variant_name()));
                };
                let column = column(key)?;
                args.push(value);
                Ok(format!("{} {} {}", column, op.as_sql(), LEGACY_PLACEHOLDER))
            }
        }
    }
}

fn single(key: &str, value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn conjunction_json(op: ConjunctionOp, children: &[Query]) -> Value {
    let children: Vec<Value> = children.iter().map(Query::to_json).collect();
    single(op.grammar_key(), Value::Array(children))
}
