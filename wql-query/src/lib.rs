//! # wql-query
//!
//! Compiler for the Wallet Query Language (WQL): JSON filters over item
//! tags in, parameterized SQL predicates out.
//!
//! The pipeline has four stages, each with its own type:
//! - [`Query::parse`] turns the JSON grammar into a source [`Query`]
//! - [`Query::optimise`] simplifies it without changing its meaning
//! - [`query_to_tagquery`] strips the legacy `~` marker and produces a
//!   [`TagQuery`] whose leaves are [`TagName`]s
//! - [`TagEncoder::encode_query`] renders SQL text plus ordered parameters
//!   for one [`Dialect`] and [`StorageMode`]
//!
//! ```rust
//! use serde_json::json;
//! use wql_query::{TagEncoder, compile};
//!
//! let filter = json!({"$and": [{"f1": "v1"}, {"f2": {"$gt": "10"}}]});
//! let (sql, params) = compile(&filter, &TagEncoder::postgres()).unwrap();
//!
//! assert_eq!(
//!     sql,
//!     "(i.id IN (SELECT item_id FROM items_tags WHERE name = %s AND value = %s) \
//!      AND i.id IN (SELECT item_id FROM items_tags WHERE name = %s AND value > %s))"
//! );
//! assert_eq!(params, vec!["f1", "v1", "f2", "10"]);
//! ```
//!
//! ## Filter grammar
//!
//! ```text
//! {"field": "value"}                                equality
//! {"field": {"$neq"|"$gt"|"$gte"|"$lt"|"$lte"|"$like": "value"}}
//! {"field": {"$in": ["v1", "v2"]}}                  membership
//! {"$exist": "field"} | {"$exist": ["f1", "f2"]}    presence
//! {"$and": [...]} | {"$or": [...]} | {"$not": {...}}
//! [{...}, {...}]                                    OR of the objects
//! ```
//!
//! Several keys in one object are ANDed together.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod logging;
pub mod operator;
pub mod query;
pub mod sql;
pub mod tag_query;

pub use config::{EncoderConfig, StorageMode};
pub use encoder::{
    DatabaseType, Dialect, PlainCodec, Postgres, Sqlite, TagCodec, TagEncoder, compile,
    compile_str,
};
pub use error::{ErrorCode, ErrorContext, WqlError, WqlResult};
pub use operator::{CompareOp, ConjunctionOp};
pub use query::{MAX_DEPTH, Query};
pub use sql::Arguments;
pub use tag_query::{TagName, TagQuery, query_to_tagquery};

/// Common imports.
pub mod prelude {
    pub use crate::config::{EncoderConfig, StorageMode};
    pub use crate::encoder::{DatabaseType, Dialect, TagEncoder, compile, compile_str};
    pub use crate::error::{WqlError, WqlResult};
    pub use crate::query::Query;
    pub use crate::tag_query::{TagName, TagQuery, query_to_tagquery};
}
