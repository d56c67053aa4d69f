//! # WQL
//!
//! The Wallet Query Language compiler.
//!
//! WQL filters are JSON documents over the key/value tags attached to
//! stored items. This crate compiles them into a SQL predicate and an
//! ordered list of bind parameters that a storage layer splices into its
//! own `SELECT`, `UPDATE` or `DELETE` statements.
//!
//! ## Quick Start
//!
//! ```rust
//! use wql::prelude::*;
//!
//! let encoder = TagEncoder::sqlite();
//! let (clause, params) = compile_str(r#"{"$not": {"status": "revoked"}}"#, &encoder)?;
//!
//! assert_eq!(
//!     clause,
//!     "i.id NOT IN (SELECT item_id FROM items_tags WHERE name = ? AND value = ?)"
//! );
//! assert_eq!(params, vec!["status", "revoked"]);
//!
//! let sql = format!("SELECT i.id FROM items i WHERE i.category = ? AND {}", clause);
//! # let _ = sql;
//! # Ok::<(), wql::WqlError>(())
//! ```
//!
//! ## Storage layouts
//!
//! In the default non-normalized layout tags live in a shared
//! `items_tags(item_id, name, value)` table and every predicate becomes a
//! subquery on it. In the normalized layout each tag is a column and
//! predicates compare columns directly; see [`TagEncoder::normalized`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use wql_query::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use wql_query::prelude::*;
}
