//! Encoder configuration.
//!
//! The storage layer decides the dialect, the storage layout and the table
//! names; the compiler only splices them into SQL text. Configuration can be
//! built in code or loaded from TOML:
//!
//! ```rust
//! use wql_query::{DatabaseType, EncoderConfig, StorageMode};
//!
//! let config = EncoderConfig::from_toml_str(r#"
//!     dialect = "sqlite"
//!     mode = "normalized"
//!     table_alias = "t"
//! "#).unwrap();
//!
//! assert_eq!(config.dialect, DatabaseType::Sqlite);
//! assert_eq!(config.mode, StorageMode::Normalized);
//! assert_eq!(config.tags_table, "items_tags");
//! ```

use serde::{Deserialize, Serialize};

use crate::encoder::DatabaseType;
use crate::error::{WqlError, WqlResult};
use crate::sql::is_plain_identifier;

/// Default name of the shared key/value tag table.
pub const DEFAULT_TAGS_TABLE: &str = "items_tags";

/// Default alias of the item table in non-normalized queries.
pub const DEFAULT_ITEM_ALIAS: &str = "i";

/// How tags are laid out in storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// One column per tag on the item's own table.
    Normalized,
    /// A shared `(item_id, name, value)` side table.
    #[default]
    NonNormalized,
}

impl StorageMode {
    /// Check if tags are stored as columns.
    pub fn is_normalized(&self) -> bool {
        matches!(self, Self::Normalized)
    }
}

/// Settings for a [`TagEncoder`](crate::TagEncoder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// SQL dialect.
    pub dialect: DatabaseType,
    /// Storage layout.
    pub mode: StorageMode,
    /// Alias qualifying tag columns (normalized mode only).
    pub table_alias: Option<String>,
    /// Shared tag table (non-normalized mode only).
    pub tags_table: String,
    /// Alias of the item table whose `id` is matched (non-normalized mode only).
    pub item_alias: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            dialect: DatabaseType::default(),
            mode: StorageMode::default(),
            table_alias: None,
            tags_table: DEFAULT_TAGS_TABLE.to_string(),
            item_alias: DEFAULT_ITEM_ALIAS.to_string(),
        }
    }
}

impl EncoderConfig {
    /// Create a non-normalized configuration for `dialect`.
    pub fn new(dialect: DatabaseType) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> WqlResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| {
            WqlError::invalid_configuration(format!("Invalid encoder configuration: {}", e))
                .with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Use the normalized (column-per-tag) layout.
    pub fn normalized(mut self) -> Self {
        self.mode = StorageMode::Normalized;
        self
    }

    /// Use the non-normalized (side table) layout.
    pub fn non_normalized(mut self) -> Self {
        self.mode = StorageMode::NonNormalized;
        self
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: DatabaseType) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the alias qualifying tag columns.
    pub fn with_table_alias(mut self, alias: impl Into<String>) -> Self {
        self.table_alias = Some(alias.into());
        self
    }

    /// Set the shared tag table name.
    pub fn with_tags_table(mut self, table: impl Into<String>) -> Self {
        self.tags_table = table.into();
        self
    }

    /// Set the item table alias.
    pub fn with_item_alias(mut self, alias: impl Into<String>) -> Self {
        self.item_alias = alias.into();
        self
    }

    /// Check that every configured name can be spliced into SQL verbatim.
    pub fn validate(&self) -> WqlResult<()> {
        let names = [
            ("tags_table", Some(self.tags_table.as_str())),
            ("item_alias", Some(self.item_alias.as_str())),
            ("table_alias", self.table_alias.as_deref()),
        ];
        for (field, value) in names {
            if let Some(value) = value {
                if !is_plain_identifier(value) {
                    return Err(WqlError::invalid_configuration(format!(
                        "{} must be a plain SQL identifier, got '{}'",
                        field, value
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.dialect, DatabaseType::Postgres);
        assert_eq!(config.mode, StorageMode::NonNormalized);
        assert_eq!(config.tags_table, "items_tags");
        assert_eq!(config.item_alias, "i");
        assert!(config.table_alias.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EncoderConfig::new(DatabaseType::Sqlite)
            .normalized()
            .with_table_alias("t")
            .with_tags_table("tags")
            .with_item_alias("items");
        assert_eq!(config.dialect, DatabaseType::Sqlite);
        assert!(config.mode.is_normalized());
        assert_eq!(config.table_alias.as_deref(), Some("t"));
        assert_eq!(config.tags_table, "tags");
        assert_eq!(config.item_alias, "items");
    }

    #[test]
    fn test_from_toml() {
        let config = EncoderConfig::from_toml_str(
            r#"
            dialect = "postgres"
            mode = "non_normalized"
            tags_table = "credential_tags"
            "#,
        )
        .unwrap();
        assert_eq!(config.tags_table, "credential_tags");
        assert_eq!(config.mode, StorageMode::NonNormalized);
    }

    #[test]
    fn test_from_toml_rejects_unknown_fields() {
        let err = EncoderConfig::from_toml_str("tag_table = \"x\"").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_validate_rejects_unsafe_names() {
        let err = EncoderConfig::default()
            .with_tags_table("items_tags; DROP TABLE items")
            .validate()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);
        assert!(err.message.contains("tags_table"));

        assert!(EncoderConfig::default().with_table_alias("").validate().is_err());
    }
}
