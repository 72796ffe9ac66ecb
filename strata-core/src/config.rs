//! Per-table query configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Query, Result};

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_deleted_at() -> String {
    "deleted_at".to_string()
}

fn default_updated_at() -> String {
    "updated_at".to_string()
}

/// Marker columns used by soft deletes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    #[serde(default = "default_deleted_at")]
    pub deleted_at_column: String,

    #[serde(default = "default_updated_at")]
    pub updated_at_column: String,
}

impl Default for SoftDeleteConfig {
    fn default() -> Self {
        Self {
            deleted_at_column: default_deleted_at(),
            updated_at_column: default_updated_at(),
        }
    }
}

/// How queries against one table behave
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Column used by `find`
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Soft-delete columns; `None` means rows are removed physically
    #[serde(default)]
    pub soft_deletes: Option<SoftDeleteConfig>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            primary_key: default_primary_key(),
            soft_deletes: None,
        }
    }
}

impl QueryConfig {
    /// Enable soft deletes with the default `deleted_at` / `updated_at` columns
    pub fn with_soft_deletes(mut self) -> Self {
        self.soft_deletes = Some(SoftDeleteConfig::default());
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Table configurations loaded from one document.
///
/// ```toml
/// [defaults]
/// primary_key = "id"
///
/// [tables.posts.soft_deletes]
/// deleted_at_column = "deleted_at"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: QueryConfig,

    #[serde(default)]
    pub tables: BTreeMap<String, QueryConfig>,
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Configuration for `table`, falling back to the defaults
    pub fn table_config(&self, table: &str) -> &QueryConfig {
        self.tables.get(table).unwrap_or(&self.defaults)
    }

    /// Start a query on `table` with its configuration applied
    pub fn query(&self, table: &str) -> Query {
        Query::with_config(table, self.table_config(table).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueryConfig::default();
        assert_eq!(config.primary_key, "id");
        assert!(config.soft_deletes.is_none());

        let config = config.with_soft_deletes();
        let soft = config.soft_deletes.unwrap();
        assert_eq!(soft.deleted_at_column, "deleted_at");
        assert_eq!(soft.updated_at_column, "updated_at");
    }

    #[test]
    fn test_query_config_from_toml() {
        let config = QueryConfig::from_toml_str(
            r#"
            primary_key = "uuid"

            [soft_deletes]
            deleted_at_column = "removed_at"
            "#,
        )
        .unwrap();

        assert_eq!(config.primary_key, "uuid");
        let soft = config.soft_deletes.unwrap();
        assert_eq!(soft.deleted_at_column, "removed_at");
        assert_eq!(soft.updated_at_column, "updated_at");
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(QueryConfig::from_toml_str("").unwrap(), QueryConfig::default());
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_table_lookup() {
        let config = Config::from_toml_str(
            r#"
            [defaults]
            primary_key = "id"

            [tables.posts.soft_deletes]

            [tables.tags]
            primary_key = "slug"
            "#,
        )
        .unwrap();

        assert!(config.table_config("posts").soft_deletes.is_some());
        assert_eq!(config.table_config("tags").primary_key, "slug");
        assert_eq!(config.table_config("users"), &QueryConfig::default());
    }

    #[test]
    fn test_query_uses_table_config() {
        let config = Config::from_toml_str("[tables.posts.soft_deletes]").unwrap();
        let sql = config.query("posts").to_sql().unwrap().sql;
        assert_eq!(sql, "SELECT * FROM posts WHERE deleted_at IS NULL");
        let sql = config.query("users").to_sql().unwrap().sql;
        assert_eq!(sql, "SELECT * FROM users");
    }

    #[test]
    fn test_invalid_toml() {
        let err = QueryConfig::from_toml_str("primary_key = [").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
