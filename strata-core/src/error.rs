//! Error types for Strata

use thiserror::Error;

/// The main error type for Strata operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed query construction (missing table, bad BETWEEN/IN arguments,
    /// unsupported payload). Fixable by changing the calling code.
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// The accumulated state cannot be rendered as valid SQL
    #[error("SQL generation error: {message}")]
    SqlGeneration { message: String },

    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Execution failure reported by a non-sqlx connection pool
    #[error("Execution error: {message}")]
    Execution { message: String },

    /// Row materialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

/// Convenience Result type for Strata operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new SQL generation error
    pub fn sql_generation(message: impl Into<String>) -> Self {
        Self::SqlGeneration {
            message: message.into(),
        }
    }

    /// Create a new execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    /// True when the query itself was built wrong. No statement was sent.
    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::InvalidQuery { .. } | Self::SqlGeneration { .. })
    }

    /// True when the failure came from executing a well-formed statement.
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Execution { .. } | Self::Serialization(_)
        )
    }
}
