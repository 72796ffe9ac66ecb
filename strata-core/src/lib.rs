//! Strata Core - a fluent SQL query builder
//!
//! Queries are accumulated through chained mutators and compiled into SQL
//! text with positional `?` placeholders plus the ordered argument list.
//! Soft-deleted rows are filtered out of reads by default, and aggregate
//! helpers swap the projection only for the duration of one compile.
//!
//! ```
//! use strata_core::table;
//!
//! let compiled = table("posts")
//!     .soft_deletes()
//!     .where_(("author_id", 7))
//!     .or_where(("pinned", true))
//!     .order_by_desc("created_at")
//!     .to_sql()
//!     .unwrap();
//!
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT * FROM posts WHERE (author_id = ? OR pinned = ?) AND deleted_at IS NULL \
//!      ORDER BY created_at DESC"
//! );
//! assert_eq!(compiled.params.len(), 2);
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod executor;
pub mod operator;
pub mod value;

// Re-export main types
pub use builder::{
    AggregateFunction, CompiledQuery, Connector, EagerLoad, IntoColumns, IntoCondition,
    IntoOperand, IntoRecord, JoinClause, JoinType, Operand, OrderByClause, Predicate, Query,
    SortDirection, Visibility,
};
pub use config::{Config, QueryConfig, SoftDeleteConfig};
pub use error::{Error, Result};
pub use executor::{ConnectionPool, RelationResolver};
pub use operator::{op, Arity, IntoOperator, Operator};
pub use value::Value;

#[cfg(feature = "sqlite")]
pub use executor::sqlite::SqlitePool;

/// Create a new query on the given table
pub fn table(name: &str) -> Query {
    Query::new(name)
}

/// Create a query that compiles to exactly `sql` and `params`
///
/// ```
/// let compiled = strata_core::raw("SELECT * FROM users WHERE id = ?", [1]).to_sql().unwrap();
/// assert_eq!(compiled.sql, "SELECT * FROM users WHERE id = ?");
/// ```
pub fn raw<I, V>(sql: &str, params: I) -> Query
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Query::raw(sql, params)
}
