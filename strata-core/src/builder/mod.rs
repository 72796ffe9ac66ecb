//! Query builder module

pub mod aggregate;
pub mod common;
pub mod compiler;
pub mod payload;
pub mod query;
pub mod soft_delete;

// Re-export types from submodules
pub use aggregate::{AggregateFunction, AGGREGATE_ALIAS};
pub use common::{
    Connector, EagerLoad, IntoColumns, IntoCondition, IntoOperand, JoinClause, JoinType, Operand,
    OrderByClause, Predicate, SortDirection,
};
pub use compiler::CompiledQuery;
pub use payload::IntoRecord;
pub use query::Query;
pub use soft_delete::Visibility;
