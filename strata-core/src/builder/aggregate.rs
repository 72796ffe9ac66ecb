//! Aggregate queries compiled by temporarily swapping the projection

use super::compiler::{compile_select, CompiledQuery};
use super::query::Query;
use crate::Result;

/// Column alias every aggregate result is read from
pub const AGGREGATE_ALIAS: &str = "aggregate";

/// Aggregation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "COUNT"),
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Min => write!(f, "MIN"),
            AggregateFunction::Max => write!(f, "MAX"),
        }
    }
}

impl AggregateFunction {
    /// Projection expression, e.g. `SUM(price) AS aggregate`
    pub fn expression(&self, column: &str) -> String {
        format!("{}({}) AS {}", self, column, AGGREGATE_ALIAS)
    }
}

/// Replaces the projection for as long as it lives; dropping it puts the
/// original projection back, whether compilation succeeded, failed or
/// panicked.
pub(crate) struct ProjectionSwap<'a> {
    query: &'a mut Query,
    saved: Vec<String>,
}

impl<'a> ProjectionSwap<'a> {
    pub(crate) fn new(query: &'a mut Query, projection: String) -> Self {
        let saved = std::mem::replace(&mut query.selected_columns, vec![projection]);
        Self { query, saved }
    }

    pub(crate) fn compile(&self) -> Result<CompiledQuery> {
        compile_select(self.query)
    }
}

impl Drop for ProjectionSwap<'_> {
    fn drop(&mut self) {
        std::mem::swap(&mut self.query.selected_columns, &mut self.saved);
    }
}

/// DISTINCT, LIMIT and OFFSET shape the row set being aggregated, so they
/// must apply inside the aggregate rather than to its single result row.
fn needs_subquery(query: &Query) -> bool {
    query.raw.is_none()
        && (query.distinct
            || query.limit_value.is_some_and(|n| n > 0)
            || query.offset_value.is_some_and(|n| n > 0))
}

impl Query {
    /// Compile `SELECT <function>(<column>) AS aggregate ...` with all
    /// conditions and soft-delete filtering applied. The query's own
    /// projection is unchanged afterwards.
    ///
    /// A DISTINCT or paginated query is aggregated as a subquery, e.g.
    /// `SELECT COUNT(*) AS aggregate FROM (SELECT DISTINCT email FROM users)
    /// AS aggregate_rows`.
    pub fn to_aggregate_sql(
        &mut self,
        function: AggregateFunction,
        column: &str,
    ) -> Result<CompiledQuery> {
        if needs_subquery(self) {
            let inner = compile_select(self)?;
            return Ok(CompiledQuery {
                sql: format!(
                    "SELECT {} FROM ({}) AS aggregate_rows",
                    function.expression(column),
                    inner.sql
                ),
                params: inner.params,
            });
        }

        let swap = ProjectionSwap::new(self, function.expression(column));
        swap.compile()
    }

    /// Compile `SELECT EXISTS(<select>) AS aggregate`
    pub fn to_exists_sql(&self) -> Result<CompiledQuery> {
        let inner = compile_select(self)?;
        Ok(CompiledQuery {
            sql: format!("SELECT EXISTS({}) AS {}", inner.sql, AGGREGATE_ALIAS),
            params: inner.params,
        })
    }
}
