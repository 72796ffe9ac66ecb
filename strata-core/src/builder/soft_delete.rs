//! Soft deletes: visibility filtering for reads and the UPDATE rewrites
//! behind `delete` and `restore`

use chrono::{DateTime, Utc};

use super::common::{Connector, Predicate};
use super::compiler::{compile_delete, compile_update, Assignment, CompiledQuery};
use super::query::Query;
use crate::{Error, Result, Value};

/// Which rows a query sees when the table uses soft deletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only rows whose deleted-at marker is NULL
    #[default]
    ExcludeTrashed,
    /// All rows
    WithTrashed,
    /// Only rows whose deleted-at marker is set
    OnlyTrashed,
}

/// Predicate ANDed onto the WHERE clause of reads and updates.
///
/// Evaluated at compile time, so the visibility can be changed after any
/// other mutation.
pub(crate) fn read_scope(query: &Query) -> Result<Option<Predicate>> {
    let Some(soft) = &query.config.soft_deletes else {
        return match query.visibility {
            Visibility::ExcludeTrashed => Ok(None),
            mode => Err(Error::invalid_query(format!(
                "{:?} requires soft deletes on table '{}'",
                mode, query.table_name
            ))),
        };
    };

    let column = soft.deleted_at_column.as_str();
    Ok(match query.visibility {
        Visibility::ExcludeTrashed => Some(Predicate::is_null(column, Connector::And)),
        Visibility::WithTrashed => None,
        Visibility::OnlyTrashed => Some(Predicate::is_not_null(column, Connector::And)),
    })
}

/// `delete` at a fixed instant: a marker UPDATE when the table uses soft
/// deletes, a physical DELETE otherwise. Restricted by the caller's
/// conditions only.
pub(crate) fn compile_soft_delete(query: &Query, now: DateTime<Utc>) -> Result<CompiledQuery> {
    let Some(soft) = &query.config.soft_deletes else {
        return compile_delete(query);
    };

    let assignments = [
        Assignment::Bind(soft.deleted_at_column.clone(), Value::Timestamp(now)),
        Assignment::Bind(soft.updated_at_column.clone(), Value::Timestamp(now)),
    ];
    compile_update(query, &assignments, None)
}

pub(crate) fn compile_restore(query: &Query) -> Result<CompiledQuery> {
    let Some(soft) = &query.config.soft_deletes else {
        return Err(Error::invalid_query(format!(
            "restore requires soft deletes on table '{}'",
            query.table_name
        )));
    };

    compile_update(
        query,
        &[Assignment::Null(soft.deleted_at_column.clone())],
        None,
    )
}

impl Query {
    /// Compile `delete`: on soft-delete tables an UPDATE stamping the
    /// deleted-at and updated-at columns with the current time
    pub fn to_delete_sql(&self) -> Result<CompiledQuery> {
        compile_soft_delete(self, Utc::now())
    }

    /// Same as [`Query::to_delete_sql`] with an explicit timestamp
    pub fn to_delete_sql_at(&self, now: DateTime<Utc>) -> Result<CompiledQuery> {
        compile_soft_delete(self, now)
    }

    /// Compile `restore`: an UPDATE clearing the deleted-at column
    pub fn to_restore_sql(&self) -> Result<CompiledQuery> {
        compile_restore(self)
    }
}
