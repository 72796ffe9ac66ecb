//! Query execution: the connection pool interface and the terminal calls

use crate::builder::aggregate::AggregateFunction;
use crate::{CompiledQuery, EagerLoad, Error, IntoRecord, Operand, Query, Result, Value};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, warn};

/// Trait for database connection pools
pub trait ConnectionPool: Send + Sync + Clone {
    /// Execute a statement that returns no rows (INSERT, UPDATE, DELETE)
    fn execute(&self, sql: &str, params: &[Value]) -> impl Future<Output = Result<u64>> + Send;

    /// Execute a query that returns multiple rows
    fn fetch_all<T>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Vec<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin;

    /// Execute a query that returns a single row
    fn fetch_one<T>(&self, sql: &str, params: &[Value]) -> impl Future<Output = Result<T>> + Send
    where
        T: DeserializeOwned + Send + Unpin;

    /// Execute a query that returns an optional row
    fn fetch_optional<T>(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: DeserializeOwned + Send + Unpin;
}

/// Loads recorded relations (`with` / `with_count`) onto fetched rows
pub trait RelationResolver<T>: Send + Sync {
    fn resolve(
        &self,
        rows: &mut [T],
        loads: &[EagerLoad],
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Single-column row produced by every aggregate statement
#[derive(Debug, Deserialize)]
struct AggregateRow<T> {
    aggregate: Option<T>,
}

fn log_statement(kind: &'static str, query: &Query, compiled: &CompiledQuery) {
    if query.is_raw() {
        warn!(kind, sql = %compiled.sql, "executing raw statement without checks");
    }
    debug!(kind, sql = %compiled.sql, params = compiled.params.len(), "executing statement");
}

/// EXISTS comes back as a boolean or as 0/1 depending on the database
fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(s) => matches!(s.as_str(), "1" | "t" | "true"),
        _ => false,
    }
}

impl Query {
    /// Fetch every matching row
    ///
    /// # Examples
    /// ```no_run
    /// # async fn run<P: strata_core::ConnectionPool>(pool: P) -> strata_core::Result<()> {
    /// use strata_core::table;
    ///
    /// #[derive(serde::Deserialize)]
    /// struct User { id: i64, name: String }
    ///
    /// let users: Vec<User> = table("users").where_(("active", true)).get(&pool).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<T, P>(&self, pool: &P) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        P: ConnectionPool,
    {
        let compiled = self.to_sql()?;
        log_statement("get", self, &compiled);
        pool.fetch_all(&compiled.sql, &compiled.params).await
    }

    /// Fetch every matching row, then hand the rows and the recorded eager
    /// loads to `resolver`. The resolver is not called when nothing was
    /// recorded with `with` / `with_count`.
    pub async fn get_with<T, P, R>(&self, pool: &P, resolver: &R) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        P: ConnectionPool,
        R: RelationResolver<T>,
    {
        let mut rows = self.get(pool).await?;
        if !self.eager_loads.is_empty() && !rows.is_empty() {
            debug!(loads = self.eager_loads.len(), rows = rows.len(), "resolving relations");
            resolver.resolve(&mut rows, &self.eager_loads).await?;
        }
        Ok(rows)
    }

    /// Fetch the first matching row. Sets LIMIT 1 on this query.
    pub async fn first<T, P>(&mut self, pool: &P) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        P: ConnectionPool,
    {
        self.limit_value = Some(1);
        let compiled = self.to_sql()?;
        log_statement("first", self, &compiled);
        pool.fetch_optional(&compiled.sql, &compiled.params).await
    }

    /// Fetch the row whose primary key equals `id`
    pub async fn find<T, P, V>(self, id: V, pool: &P) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        P: ConnectionPool,
        V: Into<Value>,
    {
        let primary_key = self.config.primary_key.clone();
        let mut query = self.where_((primary_key.as_str(), Operand::Single(id.into())));
        query.first(pool).await
    }

    /// Whether any row matches
    pub async fn exists<P>(&self, pool: &P) -> Result<bool>
    where
        P: ConnectionPool,
    {
        if self.is_raw() {
            let compiled = self.to_sql()?;
            log_statement("exists", self, &compiled);
            let row: Option<serde_json::Value> =
                pool.fetch_optional(&compiled.sql, &compiled.params).await?;
            return Ok(row.is_some());
        }

        let compiled = self.to_exists_sql()?;
        log_statement("exists", self, &compiled);
        let row: AggregateRow<serde_json::Value> =
            pool.fetch_one(&compiled.sql, &compiled.params).await?;
        Ok(row.aggregate.as_ref().is_some_and(truthy))
    }

    async fn aggregate<T, P>(
        &mut self,
        pool: &P,
        function: AggregateFunction,
        column: &str,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        P: ConnectionPool,
    {
        let compiled = self.to_aggregate_sql(function, column)?;
        log_statement("aggregate", self, &compiled);
        let row: Option<AggregateRow<T>> =
            pool.fetch_optional(&compiled.sql, &compiled.params).await?;
        Ok(row.and_then(|row| row.aggregate))
    }

    /// `COUNT(*)` over the matching rows
    pub async fn count<P>(&mut self, pool: &P) -> Result<i64>
    where
        P: ConnectionPool,
    {
        let count = self.aggregate(pool, AggregateFunction::Count, "*").await?;
        Ok(count.unwrap_or(0))
    }

    /// `SUM(column)`; 0.0 when no rows match
    pub async fn sum<P>(&mut self, column: &str, pool: &P) -> Result<f64>
    where
        P: ConnectionPool,
    {
        let sum = self.aggregate(pool, AggregateFunction::Sum, column).await?;
        Ok(sum.unwrap_or(0.0))
    }

    /// `AVG(column)`; 0.0 when no rows match
    pub async fn avg<P>(&mut self, column: &str, pool: &P) -> Result<f64>
    where
        P: ConnectionPool,
    {
        let avg = self.aggregate(pool, AggregateFunction::Avg, column).await?;
        Ok(avg.unwrap_or(0.0))
    }

    /// `MIN(column)`; `None` when no rows match
    pub async fn min<T, P>(&mut self, column: &str, pool: &P) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        P: ConnectionPool,
    {
        self.aggregate(pool, AggregateFunction::Min, column).await
    }

    /// `MAX(column)`; `None` when no rows match
    pub async fn max<T, P>(&mut self, column: &str, pool: &P) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send + Unpin,
        P: ConnectionPool,
    {
        self.aggregate(pool, AggregateFunction::Max, column).await
    }

    /// Insert one record and return the number of affected rows
    pub async fn insert<D, P>(&self, data: D, pool: &P) -> Result<u64>
    where
        D: IntoRecord,
        P: ConnectionPool,
    {
        let compiled = self.to_insert_sql(data)?;
        log_statement("insert", self, &compiled);
        pool.execute(&compiled.sql, &compiled.params).await
    }

    /// Update the matching rows; soft-deleted rows are skipped unless the
    /// visibility says otherwise
    pub async fn update<D, P>(&self, data: D, pool: &P) -> Result<u64>
    where
        D: IntoRecord,
        P: ConnectionPool,
    {
        let compiled = self.to_update_sql(data)?;
        log_statement("update", self, &compiled);
        pool.execute(&compiled.sql, &compiled.params).await
    }

    /// Soft delete the matching rows, or remove them when the table has no
    /// soft deletes
    pub async fn delete<P>(&self, pool: &P) -> Result<u64>
    where
        P: ConnectionPool,
    {
        let compiled = self.to_delete_sql()?;
        log_statement("delete", self, &compiled);
        pool.execute(&compiled.sql, &compiled.params).await
    }

    /// Physically remove the matching rows
    pub async fn force_delete<P>(&self, pool: &P) -> Result<u64>
    where
        P: ConnectionPool,
    {
        let compiled = self.to_force_delete_sql()?;
        log_statement("force_delete", self, &compiled);
        pool.execute(&compiled.sql, &compiled.params).await
    }

    /// Clear the deleted-at marker on the matching rows
    pub async fn restore<P>(&self, pool: &P) -> Result<u64>
    where
        P: ConnectionPool,
    {
        let compiled = self.to_restore_sql()?;
        log_statement("restore", self, &compiled);
        pool.execute(&compiled.sql, &compiled.params).await
    }

    /// Run a raw statement that returns no rows
    pub async fn execute<P>(&self, pool: &P) -> Result<u64>
    where
        P: ConnectionPool,
    {
        let Some(compiled) = &self.raw else {
            return Err(Error::invalid_query(
                "execute requires a raw query; use insert, update or delete",
            ));
        };
        log_statement("execute", self, compiled);
        pool.execute(&compiled.sql, &compiled.params).await
    }
}

/// SQLx connection pool wrapper
#[cfg(feature = "sqlite")]
pub mod sqlite {
    use super::*;
    use sqlx::sqlite::{SqliteArguments, SqliteRow};
    use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};

    /// SQLite connection pool wrapper
    #[derive(Clone)]
    pub struct SqlitePool {
        inner: sqlx::SqlitePool,
    }

    impl SqlitePool {
        /// Create a new SQLite pool from a connection string
        pub async fn new(database_url: &str) -> Result<Self> {
            let pool = sqlx::SqlitePool::connect(database_url).await?;
            Ok(Self { inner: pool })
        }

        /// Create from an existing sqlx pool
        pub fn from_pool(pool: sqlx::SqlitePool) -> Self {
            Self { inner: pool }
        }
    }

    impl ConnectionPool for SqlitePool {
        async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
            let query = bind_values(sqlx::query(sql), params);
            let result = query.execute(&self.inner).await?;
            Ok(result.rows_affected())
        }

        async fn fetch_all<T>(&self, sql: &str, params: &[Value]) -> Result<Vec<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            let query = bind_values(sqlx::query(sql), params);
            let rows = query.fetch_all(&self.inner).await?;

            let mut results = Vec::with_capacity(rows.len());
            for row in rows {
                results.push(serde_json::from_value(row_to_json(&row)?)?);
            }
            Ok(results)
        }

        async fn fetch_one<T>(&self, sql: &str, params: &[Value]) -> Result<T>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            let query = bind_values(sqlx::query(sql), params);
            let row = query.fetch_one(&self.inner).await?;
            Ok(serde_json::from_value(row_to_json(&row)?)?)
        }

        async fn fetch_optional<T>(&self, sql: &str, params: &[Value]) -> Result<Option<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            let query = bind_values(sqlx::query(sql), params);
            match query.fetch_optional(&self.inner).await? {
                Some(row) => Ok(Some(serde_json::from_value(row_to_json(&row)?)?)),
                None => Ok(None),
            }
        }
    }

    /// Bind values positionally; timestamps are stored as RFC 3339 text
    fn bind_values<'q>(
        mut query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<i64>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.as_str()),
                Value::Bytes(b) => query.bind(b.as_slice()),
                Value::Json(j) => query.bind(j.to_string()),
                Value::Timestamp(t) => query.bind(t.to_rfc3339()),
            };
        }
        query
    }

    /// Convert a row into a JSON object keyed by column name
    fn row_to_json(row: &SqliteRow) -> Result<serde_json::Value> {
        let mut object = serde_json::Map::new();
        for column in row.columns() {
            let index = column.ordinal();
            let raw = row.try_get_raw(index)?;
            let value = if raw.is_null() {
                serde_json::Value::Null
            } else {
                match raw.type_info().name() {
                    "INTEGER" | "INT8" | "BIGINT" => row.try_get::<i64, _>(index)?.into(),
                    "BOOLEAN" => row.try_get::<bool, _>(index)?.into(),
                    "REAL" => row.try_get::<f64, _>(index)?.into(),
                    "BLOB" => row.try_get::<Vec<u8>, _>(index)?.into(),
                    _ => row.try_get::<String, _>(index)?.into(),
                }
            };
            object.insert(column.name().to_string(), value);
        }
        Ok(serde_json::Value::Object(object))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{op, table, QueryConfig};
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: i32,
        name: String,
        #[serde(default)]
        post_count: Option<i64>,
    }

    type Statement = (String, Vec<Value>);

    // Mock connection pool: records every statement and answers with canned rows
    #[derive(Clone, Default)]
    struct MockPool {
        rows: Vec<serde_json::Value>,
        affected: u64,
        should_fail: bool,
        statements: Arc<Mutex<Vec<Statement>>>,
    }

    impl MockPool {
        fn new() -> Self {
            Self {
                affected: 1,
                ..Self::default()
            }
        }

        fn with_rows(rows: Vec<serde_json::Value>) -> Self {
            Self {
                rows,
                ..Self::new()
            }
        }

        fn with_failure() -> Self {
            Self {
                should_fail: true,
                ..Self::new()
            }
        }

        fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
            self.statements
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            if self.should_fail {
                return Err(Error::execution("Mock connection failure"));
            }
            Ok(())
        }

        fn statements(&self) -> Vec<Statement> {
            self.statements.lock().unwrap().clone()
        }

        fn last_sql(&self) -> String {
            self.statements().last().map(|s| s.0.clone()).unwrap_or_default()
        }
    }

    impl ConnectionPool for MockPool {
        async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
            self.record(sql, params)?;
            Ok(self.affected)
        }

        async fn fetch_all<T>(&self, sql: &str, params: &[Value]) -> Result<Vec<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            self.record(sql, params)?;
            Ok(serde_json::from_value(serde_json::Value::Array(self.rows.clone()))?)
        }

        async fn fetch_one<T>(&self, sql: &str, params: &[Value]) -> Result<T>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            self.record(sql, params)?;
            match self.rows.first() {
                Some(row) => Ok(serde_json::from_value(row.clone())?),
                None => Err(Error::Database(sqlx::Error::RowNotFound)),
            }
        }

        async fn fetch_optional<T>(&self, sql: &str, params: &[Value]) -> Result<Option<T>>
        where
            T: DeserializeOwned + Send + Unpin,
        {
            self.record(sql, params)?;
            match self.rows.first() {
                Some(row) => Ok(Some(serde_json::from_value(row.clone())?)),
                None => Ok(None),
            }
        }
    }

    fn users() -> Vec<serde_json::Value> {
        vec![
            json!({"id": 1, "name": "John"}),
            json!({"id": 2, "name": "Jane"}),
        ]
    }

    #[tokio::test]
    async fn test_get() {
        let pool = MockPool::with_rows(users());
        let query = table("users")
            .select(("id", "name"))
            .where_(("age", op::GT, 18));

        let users: Vec<User> = query.get(&pool).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "Jane");
        assert_eq!(
            pool.statements(),
            vec![(
                "SELECT id, name FROM users WHERE age > ?".to_string(),
                vec![Value::I32(18)]
            )]
        );
    }

    #[tokio::test]
    async fn test_first_sets_limit() {
        let pool = MockPool::with_rows(users());
        let mut query = table("users").where_(("name", "John"));

        let user: Option<User> = query.first(&pool).await.unwrap();
        assert_eq!(user.map(|u| u.id), Some(1));
        assert_eq!(pool.last_sql(), "SELECT * FROM users WHERE name = ? LIMIT 1");
        assert_eq!(query.limit_value(), Some(1));
    }

    #[tokio::test]
    async fn test_first_on_empty_result() {
        let pool = MockPool::new();
        let user: Option<User> = table("users").first(&pool).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_find_uses_primary_key() {
        let pool = MockPool::with_rows(users());
        let config = QueryConfig {
            primary_key: "user_id".into(),
            soft_deletes: None,
        };

        let _: Option<User> = Query::with_config("accounts", config)
            .find(42, &pool)
            .await
            .unwrap();
        assert_eq!(
            pool.statements(),
            vec![(
                "SELECT * FROM accounts WHERE user_id = ? LIMIT 1".to_string(),
                vec![Value::I32(42)]
            )]
        );
    }

    #[tokio::test]
    async fn test_find_respects_soft_deletes() {
        let pool = MockPool::new();
        let _: Option<User> = table("posts").soft_deletes().find(5, &pool).await.unwrap();
        assert_eq!(
            pool.last_sql(),
            "SELECT * FROM posts WHERE id = ? AND deleted_at IS NULL LIMIT 1"
        );
    }

    #[tokio::test]
    async fn test_exists() {
        let pool = MockPool::with_rows(vec![json!({"aggregate": 1})]);
        let found = assert_ok!(table("users").where_(("id", 1)).exists(&pool).await);
        assert!(found);
        assert_eq!(
            pool.last_sql(),
            "SELECT EXISTS(SELECT * FROM users WHERE id = ?) AS aggregate"
        );

        let pool = MockPool::with_rows(vec![json!({"aggregate": false})]);
        assert!(!table("users").exists(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_restores_projection() {
        let pool = MockPool::with_rows(vec![json!({"aggregate": 7})]);
        let mut query = table("users").select(("id", "name")).where_(("active", true));

        assert_eq!(query.count(&pool).await.unwrap(), 7);
        assert_eq!(
            pool.last_sql(),
            "SELECT COUNT(*) AS aggregate FROM users WHERE active = ?"
        );
        assert_eq!(query.selected_columns(), &["id", "name"]);

        let _: Vec<serde_json::Value> = query.get(&pool).await.unwrap();
        assert_eq!(pool.last_sql(), "SELECT id, name FROM users WHERE active = ?");
    }

    #[tokio::test]
    async fn test_sum_and_avg_treat_null_as_zero() {
        let pool = MockPool::with_rows(vec![json!({"aggregate": null})]);
        let mut query = table("orders").where_(("status", "void"));
        assert_eq!(query.sum("total", &pool).await.unwrap(), 0.0);
        assert_eq!(query.avg("total", &pool).await.unwrap(), 0.0);

        let pool = MockPool::with_rows(vec![json!({"aggregate": 12.5})]);
        assert_eq!(query.avg("total", &pool).await.unwrap(), 12.5);
        assert_eq!(
            pool.last_sql(),
            "SELECT AVG(total) AS aggregate FROM orders WHERE status = ?"
        );
    }

    #[tokio::test]
    async fn test_min_and_max() {
        let pool = MockPool::with_rows(vec![json!({"aggregate": "2024-01-01"})]);
        let mut query = table("events");
        let earliest: Option<String> = query.min("starts_on", &pool).await.unwrap();
        assert_eq!(earliest.as_deref(), Some("2024-01-01"));

        let pool = MockPool::with_rows(vec![json!({"aggregate": null})]);
        let latest: Option<String> = query.max("starts_on", &pool).await.unwrap();
        assert!(latest.is_none());
        assert_eq!(pool.last_sql(), "SELECT MAX(starts_on) AS aggregate FROM events");
    }

    #[tokio::test]
    async fn test_insert_update_delete() {
        let pool = MockPool::new();

        let affected = table("users")
            .insert([("name", Value::from("Test"))], &pool)
            .await
            .unwrap();
        assert_eq!(affected, 1);

        table("users")
            .where_(("id", 1))
            .update(json!({"name": "Updated"}), &pool)
            .await
            .unwrap();

        table("users")
            .where_(("age", op::LT, 13))
            .delete(&pool)
            .await
            .unwrap();

        let sql: Vec<String> = pool.statements().into_iter().map(|s| s.0).collect();
        assert_eq!(
            sql,
            vec![
                "INSERT INTO users (name) VALUES (?)",
                "UPDATE users SET name = ? WHERE id = ?",
                "DELETE FROM users WHERE age < ?",
            ]
        );
    }

    #[tokio::test]
    async fn test_soft_delete_force_delete_and_restore() {
        let pool = MockPool::new();
        let posts = || table("posts").soft_deletes().where_(("id", 3));

        posts().delete(&pool).await.unwrap();
        posts().force_delete(&pool).await.unwrap();
        posts().restore(&pool).await.unwrap();

        let statements = pool.statements();
        assert_eq!(
            statements[0].0,
            "UPDATE posts SET deleted_at = ?, updated_at = ? WHERE id = ?"
        );
        assert!(matches!(statements[0].1[0], Value::Timestamp(_)));
        assert_eq!(statements[0].1[0], statements[0].1[1]);
        assert_eq!(statements[1].0, "DELETE FROM posts WHERE id = ?");
        assert_eq!(statements[2].0, "UPDATE posts SET deleted_at = NULL WHERE id = ?");
    }

    #[tokio::test]
    async fn test_shape_error_reaches_no_pool() {
        let pool = MockPool::new();
        let result: Result<Vec<User>> = table("users")
            .where_between("age", [18, 30, 40])
            .get(&pool)
            .await;
        let err = assert_err!(result);
        assert!(err.is_query_error());
        assert!(pool.statements().is_empty());

        assert_err!(table("users").restore(&pool).await);
        assert!(pool.statements().is_empty());
    }

    #[tokio::test]
    async fn test_execution_error_passes_through() {
        let pool = MockPool::with_failure();
        let result: Result<Vec<User>> = table("users").get(&pool).await;
        let err = assert_err!(result);
        assert!(err.is_execution_error());
        assert_eq!(err.to_string(), "Execution error: Mock connection failure");
    }

    #[tokio::test]
    async fn test_raw_query() {
        let pool = MockPool::with_rows(users());
        let query = Query::raw("SELECT * FROM users WHERE id IN (?, ?)", [2, 1]);

        let rows: Vec<User> = query.get(&pool).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            pool.statements(),
            vec![(
                "SELECT * FROM users WHERE id IN (?, ?)".to_string(),
                vec![Value::I32(2), Value::I32(1)]
            )]
        );
        assert!(query.exists(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_raw_mutations() {
        let pool = MockPool::new();
        let query = Query::raw("UPDATE users SET score = score + ?", [5]);

        assert_err!(query.delete(&pool).await);
        assert_err!(query.update([("score", Value::from(1))], &pool).await);
        assert!(pool.statements().is_empty());

        assert_eq!(assert_ok!(query.execute(&pool).await), 1);
        assert_eq!(pool.last_sql(), "UPDATE users SET score = score + ?");

        assert_err!(table("users").execute(&pool).await);
    }

    struct CountResolver {
        calls: Arc<Mutex<Vec<Vec<EagerLoad>>>>,
    }

    impl RelationResolver<User> for CountResolver {
        async fn resolve(&self, rows: &mut [User], loads: &[EagerLoad]) -> Result<()> {
            self.calls.lock().unwrap().push(loads.to_vec());
            for row in rows.iter_mut() {
                row.post_count = Some(row.id as i64 * 10);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_with_resolves_recorded_loads() {
        let pool = MockPool::with_rows(users());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let resolver = CountResolver {
            calls: calls.clone(),
        };

        let rows: Vec<User> = table("users")
            .with_count("posts")
            .with_count("posts")
            .get_with(&pool, &resolver)
            .await
            .unwrap();
        assert_eq!(rows[1].post_count, Some(20));
        assert_eq!(
            *calls.lock().unwrap(),
            vec![vec![EagerLoad::Count("posts".into())]]
        );
        // Eager loads do not change the primary statement
        assert_eq!(pool.last_sql(), "SELECT * FROM users");

        let rows: Vec<User> = table("users").get_with(&pool, &resolver).await.unwrap();
        assert_eq!(rows[0].post_count, None);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }
}
