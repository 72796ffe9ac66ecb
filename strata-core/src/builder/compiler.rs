//! Rendering of an accumulated query into SQL text and positional arguments

use tracing::trace;

use super::common::{Connector, Operand, Predicate};
use super::payload::IntoRecord;
use super::query::Query;
use super::soft_delete;
use crate::{Error, Result, Value};

/// A statement ready for execution: `?` placeholders in `sql` correspond
/// one-to-one, in order, with `params`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

impl CompiledQuery {
    /// Count `?` placeholders outside single-quoted literals
    pub fn placeholder_count(&self) -> usize {
        let mut in_literal = false;
        self.sql
            .chars()
            .filter(|c| {
                if *c == '\'' {
                    in_literal = !in_literal;
                }
                !in_literal && *c == '?'
            })
            .count()
    }
}

/// One `SET` entry of an UPDATE
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Assignment {
    /// `column = ?`
    Bind(String, Value),
    /// `column = NULL`
    Null(String),
}

/// Appends text and arguments together so a placeholder is never written
/// without its argument.
struct SqlWriter {
    sql: String,
    params: Vec<Value>,
}

impl SqlWriter {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: &Value) {
        self.sql.push('?');
        self.params.push(value.clone());
    }

    fn predicate(&mut self, predicate: &Predicate) {
        self.push(&predicate.column);
        self.push(" ");
        self.push(predicate.operator.as_str());
        match &predicate.operand {
            Operand::Null => self.push(" NULL"),
            Operand::Single(value) => {
                self.push(" ");
                self.bind(value);
            }
            Operand::List(values) => {
                self.push(" (");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.bind(value);
                }
                self.push(")");
            }
            Operand::Range(low, high) => {
                self.push(" ");
                self.bind(low);
                self.push(" AND ");
                self.bind(high);
            }
        }
    }

    /// Predicates joined by each one's own connector; the first connector
    /// is never written.
    fn predicates(&mut self, predicates: &[Predicate]) {
        for (i, predicate) in predicates.iter().enumerate() {
            if i > 0 {
                self.push(" ");
                self.push(predicate.connector.as_str());
                self.push(" ");
            }
            self.predicate(predicate);
        }
    }

    /// WHERE clause with an optional visibility predicate ANDed onto the
    /// caller's conditions. Caller conditions containing OR are grouped so
    /// the visibility predicate applies to all of them.
    fn where_clause(&mut self, predicates: &[Predicate], scope: Option<&Predicate>) {
        match scope {
            None if predicates.is_empty() => {}
            None => {
                self.push(" WHERE ");
                self.predicates(predicates);
            }
            Some(scope) if predicates.is_empty() => {
                self.push(" WHERE ");
                self.predicate(scope);
            }
            Some(scope) => {
                self.push(" WHERE ");
                let grouped = predicates
                    .iter()
                    .skip(1)
                    .any(|p| p.connector == Connector::Or);
                if grouped {
                    self.push("(");
                    self.predicates(predicates);
                    self.push(")");
                } else {
                    self.predicates(predicates);
                }
                self.push(" AND ");
                self.predicate(scope);
            }
        }
    }

    fn finish(self, kind: &'static str) -> CompiledQuery {
        trace!(kind, sql = %self.sql, params = self.params.len(), "compiled statement");
        CompiledQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Shared pre-flight for every statement: recorded mutator errors, table
/// name and predicate shapes. Runs before any text is assembled.
fn preflight(query: &Query) -> Result<()> {
    query.check()?;
    if query.table_name.trim().is_empty() {
        return Err(Error::invalid_query("Query requires a table name"));
    }
    for predicate in query
        .where_conditions
        .iter()
        .chain(query.having_conditions.iter())
    {
        predicate.validate()?;
    }
    Ok(())
}

pub(crate) fn reject_raw(query: &Query, statement: &str) -> Result<()> {
    if query.raw.is_some() {
        return Err(Error::invalid_query(format!(
            "{} cannot be compiled from a raw query; execute the raw statement instead",
            statement
        )));
    }
    Ok(())
}

pub(crate) fn compile_select(query: &Query) -> Result<CompiledQuery> {
    if let Some(raw) = &query.raw {
        return Ok(raw.clone());
    }
    preflight(query)?;
    let scope = soft_delete::read_scope(query)?;

    let mut w = SqlWriter::new();

    w.push("SELECT ");
    if query.distinct {
        w.push("DISTINCT ");
    }
    if query.selected_columns.is_empty() {
        w.push("*");
    } else {
        w.push(&query.selected_columns.join(", "));
    }
    w.push(" FROM ");
    w.push(&query.table_name);

    for join in &query.join_clauses {
        w.push(&format!(
            " {} JOIN {} ON {} {} {}",
            join.join_type, join.table, join.left_column, join.operator, join.right_column
        ));
    }

    w.where_clause(&query.where_conditions, scope.as_ref());

    if !query.group_by_columns.is_empty() {
        w.push(" GROUP BY ");
        w.push(&query.group_by_columns.join(", "));
    }

    if !query.having_conditions.is_empty() {
        w.push(" HAVING ");
        w.predicates(&query.having_conditions);
    }

    if !query.order_by_clauses.is_empty() {
        let order_parts: Vec<String> = query
            .order_by_clauses
            .iter()
            .map(|clause| format!("{} {}", clause.column, clause.direction))
            .collect();
        w.push(" ORDER BY ");
        w.push(&order_parts.join(", "));
    }

    if let Some(limit) = query.limit_value.filter(|n| *n > 0) {
        w.push(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = query.offset_value.filter(|n| *n > 0) {
        w.push(&format!(" OFFSET {}", offset));
    }

    Ok(w.finish("select"))
}

pub(crate) fn compile_insert(query: &Query, record: Vec<(String, Value)>) -> Result<CompiledQuery> {
    reject_raw(query, "INSERT")?;
    preflight(query)?;

    let mut w = SqlWriter::new();
    w.push("INSERT INTO ");
    w.push(&query.table_name);
    w.push(" (");
    let columns: Vec<&str> = record.iter().map(|(column, _)| column.as_str()).collect();
    w.push(&columns.join(", "));
    w.push(") VALUES (");
    for (i, (_, value)) in record.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.bind(value);
    }
    w.push(")");

    Ok(w.finish("insert"))
}

pub(crate) fn compile_update(
    query: &Query,
    assignments: &[Assignment],
    scope: Option<&Predicate>,
) -> Result<CompiledQuery> {
    reject_raw(query, "UPDATE")?;
    preflight(query)?;
    if assignments.is_empty() {
        return Err(Error::invalid_query("UPDATE requires SET clauses"));
    }

    let mut w = SqlWriter::new();
    w.push("UPDATE ");
    w.push(&query.table_name);
    w.push(" SET ");
    for (i, assignment) in assignments.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        match assignment {
            Assignment::Bind(column, value) => {
                w.push(column);
                w.push(" = ");
                w.bind(value);
            }
            Assignment::Null(column) => {
                w.push(column);
                w.push(" = NULL");
            }
        }
    }
    w.where_clause(&query.where_conditions, scope);

    Ok(w.finish("update"))
}

/// Physical `DELETE FROM`, restricted by the caller's conditions only
pub(crate) fn compile_delete(query: &Query) -> Result<CompiledQuery> {
    reject_raw(query, "DELETE")?;
    preflight(query)?;

    let mut w = SqlWriter::new();
    w.push("DELETE FROM ");
    w.push(&query.table_name);
    w.where_clause(&query.where_conditions, None);

    Ok(w.finish("delete"))
}

impl Query {
    /// Compile the SELECT statement (or the raw override, verbatim)
    pub fn to_sql(&self) -> Result<CompiledQuery> {
        compile_select(self)
    }

    /// Compile `INSERT INTO <table> (...) VALUES (...)` for one record
    pub fn to_insert_sql<D>(&self, data: D) -> Result<CompiledQuery>
    where
        D: IntoRecord,
    {
        compile_insert(self, data.into_record()?)
    }

    /// Compile `UPDATE <table> SET ...` restricted by the conditions and
    /// the soft-delete visibility
    pub fn to_update_sql<D>(&self, data: D) -> Result<CompiledQuery>
    where
        D: IntoRecord,
    {
        let assignments: Vec<Assignment> = data
            .into_record()?
            .into_iter()
            .map(|(column, value)| Assignment::Bind(column, value))
            .collect();
        let scope = soft_delete::read_scope(self)?;
        compile_update(self, &assignments, scope.as_ref())
    }

    /// Compile a physical `DELETE FROM`, bypassing soft deletes
    pub fn to_force_delete_sql(&self) -> Result<CompiledQuery> {
        compile_delete(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::op;
    use crate::{table, Query};

    fn assert_consistent(compiled: &CompiledQuery) {
        assert_eq!(
            compiled.placeholder_count(),
            compiled.params.len(),
            "placeholder mismatch in {}",
            compiled.sql
        );
    }

    #[test]
    fn test_connectives_follow_their_own_call() {
        let compiled = table("users")
            .or_where(("a", 1))
            .where_(("b", 2))
            .or_where(("c", 3))
            .where_(("d", 4))
            .to_sql()
            .unwrap();
        // The first connector (OR) is dropped; each later one precedes its own predicate
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE a = ? AND b = ? OR c = ? AND d = ?"
        );
        assert_eq!(
            compiled.params,
            vec![Value::I32(1), Value::I32(2), Value::I32(3), Value::I32(4)]
        );
    }

    #[test]
    fn test_placeholders_match_arguments_across_clauses() {
        let queries = vec![
            table("users"),
            table("users").where_in("id", [1, 2, 3]),
            table("users")
                .where_(("age", op::GTE, 21))
                .or_where_between("score", [10, 20])
                .where_null("deleted_at")
                .where_not_in("role", ["a", "b", "c", "d"]),
            table("users")
                .soft_deletes()
                .where_(("name", op::LIKE, "%o'brien?%"))
                .or_where(("email", op::NOT_LIKE, "%@spam.test"))
                .group_by("team")
                .having(("COUNT(*)", op::BETWEEN, (2, 9)))
                .or_having(("SUM(score)", op::IN, vec![100, 200]))
                .order_by_desc("team")
                .limit(10)
                .offset(20),
            table("posts").soft_deletes().only_trashed(),
        ];

        for query in queries {
            assert_consistent(&query.to_sql().unwrap());
        }
    }

    #[test]
    fn test_argument_order_follows_text_order() {
        let compiled = table("orders")
            .where_between("total", [5, 50])
            .where_in("status", ["new", "paid"])
            .where_(("customer", "acme"))
            .group_by("status")
            .having(("COUNT(*)", op::GT, 1))
            .to_sql()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT * FROM orders WHERE total BETWEEN ? AND ? AND status IN (?, ?) \
             AND customer = ? GROUP BY status HAVING COUNT(*) > ?"
        );
        assert_eq!(
            compiled.params,
            vec![
                Value::I32(5),
                Value::I32(50),
                Value::from("new"),
                Value::from("paid"),
                Value::from("acme"),
                Value::I32(1),
            ]
        );
    }

    #[test]
    fn test_clause_order() {
        let sql = table("users")
            .select(("users.id", "COUNT(posts.id)"))
            .left_join("posts", "posts.user_id", "users.id")
            .where_(("users.active", true))
            .group_by("users.id")
            .having(("COUNT(posts.id)", op::GT, 2))
            .order_by_desc("users.id")
            .limit(5)
            .offset(10)
            .to_sql()
            .unwrap()
            .sql;
        assert_eq!(
            sql,
            "SELECT users.id, COUNT(posts.id) FROM users \
             LEFT JOIN posts ON posts.user_id = users.id \
             WHERE users.active = ? GROUP BY users.id HAVING COUNT(posts.id) > ? \
             ORDER BY users.id DESC LIMIT 5 OFFSET 10"
        );
    }

    #[test]
    fn test_zero_limit_and_offset_are_omitted() {
        let sql = table("users").limit(0).offset(0).to_sql().unwrap().sql;
        assert_eq!(sql, "SELECT * FROM users");

        let sql = table("users").offset(15).to_sql().unwrap().sql;
        assert_eq!(sql, "SELECT * FROM users OFFSET 15");
    }

    #[test]
    fn test_empty_table_fails() {
        let err = table("").to_sql().unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }));
        assert_eq!(err.to_string(), "Invalid query: Query requires a table name");
    }

    #[test]
    fn test_hand_built_predicate_is_validated() {
        let mut query = table("users");
        query.where_conditions.push(Predicate {
            column: "id".into(),
            operator: op::IN,
            operand: Operand::List(vec![]),
            connector: Connector::And,
        });
        let err = query.to_sql().unwrap_err();
        assert!(err.to_string().contains("non-empty list"));

        let mut query = table("users");
        query.where_conditions.push(Predicate {
            column: "deleted_at".into(),
            operator: op::IS,
            operand: Operand::Single(Value::I32(1)),
            connector: Connector::And,
        });
        let err = query.to_sql().unwrap_err();
        assert!(matches!(err, Error::SqlGeneration { .. }));
    }

    #[test]
    fn test_raw_override_is_verbatim() {
        let query = Query::raw("SELECT name FROM users WHERE id IN (?, ?)", vec![2, 1])
            .where_(("ignored", 1))
            .limit(3)
            .soft_deletes();
        let compiled = query.to_sql().unwrap();
        assert_eq!(compiled.sql, "SELECT name FROM users WHERE id IN (?, ?)");
        assert_eq!(compiled.params, vec![Value::I32(2), Value::I32(1)]);
    }

    #[test]
    fn test_raw_rejects_mutations() {
        let query = Query::raw("SELECT 1", Vec::<Value>::new());
        let err = query.to_insert_sql([("name", Value::from("x"))]).unwrap_err();
        assert!(err.to_string().contains("raw query"));
        assert!(query.to_force_delete_sql().is_err());
    }

    #[test]
    fn test_insert() {
        let compiled = table("users")
            .to_insert_sql([("name", Value::from("John")), ("age", Value::from(30))])
            .unwrap();
        assert_eq!(compiled.sql, "INSERT INTO users (name, age) VALUES (?, ?)");
        assert_eq!(compiled.params, vec![Value::from("John"), Value::I32(30)]);
    }

    #[test]
    fn test_update() {
        let compiled = table("users")
            .where_(("id", 7))
            .to_update_sql(vec![("name", Value::from("Jane")), ("age", Value::Null)])
            .unwrap();
        assert_eq!(compiled.sql, "UPDATE users SET name = ?, age = ? WHERE id = ?");
        assert_eq!(
            compiled.params,
            vec![Value::from("Jane"), Value::Null, Value::I32(7)]
        );
    }

    #[test]
    fn test_update_honors_soft_delete_scope() {
        let compiled = table("posts")
            .soft_deletes()
            .where_(("id", 1))
            .or_where(("id", 2))
            .to_update_sql([("title", Value::from("t"))])
            .unwrap();
        assert_eq!(
            compiled.sql,
            "UPDATE posts SET title = ? WHERE (id = ? OR id = ?) AND deleted_at IS NULL"
        );
        assert_consistent(&compiled);
    }

    #[test]
    fn test_empty_update_fails() {
        let err = table("users")
            .to_update_sql(Vec::<(String, Value)>::new())
            .unwrap_err();
        assert!(err.is_query_error());
    }

    #[test]
    fn test_force_delete_uses_caller_conditions_only() {
        let compiled = table("posts")
            .soft_deletes()
            .where_(("author_id", 3))
            .to_force_delete_sql()
            .unwrap();
        assert_eq!(compiled.sql, "DELETE FROM posts WHERE author_id = ?");
        assert_eq!(compiled.params, vec![Value::I32(3)]);

        let compiled = table("posts").soft_deletes().to_force_delete_sql().unwrap();
        assert_eq!(compiled.sql, "DELETE FROM posts");
        assert!(!compiled.sql.contains("deleted_at"));
    }

    #[test]
    fn test_placeholder_count_skips_literals() {
        let compiled = CompiledQuery {
            sql: "SELECT '?' FROM t WHERE a = ?".into(),
            params: vec![Value::I32(1)],
        };
        assert_eq!(compiled.placeholder_count(), 1);
    }
}
