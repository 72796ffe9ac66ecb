//! The query accumulator and its chainable mutators

use super::common::{
    Connector, EagerLoad, IntoColumns, IntoCondition, JoinClause, JoinType, OrderByClause,
    Predicate, SortDirection,
};
use super::compiler::CompiledQuery;
use super::soft_delete::Visibility;
use crate::operator::Arity;
use crate::{Error, Operand, Operator, QueryConfig, Result, Value};

#[derive(Debug, Clone, Copy)]
enum Clause {
    Where,
    Having,
}

/// Accumulated intent of one query.
///
/// Every mutator takes the builder by value and hands it back, so a chain
/// always owns exactly one accumulator. Mutators never fail: a malformed
/// condition is not recorded, and the first such error is returned by the
/// next compile (`to_sql` or any terminal call) before any SQL is produced.
///
/// # Examples
/// ```
/// use strata_core::{table, op};
///
/// let compiled = table("users")
///     .where_(("age", op::GT, 18))
///     .or_where(("vip", true))
///     .to_sql()
///     .unwrap();
/// assert_eq!(compiled.sql, "SELECT * FROM users WHERE age > ? OR vip = ?");
/// ```
#[derive(Debug)]
pub struct Query {
    pub(crate) table_name: String,
    pub(crate) selected_columns: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) join_clauses: Vec<JoinClause>,
    pub(crate) where_conditions: Vec<Predicate>,
    pub(crate) group_by_columns: Vec<String>,
    pub(crate) having_conditions: Vec<Predicate>,
    pub(crate) order_by_clauses: Vec<OrderByClause>,
    pub(crate) limit_value: Option<u64>,
    pub(crate) offset_value: Option<u64>,
    pub(crate) eager_loads: Vec<EagerLoad>,
    pub(crate) visibility: Visibility,
    pub(crate) config: QueryConfig,
    pub(crate) raw: Option<CompiledQuery>,
    pub(crate) error: Option<Error>,
}

impl Query {
    /// Create a new query on `table` with the default configuration
    pub fn new(table: &str) -> Self {
        Self::with_config(table, QueryConfig::default())
    }

    /// Create a new query on `table` with an explicit configuration
    pub fn with_config(table: &str, config: QueryConfig) -> Self {
        Self {
            table_name: table.to_string(),
            selected_columns: vec!["*".to_string()],
            distinct: false,
            join_clauses: Vec::new(),
            where_conditions: Vec::new(),
            group_by_columns: Vec::new(),
            having_conditions: Vec::new(),
            order_by_clauses: Vec::new(),
            limit_value: None,
            offset_value: None,
            eager_loads: Vec::new(),
            visibility: Visibility::default(),
            config,
            raw: None,
            error: None,
        }
    }

    /// Create a query whose compiled form is exactly `sql` and `params`.
    ///
    /// Nothing else set on the builder affects the statement.
    pub fn raw<I, V>(sql: &str, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut query = Self::new("");
        query.raw = Some(CompiledQuery {
            sql: sql.to_string(),
            params: params.into_iter().map(Into::into).collect(),
        });
        query
    }

    /// Select specific columns, replacing the current projection
    ///
    /// # Examples
    /// ```
    /// use strata_core::table;
    ///
    /// let query = table("users").select(("id", "name", "email"));
    /// ```
    pub fn select<T>(mut self, columns: T) -> Self
    where
        T: IntoColumns,
    {
        self.selected_columns = columns.into_columns();
        self
    }

    /// Append columns to the current projection
    pub fn add_select<T>(mut self, columns: T) -> Self
    where
        T: IntoColumns,
    {
        if self.selected_columns == ["*"] {
            self.selected_columns.clear();
        }
        self.selected_columns.extend(columns.into_columns());
        self
    }

    /// Mark the query as DISTINCT
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a WHERE condition
    ///
    /// # Examples
    /// ```
    /// use strata_core::{table, op};
    ///
    /// let query = table("users")
    ///     .where_(("age", op::GT, 18))
    ///     .where_(("name", "John"));
    /// ```
    pub fn where_<C>(self, condition: C) -> Self
    where
        C: IntoCondition,
    {
        self.push_condition(Clause::Where, condition, Connector::And)
    }

    /// Add an OR WHERE condition
    pub fn or_where<C>(self, condition: C) -> Self
    where
        C: IntoCondition,
    {
        self.push_condition(Clause::Where, condition, Connector::Or)
    }

    /// Add an AND WHERE condition (same as where_)
    pub fn and_where<C>(self, condition: C) -> Self
    where
        C: IntoCondition,
    {
        self.where_(condition)
    }

    /// `column IN (?, ...)`; an empty list fails at compile time
    pub fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::In, values, Connector::And)
    }

    pub fn or_where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::In, values, Connector::Or)
    }

    pub fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::NotIn, values, Connector::And)
    }

    pub fn or_where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::NotIn, values, Connector::Or)
    }

    /// `column IS NULL`
    pub fn where_null(self, column: &str) -> Self {
        self.push_operand(Clause::Where, column, Operator::Is, Operand::Null, Connector::And)
    }

    pub fn or_where_null(self, column: &str) -> Self {
        self.push_operand(Clause::Where, column, Operator::Is, Operand::Null, Connector::Or)
    }

    /// `column IS NOT NULL`
    pub fn where_not_null(self, column: &str) -> Self {
        self.push_operand(Clause::Where, column, Operator::IsNot, Operand::Null, Connector::And)
    }

    pub fn or_where_not_null(self, column: &str) -> Self {
        self.push_operand(Clause::Where, column, Operator::IsNot, Operand::Null, Connector::Or)
    }

    /// `column BETWEEN ? AND ?`; anything but exactly two values fails
    pub fn where_between<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::Between, values, Connector::And)
    }

    pub fn or_where_between<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::Between, values, Connector::Or)
    }

    pub fn where_not_between<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::NotBetween, values, Connector::And)
    }

    pub fn or_where_not_between<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_list(column, Operator::NotBetween, values, Connector::Or)
    }

    /// Add a JOIN clause with an explicit kind and comparison.
    ///
    /// The ON condition compares two columns, so only single-value
    /// operators are accepted; anything else fails at compile time.
    pub fn join(
        mut self,
        join_type: JoinType,
        table: &str,
        left_column: &str,
        operator: Operator,
        right_column: &str,
    ) -> Self {
        if operator.arity() != Arity::Single {
            self.record_error(Error::invalid_query(format!(
                "{} JOIN {} cannot compare columns with {}",
                join_type, table, operator
            )));
            return self;
        }
        self.join_clauses.push(JoinClause {
            join_type,
            table: table.to_string(),
            left_column: left_column.to_string(),
            operator,
            right_column: right_column.to_string(),
        });
        self
    }

    /// Add an INNER JOIN clause
    pub fn inner_join(self, table: &str, left_column: &str, right_column: &str) -> Self {
        self.join(JoinType::Inner, table, left_column, Operator::Eq, right_column)
    }

    /// Add a LEFT JOIN clause
    pub fn left_join(self, table: &str, left_column: &str, right_column: &str) -> Self {
        self.join(JoinType::Left, table, left_column, Operator::Eq, right_column)
    }

    /// Add a RIGHT JOIN clause
    pub fn right_join(self, table: &str, left_column: &str, right_column: &str) -> Self {
        self.join(JoinType::Right, table, left_column, Operator::Eq, right_column)
    }

    /// Add GROUP BY columns
    pub fn group_by<C>(mut self, columns: C) -> Self
    where
        C: IntoColumns,
    {
        self.group_by_columns.extend(columns.into_columns());
        self
    }

    /// Add a HAVING condition
    pub fn having<C>(self, condition: C) -> Self
    where
        C: IntoCondition,
    {
        self.push_condition(Clause::Having, condition, Connector::And)
    }

    /// Add an OR HAVING condition
    pub fn or_having<C>(self, condition: C) -> Self
    where
        C: IntoCondition,
    {
        self.push_condition(Clause::Having, condition, Connector::Or)
    }

    /// Add an ORDER BY clause
    pub fn order_by(mut self, column: &str, direction: SortDirection) -> Self {
        self.order_by_clauses.push(OrderByClause {
            column: column.to_string(),
            direction,
        });
        self
    }

    /// Add an ORDER BY ASC clause (convenience method)
    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, SortDirection::Asc)
    }

    /// Add an ORDER BY DESC clause (convenience method)
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, SortDirection::Desc)
    }

    /// Newest first by `column`
    pub fn latest(self, column: &str) -> Self {
        self.order_by_desc(column)
    }

    /// Oldest first by `column`
    pub fn oldest(self, column: &str) -> Self {
        self.order_by_asc(column)
    }

    /// Set the LIMIT clause; zero renders no LIMIT
    pub fn limit(mut self, count: u64) -> Self {
        self.limit_value = Some(count);
        self
    }

    /// Set the OFFSET clause; zero renders no OFFSET
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_value = Some(offset);
        self
    }

    /// Paginate with 1-based pages. Page 0 is treated as page 1.
    pub fn for_page(self, page: u64, per_page: u64) -> Self {
        let skip = page.max(1).saturating_sub(1).saturating_mul(per_page);
        self.limit(per_page).offset(skip)
    }

    /// Apply `f` only when `condition` holds
    pub fn when<F>(self, condition: bool, f: F) -> Self
    where
        F: FnOnce(Self) -> Self,
    {
        if condition {
            f(self)
        } else {
            self
        }
    }

    /// Record relations to eager load after the primary query
    pub fn with<R>(mut self, relations: R) -> Self
    where
        R: IntoColumns,
    {
        for relation in relations.into_columns() {
            self.record_eager_load(EagerLoad::Relation(relation));
        }
        self
    }

    /// Record relations whose row counts should be loaded
    pub fn with_count<R>(mut self, relations: R) -> Self
    where
        R: IntoColumns,
    {
        for relation in relations.into_columns() {
            self.record_eager_load(EagerLoad::Count(relation));
        }
        self
    }

    /// Enable soft deletes with the default marker columns
    pub fn soft_deletes(mut self) -> Self {
        if self.config.soft_deletes.is_none() {
            self.config = self.config.with_soft_deletes();
        }
        self
    }

    /// Include soft-deleted rows
    pub fn with_trashed(mut self) -> Self {
        self.visibility = Visibility::WithTrashed;
        self
    }

    /// Only soft-deleted rows
    pub fn only_trashed(mut self) -> Self {
        self.visibility = Visibility::OnlyTrashed;
        self
    }

    /// Back to the default: soft-deleted rows are excluded
    pub fn without_trashed(mut self) -> Self {
        self.visibility = Visibility::ExcludeTrashed;
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.selected_columns
    }

    pub fn where_conditions(&self) -> &[Predicate] {
        &self.where_conditions
    }

    pub fn having_conditions(&self) -> &[Predicate] {
        &self.having_conditions
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit_value
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset_value
    }

    /// Recorded eager loads, in the order they were first requested
    pub fn eager_loads(&self) -> &[EagerLoad] {
        &self.eager_loads
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn is_raw(&self) -> bool {
        self.raw.is_some()
    }

    fn record_eager_load(&mut self, load: EagerLoad) {
        if !self.eager_loads.contains(&load) {
            self.eager_loads.push(load);
        }
    }

    fn record_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push_condition<C>(mut self, clause: Clause, condition: C, connector: Connector) -> Self
    where
        C: IntoCondition,
    {
        match condition.into_condition() {
            Ok((column, operator, operand)) => {
                self.push_operand(clause, &column, operator, operand, connector)
            }
            Err(e) => {
                self.record_error(e);
                self
            }
        }
    }

    fn push_list<I, V>(
        self,
        column: &str,
        operator: Operator,
        values: I,
        connector: Connector,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let operand = Operand::List(values.into_iter().map(Into::into).collect());
        self.push_operand(Clause::Where, column, operator, operand, connector)
    }

    fn push_operand(
        mut self,
        clause: Clause,
        column: &str,
        operator: Operator,
        operand: Operand,
        connector: Connector,
    ) -> Self {
        match Predicate::new(column, operator, operand, connector) {
            Ok(predicate) => match clause {
                Clause::Where => self.where_conditions.push(predicate),
                Clause::Having => self.having_conditions.push(predicate),
            },
            Err(e) => self.record_error(e),
        }
        self
    }

    /// Surface the first error recorded by a mutator
    pub(crate) fn check(&self) -> Result<()> {
        match &self.error {
            Some(Error::InvalidQuery { message }) => Err(Error::invalid_query(message.clone())),
            Some(Error::SqlGeneration { message }) => Err(Error::sql_generation(message.clone())),
            Some(other) => Err(Error::invalid_query(other.to_string())),
            None => Ok(()),
        }
    }
}
