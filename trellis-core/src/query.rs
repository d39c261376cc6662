//! The fluent query builder bound to a connection

use crate::builder::{
    AggregateFunction, Compiled, DeleteStatement, Field, InsertKind, InsertStatement, IntoColumns,
    IntoField, IntoOperand, IntoRow, JoinClause, JoinType, SortDirection, Statement,
    UpdateStatement,
};
use crate::condition::{ConditionTree, IntoCondition};
use crate::connection::{Connection, StoredConnection};
use crate::events::{Event, EventContext, Operation};
use crate::executor::{Adapter, FetchMode, Row, WriteResult};
use crate::transaction::FailureLatch;
use crate::{IntoOperator, Raw, Result, Value};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

const SQL_TARGET: &str = "trellis::sql";

/// Result of [`QueryBuilder::update_or_insert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    /// Matching rows existed; carries the affected-row count
    Updated(u64),
    /// Nothing matched; carries the generated id, if any
    Inserted(Option<u64>),
}

/// A statement under construction plus the connection that will run it.
///
/// Clause methods consume and return the builder. Terminal operations
/// (`get`, `count`, `insert`, `update`, ...) borrow it, render the statement
/// and hand it to the connection's adapter.
///
/// # Examples
/// ```no_run
/// # async fn demo<A: trellis_core::Adapter>(conn: trellis_core::Connection<A>) -> trellis_core::Result<()> {
/// use trellis_core::{op, QueryBuilder};
///
/// let adults = QueryBuilder::new(conn)
///     .from("users")
///     .select(("id", "name"))
///     .where_(("age", op::GTE, 18))
///     .order_by_asc("name")
///     .get()
///     .await?;
/// # let _ = adults;
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<A: Adapter> {
    connection: Connection<A>,
    statement: Statement,
    fetch_mode: FetchMode,
    latch: Option<FailureLatch>,
}

impl<A: Adapter> Clone for QueryBuilder<A> {
    fn clone(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            statement: self.statement.clone(),
            fetch_mode: self.fetch_mode,
            latch: self.latch.clone(),
        }
    }
}

impl<A: Adapter> QueryBuilder<A> {
    pub fn new(connection: Connection<A>) -> Self {
        let fetch_mode = connection.config().fetch_mode;
        Self {
            connection,
            statement: Statement::new(),
            fetch_mode,
            latch: None,
        }
    }

    /// Builder on the stored fallback connection
    pub fn from_stored(store: &StoredConnection<A>) -> Result<Self> {
        Ok(Self::new(store.connection()?))
    }

    pub(crate) fn with_latch(mut self, latch: FailureLatch) -> Self {
        self.latch = Some(latch);
        self
    }

    /// Fresh statement on the same connection
    pub fn new_query(&self) -> Self {
        Self {
            connection: self.connection.clone(),
            statement: Statement::new(),
            fetch_mode: self.fetch_mode,
            latch: self.latch.clone(),
        }
    }

    /// Fresh statement on another connection
    pub fn new_query_with(&self, connection: Connection<A>) -> Self {
        Self::new(connection)
    }

    /// Fresh statement reading from `tables` on the same connection
    pub fn table<T: IntoColumns>(&self, tables: T) -> Self {
        self.new_query().from(tables)
    }

    pub fn connection(&self) -> &Connection<A> {
        &self.connection
    }

    pub fn set_connection(mut self, connection: Connection<A>) -> Self {
        self.connection = connection;
        self
    }

    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode
    }

    pub fn set_fetch_mode(mut self, mode: FetchMode) -> Self {
        self.fetch_mode = mode;
        self
    }

    /// The statement accumulated so far
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    fn prefix(&self) -> Option<&str> {
        self.connection.prefix()
    }

    // ---- clauses ----

    pub fn from<T: IntoColumns>(mut self, tables: T) -> Self {
        self.statement = self.statement.from(tables);
        self
    }

    pub fn select<C: IntoColumns>(mut self, columns: C) -> Self {
        self.statement = self.statement.select(columns);
        self
    }

    pub fn select_distinct<C: IntoColumns>(mut self, columns: C) -> Self {
        self.statement = self.statement.select_distinct(columns);
        self
    }

    /// Replace the assembled SELECT with a hand-written statement
    pub fn query(mut self, raw: Raw) -> Self {
        self.statement = self.statement.raw(raw);
        self
    }

    /// Add an `AND` condition; `("col", Value::Null)` renders `col IS NULL`
    pub fn where_<C: IntoCondition>(mut self, condition: C) -> Self {
        self.statement.wheres.where_(condition);
        self
    }

    pub fn or_where<C: IntoCondition>(mut self, condition: C) -> Self {
        self.statement.wheres.or_where(condition);
        self
    }

    pub fn where_not<C: IntoCondition>(mut self, condition: C) -> Self {
        self.statement.wheres.where_not(condition);
        self
    }

    pub fn or_where_not<C: IntoCondition>(mut self, condition: C) -> Self {
        self.statement.wheres.or_where_not(condition);
        self
    }

    pub fn where_in<F, I, V>(mut self, field: F, values: I) -> Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.statement.wheres.where_in(field, values);
        self
    }

    pub fn or_where_in<F, I, V>(mut self, field: F, values: I) -> Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.statement.wheres.or_where_in(field, values);
        self
    }

    pub fn where_not_in<F, I, V>(mut self, field: F, values: I) -> Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.statement.wheres.where_not_in(field, values);
        self
    }

    pub fn or_where_not_in<F, I, V>(mut self, field: F, values: I) -> Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.statement.wheres.or_where_not_in(field, values);
        self
    }

    pub fn where_between<F, L, H>(mut self, field: F, low: L, high: H) -> Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.statement.wheres.where_between(field, low, high);
        self
    }

    pub fn or_where_between<F, L, H>(mut self, field: F, low: L, high: H) -> Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.statement.wheres.or_where_between(field, low, high);
        self
    }

    pub fn where_not_between<F, L, H>(mut self, field: F, low: L, high: H) -> Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.statement.wheres.where_not_between(field, low, high);
        self
    }

    pub fn or_where_not_between<F, L, H>(mut self, field: F, low: L, high: H) -> Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.statement.wheres.or_where_not_between(field, low, high);
        self
    }

    pub fn where_null<F: IntoField>(mut self, field: F) -> Self {
        self.statement.wheres.where_null(field);
        self
    }

    pub fn or_where_null<F: IntoField>(mut self, field: F) -> Self {
        self.statement.wheres.or_where_null(field);
        self
    }

    pub fn where_not_null<F: IntoField>(mut self, field: F) -> Self {
        self.statement.wheres.where_not_null(field);
        self
    }

    pub fn or_where_not_null<F: IntoField>(mut self, field: F) -> Self {
        self.statement.wheres.or_where_not_null(field);
        self
    }

    /// `AND ( ... )` built by the closure
    pub fn where_group<F: FnOnce(&mut ConditionTree)>(mut self, f: F) -> Self {
        self.statement.wheres.where_group(f);
        self
    }

    pub fn or_where_group<F: FnOnce(&mut ConditionTree)>(mut self, f: F) -> Self {
        self.statement.wheres.or_where_group(f);
        self
    }

    pub fn where_not_group<F: FnOnce(&mut ConditionTree)>(mut self, f: F) -> Self {
        self.statement.wheres.where_not_group(f);
        self
    }

    pub fn or_where_not_group<F: FnOnce(&mut ConditionTree)>(mut self, f: F) -> Self {
        self.statement.wheres.or_where_not_group(f);
        self
    }

    pub fn having<C: IntoCondition>(mut self, condition: C) -> Self {
        self.statement.havings.where_(condition);
        self
    }

    pub fn or_having<C: IntoCondition>(mut self, condition: C) -> Self {
        self.statement.havings.or_where(condition);
        self
    }

    /// Inner join on a single column comparison
    pub fn join<T, L, O, R>(self, table: T, left: L, operator: O, right: R) -> Self
    where
        T: IntoField,
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.join_on(JoinType::Inner, table, left, operator, right)
    }

    pub fn inner_join<T, L, O, R>(self, table: T, left: L, operator: O, right: R) -> Self
    where
        T: IntoField,
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.join_on(JoinType::Inner, table, left, operator, right)
    }

    pub fn left_join<T, L, O, R>(self, table: T, left: L, operator: O, right: R) -> Self
    where
        T: IntoField,
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.join_on(JoinType::Left, table, left, operator, right)
    }

    pub fn right_join<T, L, O, R>(self, table: T, left: L, operator: O, right: R) -> Self
    where
        T: IntoField,
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.join_on(JoinType::Right, table, left, operator, right)
    }

    pub fn outer_join<T, L, O, R>(self, table: T, left: L, operator: O, right: R) -> Self
    where
        T: IntoField,
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.join_on(JoinType::Outer, table, left, operator, right)
    }

    pub fn cross_join<T, L, O, R>(self, table: T, left: L, operator: O, right: R) -> Self
    where
        T: IntoField,
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.join_on(JoinType::Cross, table, left, operator, right)
    }

    /// Join whose ON clauses are built by the closure.
    ///
    /// ```no_run
    /// # fn demo<A: trellis_core::Adapter>(db: trellis_core::QueryBuilder<A>) {
    /// use trellis_core::JoinType;
    ///
    /// let query = db.from("users").join_with(JoinType::Left, "posts", |j| {
    ///     j.on("users.id", "=", "posts.user_id")
    ///         .or_on("users.id", "=", "posts.editor_id");
    /// });
    /// # let _ = query;
    /// # }
    /// ```
    pub fn join_with<T, F>(mut self, join_type: JoinType, table: T, f: F) -> Self
    where
        T: IntoField,
        F: FnOnce(&mut JoinClause),
    {
        let mut join = JoinClause::new(join_type, table);
        f(&mut join);
        self.statement = self.statement.join(join);
        self
    }

    fn join_on<T, L, O, R>(self, join_type: JoinType, table: T, left: L, operator: O, right: R) -> Self
    where
        T: IntoField,
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.join_with(join_type, table, |j| {
            j.on(left, operator, right);
        })
    }

    pub fn group_by<C: IntoColumns>(mut self, columns: C) -> Self {
        self.statement = self.statement.group_by(columns);
        self
    }

    pub fn order_by<C: IntoColumns>(mut self, columns: C, direction: SortDirection) -> Self {
        self.statement = self.statement.order_by(columns, direction);
        self
    }

    pub fn order_by_asc<C: IntoColumns>(self, columns: C) -> Self {
        self.order_by(columns, SortDirection::Asc)
    }

    pub fn order_by_desc<C: IntoColumns>(self, columns: C) -> Self {
        self.order_by(columns, SortDirection::Desc)
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.statement = self.statement.limit(count);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.statement = self.statement.offset(offset);
        self
    }

    /// Assignments applied when an insert hits a duplicate key
    pub fn on_duplicate_key_update<R: IntoRow>(mut self, row: R) -> Self {
        self.statement = self.statement.on_duplicate_key_update(row);
        self
    }

    // ---- rendering ----

    /// The SELECT in its preparable form
    pub fn get_query(&self) -> Result<Compiled> {
        self.statement.compile_select(self.prefix())
    }

    /// Preparable SQL of the SELECT
    pub fn to_sql(&self) -> Result<String> {
        Ok(self.get_query()?.sql)
    }

    /// Values bound to the placeholders of [`to_sql`](Self::to_sql), in order
    pub fn bindings(&self) -> Result<Vec<Value>> {
        Ok(self.get_query()?.bindings)
    }

    /// SELECT with every binding inlined by the adapter's quoting rule
    pub fn to_raw_sql(&self) -> Result<String> {
        let adapter = self.connection.adapter();
        self.get_query()?.interpolate(|value| adapter.quote(value))
    }

    // ---- reads ----

    /// All matching rows
    pub async fn get(&self) -> Result<Vec<Row>> {
        let compiled = self.get_query()?;
        self.fetch_rows(compiled).await
    }

    /// All matching rows decoded through the builder's fetch mode
    pub async fn get_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let rows = self.get().await?;
        rows.iter().map(|row| row.decode(self.fetch_mode)).collect()
    }

    /// The first matching row.
    ///
    /// Assembled statements are limited to one row; a hand-written statement
    /// runs as is.
    pub async fn first(&self) -> Result<Option<Row>> {
        let compiled = if self.statement.raw.is_some() {
            self.get_query()?
        } else {
            self.statement
                .clone()
                .limit(1)
                .compile_select(self.prefix())?
        };
        Ok(self.fetch_rows(compiled).await?.into_iter().next())
    }

    pub async fn first_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.first().await? {
            Some(row) => Ok(Some(row.decode(self.fetch_mode)?)),
            None => Ok(None),
        }
    }

    /// First row whose `id` equals `value`
    pub async fn find<V: IntoOperand>(&self, value: V) -> Result<Option<Row>> {
        self.find_by("id", value).await
    }

    /// First row whose `field` equals `value`
    pub async fn find_by<F, V>(&self, field: F, value: V) -> Result<Option<Row>>
    where
        F: IntoField,
        V: IntoOperand,
    {
        self.clone().where_((field, value)).first().await
    }

    /// Every row whose `field` equals `value`
    pub async fn find_all<F, V>(&self, field: F, value: V) -> Result<Vec<Row>>
    where
        F: IntoField,
        V: IntoOperand,
    {
        self.clone().where_((field, value)).get().await
    }

    // ---- aggregates ----

    pub async fn count(&self) -> Result<u64> {
        let value = self.aggregate(AggregateFunction::Count, None).await?;
        Ok(value
            .and_then(|v| v.as_i64())
            .map(|n| n.max(0) as u64)
            .unwrap_or(0))
    }

    /// Sum of `column`; no rows sum to zero
    pub async fn sum<F: IntoField>(&self, column: F) -> Result<f64> {
        let value = self
            .aggregate(AggregateFunction::Sum, Some(column.into_field()))
            .await?;
        Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
    }

    pub async fn avg<F: IntoField>(&self, column: F) -> Result<f64> {
        let value = self
            .aggregate(AggregateFunction::Avg, Some(column.into_field()))
            .await?;
        Ok(value.and_then(|v| v.as_f64()).unwrap_or(0.0))
    }

    /// Smallest `column` value, as an integer when it is integral
    pub async fn min<F: IntoField>(&self, column: F) -> Result<Value> {
        let value = self
            .aggregate(AggregateFunction::Min, Some(column.into_field()))
            .await?;
        Ok(narrow_numeric(value.unwrap_or(Value::Null)))
    }

    /// Largest `column` value, as an integer when it is integral
    pub async fn max<F: IntoField>(&self, column: F) -> Result<Value> {
        let value = self
            .aggregate(AggregateFunction::Max, Some(column.into_field()))
            .await?;
        Ok(narrow_numeric(value.unwrap_or(Value::Null)))
    }

    async fn aggregate(
        &self,
        function: AggregateFunction,
        column: Option<Field>,
    ) -> Result<Option<Value>> {
        let compiled = self
            .statement
            .compile_aggregate(function, column.as_ref(), self.prefix())?;
        let rows = self.fetch_rows(compiled).await?;
        Ok(rows.into_iter().next().and_then(|row| {
            row.get("field")
                .or_else(|| row.get_index(0))
                .cloned()
        }))
    }

    // ---- writes ----

    /// Insert one row; returns the generated id, if any
    pub async fn insert<R: IntoRow>(&self, row: R) -> Result<Option<u64>> {
        let result = self.write_insert(InsertKind::Insert, row).await?;
        Ok(result.last_insert_id)
    }

    /// Insert each row with its own statement; ids come back in input order
    pub async fn insert_many<I, R>(&self, rows: I) -> Result<Vec<Option<u64>>>
    where
        I: IntoIterator<Item = R>,
        R: IntoRow,
    {
        let mut ids = Vec::new();
        for row in rows {
            ids.push(self.insert(row).await?);
        }
        Ok(ids)
    }

    /// `INSERT IGNORE` one row
    pub async fn insert_ignore<R: IntoRow>(&self, row: R) -> Result<Option<u64>> {
        let result = self.write_insert(InsertKind::InsertIgnore, row).await?;
        Ok(result.last_insert_id)
    }

    pub async fn insert_ignore_many<I, R>(&self, rows: I) -> Result<Vec<Option<u64>>>
    where
        I: IntoIterator<Item = R>,
        R: IntoRow,
    {
        let mut ids = Vec::new();
        for row in rows {
            ids.push(self.insert_ignore(row).await?);
        }
        Ok(ids)
    }

    /// `REPLACE INTO` one row
    pub async fn replace<R: IntoRow>(&self, row: R) -> Result<WriteResult> {
        self.write_insert(InsertKind::Replace, row).await
    }

    /// Update matching rows; returns the affected-row count
    pub async fn update<R: IntoRow>(&self, row: R) -> Result<u64> {
        let table = self.statement.single_table("UPDATE")?;
        let compiled = UpdateStatement::new(table)
            .set(row)
            .conditions(self.statement.wheres.clone())
            .compile(self.prefix())?;
        Ok(self.execute_write(Operation::Update, compiled).await?.affected_rows)
    }

    /// Update the rows matching the current conditions, or insert `row` when
    /// none match
    pub async fn update_or_insert<R: IntoRow>(&self, row: R) -> Result<Upserted> {
        let row = row.into_row();
        if self.first().await?.is_some() {
            Ok(Upserted::Updated(self.update(row).await?))
        } else {
            Ok(Upserted::Inserted(self.insert(row).await?))
        }
    }

    /// Delete matching rows; returns the affected-row count
    pub async fn delete(&self) -> Result<u64> {
        let table = self.statement.single_table("DELETE")?;
        let compiled = DeleteStatement::new(table)
            .conditions(self.statement.wheres.clone())
            .compile(self.prefix())?;
        Ok(self.execute_write(Operation::Delete, compiled).await?.affected_rows)
    }

    async fn write_insert<R: IntoRow>(&self, kind: InsertKind, row: R) -> Result<WriteResult> {
        let verb = match kind {
            InsertKind::Replace => "REPLACE",
            _ => "INSERT",
        };
        let table = self.statement.single_table(verb)?;
        let compiled = InsertStatement::new(kind, table)
            .values(row)
            .on_duplicate_key_update(self.statement.on_duplicate.clone())
            .compile(self.prefix())?;
        self.execute_write(Operation::Insert, compiled).await
    }

    // ---- adapter calls ----

    async fn fetch_rows(&self, compiled: Compiled) -> Result<Vec<Row>> {
        let table = self.statement.table_name();
        self.fire(Operation::Select.before(), table, &compiled, None)?;
        debug!(target: SQL_TARGET, sql = %compiled.sql, bindings = compiled.bindings.len(), "fetch");
        let started = Instant::now();
        let result = self
            .connection
            .adapter()
            .fetch(&compiled.sql, &compiled.bindings)
            .await;
        let rows = self.observe(result)?;
        self.fire(Operation::Select.after(), table, &compiled, Some(started.elapsed()))?;
        Ok(rows)
    }

    async fn execute_write(&self, operation: Operation, compiled: Compiled) -> Result<WriteResult> {
        let table = self.statement.table_name();
        self.fire(operation.before(), table, &compiled, None)?;
        debug!(target: SQL_TARGET, sql = %compiled.sql, bindings = compiled.bindings.len(), "execute");
        let started = Instant::now();
        let result = self
            .connection
            .adapter()
            .execute(&compiled.sql, &compiled.bindings)
            .await;
        let written = self.observe(result)?;
        self.fire(operation.after(), table, &compiled, Some(started.elapsed()))?;
        Ok(written)
    }

    fn fire(
        &self,
        event: Event,
        table: Option<&str>,
        statement: &Compiled,
        elapsed: Option<Duration>,
    ) -> Result<()> {
        self.connection.events().fire(&EventContext {
            event,
            table,
            statement,
            elapsed,
        })
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let (Err(err), Some(latch)) = (&result, &self.latch) {
            if err.is_adapter_fault() {
                latch.record(err);
            }
        }
        result
    }
}

fn narrow_numeric(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        other => match (other.as_i64(), other.as_f64()) {
            (Some(i), _) => Value::I64(i),
            (None, Some(f)) => Value::F64(f),
            (None, None) => other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_numeric() {
        assert_eq!(narrow_numeric(Value::from("42")), Value::I64(42));
        assert_eq!(narrow_numeric(Value::F64(3.0)), Value::I64(3));
        assert_eq!(narrow_numeric(Value::from("2.5")), Value::F64(2.5));
        assert_eq!(narrow_numeric(Value::from("abc")), Value::from("abc"));
        assert_eq!(narrow_numeric(Value::Null), Value::Null);
    }
}
