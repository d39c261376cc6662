//! In-memory statement state

use super::common::{Field, IntoColumns, IntoRow, OrderByClause, SortDirection};
use super::join::JoinClause;
use crate::condition::ConditionTree;
use crate::{Error, Raw, Result, Value};

/// Everything a builder has accumulated for one logical query.
///
/// A statement is plain data. It is rendered by [`Statement::compile_select`],
/// [`Statement::compile_aggregate`] or handed to the INSERT/UPDATE/DELETE
/// renderers by the query builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub tables: Vec<Field>,
    pub columns: Vec<Field>,
    pub distinct: bool,
    pub joins: Vec<JoinClause>,
    pub wheres: ConditionTree,
    pub group_by: Vec<Field>,
    pub havings: ConditionTree,
    pub order_by: Vec<OrderByClause>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Hand-written statement replacing everything above when rendering reads
    pub raw: Option<Raw>,
    /// `ON DUPLICATE KEY UPDATE` assignments, only used by INSERT
    pub on_duplicate: Vec<(String, Value)>,
}

impl Statement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a statement reading from the given tables
    pub fn table<T: IntoColumns>(tables: T) -> Self {
        Self::new().from(tables)
    }

    /// Append one or more tables to the FROM list
    pub fn from<T: IntoColumns>(mut self, tables: T) -> Self {
        self.tables.extend(tables.into_columns());
        self
    }

    /// Append selected columns
    pub fn select<C: IntoColumns>(mut self, columns: C) -> Self {
        self.columns.extend(columns.into_columns());
        self
    }

    /// Append selected columns and mark the statement DISTINCT
    pub fn select_distinct<C: IntoColumns>(mut self, columns: C) -> Self {
        self.distinct = true;
        self.select(columns)
    }

    pub fn join(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    /// Add WHERE conditions through the tree API
    pub fn filter<F: FnOnce(&mut ConditionTree)>(mut self, f: F) -> Self {
        f(&mut self.wheres);
        self
    }

    /// Add HAVING conditions through the tree API
    pub fn having_filter<F: FnOnce(&mut ConditionTree)>(mut self, f: F) -> Self {
        f(&mut self.havings);
        self
    }

    pub fn group_by<C: IntoColumns>(mut self, columns: C) -> Self {
        self.group_by.extend(columns.into_columns());
        self
    }

    pub fn order_by<C: IntoColumns>(mut self, columns: C, direction: SortDirection) -> Self {
        self.order_by.extend(
            columns
                .into_columns()
                .into_iter()
                .map(|field| OrderByClause { field, direction }),
        );
        self
    }

    pub fn limit(mut self, count: u64) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Replace the assembled SELECT with a hand-written statement
    pub fn raw(mut self, raw: Raw) -> Self {
        self.raw = Some(raw);
        self
    }

    pub fn on_duplicate_key_update<R: IntoRow>(mut self, row: R) -> Self {
        self.on_duplicate = row.into_row();
        self
    }

    /// True when an aggregate can run directly against the bare tables
    pub fn is_simple(&self) -> bool {
        self.raw.is_none()
            && !self.distinct
            && self.joins.is_empty()
            && self.wheres.is_blank()
            && self.group_by.is_empty()
            && self.havings.is_blank()
            && self.order_by.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
    }

    /// The one table a write statement targets
    /// Name of the first table as written, if it is not a raw fragment
    pub fn table_name(&self) -> Option<&str> {
        match self.tables.first()? {
            Field::Column(name) | Field::Aliased { name, .. } => Some(name),
            Field::Raw(_) => None,
        }
    }

    pub fn single_table(&self, verb: &str) -> Result<Field> {
        match self.tables.as_slice() {
            [table] => Ok(table.clone()),
            [] => Err(Error::invalid_statement(format!(
                "{} requires a table; call table() first",
                verb
            ))),
            _ => Err(Error::invalid_statement(format!(
                "{} targets exactly one table, {} given",
                verb,
                self.tables.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_statement_detection() {
        let stmt = Statement::table("foo");
        assert!(stmt.is_simple());
        assert!(!stmt.clone().limit(1).is_simple());
        assert!(!stmt.clone().select_distinct("a").is_simple());
        assert!(!stmt.clone().filter(|w| {
            w.where_(("a", 1i32));
        }).is_simple());
        assert!(stmt.filter(|w| {
            w.where_group(|_| {});
        }).is_simple());
    }

    #[test]
    fn test_single_table() {
        assert_eq!(
            Statement::table("foo").single_table("UPDATE").unwrap(),
            Field::Column("foo".into())
        );
        assert!(Statement::new().single_table("DELETE").is_err());
        assert!(Statement::new()
            .from(("foo", "bar"))
            .single_table("INSERT")
            .is_err());
    }
}
