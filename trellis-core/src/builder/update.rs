//! UPDATE rendering

use super::common::{Field, IntoField, IntoRow};
use super::render::{Compiled, SqlWriter};
use crate::condition::ConditionTree;
use crate::{Error, Result, Value};

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    table: Field,
    set_clauses: Vec<(String, Value)>,
    wheres: ConditionTree,
}

impl UpdateStatement {
    pub fn new<T: IntoField>(table: T) -> Self {
        Self {
            table: table.into_field(),
            set_clauses: Vec::new(),
            wheres: ConditionTree::new(),
        }
    }

    /// Set column values
    pub fn set<R: IntoRow>(mut self, row: R) -> Self {
        self.set_clauses.extend(row.into_row());
        self
    }

    /// Filter the updated rows
    pub fn conditions(mut self, wheres: ConditionTree) -> Self {
        self.wheres = wheres;
        self
    }

    pub fn compile(&self, prefix: Option<&str>) -> Result<Compiled> {
        if self.set_clauses.is_empty() {
            return Err(Error::invalid_statement("UPDATE requires SET clauses"));
        }

        let mut w = SqlWriter::new(prefix);

        // UPDATE clause
        w.push("UPDATE ");
        w.push_table(&self.table);

        // SET clause
        w.push(" SET ");
        for (i, (column, value)) in self.set_clauses.iter().enumerate() {
            if i > 0 {
                w.push(",");
            }
            w.push(column);
            w.push("=");
            w.push_value(value);
        }

        // WHERE clause
        if !self.wheres.is_blank() {
            w.push(" WHERE ");
            self.wheres.render(&mut w)?;
        }

        w.finish()
    }
}
