//! DELETE rendering

use super::common::{Field, IntoField};
use super::render::{Compiled, SqlWriter};
use crate::condition::ConditionTree;
use crate::Result;

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    table: Field,
    wheres: ConditionTree,
}

impl DeleteStatement {
    pub fn new<T: IntoField>(table: T) -> Self {
        Self {
            table: table.into_field(),
            wheres: ConditionTree::new(),
        }
    }

    /// Filter the deleted rows
    pub fn conditions(mut self, wheres: ConditionTree) -> Self {
        self.wheres = wheres;
        self
    }

    pub fn compile(&self, prefix: Option<&str>) -> Result<Compiled> {
        let mut w = SqlWriter::new(prefix);
        w.push("DELETE FROM ");
        w.push_table(&self.table);
        if !self.wheres.is_blank() {
            w.push(" WHERE ");
            self.wheres.render(&mut w)?;
        }
        w.finish()
    }
}
