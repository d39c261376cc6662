//! INSERT, INSERT IGNORE and REPLACE rendering

use super::common::{Field, IntoField, IntoRow};
use super::render::{Compiled, SqlWriter};
use crate::{Error, Result, Value};

/// Which write verb an insert renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    Insert,
    InsertIgnore,
    Replace,
}

impl InsertKind {
    fn keyword(&self) -> &'static str {
        match self {
            InsertKind::Insert => "INSERT INTO",
            InsertKind::InsertIgnore => "INSERT IGNORE INTO",
            InsertKind::Replace => "REPLACE INTO",
        }
    }
}

/// A single-row insert
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    kind: InsertKind,
    table: Field,
    row: Vec<(String, Value)>,
    on_duplicate: Vec<(String, Value)>,
}

impl InsertStatement {
    pub fn new<T: IntoField>(kind: InsertKind, table: T) -> Self {
        Self {
            kind,
            table: table.into_field(),
            row: Vec::new(),
            on_duplicate: Vec::new(),
        }
    }

    /// Set the column values for the row
    pub fn values<R: IntoRow>(mut self, row: R) -> Self {
        self.row = row.into_row();
        self
    }

    /// Attach an `ON DUPLICATE KEY UPDATE` clause; its values are inlined
    pub fn on_duplicate_key_update<R: IntoRow>(mut self, row: R) -> Self {
        self.on_duplicate = row.into_row();
        self
    }

    pub fn compile(&self, prefix: Option<&str>) -> Result<Compiled> {
        if self.row.is_empty() {
            return Err(Error::invalid_statement(format!(
                "{} requires at least one column value",
                self.kind.keyword()
            )));
        }
        if self.kind == InsertKind::Replace && !self.on_duplicate.is_empty() {
            return Err(Error::invalid_statement(
                "REPLACE cannot carry ON DUPLICATE KEY UPDATE",
            ));
        }
        if let Some((column, _)) = self.row.iter().find(|(_, v)| v.as_array().is_some()) {
            return Err(Error::invalid_statement(format!(
                "column `{}` cannot take an array value",
                column
            )));
        }

        let mut w = SqlWriter::new(prefix);
        w.push(self.kind.keyword());
        w.push(" ");
        w.push_table(&self.table);

        // Columns
        let columns: Vec<&str> = self.row.iter().map(|(c, _)| c.as_str()).collect();
        w.push(" (");
        w.push(&columns.join(","));
        w.push(")");

        // VALUES clause
        w.push(" VALUES (");
        for (i, (_, value)) in self.row.iter().enumerate() {
            if i > 0 {
                w.push(",");
            }
            w.push_value(value);
        }
        w.push(")");

        if !self.on_duplicate.is_empty() {
            w.push(" ON DUPLICATE KEY UPDATE ");
            for (i, (column, value)) in self.on_duplicate.iter().enumerate() {
                if i > 0 {
                    w.push(",");
                }
                w.push(column);
                w.push("=");
                w.push_inline(value);
            }
        }

        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert() {
        let compiled = InsertStatement::new(InsertKind::Insert, "foo")
            .values(vec![("name", "Sana"), ("description", "Blah")])
            .compile(None)
            .unwrap();
        assert_eq!(compiled.sql, "INSERT INTO foo (name,description) VALUES (%s,%s)");
        assert_eq!(
            compiled.interpolate(Value::to_sql_inline).unwrap(),
            "INSERT INTO foo (name,description) VALUES ('Sana','Blah')"
        );
    }

    #[test]
    fn test_insert_ignore_with_prefix() {
        let compiled = InsertStatement::new(InsertKind::InsertIgnore, "foo")
            .values(vec![("id", Value::from(5)), ("note", Value::Null)])
            .compile(Some("wp_"))
            .unwrap();
        assert_eq!(compiled.sql, "INSERT IGNORE INTO wp_foo (id,note) VALUES (%d,NULL)");
        assert_eq!(compiled.bindings, vec![Value::I32(5)]);
    }

    #[test]
    fn test_on_duplicate_key_update_is_inlined() {
        let compiled = InsertStatement::new(InsertKind::Insert, "my_table")
            .values(vec![("name", Value::from("Baza")), ("counter", Value::from(2))])
            .on_duplicate_key_update(vec![("name", Value::from("Baza")), ("counter", Value::from(1))])
            .compile(None)
            .unwrap();
        assert_eq!(
            compiled.interpolate(Value::to_sql_inline).unwrap(),
            "INSERT INTO my_table (name,counter) VALUES ('Baza',2) ON DUPLICATE KEY UPDATE name='Baza',counter=1"
        );
        assert_eq!(compiled.bindings.len(), 2);
    }

    #[test]
    fn test_replace_uses_type_driven_placeholders() {
        let compiled = InsertStatement::new(InsertKind::Replace, "foo")
            .values(vec![
                ("id", Value::from(24)),
                ("name", Value::from("Glynn")),
                ("doubt", Value::from(true)),
            ])
            .compile(None)
            .unwrap();
        assert_eq!(compiled.sql, "REPLACE INTO foo (id,name,doubt) VALUES (%d,%s,%d)");
        assert_eq!(
            compiled.interpolate(Value::to_sql_inline).unwrap(),
            "REPLACE INTO foo (id,name,doubt) VALUES (24,'Glynn',1)"
        );
    }

    #[test]
    fn test_invalid_inserts() {
        assert!(InsertStatement::new(InsertKind::Insert, "foo").compile(None).is_err());
        assert!(InsertStatement::new(InsertKind::Insert, "foo")
            .values(vec![("tags", Value::from(vec![1, 2]))])
            .compile(None)
            .is_err());
        assert!(InsertStatement::new(InsertKind::Replace, "foo")
            .values(vec![("a", 1)])
            .on_duplicate_key_update(vec![("a", 2)])
            .compile(None)
            .is_err());
    }
}
