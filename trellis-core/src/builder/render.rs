//! Placeholder rendering and binding interpolation

use super::common::Field;
use crate::{Error, Raw, Result, Value};

/// A rendered statement: preparable SQL plus its ordered bindings
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl Compiled {
    /// Substitute the bindings into the SQL with the given quoting rule
    pub fn interpolate<F>(&self, quote: F) -> Result<String>
    where
        F: Fn(&Value) -> String,
    {
        interpolate(&self.sql, &self.bindings, quote)
    }
}

/// Replace each `%d`/`%f`/`%s` with the next binding quoted by `quote`.
///
/// `%%` collapses to a single `%`; any other `%` is copied as is. The number
/// of placeholders and bindings must match.
pub fn interpolate<F>(sql: &str, bindings: &[Value], quote: F) -> Result<String>
where
    F: Fn(&Value) -> String,
{
    let mut out = String::with_capacity(sql.len());
    let mut values = bindings.iter();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some('d') | Some('f') | Some('s') => {
                chars.next();
                let value = values.next().ok_or_else(|| {
                    Error::invalid_statement(format!(
                        "{} binding(s) supplied for more placeholders in `{}`",
                        bindings.len(),
                        sql
                    ))
                })?;
                value.ensure_finite()?;
                out.push_str(&quote(value));
            }
            _ => out.push('%'),
        }
    }

    if values.next().is_some() {
        return Err(Error::invalid_statement(format!(
            "{} binding(s) supplied for fewer placeholders in `{}`",
            bindings.len(),
            sql
        )));
    }

    Ok(out)
}

/// Accumulates preparable SQL and the bindings it references.
///
/// The first value that cannot be written as SQL is kept and reported by
/// [`finish`](Self::finish).
pub(crate) struct SqlWriter<'a> {
    sql: String,
    bindings: Vec<Value>,
    prefix: Option<&'a str>,
    fault: Option<Error>,
}

impl<'a> SqlWriter<'a> {
    pub fn new(prefix: Option<&'a str>) -> Self {
        Self {
            sql: String::new(),
            bindings: Vec::new(),
            prefix,
            fault: None,
        }
    }

    pub fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    /// Write a value as a placeholder and record its binding.
    ///
    /// `NULL` is written literally without a binding; arrays become a
    /// parenthesized placeholder list.
    pub fn push_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.sql.push_str("NULL"),
            Value::Array(items) => self.push_list(items),
            other => {
                self.check(other);
                self.sql.push_str(other.placeholder());
                self.bindings.push(other.clone());
            }
        }
    }

    /// Write `(v1, v2, ...)` with one placeholder per value
    pub fn push_list(&mut self, items: &[Value]) {
        self.sql.push('(');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_value(item);
        }
        self.sql.push(')');
    }

    /// Write a value inline; `%` is doubled so interpolation leaves it intact
    pub fn push_inline(&mut self, value: &Value) {
        self.check(value);
        self.sql.push_str(&value.to_sql_inline().replace('%', "%%"));
    }

    pub fn push_raw(&mut self, raw: &Raw) {
        self.sql.push_str(raw.template());
        for value in raw.bindings() {
            self.check(value);
        }
        self.bindings.extend(raw.bindings().iter().cloned());
    }

    /// Write a column reference, prefixing the table part of dotted names
    pub fn push_column(&mut self, field: &Field) {
        match field {
            Field::Column(name) => {
                let name = self.prefixed_column(name);
                self.sql.push_str(&name);
            }
            Field::Aliased { name, alias } => {
                let name = self.prefixed_column(name);
                self.sql.push_str(&name);
                self.sql.push_str(" AS ");
                self.sql.push_str(alias);
            }
            Field::Raw(raw) => self.push_raw(raw),
        }
    }

    /// Write a table reference with the connection prefix applied
    pub fn push_table(&mut self, field: &Field) {
        match field {
            Field::Column(name) => {
                let name = self.prefixed_table(name);
                self.sql.push_str(&name);
            }
            Field::Aliased { name, alias } => {
                let name = self.prefixed_table(name);
                self.sql.push_str(&name);
                self.sql.push_str(" AS ");
                self.sql.push_str(alias);
            }
            Field::Raw(raw) => self.push_raw(raw),
        }
    }

    pub fn push_columns(&mut self, fields: &[Field]) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_column(field);
        }
    }

    pub fn push_tables(&mut self, fields: &[Field]) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_table(field);
        }
    }

    fn prefixed_table(&self, name: &str) -> String {
        match self.prefix {
            Some(prefix) => format!("{}{}", prefix, name),
            None => name.to_string(),
        }
    }

    fn prefixed_column(&self, name: &str) -> String {
        match (self.prefix, name.split_once('.')) {
            (Some(prefix), Some((table, column))) => format!("{}{}.{}", prefix, table, column),
            _ => name.to_string(),
        }
    }

    fn check(&mut self, value: &Value) {
        if self.fault.is_none() {
            self.fault = value.ensure_finite().err();
        }
    }

    pub fn finish(self) -> Result<Compiled> {
        match self.fault {
            Some(err) => Err(err),
            None => Ok(Compiled {
                sql: self.sql,
                bindings: self.bindings,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_quotes_each_binding() {
        let sql = interpolate(
            "SELECT * FROM foo WHERE a = %s AND b = %d AND c = %f",
            &[Value::from("x"), Value::from(3), Value::from(1.5)],
            Value::to_sql_inline,
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM foo WHERE a = 'x' AND b = 3 AND c = 1.5");
    }

    #[test]
    fn test_interpolate_collapses_escaped_percent() {
        let sql = interpolate("name LIKE 'a%%' AND id = %d", &[Value::from(1)], Value::to_sql_inline)
            .unwrap();
        assert_eq!(sql, "name LIKE 'a%' AND id = 1");
    }

    #[test]
    fn test_interpolate_rejects_count_mismatch() {
        assert!(interpolate("a = %s", &[], Value::to_sql_inline).is_err());
        assert!(interpolate("a = 1", &[Value::from(1)], Value::to_sql_inline).is_err());
    }

    #[test]
    fn test_writer_null_and_array_values() {
        let mut writer = SqlWriter::new(None);
        writer.push("a = ");
        writer.push_value(&Value::Null);
        writer.push(" AND b IN ");
        writer.push_value(&Value::from(vec![Value::from(2), Value::from("x")]));
        let compiled = writer.finish().unwrap();
        assert_eq!(compiled.sql, "a = NULL AND b IN (%d, %s)");
        assert_eq!(compiled.bindings, vec![Value::from(2), Value::from("x")]);
    }

    #[test]
    fn test_writer_prefixes_tables_and_dotted_columns() {
        let mut writer = SqlWriter::new(Some("wp_"));
        writer.push_table(&Field::Column("posts".into()));
        writer.push(" ");
        writer.push_column(&Field::Column("posts.id".into()));
        writer.push(" ");
        writer.push_column(&Field::Column("id".into()));
        assert_eq!(writer.finish().unwrap().sql, "wp_posts wp_posts.id id");
    }

    #[test]
    fn test_inline_value_escapes_percent() {
        let mut writer = SqlWriter::new(None);
        writer.push_inline(&Value::from("50%"));
        let compiled = writer.finish().unwrap();
        assert_eq!(compiled.sql, "'50%%'");
        assert_eq!(compiled.interpolate(Value::to_sql_inline).unwrap(), "'50%'");
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        let mut writer = SqlWriter::new(None);
        writer.push("a = ");
        writer.push_value(&Value::F64(f64::NAN));
        assert!(matches!(writer.finish(), Err(Error::InvalidStatement { .. })));

        let mut writer = SqlWriter::new(None);
        writer.push_inline(&Value::from(vec![Value::F32(1.0), Value::F32(f32::INFINITY)]));
        assert!(writer.finish().is_err());

        assert!(interpolate("a = %f", &[Value::F64(f64::NEG_INFINITY)], Value::to_sql_inline).is_err());
    }
}
