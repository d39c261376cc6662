//! Adapter interface and result types

use crate::{Result, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// How typed decoding sees a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// One JSON object per row, keyed by column name
    #[default]
    Assoc,
    /// One JSON array per row, in column order
    Numeric,
}

/// A result row addressable by column name or position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Value of the first column with the given name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Value at the given position
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.columns.get(index).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, value)| value)
    }

    /// JSON view of the row for the given fetch mode
    pub fn to_json(&self, mode: FetchMode) -> serde_json::Value {
        match mode {
            FetchMode::Assoc => serde_json::Value::Object(
                self.columns
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
            FetchMode::Numeric => {
                serde_json::Value::Array(self.values().map(Value::to_json).collect())
            }
        }
    }

    /// Decode the row into `T` through its JSON view
    pub fn decode<T: DeserializeOwned>(&self, mode: FetchMode) -> Result<T> {
        Ok(serde_json::from_value(self.to_json(mode))?)
    }
}

/// Outcome of a write statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteResult {
    pub affected_rows: u64,
    /// Auto-increment id generated by the statement, if any
    pub last_insert_id: Option<u64>,
}

/// Execution backend for rendered statements.
///
/// The builder hands every statement over in its preparable form: SQL with
/// `%d`/`%f`/`%s` placeholders plus the values bound to them, in order. A
/// literal `%` in the SQL arrives doubled as `%%`.
pub trait Adapter: Send + Sync + 'static {
    /// Run a statement that returns rows
    fn fetch(&self, sql: &str, bindings: &[Value]) -> impl Future<Output = Result<Vec<Row>>> + Send;

    /// Run a statement that writes
    fn execute(
        &self,
        sql: &str,
        bindings: &[Value],
    ) -> impl Future<Output = Result<WriteResult>> + Send;

    /// Issue `START TRANSACTION`
    fn begin_transaction(&self) -> impl Future<Output = Result<()>> + Send;

    /// Issue `COMMIT`
    fn commit(&self) -> impl Future<Output = Result<()>> + Send;

    /// Issue `ROLLBACK`
    fn rollback(&self) -> impl Future<Output = Result<()>> + Send;

    /// Quote a value the way the adapter substitutes bindings.
    ///
    /// Only used to render the inlined diagnostic form of a statement.
    fn quote(&self, value: &Value) -> String {
        value.to_sql_inline()
    }
}

/// MySQL adapter over a single sqlx connection
#[cfg(feature = "mysql")]
pub mod mysql {
    use super::*;
    use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};
    use sqlx::query::Query;
    use sqlx::{Column, Connection, Executor, MySql, Row as SqlxRow, TypeInfo};
    use tokio::sync::Mutex;

    /// MySQL connection wrapper.
    ///
    /// Statements share one session so that `START TRANSACTION` and the
    /// statements that follow it run on the same connection.
    pub struct MySqlAdapter {
        inner: Mutex<MySqlConnection>,
    }

    impl MySqlAdapter {
        /// Open a connection from a `mysql://` URL
        pub async fn connect(database_url: &str) -> Result<Self> {
            let conn = MySqlConnection::connect(database_url).await?;
            Ok(Self::from_connection(conn))
        }

        /// Wrap an existing connection
        pub fn from_connection(conn: MySqlConnection) -> Self {
            Self {
                inner: Mutex::new(conn),
            }
        }

        async fn run_command(&self, command: &str) -> Result<()> {
            let mut conn = self.inner.lock().await;
            (&mut *conn).execute(command).await?;
            Ok(())
        }
    }

    impl Adapter for MySqlAdapter {
        async fn fetch(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
            let sql = to_native_placeholders(sql);
            let query = bind_values_to_query(sqlx::query(&sql), bindings);
            let mut conn = self.inner.lock().await;
            let rows = query.fetch_all(&mut *conn).await?;
            rows.iter().map(row_from_mysql).collect()
        }

        async fn execute(&self, sql: &str, bindings: &[Value]) -> Result<WriteResult> {
            let sql = to_native_placeholders(sql);
            let query = bind_values_to_query(sqlx::query(&sql), bindings);
            let mut conn = self.inner.lock().await;
            let result = query.execute(&mut *conn).await?;
            let last_insert_id = match result.last_insert_id() {
                0 => None,
                id => Some(id),
            };
            Ok(WriteResult {
                affected_rows: result.rows_affected(),
                last_insert_id,
            })
        }

        async fn begin_transaction(&self) -> Result<()> {
            self.run_command("START TRANSACTION").await
        }

        async fn commit(&self) -> Result<()> {
            self.run_command("COMMIT").await
        }

        async fn rollback(&self) -> Result<()> {
            self.run_command("ROLLBACK").await
        }
    }

    /// Rewrite `%d`/`%f`/`%s` into `?` and collapse `%%`
    pub(crate) fn to_native_placeholders(sql: &str) -> String {
        let mut out = String::with_capacity(sql.len());
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
                    out.push('?');
                }
                _ => out.push('%'),
            }
        }
        out
    }

    /// Bind Trellis Values to a sqlx query
    fn bind_values_to_query<'q>(
        mut query: Query<'q, MySql, MySqlArguments>,
        params: &[Value],
    ) -> Query<'q, MySql, MySqlArguments> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<String>),
                Value::Bool(b) => query.bind(*b),
                Value::I32(i) => query.bind(*i),
                Value::I64(i) => query.bind(*i),
                Value::F32(f) => query.bind(*f),
                Value::F64(f) => query.bind(*f),
                Value::String(s) => query.bind(s.clone()),
                Value::Json(j) => query.bind(j.to_string()),
                Value::Array(items) => query.bind(Value::Array(items.clone()).to_json().to_string()),
            };
        }
        query
    }

    fn row_from_mysql(row: &MySqlRow) -> Result<Row> {
        let mut out = Row::new();
        for (index, column) in row.columns().iter().enumerate() {
            out.push(column.name(), column_value(row, index)?);
        }
        Ok(out)
    }

    /// Column types whose binary-protocol encoding is not text
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum PackedKind {
        Date,
        DateTime,
        Time,
        Year,
        Decimal,
    }

    impl PackedKind {
        pub(crate) fn from_type_name(name: &str) -> Option<Self> {
            match name {
                "DATE" => Some(Self::Date),
                "DATETIME" | "TIMESTAMP" => Some(Self::DateTime),
                "TIME" => Some(Self::Time),
                "YEAR" => Some(Self::Year),
                "DECIMAL" => Some(Self::Decimal),
                _ => None,
            }
        }
    }

    fn packed_value(row: &MySqlRow, index: usize, kind: PackedKind) -> Result<Value> {
        use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

        let value = match kind {
            PackedKind::Date => row.try_get::<Option<NaiveDate>, _>(index)?.into(),
            PackedKind::DateTime => row.try_get::<Option<NaiveDateTime>, _>(index)?.into(),
            PackedKind::Time => row
                .try_get::<Option<NaiveTime>, _>(index)?
                .map(|t| t.to_string())
                .into(),
            PackedKind::Year => row.try_get_unchecked::<Option<i64>, _>(index)?.into(),
            PackedKind::Decimal => match row.try_get::<Option<rust_decimal::Decimal>, _>(index) {
                Ok(v) => v.into(),
                // wider than rust_decimal holds; DECIMAL is sent as text
                Err(_) => row.try_get_unchecked::<Option<String>, _>(index)?.into(),
            },
        };
        Ok(value)
    }

    // Decoders are tried from the narrowest match outwards.
    fn column_value(row: &MySqlRow, index: usize) -> Result<Value> {
        let type_name = row.column(index).type_info().name();
        if let Some(kind) = PackedKind::from_type_name(type_name) {
            return packed_value(row, index, kind);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            return Ok(v.into());
        }
        if let Ok(v) = row.try_get::<Option<u64>, _>(index) {
            return Ok(v.map(|u| match i64::try_from(u) {
                Ok(i) => Value::I64(i),
                Err(_) => Value::String(u.to_string()),
            })
            .unwrap_or(Value::Null));
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            return Ok(v.into());
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
            return Ok(v.into());
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            return Ok(v.into());
        }
        let bytes = row.try_get_unchecked::<Option<Vec<u8>>, _>(index)?;
        Ok(bytes
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        id: i64,
        name: String,
    }

    fn sample() -> Row {
        Row::from_pairs(vec![("id", Value::I64(1)), ("name", Value::from("Sana"))])
    }

    #[test]
    fn test_row_access() {
        let row = sample();
        assert_eq!(row.get("name"), Some(&Value::from("Sana")));
        assert_eq!(row.get_index(0), Some(&Value::I64(1)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_assoc_decoding() {
        let user: User = sample().decode(FetchMode::Assoc).unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "Sana".to_string()
            }
        );
    }

    #[test]
    fn test_numeric_decoding() {
        let row = sample();
        assert_eq!(row.to_json(FetchMode::Numeric), serde_json::json!([1, "Sana"]));
        let tuple: (i64, String) = row.decode(FetchMode::Numeric).unwrap();
        assert_eq!(tuple, (1, "Sana".to_string()));
    }

    #[test]
    fn test_decode_mismatch_is_serialization_error() {
        let result: Result<(i64, String)> = sample().decode(FetchMode::Assoc);
        assert!(matches!(result, Err(crate::Error::Serialization(_))));
    }

    #[test]
    fn test_fetch_mode_serde() {
        let mode: FetchMode = serde_json::from_str("\"numeric\"").unwrap();
        assert_eq!(mode, FetchMode::Numeric);
        assert_eq!(serde_json::to_string(&FetchMode::Assoc).unwrap(), "\"assoc\"");
    }
}
