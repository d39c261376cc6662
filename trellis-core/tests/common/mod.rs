#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use trellis_core::{
    Adapter, Config, Connection, Error, QueryBuilder, Result, Row, Value, WriteResult,
};

/// One adapter interaction, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch { sql: String, bindings: Vec<Value> },
    Execute { sql: String, bindings: Vec<Value> },
    Begin,
    Commit,
    Rollback,
}

impl Call {
    pub fn fetch(sql: &str, bindings: Vec<Value>) -> Self {
        Call::Fetch {
            sql: sql.to_string(),
            bindings,
        }
    }

    pub fn execute(sql: &str, bindings: Vec<Value>) -> Self {
        Call::Execute {
            sql: sql.to_string(),
            bindings,
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    fetches: VecDeque<Result<Vec<Row>>>,
    writes: VecDeque<Result<WriteResult>>,
    commit_error: Option<String>,
}

/// Adapter that records every call and replays scripted results.
///
/// Unscripted fetches return no rows; unscripted writes affect nothing.
#[derive(Default)]
pub struct MockAdapter {
    state: Mutex<State>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state().fetches.push_back(Ok(rows));
    }

    pub fn push_fetch_error(&self, message: &str) {
        self.state().fetches.push_back(Err(Error::adapter(message)));
    }

    pub fn push_write(&self, affected_rows: u64, last_insert_id: Option<u64>) {
        self.state().writes.push_back(Ok(WriteResult {
            affected_rows,
            last_insert_id,
        }));
    }

    pub fn push_write_error(&self, message: &str) {
        self.state().writes.push_back(Err(Error::adapter(message)));
    }

    /// Make every later COMMIT fail after it is recorded
    pub fn fail_commit(&self, message: &str) {
        self.state().commit_error = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Every statement sent so far with its bindings inlined
    pub fn statements(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Fetch { sql, bindings } | Call::Execute { sql, bindings } => Some(
                    trellis_core::builder::interpolate(&sql, &bindings, Value::to_sql_inline)
                        .unwrap_or_else(|e| panic!("cannot inline `{sql}`: {e}")),
                ),
                _ => None,
            })
            .collect()
    }

    /// Transaction control calls only, as upper-case keywords
    pub fn control(&self) -> Vec<&'static str> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Begin => Some("START TRANSACTION"),
                Call::Commit => Some("COMMIT"),
                Call::Rollback => Some("ROLLBACK"),
                _ => None,
            })
            .collect()
    }
}

impl Adapter for MockAdapter {
    async fn fetch(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        let mut state = self.state();
        state.calls.push(Call::Fetch {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
        });
        state.fetches.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn execute(&self, sql: &str, bindings: &[Value]) -> Result<WriteResult> {
        let mut state = self.state();
        state.calls.push(Call::Execute {
            sql: sql.to_string(),
            bindings: bindings.to_vec(),
        });
        state
            .writes
            .pop_front()
            .unwrap_or_else(|| Ok(WriteResult::default()))
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.state().calls.push(Call::Begin);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call::Commit);
        match &state.commit_error {
            Some(message) => Err(Error::adapter(message.clone())),
            None => Ok(()),
        }
    }

    async fn rollback(&self) -> Result<()> {
        self.state().calls.push(Call::Rollback);
        Ok(())
    }
}

pub fn connection() -> Connection<MockAdapter> {
    Connection::new(MockAdapter::new())
}

pub fn connection_with_prefix(prefix: &str) -> Connection<MockAdapter> {
    Connection::with_config(MockAdapter::new(), Config::new().with_prefix(prefix))
}

pub fn builder() -> QueryBuilder<MockAdapter> {
    connection().query_builder()
}

pub fn builder_with_prefix(prefix: &str) -> QueryBuilder<MockAdapter> {
    connection_with_prefix(prefix).query_builder()
}

/// Row from `(column, value)` pairs
pub fn row<V: Into<Value>>(pairs: Vec<(&str, V)>) -> Row {
    Row::from_pairs(pairs)
}
