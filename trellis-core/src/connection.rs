//! Connections, configuration and the stored fallback connection

use crate::events::EventHandler;
use crate::executor::{Adapter, FetchMode};
use crate::{Error, QueryBuilder, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Connection-level settings.
///
/// Deserializable so applications can embed it in their own config files;
/// every field falls back to its default.
///
/// # Examples
/// ```
/// use trellis_core::{Config, FetchMode};
///
/// let config: Config = serde_json::from_str(r#"{"prefix": "wp_"}"#).unwrap();
/// assert_eq!(config.prefix.as_deref(), Some("wp_"));
/// assert_eq!(config.fetch_mode, FetchMode::Assoc);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prepended to every table name, and to the table part of dotted columns
    pub prefix: Option<String>,
    /// Default row shape for typed decoding
    pub fetch_mode: FetchMode,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_fetch_mode(mut self, fetch_mode: FetchMode) -> Self {
        self.fetch_mode = fetch_mode;
        self
    }
}

struct ConnectionInner<A> {
    adapter: A,
    config: Config,
    events: EventHandler,
}

/// An adapter paired with its configuration.
///
/// Cloning is cheap; clones share the same adapter.
pub struct Connection<A> {
    inner: Arc<ConnectionInner<A>>,
}

impl<A> Clone for Connection<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Adapter> Connection<A> {
    pub fn new(adapter: A) -> Self {
        Self::with_config(adapter, Config::default())
    }

    pub fn with_config(adapter: A, config: Config) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                adapter,
                config,
                events: EventHandler::new(),
            }),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.inner.adapter
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Hooks run around every statement sent through this connection
    pub fn events(&self) -> &EventHandler {
        &self.inner.events
    }

    pub fn prefix(&self) -> Option<&str> {
        self.inner.config.prefix.as_deref()
    }

    /// Start a builder on this connection
    pub fn query_builder(&self) -> QueryBuilder<A> {
        QueryBuilder::new(self.clone())
    }

    /// Whether two handles share the same adapter
    pub fn same_as(&self, other: &Connection<A>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Process-wide fallback connection, written at most once.
///
/// ```
/// use trellis_core::StoredConnection;
/// # use trellis_core::{Adapter, Row, Value, WriteResult, Result};
/// # struct Noop;
/// # impl Adapter for Noop {
/// #     async fn fetch(&self, _: &str, _: &[Value]) -> Result<Vec<Row>> { Ok(vec![]) }
/// #     async fn execute(&self, _: &str, _: &[Value]) -> Result<WriteResult> { Ok(WriteResult::default()) }
/// #     async fn begin_transaction(&self) -> Result<()> { Ok(()) }
/// #     async fn commit(&self) -> Result<()> { Ok(()) }
/// #     async fn rollback(&self) -> Result<()> { Ok(()) }
/// # }
///
/// static DB: StoredConnection<Noop> = StoredConnection::new();
///
/// assert!(DB.get().is_none());
/// ```
pub struct StoredConnection<A> {
    cell: OnceCell<Connection<A>>,
}

impl<A> StoredConnection<A> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Option<&Connection<A>> {
        self.cell.get()
    }
}

impl<A: Adapter> StoredConnection<A> {
    /// Store `connection` unless one is already stored; returns whether it was
    pub fn set(&self, connection: Connection<A>) -> bool {
        let stored = self.cell.set(connection).is_ok();
        if !stored {
            debug!("stored connection already present, keeping the first one");
        }
        stored
    }

    /// The stored connection, or a construction fault when none exists
    pub fn connection(&self) -> Result<Connection<A>> {
        self.cell.get().cloned().ok_or(Error::NoConnection)
    }
}

impl<A> Default for StoredConnection<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Row, WriteResult};
    use crate::Value;

    struct NullAdapter;

    impl Adapter for NullAdapter {
        async fn fetch(&self, _sql: &str, _bindings: &[Value]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn execute(&self, _sql: &str, _bindings: &[Value]) -> Result<WriteResult> {
            Ok(WriteResult::default())
        }

        async fn begin_transaction(&self) -> Result<()> {
            Ok(())
        }

        async fn commit(&self) -> Result<()> {
            Ok(())
        }

        async fn rollback(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_defaults_and_builders() {
        let config = Config::new()
            .with_prefix("prefix_")
            .with_fetch_mode(FetchMode::Numeric);
        assert_eq!(config.prefix.as_deref(), Some("prefix_"));
        assert_eq!(config.fetch_mode, FetchMode::Numeric);

        let parsed: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_connection_exposes_prefix() {
        let conn = Connection::with_config(NullAdapter, Config::new().with_prefix("wp_"));
        assert_eq!(conn.prefix(), Some("wp_"));
        assert!(conn.same_as(&conn.clone()));
        assert!(!conn.same_as(&Connection::new(NullAdapter)));
    }

    #[test]
    fn test_stored_connection_first_write_wins() {
        let store: StoredConnection<NullAdapter> = StoredConnection::new();
        assert!(matches!(store.connection(), Err(Error::NoConnection)));

        let first = Connection::with_config(NullAdapter, Config::new().with_prefix("first_"));
        let second = Connection::with_config(NullAdapter, Config::new().with_prefix("second_"));
        assert!(store.set(first.clone()));
        assert!(!store.set(second));

        let stored = store.connection().unwrap();
        assert!(stored.same_as(&first));
        assert_eq!(stored.prefix(), Some("first_"));
    }
}
