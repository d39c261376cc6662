//! Per-connection hooks fired around statement execution

use crate::builder::Compiled;
use crate::Result;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Points in a statement's life where hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    BeforeSelect,
    AfterSelect,
    BeforeInsert,
    AfterInsert,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
}

/// The kind of statement being run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub(crate) fn before(self) -> Event {
        match self {
            Operation::Select => Event::BeforeSelect,
            Operation::Insert => Event::BeforeInsert,
            Operation::Update => Event::BeforeUpdate,
            Operation::Delete => Event::BeforeDelete,
        }
    }

    pub(crate) fn after(self) -> Event {
        match self {
            Operation::Select => Event::AfterSelect,
            Operation::Insert => Event::AfterInsert,
            Operation::Update => Event::AfterUpdate,
            Operation::Delete => Event::AfterDelete,
        }
    }
}

/// What a hook gets to see
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    pub event: Event,
    /// First table of the statement as written, before prefixing
    pub table: Option<&'a str>,
    pub statement: &'a Compiled,
    /// Time spent in the adapter; set for `After*` events only
    pub elapsed: Option<Duration>,
}

type Hook = Arc<dyn Fn(&EventContext<'_>) -> Result<()> + Send + Sync>;

struct Registration {
    event: Event,
    table: Option<String>,
    hook: Hook,
}

/// Hooks registered on a connection, keyed by event and table.
///
/// A `Before*` hook returning an error stops the statement before it reaches
/// the adapter. An `After*` hook runs only when the adapter succeeded, and
/// its error is returned in place of the result. Hooks run in registration
/// order.
///
/// # Examples
/// ```
/// use trellis_core::{Event, EventHandler};
///
/// let events = EventHandler::new();
/// events.register(Event::AfterInsert, "orders", |ctx| {
///     println!("{} took {:?}", ctx.statement.sql, ctx.elapsed);
///     Ok(())
/// });
/// assert_eq!(events.len(), 1);
/// ```
#[derive(Default)]
pub struct EventHandler {
    hooks: RwLock<Vec<Registration>>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` for `event` on statements against `table`
    pub fn register<F>(&self, event: Event, table: impl Into<String>, hook: F)
    where
        F: Fn(&EventContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.push(event, Some(table.into()), Arc::new(hook));
    }

    /// Run `hook` for `event` whatever the table
    pub fn register_any<F>(&self, event: Event, hook: F)
    where
        F: Fn(&EventContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.push(event, None, Arc::new(hook));
    }

    /// Drop every hook for `event` on `table`; `None` targets the any-table hooks
    pub fn remove(&self, event: Event, table: Option<&str>) {
        self.write()
            .retain(|r| !(r.event == event && r.table.as_deref() == table));
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub(crate) fn fire(&self, ctx: &EventContext<'_>) -> Result<()> {
        // hooks may register further hooks, so the lock is released first
        let matching: Vec<Hook> = self
            .read()
            .iter()
            .filter(|r| r.event == ctx.event)
            .filter(|r| match (&r.table, ctx.table) {
                (None, _) => true,
                (Some(wanted), Some(table)) => wanted == table,
                (Some(_), None) => false,
            })
            .map(|r| Arc::clone(&r.hook))
            .collect();
        matching.iter().try_for_each(|hook| (**hook)(ctx))
    }

    fn push(&self, event: Event, table: Option<String>, hook: Hook) {
        self.write().push(Registration { event, table, hook });
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Registration>> {
        self.hooks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Registration>> {
        self.hooks.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandler")
            .field("hooks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;

    fn compiled() -> Compiled {
        Compiled {
            sql: "DELETE FROM foo".to_string(),
            bindings: Vec::new(),
        }
    }

    fn context<'a>(event: Event, table: Option<&'a str>, statement: &'a Compiled) -> EventContext<'a> {
        EventContext {
            event,
            table,
            statement,
            elapsed: None,
        }
    }

    #[test]
    fn test_hooks_match_event_and_table() {
        let events = EventHandler::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        events.register(Event::BeforeDelete, "foo", move |ctx| {
            log.lock().unwrap().push(format!("foo:{}", ctx.statement.sql));
            Ok(())
        });
        let log = Arc::clone(&seen);
        events.register_any(Event::BeforeDelete, move |ctx| {
            log.lock().unwrap().push(format!("any:{:?}", ctx.table));
            Ok(())
        });
        let log = Arc::clone(&seen);
        events.register(Event::AfterDelete, "foo", move |_| {
            log.lock().unwrap().push("after".to_string());
            Ok(())
        });

        let stmt = compiled();
        events.fire(&context(Event::BeforeDelete, Some("foo"), &stmt)).unwrap();
        events.fire(&context(Event::BeforeDelete, Some("bar"), &stmt)).unwrap();
        events.fire(&context(Event::BeforeDelete, None, &stmt)).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "foo:DELETE FROM foo",
                "any:Some(\"foo\")",
                "any:Some(\"bar\")",
                "any:None",
            ]
        );
    }

    #[test]
    fn test_first_failing_hook_stops_the_rest() {
        let events = EventHandler::new();
        let calls = Arc::new(Mutex::new(0));

        events.register_any(Event::BeforeInsert, |_| {
            Err(Error::invalid_statement("inserts are frozen"))
        });
        let counter = Arc::clone(&calls);
        events.register_any(Event::BeforeInsert, move |_| {
            *counter.lock().unwrap() += 1;
            Ok(())
        });

        let stmt = compiled();
        let err = events
            .fire(&context(Event::BeforeInsert, Some("foo"), &stmt))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid statement: inserts are frozen");
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_remove_targets_one_table() {
        let events = EventHandler::new();
        events.register(Event::AfterSelect, "foo", |_| Ok(()));
        events.register(Event::AfterSelect, "bar", |_| Ok(()));
        events.register_any(Event::AfterSelect, |_| Ok(()));

        events.remove(Event::AfterSelect, Some("foo"));
        assert_eq!(events.len(), 2);
        events.remove(Event::AfterSelect, None);
        assert_eq!(events.len(), 1);
        assert!(!events.is_empty());
    }

    #[test]
    fn test_operations_map_to_events() {
        assert_eq!(Operation::Select.before(), Event::BeforeSelect);
        assert_eq!(Operation::Update.after(), Event::AfterUpdate);
        assert_eq!(Operation::Delete.before(), Event::BeforeDelete);
    }
}
