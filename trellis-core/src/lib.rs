//! Trellis Core - a fluent SQL statement builder
//!
//! Statements are assembled through chained calls, rendered into a
//! preparable form (SQL with `%d`/`%f`/`%s` placeholders plus ordered
//! bindings) and handed to an [`Adapter`] for execution. The same statement
//! can also be rendered with every value inlined for logging and debugging.
//!
//! ```
//! use trellis_core::{op, ConditionTree, Raw};
//!
//! let mut tree = ConditionTree::new();
//! tree.where_(("age", op::GT, 18))
//!     .or_where_group(|g| {
//!         g.where_(("role", "admin")).where_(Raw::new("verified_at IS NOT NULL"));
//!     });
//! assert_eq!(tree.len(), 2);
//! ```

pub mod builder;
pub mod condition;
pub mod connection;
pub mod error;
pub mod events;
pub mod executor;
pub mod operator;
pub mod query;
pub mod raw;
pub mod transaction;
pub mod value;

// Re-export main types
pub use builder::{
    AggregateFunction, Compiled, Field, IntoColumns, IntoField, IntoOperand, IntoRow, JoinClause,
    JoinType, Operand, SortDirection, Statement,
};
pub use condition::{ConditionTree, Connector, IntoCondition};
pub use connection::{Config, Connection, StoredConnection};
pub use error::{Error, Result};
pub use events::{Event, EventContext, EventHandler};
pub use executor::{Adapter, FetchMode, Row, WriteResult};
pub use operator::{op, IntoOperator, Operator};
pub use query::{QueryBuilder, Upserted};
pub use raw::Raw;
pub use transaction::{Transaction, TransactionState};
pub use value::Value;

#[cfg(feature = "mysql")]
pub use executor::mysql::MySqlAdapter;

/// Create a literal SQL fragment with bindings
pub fn raw(template: impl Into<String>, bindings: impl Into<Value>) -> Raw {
    Raw::with_bindings(template, bindings)
}
