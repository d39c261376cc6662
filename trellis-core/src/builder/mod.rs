//! Statement builder module

pub mod common;
pub mod delete;
pub mod insert;
pub mod join;
pub mod render;
pub mod select;
pub mod statement;
pub mod update;

// Re-export types from submodules
pub use common::{
    AggregateFunction, Field, IntoColumns, IntoField, IntoOperand, IntoRow, JoinType, Operand,
    OrderByClause, SortDirection,
};
pub use delete::DeleteStatement;
pub use insert::{InsertKind, InsertStatement};
pub use join::JoinClause;
pub use render::{interpolate, Compiled};
pub use statement::Statement;
pub use update::UpdateStatement;
