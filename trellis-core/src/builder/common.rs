//! Common types and traits shared across all statement builders

use crate::{Raw, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// A column or table reference
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// Bare name, prefixed at render time
    Column(String),
    /// `name AS alias`
    Aliased { name: String, alias: String },
    /// Literal fragment, never prefixed
    Raw(Raw),
}

impl Field {
    /// Create an aliased reference rendered as `name AS alias`
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Aliased {
            name: name.into(),
            alias: alias.into(),
        }
    }
}

/// Trait for types usable as a column or table reference
pub trait IntoField {
    fn into_field(self) -> Field;
}

impl IntoField for &str {
    fn into_field(self) -> Field {
        Field::Column(self.to_string())
    }
}

impl IntoField for String {
    fn into_field(self) -> Field {
        Field::Column(self)
    }
}

impl IntoField for &String {
    fn into_field(self) -> Field {
        Field::Column(self.clone())
    }
}

impl IntoField for Field {
    fn into_field(self) -> Field {
        self
    }
}

impl IntoField for Raw {
    fn into_field(self) -> Field {
        Field::Raw(self)
    }
}

/// Trait to convert various types into a list of references
pub trait IntoColumns {
    fn into_columns(self) -> Vec<Field>;
}

impl IntoColumns for &str {
    fn into_columns(self) -> Vec<Field> {
        vec![self.into_field()]
    }
}

impl IntoColumns for String {
    fn into_columns(self) -> Vec<Field> {
        vec![self.into_field()]
    }
}

impl IntoColumns for Field {
    fn into_columns(self) -> Vec<Field> {
        vec![self]
    }
}

impl IntoColumns for Raw {
    fn into_columns(self) -> Vec<Field> {
        vec![Field::Raw(self)]
    }
}

impl<T: IntoField> IntoColumns for Vec<T> {
    fn into_columns(self) -> Vec<Field> {
        self.into_iter().map(IntoField::into_field).collect()
    }
}

impl<T: IntoField, const N: usize> IntoColumns for [T; N] {
    fn into_columns(self) -> Vec<Field> {
        self.into_iter().map(IntoField::into_field).collect()
    }
}

// Tuples mix names, aliases and raw fragments: select(("id", Field::aliased("name", "n")))
macro_rules! tuple_columns {
    ($($name:ident),+) => {
        impl<$($name: IntoField),+> IntoColumns for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_columns(self) -> Vec<Field> {
                let ($($name,)+) = self;
                vec![$($name.into_field()),+]
            }
        }
    };
}

tuple_columns!(A, B);
tuple_columns!(A, B, C);
tuple_columns!(A, B, C, D);
tuple_columns!(A, B, C, D, E);
tuple_columns!(A, B, C, D, E, F);

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Bound value
    Value(Value),
    /// Literal fragment with its own bindings
    Raw(Raw),
    /// Another column, as used by JOIN ... ON
    Column(Field),
}

/// Trait for types usable as the right-hand side of a comparison
pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

macro_rules! value_operand {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoOperand for $ty {
                fn into_operand(self) -> Operand {
                    Operand::Value(self.into())
                }
            }
        )+
    };
}

value_operand!(
    (),
    bool,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    &str,
    &String,
    Value,
    serde_json::Value,
);

#[cfg(feature = "uuid")]
value_operand!(uuid::Uuid);

#[cfg(feature = "chrono")]
value_operand!(chrono::NaiveDateTime, chrono::NaiveDate);

#[cfg(feature = "rust_decimal")]
value_operand!(rust_decimal::Decimal);

impl<T: Into<Value>> IntoOperand for Option<T> {
    fn into_operand(self) -> Operand {
        Operand::Value(self.into())
    }
}

impl<T: Into<Value>> IntoOperand for Vec<T> {
    fn into_operand(self) -> Operand {
        Operand::Value(self.into())
    }
}

impl<T: Into<Value>, const N: usize> IntoOperand for [T; N] {
    fn into_operand(self) -> Operand {
        Operand::Value(Value::Array(self.into_iter().map(Into::into).collect()))
    }
}

impl IntoOperand for Raw {
    fn into_operand(self) -> Operand {
        Operand::Raw(self)
    }
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

/// Trait for column/value maps written by INSERT, REPLACE and UPDATE.
///
/// Ordered inputs keep their order in the rendered column list; `HashMap`
/// iteration order is unspecified.
pub trait IntoRow {
    fn into_row(self) -> Vec<(String, Value)>;
}

impl<K: Into<String>, V: Into<Value>> IntoRow for Vec<(K, V)> {
    fn into_row(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> IntoRow for [(K, V); N] {
    fn into_row(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K: Into<String>, V: Into<Value>> IntoRow for BTreeMap<K, V> {
    fn into_row(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K: Into<String>, V: Into<Value>, S: BuildHasher> IntoRow for HashMap<K, V, S> {
    fn into_row(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl IntoRow for serde_json::Map<String, serde_json::Value> {
    fn into_row(self) -> Vec<(String, Value)> {
        self.into_iter().map(|(k, v)| (k, Value::from_json(v))).collect()
    }
}

/// JOIN types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Outer,
    Cross,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER"),
            JoinType::Left => write!(f, "LEFT"),
            JoinType::Right => write!(f, "RIGHT"),
            JoinType::Outer => write!(f, "OUTER"),
            JoinType::Cross => write!(f, "CROSS"),
        }
    }
}

/// Sort direction for ORDER BY clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// An ORDER BY clause
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub field: Field,
    pub direction: SortDirection,
}

/// Aggregation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    /// Lowercase spelling used by the direct (unwrapped) aggregate form
    pub fn as_lower(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }
}

impl std::fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateFunction::Count => write!(f, "COUNT"),
            AggregateFunction::Sum => write!(f, "SUM"),
            AggregateFunction::Avg => write!(f, "AVG"),
            AggregateFunction::Min => write!(f, "MIN"),
            AggregateFunction::Max => write!(f, "MAX"),
        }
    }
}
