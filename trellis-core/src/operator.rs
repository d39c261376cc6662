//! SQL operator types and conversions

use std::fmt::{self, Display};

/// Comparison operator placed between a field and its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator(&'static str);

impl Operator {
    pub const GT: Self = Operator(">");
    pub const LT: Self = Operator("<");
    pub const EQ: Self = Operator("=");
    pub const NEQ: Self = Operator("!=");
    pub const LTGT: Self = Operator("<>");
    pub const GTE: Self = Operator(">=");
    pub const LTE: Self = Operator("<=");
    pub const LIKE: Self = Operator("LIKE");
    pub const NOT_LIKE: Self = Operator("NOT LIKE");
    pub const IN: Self = Operator("IN");
    pub const NOT_IN: Self = Operator("NOT IN");
    pub const BETWEEN: Self = Operator("BETWEEN");
    pub const NOT_BETWEEN: Self = Operator("NOT BETWEEN");
    pub const REGEXP: Self = Operator("REGEXP");

    /// Create a custom operator for dialect-specific comparisons
    ///
    /// # Examples
    /// ```
    /// use trellis_core::Operator;
    ///
    /// let null_safe_eq = Operator::custom("<=>");
    /// assert_eq!(null_safe_eq.as_str(), "<=>");
    /// ```
    pub const fn custom(op: &'static str) -> Self {
        Operator(op)
    }

    /// Get the string representation of the operator
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Whether the operator takes a `low AND high` pair
    pub fn is_between(&self) -> bool {
        *self == Operator::BETWEEN || *self == Operator::NOT_BETWEEN
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for types that can be converted to SQL operators
pub trait IntoOperator {
    fn into_operator(self) -> Operator;
}

impl IntoOperator for Operator {
    fn into_operator(self) -> Operator {
        self
    }
}

/// String literals map onto the known constants; anything else is passed
/// through verbatim as a custom operator.
impl IntoOperator for &'static str {
    fn into_operator(self) -> Operator {
        match self {
            ">" => Operator::GT,
            "<" => Operator::LT,
            "=" => Operator::EQ,
            "!=" => Operator::NEQ,
            "<>" => Operator::LTGT,
            ">=" => Operator::GTE,
            "<=" => Operator::LTE,
            "LIKE" | "like" => Operator::LIKE,
            "NOT LIKE" | "not like" => Operator::NOT_LIKE,
            "IN" | "in" => Operator::IN,
            "NOT IN" | "not in" => Operator::NOT_IN,
            "BETWEEN" | "between" => Operator::BETWEEN,
            "NOT BETWEEN" | "not between" => Operator::NOT_BETWEEN,
            "REGEXP" | "regexp" => Operator::REGEXP,
            other => Operator::custom(other),
        }
    }
}

/// Convenience module for operator constants
pub mod op {
    use super::Operator;

    pub const GT: Operator = Operator::GT;
    pub const LT: Operator = Operator::LT;
    pub const EQ: Operator = Operator::EQ;
    pub const NEQ: Operator = Operator::NEQ;
    pub const LTGT: Operator = Operator::LTGT;
    pub const GTE: Operator = Operator::GTE;
    pub const LTE: Operator = Operator::LTE;
    pub const LIKE: Operator = Operator::LIKE;
    pub const NOT_LIKE: Operator = Operator::NOT_LIKE;
    pub const IN: Operator = Operator::IN;
    pub const NOT_IN: Operator = Operator::NOT_IN;
    pub const BETWEEN: Operator = Operator::BETWEEN;
    pub const NOT_BETWEEN: Operator = Operator::NOT_BETWEEN;
}
