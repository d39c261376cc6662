//! Boolean condition trees shared by WHERE, HAVING and JOIN ... ON

use crate::builder::common::{Field, IntoField, IntoOperand, Operand};
use crate::builder::render::SqlWriter;
use crate::{Error, IntoOperator, Operator, Raw, Result, Value};

/// How a condition attaches to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    fn separator(&self) -> &'static str {
        match self {
            Connector::And => " AND ",
            Connector::Or => " OR ",
        }
    }
}

/// What a single condition node tests
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    /// `field operator value`
    Comparison {
        field: Field,
        operator: Operator,
        value: Operand,
    },
    /// `field IN (v1, v2, ...)`
    In { field: Field, values: Vec<Value> },
    /// `field BETWEEN low AND high`
    Between {
        field: Field,
        low: Operand,
        high: Operand,
    },
    /// `field IS NULL`
    Null { field: Field },
    /// `( nested tree )`
    Group(ConditionTree),
    /// Literal fragment
    Raw(Raw),
}

/// A node in a condition tree
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub connector: Connector,
    pub negated: bool,
    pub kind: ConditionKind,
}

/// Trait for conditions that can be used in WHERE and HAVING clauses
pub trait IntoCondition {
    fn into_condition(self) -> ConditionKind;
}

// Shorthand equality: where_(("age", 18))
impl<F, V> IntoCondition for (F, V)
where
    F: IntoField,
    V: IntoOperand,
{
    fn into_condition(self) -> ConditionKind {
        ConditionKind::Comparison {
            field: self.0.into_field(),
            operator: Operator::EQ,
            value: self.1.into_operand(),
        }
    }
}

// Explicit operators: where_(("age", op::GT, 18)) or where_(("age", ">", 18))
impl<F, O, V> IntoCondition for (F, O, V)
where
    F: IntoField,
    O: IntoOperator,
    V: IntoOperand,
{
    fn into_condition(self) -> ConditionKind {
        ConditionKind::Comparison {
            field: self.0.into_field(),
            operator: self.1.into_operator(),
            value: self.2.into_operand(),
        }
    }
}

impl IntoCondition for Raw {
    fn into_condition(self) -> ConditionKind {
        ConditionKind::Raw(self)
    }
}

/// An ordered sequence of connector-tagged conditions.
///
/// Nodes are only ever appended. The first rendered node drops its
/// connector; empty nested groups are skipped entirely.
///
/// # Examples
/// ```
/// use trellis_core::ConditionTree;
///
/// let mut tree = ConditionTree::new();
/// tree.where_(("status", "active"))
///     .or_where_group(|g| {
///         g.where_(("role", "admin")).where_not_null("verified_at");
///     });
/// assert_eq!(tree.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionTree {
    nodes: Vec<Condition>,
}

impl ConditionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Condition] {
        &self.nodes
    }

    /// True when rendering would produce no text
    pub fn is_blank(&self) -> bool {
        self.nodes.iter().all(|node| match &node.kind {
            ConditionKind::Group(tree) => tree.is_blank(),
            _ => false,
        })
    }

    /// Append a node
    pub fn push(&mut self, connector: Connector, negated: bool, kind: ConditionKind) -> &mut Self {
        self.nodes.push(Condition {
            connector,
            negated,
            kind,
        });
        self
    }

    /// Build a nested tree with `f` and append it as a group node
    pub fn group<F>(&mut self, connector: Connector, negated: bool, f: F) -> &mut Self
    where
        F: FnOnce(&mut ConditionTree),
    {
        let mut nested = ConditionTree::new();
        f(&mut nested);
        self.push(connector, negated, ConditionKind::Group(nested))
    }

    /// Add an `AND` condition.
    ///
    /// Comparing with `NULL` through `=` renders `IS NULL`, and through `!=`
    /// or `<>` renders `IS NOT NULL`.
    pub fn where_<C: IntoCondition>(&mut self, condition: C) -> &mut Self {
        self.push(Connector::And, false, condition.into_condition())
    }

    pub fn or_where<C: IntoCondition>(&mut self, condition: C) -> &mut Self {
        self.push(Connector::Or, false, condition.into_condition())
    }

    pub fn where_not<C: IntoCondition>(&mut self, condition: C) -> &mut Self {
        self.push(Connector::And, true, condition.into_condition())
    }

    pub fn or_where_not<C: IntoCondition>(&mut self, condition: C) -> &mut Self {
        self.push(Connector::Or, true, condition.into_condition())
    }

    pub fn where_in<F, I, V>(&mut self, field: F, values: I) -> &mut Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(Connector::And, false, in_list(field, values))
    }

    pub fn or_where_in<F, I, V>(&mut self, field: F, values: I) -> &mut Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(Connector::Or, false, in_list(field, values))
    }

    pub fn where_not_in<F, I, V>(&mut self, field: F, values: I) -> &mut Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(Connector::And, true, in_list(field, values))
    }

    pub fn or_where_not_in<F, I, V>(&mut self, field: F, values: I) -> &mut Self
    where
        F: IntoField,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push(Connector::Or, true, in_list(field, values))
    }

    pub fn where_between<F, L, H>(&mut self, field: F, low: L, high: H) -> &mut Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.push(Connector::And, false, between(field, low, high))
    }

    pub fn or_where_between<F, L, H>(&mut self, field: F, low: L, high: H) -> &mut Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.push(Connector::Or, false, between(field, low, high))
    }

    pub fn where_not_between<F, L, H>(&mut self, field: F, low: L, high: H) -> &mut Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.push(Connector::And, true, between(field, low, high))
    }

    pub fn or_where_not_between<F, L, H>(&mut self, field: F, low: L, high: H) -> &mut Self
    where
        F: IntoField,
        L: IntoOperand,
        H: IntoOperand,
    {
        self.push(Connector::Or, true, between(field, low, high))
    }

    pub fn where_null<F: IntoField>(&mut self, field: F) -> &mut Self {
        self.push(Connector::And, false, null(field))
    }

    pub fn or_where_null<F: IntoField>(&mut self, field: F) -> &mut Self {
        self.push(Connector::Or, false, null(field))
    }

    pub fn where_not_null<F: IntoField>(&mut self, field: F) -> &mut Self {
        self.push(Connector::And, true, null(field))
    }

    pub fn or_where_not_null<F: IntoField>(&mut self, field: F) -> &mut Self {
        self.push(Connector::Or, true, null(field))
    }

    pub fn where_group<F: FnOnce(&mut ConditionTree)>(&mut self, f: F) -> &mut Self {
        self.group(Connector::And, false, f)
    }

    pub fn or_where_group<F: FnOnce(&mut ConditionTree)>(&mut self, f: F) -> &mut Self {
        self.group(Connector::Or, false, f)
    }

    pub fn where_not_group<F: FnOnce(&mut ConditionTree)>(&mut self, f: F) -> &mut Self {
        self.group(Connector::And, true, f)
    }

    pub fn or_where_not_group<F: FnOnce(&mut ConditionTree)>(&mut self, f: F) -> &mut Self {
        self.group(Connector::Or, true, f)
    }

    pub(crate) fn render(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        let mut first = true;
        for node in &self.nodes {
            if let ConditionKind::Group(tree) = &node.kind {
                if tree.is_blank() {
                    continue;
                }
            }
            if !first {
                w.push(node.connector.separator());
            }
            first = false;
            node.render(w)?;
        }
        Ok(())
    }
}

impl Condition {
    fn render(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        match &self.kind {
            ConditionKind::Comparison {
                field,
                operator,
                value,
            } => {
                if self.negated {
                    w.push("NOT ");
                }
                w.push_column(field);
                if let Operand::Value(Value::Null) = value {
                    match operator.as_str() {
                        "=" => {
                            w.push(" IS NULL");
                            return Ok(());
                        }
                        "!=" | "<>" => {
                            w.push(" IS NOT NULL");
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                w.push(" ");
                w.push(operator.as_str());
                w.push(" ");
                if operator.is_between() {
                    match value {
                        Operand::Value(Value::Array(pair)) if pair.len() == 2 => {
                            w.push_value(&pair[0]);
                            w.push(" AND ");
                            w.push_value(&pair[1]);
                        }
                        _ => {
                            return Err(Error::invalid_statement(format!(
                                "{} expects exactly two values",
                                operator
                            )))
                        }
                    }
                } else {
                    render_operand(w, value);
                }
            }
            ConditionKind::In { field, values } => {
                if values.is_empty() {
                    return Err(Error::invalid_statement("IN requires at least one value"));
                }
                w.push_column(field);
                w.push(if self.negated { " NOT IN " } else { " IN " });
                w.push_list(values);
            }
            ConditionKind::Between { field, low, high } => {
                w.push_column(field);
                w.push(if self.negated {
                    " NOT BETWEEN "
                } else {
                    " BETWEEN "
                });
                render_operand(w, low);
                w.push(" AND ");
                render_operand(w, high);
            }
            ConditionKind::Null { field } => {
                w.push_column(field);
                w.push(if self.negated {
                    " IS NOT NULL"
                } else {
                    " IS NULL"
                });
            }
            ConditionKind::Group(tree) => {
                if self.negated {
                    w.push("NOT ");
                }
                w.push("(");
                tree.render(w)?;
                w.push(")");
            }
            ConditionKind::Raw(raw) => {
                if self.negated {
                    w.push("NOT ");
                }
                w.push_raw(raw);
            }
        }
        Ok(())
    }
}

fn render_operand(w: &mut SqlWriter<'_>, operand: &Operand) {
    match operand {
        Operand::Value(value) => w.push_value(value),
        Operand::Raw(raw) => w.push_raw(raw),
        Operand::Column(field) => w.push_column(field),
    }
}

fn in_list<F, I, V>(field: F, values: I) -> ConditionKind
where
    F: IntoField,
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    ConditionKind::In {
        field: field.into_field(),
        values: values.into_iter().map(Into::into).collect(),
    }
}

fn between<F, L, H>(field: F, low: L, high: H) -> ConditionKind
where
    F: IntoField,
    L: IntoOperand,
    H: IntoOperand,
{
    ConditionKind::Between {
        field: field.into_field(),
        low: low.into_operand(),
        high: high.into_operand(),
    }
}

fn null<F: IntoField>(field: F) -> ConditionKind {
    ConditionKind::Null {
        field: field.into_field(),
    }
}
