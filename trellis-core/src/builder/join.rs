//! JOIN clause builder

use super::common::{Field, IntoField, JoinType, Operand};
use super::render::SqlWriter;
use crate::condition::{ConditionKind, ConditionTree, Connector};
use crate::{IntoOperator, Result};

/// A joined table with its ON conditions
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: Field,
    pub conditions: ConditionTree,
}

impl JoinClause {
    /// Create a join with no ON conditions yet
    pub fn new<T: IntoField>(join_type: JoinType, table: T) -> Self {
        Self {
            join_type,
            table: table.into_field(),
            conditions: ConditionTree::new(),
        }
    }

    /// Add an `AND left op right` column comparison
    pub fn on<L, O, R>(&mut self, left: L, operator: O, right: R) -> &mut Self
    where
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.push_on(Connector::And, left, operator, right)
    }

    /// Add an `OR left op right` column comparison
    pub fn or_on<L, O, R>(&mut self, left: L, operator: O, right: R) -> &mut Self
    where
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.push_on(Connector::Or, left, operator, right)
    }

    fn push_on<L, O, R>(&mut self, connector: Connector, left: L, operator: O, right: R) -> &mut Self
    where
        L: IntoField,
        O: IntoOperator,
        R: IntoField,
    {
        self.conditions.push(
            connector,
            false,
            ConditionKind::Comparison {
                field: left.into_field(),
                operator: operator.into_operator(),
                value: Operand::Column(right.into_field()),
            },
        );
        self
    }

    pub(crate) fn render(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        w.push(" ");
        w.push(&self.join_type.to_string());
        w.push(" JOIN ");
        w.push_table(&self.table);
        if !self.conditions.is_blank() {
            w.push(" ON ");
            self.conditions.render(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(join: &JoinClause, prefix: Option<&str>) -> String {
        let mut w = SqlWriter::new(prefix);
        join.render(&mut w).unwrap();
        w.finish().unwrap().sql
    }

    #[test]
    fn test_single_comparison_join() {
        let mut join = JoinClause::new(JoinType::Left, "bar");
        join.on("foo.id", "=", "bar.foo_id");
        assert_eq!(render(&join, None), " LEFT JOIN bar ON foo.id = bar.foo_id");
    }

    #[test]
    fn test_multiple_on_clauses() {
        let mut join = JoinClause::new(JoinType::Inner, "person_details");
        join.on("person_details.person_id", "=", "my_table.id")
            .or_on("person_details.age", ">", "my_table.age");
        assert_eq!(
            render(&join, None),
            " INNER JOIN person_details ON person_details.person_id = my_table.id OR person_details.age > my_table.age"
        );
    }

    #[test]
    fn test_prefix_applies_inside_on() {
        let mut join = JoinClause::new(JoinType::Cross, "bar");
        join.on("foo.id", "=", "bar.id");
        assert_eq!(
            render(&join, Some("prefix_")),
            " CROSS JOIN prefix_bar ON prefix_foo.id = prefix_bar.id"
        );
    }

    #[test]
    fn test_join_without_conditions() {
        let join = JoinClause::new(JoinType::Outer, "bar");
        assert_eq!(render(&join, None), " OUTER JOIN bar");
    }
}
