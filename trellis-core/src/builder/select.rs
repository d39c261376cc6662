//! SELECT and aggregate rendering

use super::common::{AggregateFunction, Field};
use super::render::{Compiled, SqlWriter};
use super::statement::Statement;
use crate::{Error, Result};

impl Statement {
    /// Render the SELECT in its preparable form
    pub fn compile_select(&self, prefix: Option<&str>) -> Result<Compiled> {
        let mut w = SqlWriter::new(prefix);
        self.render_select(&mut w)?;
        w.finish()
    }

    /// Render an aggregate over this statement.
    ///
    /// A simple statement is aggregated directly against its tables; anything
    /// carrying conditions, joins, grouping, ordering, paging or DISTINCT is
    /// wrapped as a derived table first.
    pub fn compile_aggregate(
        &self,
        function: AggregateFunction,
        column: Option<&Field>,
        prefix: Option<&str>,
    ) -> Result<Compiled> {
        let mut w = SqlWriter::new(prefix);
        if self.is_simple() {
            self.require_tables()?;
            w.push("SELECT ");
            w.push(function.as_lower());
            push_argument(&mut w, column);
            w.push(" as field FROM ");
            w.push_tables(&self.tables);
        } else {
            let outer = self.outer_argument(column)?;
            w.push("SELECT ");
            w.push(&function.to_string());
            push_argument(&mut w, outer.as_ref());
            w.push(" AS field FROM (");
            self.render_select(&mut w)?;
            w.push(") AS count LIMIT 1");
        }
        w.finish()
    }

    /// The aggregate argument as seen from outside the derived table.
    ///
    /// Only the last segment of a dotted column survives the subquery, and it
    /// has to be one of the columns the inner SELECT produces.
    fn outer_argument(&self, column: Option<&Field>) -> Result<Option<Field>> {
        let name = match column {
            None => return Ok(None),
            Some(Field::Raw(raw)) => return Ok(Some(Field::Raw(raw.clone()))),
            Some(Field::Column(name)) | Some(Field::Aliased { name, .. }) => last_segment(name),
        };
        if self.raw.is_none() && !self.columns.is_empty() && !self.selects(name) {
            return Err(Error::invalid_statement(format!(
                "aggregate column `{}` is not selected by the wrapped query",
                name
            )));
        }
        Ok(Some(Field::Raw(crate::Raw::new(name))))
    }

    fn selects(&self, name: &str) -> bool {
        self.columns.iter().any(|field| match field {
            Field::Column(column) => {
                let segment = last_segment(column);
                segment == "*" || segment == name
            }
            Field::Aliased { alias, .. } => alias == name,
            // literal fragments cannot be inspected
            Field::Raw(_) => true,
        })
    }

    fn require_tables(&self) -> Result<()> {
        if self.tables.is_empty() {
            return Err(Error::invalid_statement(
                "no table selected; call table() or from() first",
            ));
        }
        Ok(())
    }

    pub(crate) fn render_select(&self, w: &mut SqlWriter<'_>) -> Result<()> {
        if let Some(raw) = &self.raw {
            w.push_raw(raw);
            return Ok(());
        }
        self.require_tables()?;

        // SELECT clause
        w.push("SELECT ");
        if self.distinct {
            w.push("DISTINCT ");
        }
        if self.columns.is_empty() {
            w.push("*");
        } else {
            w.push_columns(&self.columns);
        }

        // FROM clause
        w.push(" FROM ");
        w.push_tables(&self.tables);

        // JOIN clauses
        for join in &self.joins {
            join.render(w)?;
        }

        // WHERE clause
        if !self.wheres.is_blank() {
            w.push(" WHERE ");
            self.wheres.render(w)?;
        }

        // GROUP BY clause
        if !self.group_by.is_empty() {
            w.push(" GROUP BY ");
            w.push_columns(&self.group_by);
        }

        // HAVING clause
        if !self.havings.is_blank() {
            w.push(" HAVING ");
            self.havings.render(w)?;
        }

        // ORDER BY clause
        if !self.order_by.is_empty() {
            w.push(" ORDER BY ");
            for (i, clause) in self.order_by.iter().enumerate() {
                if i > 0 {
                    w.push(", ");
                }
                w.push_column(&clause.field);
                w.push(" ");
                w.push(&clause.direction.to_string());
            }
        }

        // LIMIT clause
        if let Some(limit) = self.limit {
            w.push(&format!(" LIMIT {}", limit));
        }

        // OFFSET clause
        if let Some(offset) = self.offset {
            w.push(&format!(" OFFSET {}", offset));
        }

        Ok(())
    }
}

fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn push_argument(w: &mut SqlWriter<'_>, column: Option<&Field>) {
    w.push("(");
    match column {
        Some(field) => w.push_column(field),
        None => w.push("*"),
    }
    w.push(")");
}
