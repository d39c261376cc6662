//! Literal SQL fragments with their own bound values

use crate::builder::render::interpolate;
use crate::{Result, Value};

/// A literal SQL fragment carrying zero or more ordered bindings.
///
/// The template is written into the statement untouched, so any `%d`, `%f`
/// or `%s` placeholders it contains line up with its bindings. A `Raw` can
/// stand in for a table, a selected column, a condition operand or a whole
/// condition.
///
/// # Examples
/// ```
/// use trellis_core::Raw;
///
/// let expr = Raw::with_bindings("DATE(created_at) > %s", "2024-01-01");
/// assert_eq!(expr.bindings().len(), 1);
/// assert_eq!(expr.to_raw_sql().unwrap(), "DATE(created_at) > '2024-01-01'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Raw {
    template: String,
    bindings: Vec<Value>,
}

impl Raw {
    /// Create a fragment without bindings
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            bindings: Vec::new(),
        }
    }

    /// Create a fragment with bindings.
    ///
    /// An array value supplies one binding per element; any other value is
    /// treated as a single binding.
    pub fn with_bindings(template: impl Into<String>, bindings: impl Into<Value>) -> Self {
        let bindings = match bindings.into() {
            Value::Array(items) => items,
            single => vec![single],
        };
        Self {
            template: template.into(),
            bindings,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// Render with every binding inlined using the default literal quoting
    pub fn to_raw_sql(&self) -> Result<String> {
        interpolate(&self.template, &self.bindings, Value::to_sql_inline)
    }
}
