//! Sparse field-set builder for dynamically assembled statements.
//!
//! # Responsibility
//! - Turn an ordered set of (column, value) pairs into aligned column,
//!   placeholder, and bound-argument sequences.
//! - Render the fragments every operation kind needs: insert column and
//!   placeholder lists, update assignment lists, conjunctive predicates.
//!
//! # Invariants
//! - Columns and values stay in lock-step insertion order; positional
//!   arguments align 1:1 with rendered placeholders.
//! - Column identifiers are compile-time string literals; values only
//!   ever travel as bound parameters.

use rusqlite::types::Value;

/// Ordered collection of present fields for one statement.
#[derive(Debug, Default)]
pub struct FieldSet {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field unconditionally.
    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        self.columns.push(column);
        self.values.push(value.into());
    }

    /// Appends a field only when a value is present.
    pub fn set_if(&mut self, column: &'static str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.set(column, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Renders `a, b, c` for insert column lists.
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }

    /// Renders `?, ?, ?` matching the column list.
    pub fn placeholder_list(&self) -> String {
        vec!["?"; self.columns.len()].join(", ")
    }

    /// Renders `a = ?, b = ?` for update SET clauses.
    pub fn assignment_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders a conjunctive predicate over all present fields.
    ///
    /// Starts from the always-true base, so an empty set matches every
    /// row and present fields append in insertion order.
    pub fn predicate(&self) -> String {
        let mut clause = String::from("1 = 1");
        for column in &self.columns {
            clause.push_str(" AND ");
            clause.push_str(column);
            clause.push_str(" = ?");
        }
        clause
    }

    /// Yields the bound arguments, aligned with the rendered fragments.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
