//! Statement model handed to a [`StorageSession`](super::StorageSession).
//!
//! Every statement renders to CQL through `Display`, which is what gets logged
//! and what a driver-backed session sends over the wire.

use std::collections::BTreeMap;
use std::fmt;

use crate::core::Value;

/// `column = value` restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub value: Value,
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

fn write_where(f: &mut fmt::Formatter<'_>, conditions: &[Condition]) -> fmt::Result {
    for (idx, cond) in conditions.iter().enumerate() {
        let keyword = if idx == 0 { " WHERE" } else { " AND" };
        write!(f, "{} {} = {}", keyword, cond.column, cond.value)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<(String, Value)>,
}

impl Insert {
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: Vec::new(),
        }
    }

    pub fn value(mut self, column: impl Into<String>, value: Value) -> Self {
        self.values.push((column.into(), value));
        self
    }
}

impl fmt::Display for Insert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .values
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let values = self
            .values
            .iter()
            .map(|(_, value)| value.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "INSERT INTO {} ({}) VALUES ({})", self.table, names, values)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<(String, Value)>,
    pub conditions: Vec<Condition>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn set(mut self, column: impl Into<String>, value: Value) -> Self {
        self.assignments.push((column.into(), value));
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::eq(column, value));
        self
    }

    pub fn has_assignments(&self) -> bool {
        !self.assignments.is_empty()
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assignments = self
            .assignments
            .iter()
            .map(|(name, value)| format!("{} = {}", name, value))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "UPDATE {} SET {}", self.table, assignments)?;
        write_where(f, &self.conditions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub table: String,
    pub conditions: Vec<Condition>,
}

impl Delete {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
        }
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::eq(column, value));
        self
    }
}

impl fmt::Display for Delete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table)?;
        write_where(f, &self.conditions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    /// Empty selects every column.
    pub columns: Vec<String>,
    pub conditions: Vec<Condition>,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.conditions.push(Condition::eq(column, value));
        self
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        write!(f, "SELECT {} FROM {}", columns, self.table)?;
        write_where(f, &self.conditions)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Mutation {
    pub fn table(&self) -> &str {
        match self {
            Self::Insert(stmt) => &stmt.table,
            Self::Update(stmt) => &stmt.table,
            Self::Delete(stmt) => &stmt.table,
        }
    }
}

impl From<Insert> for Mutation {
    fn from(stmt: Insert) -> Self {
        Self::Insert(stmt)
    }
}

impl From<Update> for Mutation {
    fn from(stmt: Update) -> Self {
        Self::Update(stmt)
    }
}

impl From<Delete> for Mutation {
    fn from(stmt: Delete) -> Self {
        Self::Delete(stmt)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert(stmt) => fmt::Display::fmt(stmt, f),
            Self::Update(stmt) => fmt::Display::fmt(stmt, f),
            Self::Delete(stmt) => fmt::Display::fmt(stmt, f),
        }
    }
}

/// Mutations applied to the store as one atomic unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    mutations: Vec<Mutation>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mutation: impl Into<Mutation>) {
        self.mutations.push(mutation.into());
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn into_mutations(self) -> Vec<Mutation> {
        self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Mutations touching `table`, in batch order.
    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a Mutation> + 'a {
        self.mutations.iter().filter(move |m| m.table() == table)
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BEGIN BATCH")?;
        for mutation in &self.mutations {
            writeln!(f, "  {};", mutation)?;
        }
        write!(f, "APPLY BATCH")
    }
}

/// One result row, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: Value) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Takes a column out of the row, yielding null when it is absent.
    pub fn take(&mut self, column: &str) -> Value {
        self.columns.remove(column).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub(crate) fn matches(&self, conditions: &[Condition]) -> bool {
        conditions
            .iter()
            .all(|cond| self.get(&cond.column).unwrap_or(&Value::Null) == &cond.value)
    }

    pub(crate) fn project(&self, columns: &[String]) -> Row {
        let mut row = Row::new();
        for column in columns {
            row.set(
                column.clone(),
                self.get(column).cloned().unwrap_or(Value::Null),
            );
        }
        row
    }
}
