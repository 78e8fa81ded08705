use serde::{Deserialize, Serialize};

use super::statement::{Condition, Row};
use crate::core::{ColumnKind, StorageError, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Structural description of one wide-column table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub partition_key: Vec<String>,
    pub clustering_key: Vec<String>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            partition_key: Vec::new(),
            clustering_key: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnDef::new(name, kind));
        self
    }

    pub fn partition_key(mut self, name: impl Into<String>) -> Self {
        self.partition_key.push(name.into());
        self
    }

    pub fn clustering_key(mut self, name: impl Into<String>) -> Self {
        self.clustering_key.push(name.into());
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &str> {
        self.partition_key
            .iter()
            .chain(self.clustering_key.iter())
            .map(String::as_str)
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary_key().any(|key| key == name)
    }

    /// CQL `CREATE TABLE` statement for this definition.
    pub fn to_cql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|col| format!("{} {}", col.name, col.kind.cql_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let partition = if self.partition_key.len() == 1 {
            self.partition_key[0].clone()
        } else {
            format!("({})", self.partition_key.join(", "))
        };
        let key = if self.clustering_key.is_empty() {
            partition
        } else {
            format!("{}, {}", partition, self.clustering_key.join(", "))
        };
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
            self.name, columns, key
        )
    }
}

/// Rows of one table held by the in-memory session.
///
/// Rows keep insertion order, so a partition reads back in the order its
/// clustering rows were written.
#[derive(Debug, Clone)]
pub(crate) struct MemTable {
    def: TableDef,
    rows: Vec<Row>,
}

impl MemTable {
    pub fn new(def: TableDef) -> Self {
        Self {
            def,
            rows: Vec::new(),
        }
    }

    pub fn def(&self) -> &TableDef {
        &self.def
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn check_insert(&self, values: &[(String, Value)]) -> Result<(), StorageError> {
        for (name, value) in values {
            self.check_column(name, value)?;
        }
        for key in self.def.primary_key() {
            let bound = values
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value);
            match bound {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(StorageError::InvalidStatement(format!(
                        "missing or null primary key column '{}' for '{}'",
                        key, self.def.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn check_update(
        &self,
        assignments: &[(String, Value)],
        conditions: &[Condition],
    ) -> Result<(), StorageError> {
        for (name, value) in assignments {
            if self.def.is_key_column(name) {
                return Err(StorageError::InvalidStatement(format!(
                    "primary key column '{}' cannot be assigned",
                    name
                )));
            }
            self.check_column(name, value)?;
        }
        for key in self.def.primary_key() {
            if !conditions.iter().any(|cond| cond.column == key) {
                return Err(StorageError::InvalidStatement(format!(
                    "update on '{}' must restrict primary key column '{}'",
                    self.def.name, key
                )));
            }
        }
        self.check_conditions(conditions)
    }

    pub fn check_delete(&self, conditions: &[Condition]) -> Result<(), StorageError> {
        for key in &self.def.partition_key {
            if !conditions.iter().any(|cond| &cond.column == key) {
                return Err(StorageError::InvalidStatement(format!(
                    "delete on '{}' must restrict partition key column '{}'",
                    self.def.name, key
                )));
            }
        }
        self.check_conditions(conditions)
    }

    pub fn check_conditions(&self, conditions: &[Condition]) -> Result<(), StorageError> {
        for cond in conditions {
            self.check_column(&cond.column, &cond.value)?;
        }
        Ok(())
    }

    fn check_column(&self, name: &str, value: &Value) -> Result<(), StorageError> {
        let column = self.def.find_column(name).ok_or_else(|| {
            StorageError::InvalidStatement(format!(
                "unknown column '{}' in table '{}'",
                name, self.def.name
            ))
        })?;
        match value.kind() {
            Some(kind) if kind != column.kind => Err(StorageError::InvalidStatement(format!(
                "column '{}.{}' is {}, got {}",
                self.def.name,
                name,
                column.kind,
                value.type_name()
            ))),
            _ => Ok(()),
        }
    }

    /// Writes `values` into the row addressed by the primary key, creating it if absent.
    pub fn upsert(&mut self, values: Vec<(String, Value)>) {
        let key: Vec<Condition> = self
            .def
            .primary_key()
            .filter_map(|key| {
                values
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(name, value)| Condition::eq(name.clone(), value.clone()))
            })
            .collect();

        match self.rows.iter_mut().find(|row| row.matches(&key)) {
            Some(row) => {
                for (name, value) in values {
                    row.set(name, value);
                }
            }
            None => {
                let mut row = Row::new();
                for (name, value) in values {
                    row.set(name, value);
                }
                self.rows.push(row);
            }
        }
    }

    pub fn delete(&mut self, conditions: &[Condition]) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !row.matches(conditions));
        before - self.rows.len()
    }

    pub fn select(&self, columns: &[String], conditions: &[Condition]) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|row| row.matches(conditions))
            .map(|row| {
                if columns.is_empty() {
                    row.clone()
                } else {
                    row.project(columns)
                }
            })
            .collect()
    }
}
