use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{Level, event};

use super::statement::{Batch, Mutation, Row, Select};
use super::table::{MemTable, TableDef};
use super::StorageSession;
use crate::core::{StorageError, Value};
use crate::schema::{Entity, Schema};

/// In-process wide-column store.
///
/// Inserts and updates are upserts by primary key, deletes remove every row
/// matching the restricted key columns, and a batch is validated in full
/// before any of it is applied.
#[derive(Default)]
pub struct MemorySession {
    tables: RwLock<HashMap<String, MemTable>>,
    history: Mutex<Vec<Batch>>,
    pending_failure: Mutex<Option<StorageError>>,
    selects: AtomicUsize,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a table; declaring an existing table is a no-op.
    pub async fn create_table(&self, def: TableDef) {
        let mut tables = self.tables.write().await;
        tables
            .entry(def.name.clone())
            .or_insert_with(|| MemTable::new(def));
    }

    /// Declares the primary, index and join tables of an entity.
    pub async fn create_schema_tables<E: Entity>(&self, schema: &Schema<E>) {
        for def in schema.table_defs() {
            self.create_table(def).await;
        }
    }

    pub async fn table_exists(&self, name: &str) -> bool {
        self.tables.read().await.contains_key(name)
    }

    pub async fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every row currently stored in `table`.
    pub async fn rows(&self, table: &str) -> Result<Vec<Row>, StorageError> {
        let tables = self.tables.read().await;
        let table = tables
            .get(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))?;
        Ok(table.rows().to_vec())
    }

    pub async fn row_count(&self, table: &str) -> Result<usize, StorageError> {
        Ok(self.rows(table).await?.len())
    }

    /// Batches applied so far, oldest first.
    pub fn executed_batches(&self) -> Vec<Batch> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    pub fn last_batch(&self) -> Option<Batch> {
        self.executed_batches().pop()
    }

    pub fn select_count(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    /// Makes the next `execute` or `select` fail with `error`.
    pub fn fail_next(&self, error: StorageError) {
        if let Ok(mut pending) = self.pending_failure.lock() {
            *pending = Some(error);
        }
    }

    fn take_failure(&self) -> Option<StorageError> {
        self.pending_failure
            .lock()
            .ok()
            .and_then(|mut pending| pending.take())
    }

    fn validate(
        tables: &HashMap<String, MemTable>,
        mutation: &Mutation,
    ) -> Result<(), StorageError> {
        let table = tables
            .get(mutation.table())
            .ok_or_else(|| StorageError::TableNotFound(mutation.table().to_string()))?;
        match mutation {
            Mutation::Insert(stmt) => table.check_insert(&stmt.values),
            Mutation::Update(stmt) => table.check_update(&stmt.assignments, &stmt.conditions),
            Mutation::Delete(stmt) => table.check_delete(&stmt.conditions),
        }
    }

    fn apply(tables: &mut HashMap<String, MemTable>, mutation: Mutation) {
        let Some(table) = tables.get_mut(mutation.table()) else {
            return;
        };
        match mutation {
            Mutation::Insert(stmt) => table.upsert(stmt.values),
            Mutation::Update(stmt) => {
                let mut values: Vec<(String, Value)> = stmt
                    .conditions
                    .into_iter()
                    .map(|cond| (cond.column, cond.value))
                    .collect();
                values.extend(stmt.assignments);
                table.upsert(values);
            }
            Mutation::Delete(stmt) => {
                table.delete(&stmt.conditions);
            }
        }
    }
}

#[async_trait]
impl StorageSession for MemorySession {
    async fn execute(&self, batch: Batch) -> Result<(), StorageError> {
        if let Some(err) = self.take_failure() {
            event!(Level::DEBUG, error = %err, "injected batch failure");
            return Err(err);
        }

        let mut tables = self.tables.write().await;
        for mutation in batch.mutations() {
            Self::validate(&tables, mutation)?;
        }

        if let Ok(mut history) = self.history.lock() {
            history.push(batch.clone());
        }
        for mutation in batch.into_mutations() {
            Self::apply(&mut tables, mutation);
        }
        Ok(())
    }

    async fn select(&self, select: Select) -> Result<Vec<Row>, StorageError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.take_failure() {
            return Err(err);
        }

        let tables = self.tables.read().await;
        let table = tables
            .get(&select.table)
            .ok_or_else(|| StorageError::TableNotFound(select.table.clone()))?;
        for column in &select.columns {
            if table.def().find_column(column).is_none() {
                return Err(StorageError::InvalidStatement(format!(
                    "unknown column '{}' in table '{}'",
                    column, select.table
                )));
            }
        }
        table.check_conditions(&select.conditions)?;
        Ok(table.select(&select.columns, &select.conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ColumnKind;
    use crate::storage::{Delete, Insert, Update};

    fn join_table() -> TableDef {
        TableDef::new("owner_item")
            .column("owner_id", ColumnKind::Int)
            .column("item_id", ColumnKind::Int)
            .partition_key("owner_id")
            .clustering_key("item_id")
    }

    #[tokio::test]
    async fn insert_is_an_upsert_by_primary_key() {
        let session = MemorySession::new();
        session
            .create_table(
                TableDef::new("kv")
                    .column("k", ColumnKind::Text)
                    .column("v", ColumnKind::Int)
                    .partition_key("k"),
            )
            .await;

        for v in [1, 2] {
            let mut batch = Batch::new();
            batch.add(
                Insert::into("kv")
                    .value("k", Value::Text("a".into()))
                    .value("v", Value::Int(v)),
            );
            session.execute(batch).await.unwrap();
        }

        let rows = session.rows("kv").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("v"), Some(&Value::Int(2)));
    }

    #[tokio::test]
    async fn invalid_statement_rejects_the_whole_batch() {
        let session = MemorySession::new();
        session.create_table(join_table()).await;

        let mut batch = Batch::new();
        batch.add(
            Insert::into("owner_item")
                .value("owner_id", Value::Int(1))
                .value("item_id", Value::Int(2)),
        );
        batch.add(Update::table("owner_item").set("item_id", Value::Int(3)));

        let err = session.execute(batch).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidStatement(_)));
        assert_eq!(session.row_count("owner_item").await.unwrap(), 0);
        assert!(session.executed_batches().is_empty());
    }

    #[tokio::test]
    async fn partition_delete_removes_every_clustering_row() {
        let session = MemorySession::new();
        session.create_table(join_table()).await;

        let mut batch = Batch::new();
        for item in 0..3 {
            batch.add(
                Insert::into("owner_item")
                    .value("owner_id", Value::Int(1))
                    .value("item_id", Value::Int(item)),
            );
        }
        batch.add(
            Insert::into("owner_item")
                .value("owner_id", Value::Int(2))
                .value("item_id", Value::Int(9)),
        );
        session.execute(batch).await.unwrap();

        let mut batch = Batch::new();
        batch.add(Delete::from("owner_item").where_eq("owner_id", Value::Int(1)));
        session.execute(batch).await.unwrap();

        let rows = session.rows("owner_item").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("item_id"), Some(&Value::Int(9)));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let session = MemorySession::new();
        session.create_table(join_table()).await;
        session.fail_next(StorageError::Timeout("slow".into()));

        let select = Select::from("owner_item").where_eq("owner_id", Value::Int(1));
        assert!(session.select(select.clone()).await.is_err());
        assert!(session.select(select).await.unwrap().is_empty());
        assert_eq!(session.select_count(), 2);
    }

    #[tokio::test]
    async fn unknown_table_is_reported() {
        let session = MemorySession::new();
        let err = session
            .select(Select::from("missing"))
            .await
            .unwrap_err();
        assert_eq!(err, StorageError::TableNotFound("missing".into()));
    }
}
