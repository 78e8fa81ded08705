//! Create, read, update and delete of entity instances.
//!
//! Every write is assembled into one [`Batch`] and handed to the session in a
//! single call, so a failed write leaves nothing half-applied on our side.

// CRUD paths are split by operation but share one impl block scope.

pub mod record;
pub mod trail;

use std::collections::HashSet;
use std::sync::Arc;

use async_recursion::async_recursion;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

use crate::config::MapperConfig;
use crate::core::{ColumnType, MapperError, Result, Value};
use crate::schema::{Entity, RelationDescriptor, Schema, SchemaRegistry};
use crate::storage::{Batch, Delete, Insert, Row, Select, StorageSession, Update};

pub use record::{EntityHandle, Record, RecordCache, Tracked};
pub use trail::ReadTrail;

/// Entry point for persisting entities through a [`StorageSession`].
///
/// Cloning is cheap; clones share the session, the schema registry and the
/// record cache.
#[derive(Clone)]
pub struct Mapper {
    session: Arc<dyn StorageSession>,
    registry: Arc<SchemaRegistry>,
    cache: Arc<RecordCache>,
    config: MapperConfig,
}

impl Mapper {
    pub fn new(session: Arc<dyn StorageSession>) -> Self {
        Self::with_config(session, MapperConfig::default())
    }

    pub fn with_config(session: Arc<dyn StorageSession>, config: MapperConfig) -> Self {
        Self {
            session,
            registry: Arc::new(SchemaRegistry::new()),
            cache: Arc::new(RecordCache::new()),
            config,
        }
    }

    /// Derived schema of `E`, cached after the first successful derivation.
    pub fn schema<E: Entity>(&self) -> Result<Arc<Schema<E>>> {
        self.registry.schema::<E>()
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn records(&self) -> &RecordCache {
        &self.cache
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<dyn StorageSession> {
        &self.session
    }

    async fn submit(&self, operation: &'static str, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            event!(Level::DEBUG, operation, "nothing to write");
            return Ok(());
        }
        event!(
            Level::DEBUG,
            operation,
            statements = batch.len(),
            cql = %batch,
            "submitting batch"
        );
        self.session.execute(batch).await.map_err(|err| {
            event!(Level::ERROR, operation, error = %err, "batch rejected by storage");
            MapperError::from(err)
        })
    }

    async fn query(&self, select: Select) -> Result<Vec<Row>> {
        event!(Level::TRACE, cql = %select, "querying");
        Ok(self.session.select(select).await?)
    }

    /// Ids of the collection elements; every element must already be persisted.
    fn relation_ids<E: Entity>(
        &self,
        relation: &RelationDescriptor<E>,
        entity: &E,
    ) -> Result<Vec<Uuid>> {
        relation
            .link()
            .related_ids(entity, &self.registry)?
            .into_iter()
            .map(|id| {
                id.ok_or_else(|| MapperError::UnsavedRelation {
                    field: relation.field().to_string(),
                })
            })
            .collect()
    }

    fn snapshot<E: Entity>(&self, schema: &Schema<E>, entity: &E, id: Uuid) -> Result<Record> {
        let mut record = Record::new(id);
        for column in schema.columns() {
            record.put_column(column.name(), column.get(entity)?);
        }
        for relation in schema.relations() {
            record.put_relation(relation.field(), self.relation_ids(relation, entity)?);
        }
        Ok(record)
    }

    fn track<E: Entity>(&self, schema: &Schema<E>, entity: E, id: Uuid) -> Result<Tracked<E>> {
        let handle = self.cache.allocate();
        if self.config.track_reads {
            let record = self.snapshot(schema, &entity, id)?;
            self.cache.insert(handle, record)?;
        }
        Ok(Tracked::new(entity, id, handle, Arc::downgrade(&self.cache)))
    }
}

/// At most one row, more is a broken invariant of the table.
fn single_row(table: &str, rows: Vec<Row>) -> Result<Option<Row>> {
    if rows.len() > 1 {
        return Err(MapperError::DataIntegrity {
            table: table.to_string(),
            rows: rows.len(),
        });
    }
    Ok(rows.into_iter().next())
}

/// Distinct ids in first-seen order.
fn distinct(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

include!("crud/create_paths.rs");
include!("crud/read_paths.rs");
include!("crud/update_paths.rs");
include!("crud/delete_paths.rs");
