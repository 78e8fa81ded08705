use async_trait::async_trait;
use tracing::{Level, event};
use uuid::Uuid;

use super::metadata::Entity;
use super::registry::SchemaRegistry;
use super::schema::{DeriveTrail, Schema};
use crate::core::{Result, SchemaError};
use crate::mapper::{Mapper, ReadTrail};

/// The table a relation points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTarget {
    pub type_name: &'static str,
    pub table: String,
    pub id_column: String,
}

/// Type-erased access to a `Vec<R>` relation field of `E`.
#[async_trait]
pub(crate) trait RelationLink<E>: Send + Sync {
    /// Validates the related type and reports the table it maps to.
    fn resolve(&self, trail: &mut DeriveTrail) -> std::result::Result<RelationTarget, SchemaError>;

    /// Identity of every element currently in the collection, in order.
    fn related_ids(&self, owner: &E, registry: &SchemaRegistry) -> Result<Vec<Option<Uuid>>>;

    /// Reads every id and stores the found entities in the collection.
    async fn load(
        &self,
        mapper: &Mapper,
        owner: &mut E,
        ids: Vec<Uuid>,
        trail: &mut ReadTrail,
    ) -> Result<()>;
}

pub(crate) struct TypedLink<E, R> {
    get: fn(&E) -> &Vec<R>,
    get_mut: fn(&mut E) -> &mut Vec<R>,
}

impl<E, R> TypedLink<E, R> {
    pub(crate) fn new(get: fn(&E) -> &Vec<R>, get_mut: fn(&mut E) -> &mut Vec<R>) -> Self {
        Self { get, get_mut }
    }
}

#[async_trait]
impl<E: Entity, R: Entity> RelationLink<E> for TypedLink<E, R> {
    fn resolve(&self, trail: &mut DeriveTrail) -> std::result::Result<RelationTarget, SchemaError> {
        if trail.visited::<R>() {
            // already being derived further up; its shape is checked there
            return Schema::<R>::target_of(&R::metadata());
        }
        Schema::<R>::derive_in(trail).map(|schema| schema.target())
    }

    fn related_ids(&self, owner: &E, registry: &SchemaRegistry) -> Result<Vec<Option<Uuid>>> {
        let schema = registry.schema::<R>()?;
        (self.get)(owner)
            .iter()
            .map(|related| schema.id_value(related))
            .collect()
    }

    async fn load(
        &self,
        mapper: &Mapper,
        owner: &mut E,
        ids: Vec<Uuid>,
        trail: &mut ReadTrail,
    ) -> Result<()> {
        let mut related = Vec::with_capacity(ids.len());
        for id in ids {
            match mapper.read_related::<R>(id, trail).await? {
                Some(entity) => related.push(entity),
                None => {
                    event!(
                        Level::WARN,
                        related_type = std::any::type_name::<R>(),
                        %id,
                        "skipping join row that references a missing entity"
                    );
                }
            }
        }
        *(self.get_mut)(owner) = related;
        Ok(())
    }
}
