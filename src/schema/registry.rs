use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{Level, event};

use super::metadata::Entity;
use super::schema::Schema;
use crate::core::Result;

type SharedSchema = Arc<dyn Any + Send + Sync>;

/// Per-type cache of derived schemas.
///
/// Successful derivations are kept for the life of the registry; failures are
/// returned to the caller and derived again on the next request.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<TypeId, SharedSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema<E: Entity>(&self) -> Result<Arc<Schema<E>>> {
        let key = TypeId::of::<E>();
        let cached = self.schemas.read()?.get(&key).cloned();
        if let Some(schema) = cached.and_then(|shared| shared.downcast::<Schema<E>>().ok()) {
            return Ok(schema);
        }

        let schema = Arc::new(Schema::<E>::derive()?);
        event!(
            Level::DEBUG,
            entity = schema.type_name(),
            table = schema.table_name(),
            columns = schema.columns().len(),
            relations = schema.relations().len(),
            "derived entity schema"
        );

        let shared: SharedSchema = schema.clone();
        self.schemas.write()?.entry(key).or_insert(shared);
        Ok(schema)
    }

    pub fn contains<E: Entity>(&self) -> bool {
        self.schemas
            .read()
            .map(|schemas| schemas.contains_key(&TypeId::of::<E>()))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().map(|schemas| schemas.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
