use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, Weak};

use uuid::Uuid;

use crate::core::{Result, Value};

/// Opaque key of a cached [`Record`], assigned when a read hands out a [`Tracked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

/// Last-persisted state of one tracked instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: Uuid,
    columns: BTreeMap<String, Value>,
    relations: BTreeMap<String, Vec<Uuid>>,
}

impl Record {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            columns: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn put_column(&mut self, name: impl Into<String>, value: Value) {
        self.columns.insert(name.into(), value);
    }

    pub fn put_relation(&mut self, field: impl Into<String>, ids: Vec<Uuid>) {
        self.relations.insert(field.into(), ids);
    }

    pub fn column(&self, name: &str) -> Option<&Value> {
        self.columns.get(name)
    }

    /// Related ids as last persisted; empty when the relation was never seen.
    pub fn relation(&self, field: &str) -> &[Uuid] {
        self.relations.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn columns(&self) -> &BTreeMap<String, Value> {
        &self.columns
    }
}

/// Process-wide snapshots keyed by [`EntityHandle`].
///
/// Safe to share between tasks. Reading a snapshot and diffing against it is
/// not atomic: two writers updating the same entity race.
#[derive(Debug, Default)]
pub struct RecordCache {
    records: RwLock<HashMap<EntityHandle, Record>>,
    next_handle: AtomicU64,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn allocate(&self) -> EntityHandle {
        EntityHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    pub fn insert(&self, handle: EntityHandle, record: Record) -> Result<()> {
        self.records.write()?.insert(handle, record);
        Ok(())
    }

    pub fn get(&self, handle: EntityHandle) -> Result<Option<Record>> {
        Ok(self.records.read()?.get(&handle).cloned())
    }

    pub fn evict(&self, handle: EntityHandle) -> Result<Option<Record>> {
        Ok(self.records.write()?.remove(&handle))
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.records
            .read()
            .map(|records| records.contains_key(&handle))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evicts the handle's record once the owning [`Tracked`] goes away.
struct Lease {
    handle: EntityHandle,
    cache: Weak<RecordCache>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(cache) = self.cache.upgrade() {
            let _ = cache.evict(self.handle);
        }
    }
}

/// An entity returned by a read, tied to its cached [`Record`].
///
/// Dereferences to the entity. The record lives as long as this wrapper;
/// dropping it or calling [`Tracked::into_inner`] evicts the record.
pub struct Tracked<E> {
    entity: E,
    id: Uuid,
    lease: Lease,
}

impl<E> Tracked<E> {
    pub(crate) fn new(entity: E, id: Uuid, handle: EntityHandle, cache: Weak<RecordCache>) -> Self {
        Self {
            entity,
            id,
            lease: Lease { handle, cache },
        }
    }

    pub fn handle(&self) -> EntityHandle {
        self.lease.handle
    }

    /// Storage id the entity was read with.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_inner(self) -> E {
        self.entity
    }
}

impl<E> Deref for Tracked<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E> DerefMut for Tracked<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}

impl<E: fmt::Debug> fmt::Debug for Tracked<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracked")
            .field("handle", &self.lease.handle)
            .field("id", &self.id)
            .field("entity", &self.entity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn dropping_tracked_evicts_its_record() {
        let cache = Arc::new(RecordCache::new());
        let handle = cache.allocate();
        let id = Uuid::new_v4();
        cache.insert(handle, Record::new(id)).unwrap();

        let tracked = Tracked::new("entity", id, handle, Arc::downgrade(&cache));
        assert!(cache.contains(handle));
        assert_eq!(tracked.into_inner(), "entity");
        assert!(!cache.contains(handle));
    }

    #[test]
    fn handles_are_unique() {
        let cache = RecordCache::new();
        assert_ne!(cache.allocate(), cache.allocate());
    }

    #[test]
    fn unknown_relation_reads_as_empty() {
        let mut record = Record::new(Uuid::nil());
        record.put_column("name", Value::Text("a".into()));
        assert!(record.relation("items").is_empty());
        assert_eq!(record.column("name"), Some(&Value::Text("a".into())));
    }
}
