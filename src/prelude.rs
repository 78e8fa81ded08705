//! Everything an application needs to declare and persist entities.
//!
//! `use cassmap::prelude::*;` brings in the derive, the mapper and the
//! in-memory session, plus the id type entities are keyed by.

pub use crate::{
    ColumnType, Entity, EntityMetadata, FieldMetadata, Mapper, MapperConfig, MapperError,
    MemorySession, Result, StorageSession, Tracked, Value,
};

pub use std::sync::Arc;
pub use uuid::Uuid;
