// ============================================================================
// cassmap: object-to-column-family mapping over a wide-column store
// ============================================================================

//! Derive a table layout from an annotated entity type, then create, read,
//! update and delete instances through a [`StorageSession`].
//!
//! ```ignore
//! use cassmap::prelude::*;
//!
//! #[derive(Entity, Default)]
//! struct Person {
//!     #[id]
//!     id: Option<Uuid>,
//!     #[column(index)]
//!     email: String,
//! }
//!
//! let session = Arc::new(MemorySession::new());
//! let mapper = Mapper::new(session.clone());
//! session.create_schema_tables(&*mapper.schema::<Person>()?).await;
//!
//! let mut person = Person { email: "ada@example.com".into(), ..Default::default() };
//! let id = mapper.create(&mut person).await?;
//! let found = mapper.read::<Person>(id).await?;
//! ```

extern crate self as cassmap;

pub mod config;
pub mod core;
pub mod mapper;
pub mod prelude;
pub mod schema;
pub mod storage;

// Re-export main types for convenience
pub use config::MapperConfig;
pub use core::{ColumnKind, ColumnType, MapperError, Result, SchemaError, StorageError, Value};
pub use mapper::{EntityHandle, Mapper, ReadTrail, Record, RecordCache, Tracked};
pub use schema::{
    ColumnAccessor, Entity, EntityMetadata, FieldMetadata, FieldRole, Schema, SchemaDescription,
    SchemaRegistry,
};
pub use storage::{Batch, MemorySession, Row, Select, StorageSession, TableDef};

// Derive macro shares the trait's name; they live in different namespaces.
pub use cassmap_derive::Entity;
