//! Schema derivation: how an entity type maps onto tables.

pub mod ddl;
pub mod metadata;
pub mod naming;
pub mod registry;
pub mod relation;
#[allow(clippy::module_inception)]
pub mod schema;

pub use ddl::{ColumnDescription, RelationDescription, SchemaDescription};
pub use metadata::{ColumnAccessor, Entity, EntityMetadata, FieldMetadata, FieldRole};
pub use registry::SchemaRegistry;
pub use relation::RelationTarget;
pub use schema::{ColumnDescriptor, DeriveTrail, IdDescriptor, RelationDescriptor, Schema};
