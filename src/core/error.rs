use thiserror::Error;
use uuid::Uuid;

use super::types::ColumnKind;

/// Problems with an entity type's shape, detected while deriving its schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Entity '{0}' has no zero-argument constructor")]
    MissingConstructor(String),

    #[error("Entity '{0}' declares no identity field")]
    MissingIdentity(String),

    #[error("Entity '{entity}' declares more than one identity field: {fields:?}")]
    MultipleIdentity {
        entity: String,
        fields: Vec<String>,
    },

    #[error("Identity field '{entity}.{field}' must be a uuid, found {found}")]
    InvalidIdentityType {
        entity: String,
        field: String,
        found: ColumnKind,
    },

    #[error("Identity field '{entity}.{field}' must be optional")]
    NonOptionalIdentity { entity: String, field: String },

    #[error("Field '{entity}.{field}' has unsupported column type {kind}")]
    UnsupportedFieldType {
        entity: String,
        field: String,
        kind: ColumnKind,
    },

    #[error("Entity '{entity}' maps more than one field to column '{column}'")]
    DuplicateColumn { entity: String, column: String },

    #[error("Entity '{entity}' maps more than one index or relation to table '{table}'")]
    DuplicateTable { entity: String, table: String },

    #[error("Relation '{entity}.{field}' targets an invalid entity: {source}")]
    InvalidRelation {
        entity: String,
        field: String,
        #[source]
        source: Box<SchemaError>,
    },
}

/// Failures reported by a storage session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage timeout: {0}")]
    Timeout(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),
}

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Relation '{field}' references an entity that was never created")]
    UnsavedRelation { field: String },

    #[error("Data integrity violation: {rows} rows in '{table}' where at most one was expected")]
    DataIntegrity { table: String, rows: usize },

    #[error("Column '{column}' expects {expected}, got {found}")]
    UnsupportedType {
        column: String,
        expected: ColumnKind,
        found: &'static str,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Column '{column}' of table '{table}' is not indexed")]
    NotIndexed { table: String, column: String },

    #[error("Relation cycle detected at {table} {id}")]
    RelationCycle { table: String, id: Uuid },

    #[error("Relation depth exceeded the configured limit of {depth}")]
    RelationDepthExceeded { depth: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;

impl<T> From<std::sync::PoisonError<T>> for MapperError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}

impl MapperError {
    /// Attaches a column name to a decode failure raised without one.
    pub(crate) fn in_column(self, column: &str) -> Self {
        match self {
            Self::UnsupportedType {
                column: existing,
                expected,
                found,
            } if existing.is_empty() => Self::UnsupportedType {
                column: column.to_string(),
                expected,
                found,
            },
            other => other,
        }
    }
}
