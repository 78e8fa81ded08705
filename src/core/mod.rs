pub mod error;
pub mod types;
pub mod value;

pub use error::{MapperError, Result, SchemaError, StorageError};
pub use types::{ColumnKind, ColumnType};
pub use value::Value;
