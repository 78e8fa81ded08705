pub mod memory;
pub mod session;
pub mod statement;
pub mod table;

pub use memory::MemorySession;
pub use session::StorageSession;
pub use statement::{Batch, Condition, Delete, Insert, Mutation, Row, Select, Update};
pub use table::{ColumnDef, TableDef};
