use async_trait::async_trait;

use super::statement::{Batch, Row, Select};
use crate::core::StorageError;

/// Connection to a wide-column store.
///
/// Implementations own connection management, retries and timeouts; the mapper
/// surfaces every error returned here unchanged.
#[async_trait]
pub trait StorageSession: Send + Sync {
    /// Applies every mutation of `batch` atomically.
    async fn execute(&self, batch: Batch) -> Result<(), StorageError>;

    async fn select(&self, select: Select) -> Result<Vec<Row>, StorageError>;
}
