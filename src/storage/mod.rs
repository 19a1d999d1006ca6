use async_trait::async_trait;
use crate::error::StorageError;

pub mod gcs;
pub mod local;
pub mod memory;

pub use gcs::{GcsAuth, GcsSink};
pub use local::LocalSink;
pub use memory::MemorySink;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Durable key/value object store. One `put` per indicator per run.
#[async_trait]
pub trait StorageSink: Send + Sync {
    fn name(&self) -> &str;
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
}
