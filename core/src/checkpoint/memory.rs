use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::checkpoint::CheckpointStore;

/// Process-local checkpoint for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    key: String,
    block_number: Mutex<Option<u64>>,
}

impl MemoryCheckpointStore {
    pub fn new(key: &str) -> Self {
        Self { key: key.to_string(), block_number: Mutex::new(None) }
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    fn key(&self) -> &str {
        &self.key
    }

    async fn last_processed_block(&self) -> Option<u64> {
        *self.block_number.lock().await
    }

    async fn persist_block(&self, block_number: u64) {
        let mut stored = self.block_number.lock().await;
        if stored.map_or(true, |current| block_number > current) {
            *stored = Some(block_number);
        }
    }
}
