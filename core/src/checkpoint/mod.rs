use std::{path::Path, sync::Arc};

use async_trait::async_trait;

use crate::manifest::checkpoint::{CheckpointConfig, DEFAULT_CHECKPOINT_PREFIX};

mod file;
mod memory;
mod redis;

pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;
pub use self::redis::RedisCheckpointStore;

#[derive(thiserror::Error, Debug)]
pub enum CheckpointError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("File IO error: {0}")]
    FileIo(#[from] std::io::Error),

    #[error("Failed to parse stored block number {0}")]
    ParseError(String),
}

/// Last fully processed block height of one indexer identity.
///
/// Reads and writes are best-effort: failures are logged inside the store and surface as
/// "no checkpoint" or a skipped write, never as an error to the caller.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    fn key(&self) -> &str;

    fn is_available(&self) -> bool {
        true
    }

    async fn last_processed_block(&self) -> Option<u64>;

    /// Stores `block_number` unless a higher height is already stored.
    async fn persist_block(&self, block_number: u64);
}

pub fn checkpoint_key(prefix: &str, identity: &str) -> String {
    format!("{}:{}:last_block", prefix, identity)
}

/// Height the stream should start from: the block after the checkpoint when there is one,
/// the configured starting block otherwise.
pub async fn resume_block(store: &dyn CheckpointStore, configured_start: Option<u64>) -> u64 {
    match store.last_processed_block().await {
        Some(block_number) => block_number.saturating_add(1),
        None => configured_start.unwrap_or(0),
    }
}

/// Builds the store the manifest asks for. An unreachable Redis still yields a store, in the
/// unavailable state, so a run can go on without resume support.
pub async fn checkpoint_store_from_config(
    config: &CheckpointConfig,
    identity: &str,
    project_path: &Path,
) -> Arc<dyn CheckpointStore> {
    if let Some(redis) = &config.redis {
        return Arc::new(RedisCheckpointStore::initialize(&redis.url, identity, &redis.prefix).await);
    }

    if let Some(file) = &config.file {
        let dir = project_path.join(&file.path);
        return Arc::new(FileCheckpointStore::new(dir, &file.prefix, identity));
    }

    Arc::new(MemoryCheckpointStore::new(&checkpoint_key(DEFAULT_CHECKPOINT_PREFIX, identity)))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::manifest::checkpoint::FileCheckpointConfig;

    #[test]
    fn test_checkpoint_key() {
        assert_eq!(checkpoint_key("apibara", "token-indexer"), "apibara:token-indexer:last_block");
    }

    #[tokio::test]
    async fn test_resume_block_uses_checkpoint_plus_one() {
        let store = MemoryCheckpointStore::new("apibara:test:last_block");
        assert_eq!(resume_block(&store, Some(500)).await, 500);
        assert_eq!(resume_block(&store, None).await, 0);

        store.persist_block(812).await;
        assert_eq!(resume_block(&store, Some(500)).await, 813);
    }

    #[tokio::test]
    async fn test_store_from_config_defaults_to_memory() {
        let dir = tempdir().unwrap();
        let store = checkpoint_store_from_config(&CheckpointConfig::default(), "idx", dir.path()).await;

        assert_eq!(store.key(), "apibara:idx:last_block");
        assert!(store.is_available());
        assert_eq!(store.last_processed_block().await, None);
    }

    #[tokio::test]
    async fn test_store_from_config_file_is_relative_to_project() {
        let dir = tempdir().unwrap();
        let config = CheckpointConfig {
            redis: None,
            file: Some(FileCheckpointConfig { path: "checkpoints".to_string(), prefix: "apibara".to_string() }),
        };

        let store = checkpoint_store_from_config(&config, "idx", dir.path()).await;
        store.persist_block(42).await;

        assert!(dir.path().join("checkpoints").join("apibara-idx-last_block.txt").exists());
        assert_eq!(store.last_processed_block().await, Some(42));
    }
}
