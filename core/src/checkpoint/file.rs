use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{
    fs,
    fs::File,
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};
use tracing::error;

use crate::{
    checkpoint::{checkpoint_key, CheckpointError, CheckpointStore},
    helpers::sanitize_identity,
};

/// One text file per identity holding the last processed height as a decimal string.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    key: String,
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl AsRef<Path>, prefix: &str, identity: &str) -> Self {
        let file_name =
            format!("{}-{}-last_block.txt", sanitize_identity(prefix), sanitize_identity(identity));
        Self { key: checkpoint_key(prefix, identity), path: dir.as_ref().join(file_name) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_block(&self) -> Result<Option<u64>, CheckpointError> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let mut line = String::new();

        if reader.read_line(&mut line).await? > 0 {
            let value = line.trim();
            return value
                .parse::<u64>()
                .map(Some)
                .map_err(|_| CheckpointError::ParseError(value.to_string()));
        }

        Ok(None)
    }

    async fn write_block(&self, block_number: u64) -> Result<(), CheckpointError> {
        let last_block = match self.read_block().await {
            Ok(last_block) => last_block,
            Err(CheckpointError::ParseError(_)) => None,
            Err(e) => return Err(e),
        };

        if last_block.is_some_and(|last_block| block_number <= last_block) {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let temp_file_path = self.path.with_extension("txt.tmp");

        let mut file = File::create(&temp_file_path).await?;
        file.write_all(block_number.to_string().as_bytes()).await?;
        file.sync_all().await?;

        fs::rename(temp_file_path, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    fn key(&self) -> &str {
        &self.key
    }

    async fn last_processed_block(&self) -> Option<u64> {
        match self.read_block().await {
            Ok(block_number) => block_number,
            Err(e) => {
                error!("Error reading checkpoint {} from {}: {}", self.key, self.path.display(), e);
                None
            }
        }
    }

    async fn persist_block(&self, block_number: u64) {
        if let Err(e) = self.write_block(block_number).await {
            error!(
                "Error persisting checkpoint {} for block {} to {}: {}",
                self.key,
                block_number,
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_persist_survives_new_instance() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path(), "apibara", "token-indexer");

        assert_eq!(store.last_processed_block().await, None);
        store.persist_block(1234).await;

        let reopened = FileCheckpointStore::new(dir.path(), "apibara", "token-indexer");
        assert_eq!(reopened.last_processed_block().await, Some(1234));
        assert_eq!(reopened.key(), "apibara:token-indexer:last_block");
        assert!(reopened.path().ends_with("apibara-token-indexer-last_block.txt"));
    }

    #[tokio::test]
    async fn test_lower_height_is_ignored() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path(), "apibara", "idx");

        store.persist_block(50).await;
        store.persist_block(10).await;

        assert_eq!(store.last_processed_block().await, Some(50));
        assert!(!dir.path().join("apibara-idx-last_block.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_as_none_and_is_overwritten() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path(), "apibara", "idx");
        std::fs::write(store.path(), "not a number").unwrap();

        assert_eq!(store.last_processed_block().await, None);

        store.persist_block(7).await;
        assert_eq!(store.last_processed_block().await, Some(7));
    }

    #[tokio::test]
    async fn test_missing_directory_reads_as_none_and_is_created_on_write() {
        let dir = tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("nested/checkpoints"), "apibara", "idx");

        assert_eq!(store.read_block().await.unwrap(), None);

        store.persist_block(3).await;
        assert_eq!(store.read_block().await.unwrap(), Some(3));
    }
}
