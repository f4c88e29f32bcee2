use async_trait::async_trait;

use crate::{
    event::RawBlock,
    streams::{SinkReport, StreamError},
};

mod process;
pub mod start;

pub use process::StreamIndexer;

#[derive(thiserror::Error, Debug)]
pub enum IndexerError {
    #[error("{0}")]
    Stream(#[from] StreamError),

    #[error("Indexer {0} has no stream configured")]
    NoStreamsConfigured(String),
}

/// What happened to one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    pub block_number: Option<u64>,
    pub events: usize,
    pub deliveries: Vec<SinkReport>,
    pub checkpointed: bool,
}

impl BlockReport {
    pub fn all_delivered(&self) -> bool {
        self.deliveries.iter().all(|report| report.outcome.success)
    }
}

/// Callbacks the block stream drives: once before the first block, once per block in order,
/// once after the last.
#[async_trait]
pub trait IndexerHooks: Send + Sync {
    /// Returns the height to resume streaming from.
    async fn on_start(&self) -> Result<u64, IndexerError>;

    async fn on_block(&self, block: RawBlock) -> Result<BlockReport, IndexerError>;

    async fn on_stop(&self);
}
