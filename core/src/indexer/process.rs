use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    checkpoint::{checkpoint_store_from_config, resume_block, CheckpointStore},
    decoder::EventDecoder,
    event::{FinalityStatus, RawBlock},
    indexer::{BlockReport, IndexerError, IndexerHooks},
    manifest::core::Manifest,
    streams::StreamsClients,
};

/// Decodes each block, fans the batch out to every sink and then moves the checkpoint.
pub struct StreamIndexer {
    identity: String,
    decoder: EventDecoder,
    streams: StreamsClients,
    checkpoint: Arc<dyn CheckpointStore>,
    starting_block: Option<u64>,
    deliver_empty_batches: bool,
}

impl StreamIndexer {
    pub fn new(
        identity: &str,
        decoder: EventDecoder,
        streams: StreamsClients,
        checkpoint: Arc<dyn CheckpointStore>,
        starting_block: Option<u64>,
    ) -> Self {
        Self {
            identity: identity.to_string(),
            decoder,
            streams,
            checkpoint,
            starting_block,
            deliver_empty_batches: false,
        }
    }

    pub fn with_empty_batches(mut self, deliver_empty_batches: bool) -> Self {
        self.deliver_empty_batches = deliver_empty_batches;
        self
    }

    /// Builds every part from the manifest. Relative checkpoint paths resolve against
    /// `project_path`.
    pub async fn from_manifest(
        manifest: &Manifest,
        project_path: &Path,
    ) -> Result<Self, IndexerError> {
        if manifest.streams.is_empty() {
            return Err(IndexerError::NoStreamsConfigured(manifest.name.clone()));
        }

        let decoder = EventDecoder::new(manifest.event_selectors(), &manifest.contracts);
        let streams = StreamsClients::new(&manifest.streams).await?;
        let checkpoint =
            checkpoint_store_from_config(&manifest.checkpoint, &manifest.name, project_path).await;

        Ok(Self::new(&manifest.name, decoder, streams, checkpoint, manifest.starting_block)
            .with_empty_batches(manifest.deliver_empty_batches))
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn checkpoint(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoint
    }

    pub fn override_starting_block(&mut self, starting_block: u64) {
        self.starting_block = Some(starting_block);
    }
}

#[async_trait]
impl IndexerHooks for StreamIndexer {
    async fn on_start(&self) -> Result<u64, IndexerError> {
        if !self.checkpoint.is_available() {
            warn!(
                "{} - checkpoint store is unavailable, progress will not be saved",
                self.identity
            );
        }

        let resume_from = resume_block(self.checkpoint.as_ref(), self.starting_block).await;
        info!(
            "{} - starting from block {} (checkpoint key {}) with sinks [{}]",
            self.identity,
            resume_from,
            self.checkpoint.key(),
            self.streams.sink_names().join(", ")
        );

        Ok(resume_from)
    }

    async fn on_block(&self, block: RawBlock) -> Result<BlockReport, IndexerError> {
        let batch = self.decoder.decode(&block);

        let deliveries = if batch.is_empty() && !self.deliver_empty_batches {
            debug!("{} - block {} has no matching events", self.identity, batch.block_label());
            Vec::new()
        } else {
            // A fatal sink error returns here, before the checkpoint moves.
            self.streams.stream(&batch).await?
        };

        let checkpointed = match batch.block_number {
            Some(block_number) if batch.finality != FinalityStatus::Pending => {
                self.checkpoint.persist_block(block_number).await;
                true
            }
            _ => {
                debug!(
                    "{} - not checkpointing pending block {}",
                    self.identity,
                    batch.block_label()
                );
                false
            }
        };

        Ok(BlockReport { block_number: batch.block_number, events: batch.len(), deliveries, checkpointed })
    }

    async fn on_stop(&self) {
        self.streams.close().await;
        info!("{} - stopped", self.identity);
    }
}
