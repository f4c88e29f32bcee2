use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{error, info, warn};

use crate::{
    event::RawBlock,
    indexer::{IndexerError, IndexerHooks},
    system_state::is_running,
};

#[derive(thiserror::Error, Debug)]
pub enum RunBlocksError {
    #[error("{0}")]
    Indexer(#[from] IndexerError),

    #[error("Could not read block stream: {0}")]
    CouldNotReadBlocks(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub resumed_from: u64,
    pub processed: u64,
    pub skipped: u64,
    pub last_block: Option<u64>,
}

/// Feeds newline-delimited JSON blocks to the hooks in order.
///
/// Blocks below the resume height and lines that do not parse are skipped. Any hook error
/// stops the loop; `on_stop` runs either way once `on_start` succeeded.
pub async fn run_blocks<H, R>(hooks: &H, reader: R) -> Result<RunSummary, RunBlocksError>
where
    H: IndexerHooks + ?Sized,
    R: AsyncBufRead + Unpin,
{
    let resumed_from = hooks.on_start().await?;
    let mut summary = RunSummary { resumed_from, ..Default::default() };

    let mut lines = reader.lines();
    let mut line_number: u64 = 0;

    let result: Result<(), RunBlocksError> = loop {
        if !is_running() {
            info!("Shutdown requested, stopping block stream");
            break Ok(());
        }

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e.into()),
        };
        line_number += 1;

        if line.trim().is_empty() {
            continue;
        }

        let block: RawBlock = match serde_json::from_str(&line) {
            Ok(block) => block,
            Err(e) => {
                warn!("Skipping line {} of the block stream, not a valid block: {}", line_number, e);
                summary.skipped += 1;
                continue;
            }
        };

        if block.header.block_number.is_some_and(|number| number < resumed_from) {
            summary.skipped += 1;
            continue;
        }

        match hooks.on_block(block).await {
            Ok(report) => {
                summary.processed += 1;
                if report.block_number.is_some() {
                    summary.last_block = report.block_number;
                }
            }
            Err(e) => {
                error!("Stopping block stream at line {}: {}", line_number, e);
                break Err(e.into());
            }
        }
    };

    hooks.on_stop().await;

    result.map(|()| summary)
}
