use std::path::{Path, PathBuf};

use starkstream::{
    checkpoint::CheckpointStore,
    indexer::IndexerHooks,
    manifest::yaml::read_manifest,
    parse_log_level, run_blocks, setup_logger, shutdown_on_ctrl_c, LevelFilter, RunSummary,
    StreamIndexer,
};
use tokio::{
    fs::File,
    io::{stdin, BufReader},
};

use crate::{
    cli_interface::RunArgs,
    console::{print_error_message, print_success_message},
    starkstream_yaml::validate_starkstream_yaml_exist,
};

#[derive(Debug, Clone, Copy)]
pub enum RunMode {
    Start { from_block: Option<u64> },
    Resume,
}

async fn run_from_source<H: IndexerHooks>(
    indexer: &H,
    project_path: &Path,
    blocks: &Option<String>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    let summary = match blocks.as_deref() {
        Some(path) if path != "-" => {
            let file = File::open(project_path.join(path)).await.map_err(|e| {
                print_error_message(&format!("Could not open block file {}: {}", path, e));
                e
            })?;
            run_blocks(indexer, BufReader::new(file)).await?
        }
        _ => run_blocks(indexer, BufReader::new(stdin())).await?,
    };

    Ok(summary)
}

pub async fn start(
    project_path: PathBuf,
    run: &RunArgs,
    mode: RunMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match run.log_level.as_deref() {
        Some(value) => parse_log_level(value).ok_or_else(|| {
            let error = format!("Unknown log level {}", value);
            print_error_message(&error);
            error
        })?,
        None => LevelFilter::INFO,
    };
    setup_logger(log_level);

    let manifest_path = validate_starkstream_yaml_exist(&project_path).map_err(|e| {
        print_error_message(&e);
        e
    })?;

    let manifest = read_manifest(&manifest_path).map_err(|e| {
        print_error_message(&format!("Could not read the starkstream.yaml file: {}", e));
        e
    })?;

    let mut indexer = StreamIndexer::from_manifest(&manifest, &project_path).await.map_err(|e| {
        print_error_message(&format!("Could not set up indexer {}: {}", manifest.name, e));
        e
    })?;

    match mode {
        RunMode::Start { from_block: Some(from_block) } => {
            indexer.override_starting_block(from_block)
        }
        RunMode::Start { from_block: None } => {}
        RunMode::Resume => {
            if indexer.checkpoint().last_processed_block().await.is_none() {
                let error = format!(
                    "No checkpoint stored under {}, use `starkstream start` for a first run",
                    indexer.checkpoint().key()
                );
                print_error_message(&error);
                return Err(error.into());
            }
        }
    }

    shutdown_on_ctrl_c();

    let summary = run_from_source(&indexer, &project_path, &run.blocks).await.map_err(|e| {
        print_error_message(&format!("Indexer {} stopped: {}", manifest.name, e));
        e
    })?;

    print_success_message(&format!(
        "{} processed {} blocks from block {} ({} skipped), last block {}",
        manifest.name,
        summary.processed,
        summary.resumed_from,
        summary.skipped,
        summary.last_block.map_or_else(|| "none".to_string(), |block| block.to_string())
    ));

    Ok(())
}
