#[cfg(feature = "jemalloc")]
use jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::{path::PathBuf, str::FromStr};

use clap::Parser;

use crate::{
    cli_interface::{Commands, CLI},
    commands::{
        start::{start, RunMode},
        validate::validate,
    },
    console::print_error_message,
};

mod cli_interface;
mod commands;
mod console;
mod starkstream_yaml;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CLI::parse();

    match &cli.command {
        Commands::Start { run, from_block } => {
            let resolved_path = resolve_path(&run.path).map_err(|e| {
                print_error_message(&e);
                e
            })?;
            start(resolved_path, run, RunMode::Start { from_block: *from_block }).await
        }
        Commands::Resume { run } => {
            let resolved_path = resolve_path(&run.path).map_err(|e| {
                print_error_message(&e);
                e
            })?;
            start(resolved_path, run, RunMode::Resume).await
        }
        Commands::Validate { path } => {
            let resolved_path = resolve_path(path).map_err(|e| {
                print_error_message(&e);
                e
            })?;
            validate(resolved_path)
        }
    }
}

fn resolve_path(override_path: &Option<String>) -> Result<PathBuf, String> {
    match override_path {
        Some(path) => {
            let path = PathBuf::from_str(path).map_err(|_| "Invalid path provided.".to_string())?;
            Ok(path)
        }
        None => Ok(std::env::current_dir().map_err(|_| "Failed to get current directory.".to_string())?),
    }
}
