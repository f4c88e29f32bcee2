use clap::{Args, Parser, Subcommand};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "starkstream", about, version)]
pub struct CLI {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// optional - File of newline-delimited JSON blocks, default (or `-`) reads stdin.
    #[clap(long, short)]
    pub blocks: Option<String>,

    /// optional - error, warn, info, debug or trace, default is info.
    #[clap(long)]
    pub log_level: Option<String>,

    /// optional - The path to run the command in, default will be where the command is run.
    #[clap(long, short)]
    pub path: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Starts the indexer defined in starkstream.yaml.
    ///
    /// Blocks are read as newline-delimited JSON, one block per line, in order. The
    /// indexer resumes after its checkpoint when one exists, otherwise from the starting
    /// block.
    ///
    /// Example:
    /// `apibara-stream | starkstream start` or `starkstream start --blocks blocks.ndjson`
    #[clap(name = "start")]
    Start {
        #[clap(flatten)]
        run: RunArgs,

        /// optional - Starting block used when no checkpoint is stored, overrides the manifest.
        #[clap(long)]
        from_block: Option<u64>,
    },

    /// Resumes the indexer from its checkpoint, failing when none is stored.
    ///
    /// Example:
    /// `starkstream resume --blocks blocks.ndjson`
    #[clap(name = "resume")]
    Resume {
        #[clap(flatten)]
        run: RunArgs,
    },

    /// Validates starkstream.yaml and prints what the indexer would run with.
    ///
    /// Example:
    /// `starkstream validate`
    #[clap(name = "validate")]
    Validate {
        /// optional - The path to run the command in, default will be where the command is run.
        #[clap(long, short)]
        path: Option<String>,
    },
}
