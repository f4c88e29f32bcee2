// public
pub mod checkpoint;
pub mod decoder;
pub mod event;
pub mod indexer;
pub mod manifest;
pub mod streams;

mod helpers;
pub use helpers::{
    decode_short_string, format_felt, hex_eq, is_hex_string, load_env_from_manifest_dir,
    normalize_hex, parse_felt, selector_hex, split_uint256, starknet_keccak, uint256_from_limbs,
};

mod logger;
pub use logger::{parse_log_level, setup_info_logger, setup_logger};

mod system_state;
pub use system_state::{initiate_shutdown, is_running, shutdown_on_ctrl_c};

pub use indexer::{
    start::{run_blocks, RunBlocksError, RunSummary},
    BlockReport, IndexerError, IndexerHooks, StreamIndexer,
};

// export 3rd party dependencies
pub use alloy_primitives::U256;
pub use async_trait::async_trait;
pub use tokio::main as starkstream_main;
pub use tracing::{
    error as starkstream_error, info as starkstream_info, level_filters::LevelFilter,
};
