use serde::{Deserialize, Serialize};

pub const DEFAULT_CHECKPOINT_PREFIX: &str = "apibara";

fn default_prefix() -> String {
    DEFAULT_CHECKPOINT_PREFIX.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisCheckpointConfig {
    pub url: String,

    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCheckpointConfig {
    pub path: String,

    #[serde(default = "default_prefix")]
    pub prefix: String,
}

/// Where the last processed block is kept. Nothing configured means an in-memory
/// checkpoint that does not survive a restart.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisCheckpointConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileCheckpointConfig>,
}
