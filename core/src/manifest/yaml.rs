use std::{
    collections::HashSet,
    env,
    fs::File,
    io::Read,
    path::Path,
};

use regex::{Captures, Regex};
use tracing::error;

use crate::{
    helpers::{is_hex_string, load_env_from_manifest_dir, normalize_hex},
    manifest::{core::Manifest, stream::RetryConfig},
};

pub const YAML_CONFIG_NAME: &str = "starkstream.yaml";

fn substitute_env_variables(contents: &str) -> Result<String, ReadManifestError> {
    let re = Regex::new(r"\$\{([^}]+)\}")?;
    let mut missing: Vec<String> = Vec::new();

    let result = re.replace_all(contents, |caps: &Captures| {
        let var_name = &caps[1];
        match env::var(var_name) {
            Ok(val) => val,
            Err(_) => {
                error!("Environment variable {} not found", var_name);
                missing.push(var_name.to_string());
                String::new()
            }
        }
    });
    let result = result.into_owned();

    if !missing.is_empty() {
        return Err(ReadManifestError::EnvironmentVariableNotFound(missing.join(", ")));
    }

    Ok(result)
}

#[derive(thiserror::Error, Debug)]
pub enum ValidateManifestError {
    #[error("Indexer name can not be empty, it is used as the checkpoint identity")]
    NameMustBeSet,

    #[error("Contract address {0} is not a valid hex string")]
    InvalidContractAddress(String),

    #[error("Contract address {0} is defined more than once")]
    ContractAddressMustBeUnique(String),

    #[error("Redis checkpoint url can not be empty")]
    RedisCheckpointUrlMustBeSet,

    #[error("File checkpoint path can not be empty")]
    FileCheckpointPathMustBeSet,

    #[error("Only one checkpoint store can be configured, found both redis and file")]
    MultipleCheckpointStores,

    #[error("Webhook stream url can not be empty")]
    WebhookUrlMustBeSet,

    #[error("Kafka stream needs at least one broker")]
    KafkaBrokersMustBeSet,

    #[error("Kafka stream topic can not be empty")]
    KafkaTopicMustBeSet,

    #[error("Kafka stream chunk_size must be greater than 0")]
    KafkaChunkSizeMustBePositive,

    #[error("WebSocket stream url can not be empty")]
    WebSocketUrlMustBeSet,

    #[error("{0} stream retry max_attempts must be greater than 0")]
    RetryAttemptsMustBePositive(String),
}

fn validate_retry(stream: &str, retry: &RetryConfig) -> Result<(), ValidateManifestError> {
    if retry.max_attempts == 0 {
        return Err(ValidateManifestError::RetryAttemptsMustBePositive(stream.to_string()));
    }
    Ok(())
}

pub fn validate_manifest(manifest: &Manifest) -> Result<(), ValidateManifestError> {
    if manifest.name.trim().is_empty() {
        return Err(ValidateManifestError::NameMustBeSet);
    }

    let mut seen = HashSet::new();
    for contract in &manifest.contracts {
        if !is_hex_string(contract) {
            return Err(ValidateManifestError::InvalidContractAddress(contract.clone()));
        }
        if !seen.insert(normalize_hex(contract)) {
            return Err(ValidateManifestError::ContractAddressMustBeUnique(contract.clone()));
        }
    }

    let checkpoint = &manifest.checkpoint;
    if checkpoint.redis.is_some() && checkpoint.file.is_some() {
        return Err(ValidateManifestError::MultipleCheckpointStores);
    }
    if let Some(redis) = &checkpoint.redis {
        if redis.url.trim().is_empty() {
            return Err(ValidateManifestError::RedisCheckpointUrlMustBeSet);
        }
    }
    if let Some(file) = &checkpoint.file {
        if file.path.trim().is_empty() {
            return Err(ValidateManifestError::FileCheckpointPathMustBeSet);
        }
    }

    if let Some(webhook) = &manifest.streams.webhook {
        if webhook.url.trim().is_empty() {
            return Err(ValidateManifestError::WebhookUrlMustBeSet);
        }
        validate_retry("Webhook", &webhook.retry)?;
    }

    if let Some(kafka) = &manifest.streams.kafka {
        if kafka.brokers.iter().all(|broker| broker.trim().is_empty()) {
            return Err(ValidateManifestError::KafkaBrokersMustBeSet);
        }
        if kafka.topic.trim().is_empty() {
            return Err(ValidateManifestError::KafkaTopicMustBeSet);
        }
        if kafka.chunk_size == 0 {
            return Err(ValidateManifestError::KafkaChunkSizeMustBePositive);
        }
        validate_retry("Kafka", &kafka.retry)?;
    }

    if let Some(websocket) = &manifest.streams.websocket {
        if websocket.url.trim().is_empty() {
            return Err(ValidateManifestError::WebSocketUrlMustBeSet);
        }
        validate_retry("WebSocket", &websocket.retry)?;
    }

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum ReadManifestError {
    #[error("Could not open file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse manifest: {0}")]
    CouldNotParseManifest(#[from] serde_yaml::Error),

    #[error("Could not substitute env variables: {0}")]
    CouldNotSubstituteEnvVariables(#[from] regex::Error),

    #[error("Environment variable(s) {0} not found")]
    EnvironmentVariableNotFound(String),

    #[error("Could not validate manifest: {0}")]
    CouldNotValidateManifest(#[from] ValidateManifestError),
}

/// Parses manifest contents after `${VAR}` substitution and validates the result.
pub fn parse_manifest(contents: &str) -> Result<Manifest, ReadManifestError> {
    let contents = substitute_env_variables(contents)?;
    let manifest: Manifest = serde_yaml::from_str(&contents)?;

    validate_manifest(&manifest)?;
    Ok(manifest)
}

pub fn read_manifest(file_path: &Path) -> Result<Manifest, ReadManifestError> {
    let mut file = File::open(file_path)?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;

    load_env_from_manifest_dir(file_path);

    parse_manifest(&contents)
}
