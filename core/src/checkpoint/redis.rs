use async_trait::async_trait;
use once_cell::sync::Lazy;
use redis::{aio::MultiplexedConnection, cmd, AsyncCommands, Script};
use tracing::{error, info, warn};

use crate::checkpoint::{checkpoint_key, CheckpointError, CheckpointStore};

// Only moves the cursor forward so a replayed or late write can not rewind it.
static PERSIST_BLOCK_SCRIPT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r"
        local current = tonumber(redis.call('GET', KEYS[1]))
        if current ~= nil and current >= tonumber(ARGV[1]) then
            return 0
        end
        redis.call('SET', KEYS[1], ARGV[1])
        return 1
        ",
    )
});

enum RedisState {
    Available(MultiplexedConnection),
    Unavailable,
}

/// Checkpoint kept under `{prefix}:{identity}:last_block`.
///
/// A store that failed to connect stays in the unavailable state for the whole run: reads
/// return `None` and writes are skipped.
pub struct RedisCheckpointStore {
    key: String,
    state: RedisState,
}

impl RedisCheckpointStore {
    pub async fn try_initialize(
        url: &str,
        identity: &str,
        prefix: &str,
    ) -> Result<Self, CheckpointError> {
        let client = redis::Client::open(url)?;
        let mut connection = client.get_multiplexed_async_connection().await?;
        let _: String = cmd("PING").query_async(&mut connection).await?;

        let key = checkpoint_key(prefix, identity);
        info!("Successfully connected to Redis checkpoint store for {}", key);

        Ok(Self { key, state: RedisState::Available(connection) })
    }

    pub async fn initialize(url: &str, identity: &str, prefix: &str) -> Self {
        match Self::try_initialize(url, identity, prefix).await {
            Ok(store) => store,
            Err(e) => {
                error!("Error connecting to Redis checkpoint store: {}", e);
                Self::unavailable(identity, prefix)
            }
        }
    }

    pub fn unavailable(identity: &str, prefix: &str) -> Self {
        Self { key: checkpoint_key(prefix, identity), state: RedisState::Unavailable }
    }

    async fn read_block(
        &self,
        connection: &MultiplexedConnection,
    ) -> Result<Option<u64>, CheckpointError> {
        let mut connection = connection.clone();
        let value: Option<String> = connection.get(&self.key).await?;

        match value {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| CheckpointError::ParseError(value)),
        }
    }

    async fn write_block(
        &self,
        connection: &MultiplexedConnection,
        block_number: u64,
    ) -> Result<bool, CheckpointError> {
        let mut connection = connection.clone();
        let updated: i64 = PERSIST_BLOCK_SCRIPT
            .key(&self.key)
            .arg(block_number.to_string())
            .invoke_async(&mut connection)
            .await?;

        Ok(updated == 1)
    }
}

#[async_trait]
impl CheckpointStore for RedisCheckpointStore {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_available(&self) -> bool {
        matches!(self.state, RedisState::Available(_))
    }

    async fn last_processed_block(&self) -> Option<u64> {
        let RedisState::Available(connection) = &self.state else {
            return None;
        };

        match self.read_block(connection).await {
            Ok(block_number) => block_number,
            Err(e) => {
                error!("Error reading checkpoint {} from Redis: {}", self.key, e);
                None
            }
        }
    }

    async fn persist_block(&self, block_number: u64) {
        let RedisState::Available(connection) = &self.state else {
            return;
        };

        match self.write_block(connection, block_number).await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Checkpoint {} is already past block {}, not rewinding", self.key, block_number)
            }
            Err(e) => {
                error!("Error persisting checkpoint {} for block {}: {}", self.key, block_number, e)
            }
        }
    }
}
