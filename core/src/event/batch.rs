use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalityStatus {
    Pending,
    #[default]
    Accepted,
    Finalized,
}

impl FinalityStatus {
    /// Maps the status strings used by nodes and streaming engines.
    ///
    /// Anything unknown is treated as accepted, which is what a block the engine
    /// delivers without a finality marker is.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "pre_confirmed" | "received" => FinalityStatus::Pending,
            "finalized" | "accepted_on_l1" => FinalityStatus::Finalized,
            _ => FinalityStatus::Accepted,
        }
    }
}

pub fn serialize_option_u64_as_string<S>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(number) => serializer.serialize_some(&number.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Fields every decoded event carries, flattened into the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    pub contract_address: String,
    pub transaction_hash: Option<String>,
    #[serde(serialize_with = "serialize_option_u64_as_string")]
    pub block_number: Option<u64>,
    pub timestamp: String,
    pub finality: FinalityStatus,
    /// Fee paid by the emitting transaction, decimal, `"0"` when unknown.
    pub fee: String,
    pub event_index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub from: String,
    pub to: String,
    /// uint256 as a decimal string, token amounts do not fit any native integer.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreated {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub token: String,
    pub creator: String,
    pub name: String,
    pub symbol: String,
    pub initial_supply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpgraded {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub token: String,
    pub new_class_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Transfer(Transfer),
    TokenCreated(TokenCreated),
    TokenUpgraded(TokenUpgraded),
}

impl DomainEvent {
    pub fn meta(&self) -> &EventMeta {
        match self {
            DomainEvent::Transfer(event) => &event.meta,
            DomainEvent::TokenCreated(event) => &event.meta,
            DomainEvent::TokenUpgraded(event) => &event.meta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub original_count: usize,
}

/// Everything decoded out of one block, handed to every sink.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryBatch {
    pub block_number: Option<u64>,
    pub timestamp: String,
    pub finality: FinalityStatus,
    pub events: Vec<DomainEvent>,
    pub chunk: Option<ChunkInfo>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchPayload<'a> {
    #[serde(serialize_with = "serialize_option_u64_as_string")]
    block_number: Option<u64>,
    timestamp: &'a str,
    finality: FinalityStatus,
    transfers: Vec<&'a Transfer>,
    tokens_created: Vec<&'a TokenCreated>,
    tokens_upgraded: Vec<&'a TokenUpgraded>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunk: Option<ChunkInfo>,
}

impl DeliveryBatch {
    pub fn new(block_number: Option<u64>, timestamp: String, finality: FinalityStatus) -> Self {
        Self { block_number, timestamp, finality, events: Vec::new(), chunk: None }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Block height for log lines, `pending` when the block has no number yet.
    pub fn block_label(&self) -> String {
        self.block_number.map_or_else(|| "pending".to_string(), |number| number.to_string())
    }

    /// Splits the events into ordered chunks of at most `chunk_size` events.
    ///
    /// A batch that already fits is returned as a single batch without chunk metadata.
    pub fn chunks(&self, chunk_size: usize) -> Vec<DeliveryBatch> {
        let chunk_size = chunk_size.max(1);
        if self.events.len() <= chunk_size {
            return vec![self.clone()];
        }

        let total_chunks = self.events.len().div_ceil(chunk_size);
        self.events
            .chunks(chunk_size)
            .enumerate()
            .map(|(chunk_index, events)| DeliveryBatch {
                block_number: self.block_number,
                timestamp: self.timestamp.clone(),
                finality: self.finality,
                events: events.to_vec(),
                chunk: Some(ChunkInfo {
                    chunk_index,
                    total_chunks,
                    original_count: self.events.len(),
                }),
            })
            .collect()
    }

    fn payload(&self) -> BatchPayload<'_> {
        let mut payload = BatchPayload {
            block_number: self.block_number,
            timestamp: &self.timestamp,
            finality: self.finality,
            transfers: Vec::new(),
            tokens_created: Vec::new(),
            tokens_upgraded: Vec::new(),
            chunk: self.chunk,
        };

        for event in &self.events {
            match event {
                DomainEvent::Transfer(transfer) => payload.transfers.push(transfer),
                DomainEvent::TokenCreated(created) => payload.tokens_created.push(created),
                DomainEvent::TokenUpgraded(upgraded) => payload.tokens_upgraded.push(upgraded),
            }
        }

        payload
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl Serialize for DeliveryBatch {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.payload().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(index: u64) -> DomainEvent {
        DomainEvent::Transfer(Transfer {
            meta: EventMeta {
                contract_address: "0x1".to_string(),
                transaction_hash: Some(format!("0x{index:x}")),
                block_number: Some(10),
                timestamp: "2024-01-01T00:00:00.000Z".to_string(),
                finality: FinalityStatus::Accepted,
                fee: "0".to_string(),
                event_index: Some(index),
            },
            from: "0xa".to_string(),
            to: "0xb".to_string(),
            value: index.to_string(),
        })
    }

    fn batch_with(count: u64) -> DeliveryBatch {
        let mut batch = DeliveryBatch::new(
            Some(10),
            "2024-01-01T00:00:00.000Z".to_string(),
            FinalityStatus::Accepted,
        );
        batch.events = (0..count).map(transfer).collect();
        batch
    }

    #[test]
    fn test_finality_parse() {
        assert_eq!(FinalityStatus::parse("ACCEPTED_ON_L1"), FinalityStatus::Finalized);
        assert_eq!(FinalityStatus::parse("finalized"), FinalityStatus::Finalized);
        assert_eq!(FinalityStatus::parse("pending"), FinalityStatus::Pending);
        assert_eq!(FinalityStatus::parse("ACCEPTED_ON_L2"), FinalityStatus::Accepted);
        assert_eq!(FinalityStatus::parse("whatever"), FinalityStatus::Accepted);
    }

    #[test]
    fn test_payload_shape() {
        let value = batch_with(2).to_value().unwrap();

        assert_eq!(value["blockNumber"], "10");
        assert_eq!(value["timestamp"], "2024-01-01T00:00:00.000Z");
        assert_eq!(value["finality"], "accepted");
        assert_eq!(value["transfers"].as_array().unwrap().len(), 2);
        assert_eq!(value["tokensCreated"].as_array().unwrap().len(), 0);
        assert!(value.get("chunk").is_none());

        let first = &value["transfers"][0];
        assert_eq!(first["contractAddress"], "0x1");
        assert_eq!(first["blockNumber"], "10");
        assert_eq!(first["from"], "0xa");
        assert_eq!(first["value"], "0");
        assert_eq!(first["eventIndex"], 0);
    }

    #[test]
    fn test_pending_block_number_is_null() {
        let mut batch = batch_with(0);
        batch.block_number = None;

        let value = batch.to_value().unwrap();
        assert!(value["blockNumber"].is_null());
        assert_eq!(batch.block_label(), "pending");
    }

    #[test]
    fn test_chunks_keep_order_and_metadata() {
        let batch = batch_with(450);
        let chunks = batch.chunks(200);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![200, 200, 50]);
        for (index, chunk) in chunks.iter().enumerate() {
            let info = chunk.chunk.unwrap();
            assert_eq!(info.chunk_index, index);
            assert_eq!(info.total_chunks, 3);
            assert_eq!(info.original_count, 450);
        }
        assert_eq!(chunks[1].events[0], batch.events[200]);
    }

    #[test]
    fn test_small_batch_is_not_chunked() {
        let chunks = batch_with(200).chunks(200);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].chunk.is_none());
    }
}
