use async_trait::async_trait;
use serde::Serialize;

use crate::event::DeliveryBatch;

mod clients;
mod kafka;
mod retry;
mod webhook;
mod websocket;

pub use clients::{SinkReport, StreamsClients};
pub use kafka::{plan_kafka_messages, Kafka, KafkaError, KafkaMessage};
pub use retry::{retry_fixed, RetryExhausted};
pub use webhook::{Webhook, WebhookError};
pub use websocket::{ConnectionState, WebSocket, WebSocketError};

#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    #[error("Webhook stream error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Kafka stream error: {0}")]
    Kafka(#[from] KafkaError),

    #[error("WebSocket stream error: {0}")]
    WebSocket(#[from] WebSocketError),

    #[error("WebSocket delivery of block {block} failed after {attempts} attempts: {last_error}")]
    WebSocketExhausted { block: String, attempts: u32, last_error: String },

    #[error("Could not serialize delivery batch: {0}")]
    CouldNotSerialize(#[from] serde_json::Error),
}

/// Result of handing one batch to one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    /// Last HTTP status seen, webhook only.
    pub status: Option<u16>,
    pub attempts: u32,
}

#[async_trait]
pub trait DeliverySink: Send + Sync {
    fn name(&self) -> &str;

    /// Delivers the batch with the sink's retry policy. An exhausted retry budget is an
    /// unsuccessful outcome, except where the sink treats it as fatal and returns an error.
    async fn send(&self, batch: &DeliveryBatch) -> Result<DeliveryOutcome, StreamError>;

    async fn close(&self);
}
