#[cfg(feature = "kafka")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "kafka")]
use rdkafka::{
    config::ClientConfig,
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};
use thiserror::Error;
#[cfg(feature = "kafka")]
use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::{
    event::DeliveryBatch,
    manifest::stream::KafkaStreamConfig,
    streams::{retry::retry_fixed, DeliveryOutcome, DeliverySink, StreamError},
};

#[derive(Error, Debug)]
pub enum KafkaError {
    #[error("Kafka error: {0}")]
    RdkafkaError(String),

    #[error("Kafka stream is configured but this build does not include the kafka feature")]
    FeatureNotEnabled,
}

/// One record ready for the producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaMessage {
    pub key: Option<String>,
    pub payload: String,
    pub headers: Vec<(String, String)>,
}

/// Turns a batch into the ordered records sent for it.
///
/// A batch over `chunk_size` events becomes `ceil(n / chunk_size)` records keyed
/// `{block}-chunk-{index}` whose payloads and headers carry the reassembly metadata. A batch
/// that fits is one record keyed by the block height, or unkeyed for a pending block.
pub fn plan_kafka_messages(
    batch: &DeliveryBatch,
    chunk_size: usize,
    source: &str,
) -> Result<Vec<KafkaMessage>, serde_json::Error> {
    batch
        .chunks(chunk_size)
        .into_iter()
        .map(|chunk| {
            let mut headers = vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("source".to_string(), source.to_string()),
            ];

            let key = match chunk.chunk {
                Some(info) => {
                    headers.push(("chunk-index".to_string(), info.chunk_index.to_string()));
                    headers.push(("total-chunks".to_string(), info.total_chunks.to_string()));
                    headers.push(("original-block".to_string(), chunk.block_label()));
                    chunk
                        .block_number
                        .map(|block_number| format!("{}-chunk-{}", block_number, info.chunk_index))
                }
                None => chunk.block_number.map(|block_number| block_number.to_string()),
            };

            Ok(KafkaMessage { key, payload: chunk.to_json()?, headers })
        })
        .collect()
}

#[cfg(feature = "kafka")]
fn create_producer(config: &KafkaStreamConfig) -> Result<FutureProducer, KafkaError> {
    let servers_list = config.brokers.join(",");
    let mut client_config = ClientConfig::new();

    client_config.set("bootstrap.servers", &servers_list);

    if let Some(ref client_id) = config.client_id {
        client_config.set("client.id", client_id);
    }
    if let Some(ref security_protocol) = config.security_protocol {
        client_config.set("security.protocol", security_protocol);
    }
    if let Some(ref acks) = config.acks {
        client_config.set("acks", acks);
    }
    if let Some(ref sasl_mechanisms) = config.sasl_mechanisms {
        client_config.set("sasl.mechanisms", sasl_mechanisms);
    }
    if let Some(ref sasl_username) = config.sasl_username {
        client_config.set("sasl.username", sasl_username);
    }
    if let Some(ref sasl_password) = config.sasl_password {
        client_config.set("sasl.password", sasl_password);
    }

    client_config.create().map_err(|e| KafkaError::RdkafkaError(e.to_string()))
}

pub struct Kafka {
    config: KafkaStreamConfig,
    #[cfg(feature = "kafka")]
    producer: OnceCell<FutureProducer>,
}

impl Kafka {
    pub fn new(config: &KafkaStreamConfig) -> Result<Self, KafkaError> {
        #[cfg(feature = "kafka")]
        {
            Ok(Self { config: config.clone(), producer: OnceCell::new() })
        }

        #[cfg(not(feature = "kafka"))]
        {
            let _ = config;
            Err(KafkaError::FeatureNotEnabled)
        }
    }

    // Created on the first send and reused for the rest of the run.
    #[cfg(feature = "kafka")]
    async fn producer(&self) -> Result<&FutureProducer, KafkaError> {
        self.producer.get_or_try_init(|| async { create_producer(&self.config) }).await
    }

    #[cfg(feature = "kafka")]
    pub async fn publish(&self, message: &KafkaMessage) -> Result<(), KafkaError> {
        let producer = self.producer().await?;

        let mut headers = OwnedHeaders::new();
        for (key, value) in &message.headers {
            headers = headers.insert(Header { key: key.as_str(), value: Some(value) });
        }

        let mut record: FutureRecord<'_, String, String> =
            FutureRecord::to(&self.config.topic).payload(&message.payload).headers(headers);
        if let Some(key) = &message.key {
            record = record.key(key);
        }

        producer
            .send(record, Timeout::After(Duration::from_secs(0)))
            .await
            .map_err(|(e, _)| KafkaError::RdkafkaError(e.to_string()))?;

        Ok(())
    }

    #[cfg(not(feature = "kafka"))]
    pub async fn publish(&self, _message: &KafkaMessage) -> Result<(), KafkaError> {
        Err(KafkaError::FeatureNotEnabled)
    }

    #[cfg(feature = "kafka")]
    fn flush(&self) {
        if let Some(producer) = self.producer.get() {
            if let Err(e) = producer.flush(Timeout::After(Duration::from_secs(5))) {
                error!("Error flushing Kafka producer: {}", e);
            }
        }
    }

    #[cfg(not(feature = "kafka"))]
    fn flush(&self) {}
}

#[async_trait]
impl DeliverySink for Kafka {
    fn name(&self) -> &str {
        "kafka"
    }

    async fn send(&self, batch: &DeliveryBatch) -> Result<DeliveryOutcome, StreamError> {
        let messages = plan_kafka_messages(batch, self.config.chunk_size, &self.config.source)?;
        let total = messages.len();

        let mut success = true;
        let mut attempts = 0;

        // Each chunk gets its own retry budget; a failed chunk does not stop the ones after it.
        for (index, message) in messages.iter().enumerate() {
            let label = format!(
                "Kafka delivery of block {} chunk {}/{}",
                batch.block_label(),
                index + 1,
                total
            );

            match retry_fixed(&self.config.retry, &label, |_| self.publish(message)).await {
                Ok(((), chunk_attempts)) => {
                    attempts += chunk_attempts;
                }
                Err(exhausted) => {
                    error!(
                        "Kafka delivery of block {} chunk {}/{} to topic {} failed after {} attempts: {}",
                        batch.block_label(),
                        index + 1,
                        total,
                        self.config.topic,
                        exhausted.attempts,
                        exhausted.last_error
                    );
                    attempts += exhausted.attempts;
                    success = false;
                }
            }
        }

        debug!(
            "Kafka sent block {} as {} message(s) to topic {}",
            batch.block_label(),
            total,
            self.config.topic
        );

        Ok(DeliveryOutcome { success, status: None, attempts })
    }

    async fn close(&self) {
        self.flush();
    }
}
