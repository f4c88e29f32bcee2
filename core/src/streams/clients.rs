use tracing::{error, info};

use crate::{
    event::DeliveryBatch,
    manifest::stream::StreamsConfig,
    streams::{DeliveryOutcome, DeliverySink, Kafka, StreamError, WebSocket, Webhook},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub sink: String,
    pub outcome: DeliveryOutcome,
}

/// Every configured sink, in configuration order (webhook, kafka, websocket).
pub struct StreamsClients {
    sinks: Vec<Box<dyn DeliverySink>>,
}

impl StreamsClients {
    pub async fn new(stream_config: &StreamsConfig) -> Result<Self, StreamError> {
        let mut sinks: Vec<Box<dyn DeliverySink>> = Vec::new();

        if let Some(config) = &stream_config.webhook {
            sinks.push(Box::new(Webhook::new(config)?));
        }

        if let Some(config) = &stream_config.kafka {
            sinks.push(Box::new(Kafka::new(config)?));
        }

        if let Some(config) = &stream_config.websocket {
            sinks.push(Box::new(WebSocket::connect(config).await));
        }

        Ok(Self { sinks })
    }

    pub fn from_sinks(sinks: Vec<Box<dyn DeliverySink>>) -> Self {
        Self { sinks }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Sends the batch to every sink. A sink error is returned only after all sinks had their
    /// turn, so one fatal sink never starves the others of a block.
    pub async fn stream(&self, batch: &DeliveryBatch) -> Result<Vec<SinkReport>, StreamError> {
        let mut reports = Vec::with_capacity(self.sinks.len());
        let mut first_error: Option<StreamError> = None;

        for sink in &self.sinks {
            match sink.send(batch).await {
                Ok(outcome) => {
                    if outcome.success {
                        info!(
                            "{} - delivered block {} ({} events)",
                            sink.name(),
                            batch.block_label(),
                            batch.len()
                        );
                    }
                    reports.push(SinkReport { sink: sink.name().to_string(), outcome });
                }
                Err(e) => {
                    error!("{} - delivery of block {} failed: {}", sink.name(), batch.block_label(), e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    pub async fn close(&self) {
        for sink in &self.sinks {
            sink.close().await;
        }
    }
}
