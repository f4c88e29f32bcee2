use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client, StatusCode,
};
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    event::DeliveryBatch,
    manifest::stream::WebhookStreamConfig,
    streams::{retry::retry_fixed, DeliveryOutcome, DeliverySink, StreamError},
};

#[derive(thiserror::Error, Debug)]
pub enum WebhookError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Webhook responded with status {0}")]
    UnsuccessfulStatus(StatusCode),

    #[error("Invalid webhook header {0}")]
    InvalidHeader(String),
}

impl WebhookError {
    pub fn status(&self) -> Option<u16> {
        match self {
            WebhookError::UnsuccessfulStatus(status) => Some(status.as_u16()),
            WebhookError::RequestError(e) => e.status().map(|status| status.as_u16()),
            WebhookError::InvalidHeader(_) => None,
        }
    }
}

/// POSTs each batch as JSON to a single endpoint. Anything but a 2xx is retried.
#[derive(Debug, Clone)]
pub struct Webhook {
    client: Client,
    config: WebhookStreamConfig,
    headers: HeaderMap,
}

impl Webhook {
    pub fn new(config: &WebhookStreamConfig) -> Result<Self, WebhookError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| WebhookError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| WebhookError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(Self { client: builder.build()?, config: config.clone(), headers })
    }

    pub async fn publish(&self, message: &Value) -> Result<StatusCode, WebhookError> {
        let response = self
            .client
            .post(&self.config.url)
            .headers(self.headers.clone())
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(status)
        } else {
            Err(WebhookError::UnsuccessfulStatus(status))
        }
    }
}

#[async_trait]
impl DeliverySink for Webhook {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, batch: &DeliveryBatch) -> Result<DeliveryOutcome, StreamError> {
        let message = batch.to_value()?;
        let message = &message;
        let label = format!("Webhook delivery of block {}", batch.block_label());

        match retry_fixed(&self.config.retry, &label, move |_| self.publish(message)).await {
            Ok((status, attempts)) => {
                debug!(
                    "Webhook delivered block {} ({} events) on attempt {}",
                    batch.block_label(),
                    batch.len(),
                    attempts
                );
                Ok(DeliveryOutcome { success: true, status: Some(status.as_u16()), attempts })
            }
            Err(exhausted) => {
                error!(
                    "Webhook delivery of block {} to {} failed after {} attempts: {}",
                    batch.block_label(),
                    self.config.url,
                    exhausted.attempts,
                    exhausted.last_error
                );
                Ok(DeliveryOutcome {
                    success: false,
                    status: exhausted.last_error.status(),
                    attempts: exhausted.attempts,
                })
            }
        }
    }

    async fn close(&self) {}
}
