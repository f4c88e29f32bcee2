use std::{collections::BTreeMap, time::Duration};

use serde::{Deserialize, Serialize};

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_chunk_size() -> usize {
    200
}

fn default_source() -> String {
    "starkstream".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    2000
}

/// Fixed-delay retry shared by every sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: default_max_attempts(), delay_ms: default_delay_ms() }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookStreamConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaStreamConfig {
    pub brokers: Vec<String>,

    pub topic: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Batches with more events than this are split into several messages.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Value of the `source` header on every message.
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_protocol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_mechanisms: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sasl_password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acks: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSocketStreamConfig {
    pub url: String,

    /// Delay of the background reconnect loop scheduled after a disconnect.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl WebSocketStreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookStreamConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<KafkaStreamConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket: Option<WebSocketStreamConfig>,
}

impl StreamsConfig {
    pub fn is_empty(&self) -> bool {
        self.webhook.is_none() && self.kafka.is_none() && self.websocket.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streams_defaults() {
        let yaml = r#"
          webhook:
            url: https://example.com/hook
          kafka:
            brokers: ["localhost:9092"]
            topic: transfers
          websocket:
            url: ws://localhost:8080
        "#;

        let streams: StreamsConfig = serde_yaml::from_str(yaml).unwrap();

        let webhook = streams.webhook.unwrap();
        assert_eq!(webhook.retry, RetryConfig { max_attempts: 3, delay_ms: 1000 });
        assert!(webhook.headers.is_empty());

        let kafka = streams.kafka.unwrap();
        assert_eq!(kafka.chunk_size, 200);
        assert_eq!(kafka.source, "starkstream");

        let websocket = streams.websocket.unwrap();
        assert_eq!(websocket.reconnect_delay(), Duration::from_millis(2000));
    }

    #[test]
    fn test_partial_retry_override() {
        let yaml = r#"
          url: https://example.com/hook
          headers:
            Authorization: Bearer abc
          retry:
            max_attempts: 5
        "#;

        let webhook: WebhookStreamConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(webhook.retry.max_attempts, 5);
        assert_eq!(webhook.retry.delay(), Duration::from_millis(1000));
        assert_eq!(webhook.headers.get("Authorization").unwrap(), "Bearer abc");
    }

    #[test]
    fn test_empty_streams() {
        let streams: StreamsConfig = serde_yaml::from_str("{}").unwrap();
        assert!(streams.is_empty());
    }
}
