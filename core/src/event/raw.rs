use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Block as handed over by the streaming engine, one per `on_block` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBlock {
    pub header: BlockHeader,

    #[serde(default)]
    pub events: Vec<RawEvent>,

    #[serde(default)]
    pub receipts: Vec<RawReceipt>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finality: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    /// Pending blocks do not carry a number yet.
    #[serde(default, deserialize_with = "deserialize_option_block_number")]
    pub block_number: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,

    pub timestamp: BlockTimestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTimestamp {
    Unix(i64),
    Iso(String),
}

impl BlockTimestamp {
    /// ISO-8601 in UTC with millisecond precision, e.g. `2024-03-01T12:00:00.000Z`.
    pub fn to_iso8601(&self) -> String {
        match self {
            BlockTimestamp::Unix(seconds) => DateTime::<Utc>::from_timestamp(*seconds, 0)
                .map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_else(|| seconds.to_string()),
            BlockTimestamp::Iso(value) => match DateTime::parse_from_rfc3339(value) {
                Ok(date) => date.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true),
                Err(_) => value.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub address: String,

    #[serde(default)]
    pub keys: Vec<String>,

    #[serde(default)]
    pub data: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_index: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,

    /// `{ amount, unit }` on current nodes, a bare value on older ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_fee: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn deserialize_option_block_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrString> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(NumberOrString::Number(number)) => Ok(Some(number)),
        Some(NumberOrString::String(string)) => {
            let string = string.trim();
            let parsed = match string.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => string.parse::<u64>(),
            };
            parsed.map(Some).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_number_from_number_or_string() {
        let block: RawBlock =
            serde_json::from_str(r#"{"header": {"blockNumber": 42, "timestamp": 0}}"#).unwrap();
        assert_eq!(block.header.block_number, Some(42));

        let block: RawBlock =
            serde_json::from_str(r#"{"header": {"blockNumber": "43", "timestamp": 0}}"#).unwrap();
        assert_eq!(block.header.block_number, Some(43));

        let block: RawBlock =
            serde_json::from_str(r#"{"header": {"blockNumber": "0x2c", "timestamp": 0}}"#).unwrap();
        assert_eq!(block.header.block_number, Some(44));

        let block: RawBlock = serde_json::from_str(r#"{"header": {"timestamp": 0}}"#).unwrap();
        assert_eq!(block.header.block_number, None);
        assert!(block.events.is_empty());
    }

    #[test]
    fn test_invalid_block_number_is_rejected() {
        let result = serde_json::from_str::<RawBlock>(
            r#"{"header": {"blockNumber": "abc", "timestamp": 0}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_timestamp_to_iso8601() {
        assert_eq!(BlockTimestamp::Unix(1_700_000_000).to_iso8601(), "2023-11-14T22:13:20.000Z");
        assert_eq!(
            BlockTimestamp::Iso("2023-11-14T23:13:20+01:00".to_string()).to_iso8601(),
            "2023-11-14T22:13:20.000Z"
        );
        assert_eq!(BlockTimestamp::Iso("yesterday".to_string()).to_iso8601(), "yesterday");
    }
}
