//! Turns the raw events of a block into [`DomainEvent`]s.
//!
//! Decoding is per event and best-effort: an event whose selector is unknown, whose
//! arity does not match or whose felts do not parse is skipped, and its siblings are
//! decoded as usual.

mod fee;
mod selectors;

pub use fee::{extract_fee, fee_from_receipt};
pub use selectors::{EventKind, EventSelectors, SelectorAlias};
use tracing::debug;

use crate::{
    event::{
        DeliveryBatch, DomainEvent, EventMeta, FinalityStatus, RawBlock, RawEvent, RawReceipt,
        TokenCreated, TokenUpgraded, Transfer,
    },
    helpers::{decode_short_string, format_felt, normalize_hex, parse_felt, uint256_from_limbs},
};

/// Why an event was left out of a batch. Skips are expected, not errors.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum SkipReason {
    #[error("event has no keys")]
    NoKeys,

    #[error("selector {0} is not registered")]
    UnknownSelector(String),

    #[error("contract {0} is not indexed")]
    UnwatchedContract(String),

    #[error("{kind:?} expects {expected} felts, got {actual}")]
    ArityMismatch { kind: EventKind, expected: usize, actual: usize },

    #[error("felt {0} could not be parsed")]
    InvalidFelt(String),

    #[error("u256 limbs ({0}, {1}) are out of range")]
    InvalidUint256(String, String),
}

/// Block level context shared by every event of the block.
struct BlockContext<'a> {
    block_number: Option<u64>,
    timestamp: String,
    finality: FinalityStatus,
    receipts: &'a [RawReceipt],
}

#[derive(Debug, Clone, Default)]
pub struct EventDecoder {
    selectors: EventSelectors,
    /// Normalized contract addresses; empty means every contract.
    contracts: Vec<String>,
}

impl EventDecoder {
    pub fn new(selectors: EventSelectors, contracts: &[String]) -> Self {
        Self { selectors, contracts: contracts.iter().map(|c| normalize_hex(c)).collect() }
    }

    pub fn selectors(&self) -> &EventSelectors {
        &self.selectors
    }

    pub fn decode(&self, block: &RawBlock) -> DeliveryBatch {
        let block_finality = block.finality.as_deref().map(FinalityStatus::parse);
        let context = BlockContext {
            block_number: block.header.block_number,
            timestamp: block.header.timestamp.to_iso8601(),
            finality: block_finality.unwrap_or_default(),
            receipts: &block.receipts,
        };

        let mut batch =
            DeliveryBatch::new(context.block_number, context.timestamp.clone(), context.finality);

        for (position, event) in block.events.iter().enumerate() {
            match self.decode_event(event, &context, block_finality.is_some()) {
                Ok(decoded) => batch.events.push(decoded),
                Err(reason) => debug!(
                    "Skipping event {} of block {}: {}",
                    event.event_index.unwrap_or(position as u64),
                    batch.block_label(),
                    reason
                ),
            }
        }

        batch
    }

    fn decode_event(
        &self,
        event: &RawEvent,
        context: &BlockContext<'_>,
        block_has_finality: bool,
    ) -> Result<DomainEvent, SkipReason> {
        let selector = event.keys.first().ok_or(SkipReason::NoKeys)?;
        let kind = self
            .selectors
            .match_key(selector)
            .ok_or_else(|| SkipReason::UnknownSelector(selector.clone()))?;

        if !self.contracts.is_empty() && !self.contracts.contains(&normalize_hex(&event.address)) {
            return Err(SkipReason::UnwatchedContract(event.address.clone()));
        }

        let fields: Vec<&str> =
            event.keys[1..].iter().chain(event.data.iter()).map(String::as_str).collect();
        if fields.len() != kind.felt_count() {
            return Err(SkipReason::ArityMismatch {
                kind,
                expected: kind.felt_count(),
                actual: fields.len(),
            });
        }

        let finality = match (&event.transaction_status, block_has_finality) {
            (Some(status), false) => FinalityStatus::parse(status),
            _ => context.finality,
        };

        let meta = EventMeta {
            contract_address: felt(&event.address)?,
            transaction_hash: event.transaction_hash.as_deref().map(felt).transpose()?,
            block_number: context.block_number,
            timestamp: context.timestamp.clone(),
            finality,
            fee: extract_fee(context.receipts, event.transaction_hash.as_deref()),
            event_index: event.event_index,
        };

        let decoded = match kind {
            EventKind::Transfer => DomainEvent::Transfer(Transfer {
                meta,
                from: felt(fields[0])?,
                to: felt(fields[1])?,
                value: uint256(fields[2], fields[3])?,
            }),
            EventKind::TokenCreated => DomainEvent::TokenCreated(TokenCreated {
                meta,
                token: felt(fields[0])?,
                creator: felt(fields[1])?,
                name: short_string(fields[2])?,
                symbol: short_string(fields[3])?,
                initial_supply: uint256(fields[4], fields[5])?,
            }),
            EventKind::TokenUpgraded => DomainEvent::TokenUpgraded(TokenUpgraded {
                meta,
                token: felt(fields[0])?,
                new_class_hash: felt(fields[1])?,
            }),
        };

        Ok(decoded)
    }
}

fn felt(value: &str) -> Result<String, SkipReason> {
    parse_felt(value).map(format_felt).ok_or_else(|| SkipReason::InvalidFelt(value.to_string()))
}

fn short_string(value: &str) -> Result<String, SkipReason> {
    parse_felt(value)
        .map(decode_short_string)
        .ok_or_else(|| SkipReason::InvalidFelt(value.to_string()))
}

fn uint256(low: &str, high: &str) -> Result<String, SkipReason> {
    uint256_from_limbs(low, high)
        .map(|value| value.to_string())
        .ok_or_else(|| SkipReason::InvalidUint256(low.to_string(), high.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        event::{BlockHeader, BlockTimestamp},
        helpers::selector_hex,
    };

    const TOKEN: &str = "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";

    fn block(events: Vec<RawEvent>, receipts: Vec<RawReceipt>) -> RawBlock {
        RawBlock {
            header: BlockHeader {
                block_number: Some(600_000),
                block_hash: None,
                timestamp: BlockTimestamp::Unix(1_700_000_000),
            },
            events,
            receipts,
            finality: None,
        }
    }

    fn raw_event(name: &str, keys: &[&str], data: &[&str]) -> RawEvent {
        let mut all_keys = vec![selector_hex(name)];
        all_keys.extend(keys.iter().map(|k| k.to_string()));
        RawEvent {
            address: TOKEN.to_string(),
            keys: all_keys,
            data: data.iter().map(|d| d.to_string()).collect(),
            transaction_hash: Some("0x0777".to_string()),
            event_index: Some(0),
            transaction_status: None,
        }
    }

    #[test]
    fn test_decode_transfer_modern_layout() {
        let event = raw_event("Transfer", &["0x1", "0x2"], &["0x64", "0x0"]);
        let receipts = vec![RawReceipt {
            transaction_hash: "0x777".to_string(),
            actual_fee: Some(json!({"amount": "0x2710", "unit": "FRI"})),
        }];

        let batch = EventDecoder::default().decode(&block(vec![event], receipts));

        assert_eq!(batch.block_number, Some(600_000));
        assert_eq!(batch.timestamp, "2023-11-14T22:13:20.000Z");
        assert_eq!(batch.len(), 1);
        let DomainEvent::Transfer(transfer) = &batch.events[0] else {
            panic!("expected a transfer");
        };
        assert_eq!(transfer.from, format_felt(parse_felt("0x1").unwrap()));
        assert_eq!(transfer.to, format_felt(parse_felt("0x2").unwrap()));
        assert_eq!(transfer.value, "100");
        assert_eq!(transfer.meta.fee, "10000");
        assert_eq!(transfer.meta.contract_address, TOKEN);
        assert_eq!(transfer.meta.finality, FinalityStatus::Accepted);
    }

    #[test]
    fn test_decode_transfer_legacy_layout_and_large_value() {
        let event = raw_event("Transfer", &[], &["0x1", "0x2", "0x0", "0x1"]);

        let batch = EventDecoder::default().decode(&block(vec![event], vec![]));

        let DomainEvent::Transfer(transfer) = &batch.events[0] else {
            panic!("expected a transfer");
        };
        assert_eq!(transfer.value, "340282366920938463463374607431768211456");
        assert_eq!(transfer.meta.fee, "0");
    }

    #[test]
    fn test_wrong_arity_is_skipped_without_affecting_siblings() {
        let good = raw_event("Transfer", &["0x1", "0x2"], &["0x5", "0x0"]);
        let wrong_arity = raw_event("Transfer", &["0x1", "0x2"], &["0x5"]);

        let batch = EventDecoder::default().decode(&block(vec![wrong_arity, good], vec![]));

        assert_eq!(batch.len(), 1);
        let DomainEvent::Transfer(transfer) = &batch.events[0] else {
            panic!("expected a transfer");
        };
        assert_eq!(transfer.value, "5");
    }

    #[test]
    fn test_malformed_felt_and_unknown_selector_are_skipped() {
        let malformed = raw_event("Transfer", &["0xzz", "0x2"], &["0x5", "0x0"]);
        let unknown = raw_event("Approval", &["0x1", "0x2"], &["0x5", "0x0"]);
        let no_keys = RawEvent { keys: vec![], ..raw_event("Transfer", &[], &[]) };
        let good = raw_event("TokenUpgraded", &[], &["0x10", "0xc1a55"]);

        let batch = EventDecoder::default().decode(&block(vec![malformed, unknown, no_keys, good], vec![]));

        assert_eq!(batch.len(), 1);
        let DomainEvent::TokenUpgraded(upgraded) = &batch.events[0] else {
            panic!("expected an upgrade");
        };
        assert_eq!(upgraded.new_class_hash, format_felt(parse_felt("0xc1a55").unwrap()));
    }

    #[test]
    fn test_decode_token_created() {
        // "Stark Token" / "STRK"
        let event = raw_event(
            "TokenCreated",
            &["0x10"],
            &["0x20", "0x537461726b20546f6b656e", "0x5354524b", "0x3e8", "0x0"],
        );

        let batch = EventDecoder::default().decode(&block(vec![event], vec![]));

        let DomainEvent::TokenCreated(created) = &batch.events[0] else {
            panic!("expected a token creation");
        };
        assert_eq!(created.name, "Stark Token");
        assert_eq!(created.symbol, "STRK");
        assert_eq!(created.initial_supply, "1000");
    }

    #[test]
    fn test_oversized_limb_is_skipped() {
        let too_big = format!("0x1{}", "0".repeat(32));
        let event = raw_event("Transfer", &["0x1", "0x2"], &[too_big.as_str(), "0x0"]);

        let batch = EventDecoder::default().decode(&block(vec![event], vec![]));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_contract_filter_uses_normalized_addresses() {
        let event = raw_event("Transfer", &["0x1", "0x2"], &["0x5", "0x0"]);
        let other = RawEvent { address: "0x123".to_string(), ..event.clone() };

        let decoder = EventDecoder::new(
            EventSelectors::standard(),
            &["0x49D36570D4E46F48E99674BD3FCC84644DDD6B96F7C741B1562B82F9E004DC7".to_string()],
        );
        let batch = decoder.decode(&block(vec![event, other], vec![]));

        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_finality_from_block_wins_over_transaction_status() {
        let mut event = raw_event("Transfer", &["0x1", "0x2"], &["0x5", "0x0"]);
        event.transaction_status = Some("ACCEPTED_ON_L1".to_string());

        let batch = EventDecoder::default().decode(&block(vec![event.clone()], vec![]));
        assert_eq!(batch.events[0].meta().finality, FinalityStatus::Finalized);

        let mut pending = block(vec![event], vec![]);
        pending.finality = Some("pending".to_string());
        let batch = EventDecoder::default().decode(&pending);
        assert_eq!(batch.finality, FinalityStatus::Pending);
        assert_eq!(batch.events[0].meta().finality, FinalityStatus::Pending);
    }
}
