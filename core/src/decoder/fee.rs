use serde_json::Value;
use tracing::debug;

use crate::{
    event::RawReceipt,
    helpers::{hex_eq, parse_felt},
};

/// Fee of the transaction that emitted an event, as a decimal string.
///
/// Never fails: a missing receipt, a missing fee or a fee that does not parse all yield `"0"`.
pub fn extract_fee(receipts: &[RawReceipt], transaction_hash: Option<&str>) -> String {
    let Some(transaction_hash) = transaction_hash else {
        return "0".to_string();
    };

    let receipt = receipts.iter().find(|receipt| hex_eq(&receipt.transaction_hash, transaction_hash));
    fee_from_receipt(receipt)
}

pub fn fee_from_receipt(receipt: Option<&RawReceipt>) -> String {
    let Some(fee) = receipt.and_then(|receipt| receipt.actual_fee.as_ref()) else {
        return "0".to_string();
    };

    let amount = match fee {
        Value::Object(map) => map.get("amount").and_then(value_as_felt_string),
        other => value_as_felt_string(other),
    };

    match amount.as_deref().and_then(parse_felt) {
        Some(value) => value.to_string(),
        None => {
            debug!("Could not parse transaction fee {}, defaulting to 0", fee);
            "0".to_string()
        }
    }
}

fn value_as_felt_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
