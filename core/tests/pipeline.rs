use std::sync::Arc;

use serde_json::json;
use starkstream::{
    checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore},
    decoder::{EventDecoder, EventSelectors},
    manifest::{
        stream::WebhookStreamConfig,
        yaml::{read_manifest, YAML_CONFIG_NAME},
    },
    format_felt, parse_felt, run_blocks, selector_hex,
    streams::{StreamsClients, Webhook},
    IndexerHooks, StreamIndexer,
};
use tempfile::tempdir;
use tokio::io::BufReader;

const TOKEN: &str = "0x049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";

fn padded(felt: &str) -> String {
    format_felt(parse_felt(felt).unwrap())
}

fn block_line(number: u64, events: serde_json::Value) -> String {
    json!({
        "header": { "blockNumber": number, "timestamp": 1_700_000_000 + number },
        "events": events,
        "receipts": [
            { "transactionHash": "0x0abc", "actualFee": { "amount": "0x3e8", "unit": "WEI" } }
        ],
    })
    .to_string()
}

fn transfer_event(value_low: &str) -> serde_json::Value {
    json!({
        "address": TOKEN,
        "keys": [selector_hex("Transfer"), "0x111", "0x222"],
        "data": [value_low, "0x0"],
        "transactionHash": "0xabc",
        "eventIndex": 0,
    })
}

fn stream_of_blocks() -> String {
    [
        block_line(10, json!([transfer_event("0x64")])),
        block_line(11, json!([])),
        block_line(12, json!([transfer_event("0xc8"), { "address": TOKEN, "keys": [selector_hex("Transfer")], "data": ["0x1"] }])),
    ]
    .join("\n")
}

#[tokio::test]
async fn test_blocks_flow_from_decoder_to_webhook_and_checkpoint() {
    let mut server = mockito::Server::new_async().await;
    let with_transfer = server
        .mock("POST", "/hook")
        .match_body(mockito::Matcher::PartialJson(json!({
            "blockNumber": "10",
            "transfers": [{
                "from": padded("0x111"),
                "to": padded("0x222"),
                "value": "100",
                "fee": "1000",
                "contractAddress": padded(TOKEN),
            }]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let malformed_sibling_skipped = server
        .mock("POST", "/hook")
        .match_body(mockito::Matcher::PartialJson(json!({
            "blockNumber": "12",
            "transfers": [{ "value": "200" }]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config: WebhookStreamConfig =
        serde_yaml::from_str(&format!("url: {}/hook", server.url())).unwrap();
    let store = Arc::new(MemoryCheckpointStore::new("apibara:pipeline:last_block"));
    let indexer = StreamIndexer::new(
        "pipeline",
        EventDecoder::new(EventSelectors::standard(), &[TOKEN.to_string()]),
        StreamsClients::from_sinks(vec![Box::new(Webhook::new(&config).unwrap())]),
        store.clone(),
        Some(10),
    );

    let summary = run_blocks(&indexer, BufReader::new(stream_of_blocks().as_bytes())).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.last_block, Some(12));
    assert_eq!(store.last_processed_block().await, Some(12));
    with_transfer.assert_async().await;
    malformed_sibling_skipped.assert_async().await;
}

#[tokio::test]
async fn test_restart_resumes_after_file_checkpoint() {
    let dir = tempdir().unwrap();
    let mut server = mockito::Server::new_async().await;
    let hook = server.mock("POST", "/hook").with_status(200).expect(2).create_async().await;

    std::fs::write(
        dir.path().join(YAML_CONFIG_NAME),
        format!(
            "name: restart-test\nstarting_block: 10\ncheckpoint:\n  file:\n    path: checkpoints\nstreams:\n  webhook:\n    url: {}/hook\n    retry:\n      delay_ms: 10\n",
            server.url()
        ),
    )
    .unwrap();
    let manifest = read_manifest(&dir.path().join(YAML_CONFIG_NAME)).unwrap();

    let first_run = StreamIndexer::from_manifest(&manifest, dir.path()).await.unwrap();
    let first_blocks = block_line(10, json!([transfer_event("0x1")]));
    run_blocks(&first_run, BufReader::new(first_blocks.as_bytes())).await.unwrap();

    let stored = FileCheckpointStore::new(dir.path().join("checkpoints"), "apibara", "restart-test");
    assert_eq!(stored.last_processed_block().await, Some(10));

    let second_run = StreamIndexer::from_manifest(&manifest, dir.path()).await.unwrap();
    assert_eq!(second_run.on_start().await.unwrap(), 11);

    let replayed = stream_of_blocks();
    let summary = run_blocks(&second_run, BufReader::new(replayed.as_bytes())).await.unwrap();

    assert_eq!(summary.resumed_from, 11);
    assert_eq!(summary.skipped, 1);
    assert_eq!(stored.last_processed_block().await, Some(12));
    hook.assert_async().await;
}
