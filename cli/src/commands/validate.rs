use std::path::PathBuf;

use starkstream::manifest::{
    checkpoint::CheckpointConfig,
    core::Manifest,
    yaml::read_manifest,
};

use crate::{
    console::{print_detail, print_error_message, print_success_message, print_warn_message},
    starkstream_yaml::validate_starkstream_yaml_exist,
};

fn describe_checkpoint(config: &CheckpointConfig) -> String {
    if let Some(redis) = &config.redis {
        return format!("redis (prefix {})", redis.prefix);
    }
    if let Some(file) = &config.file {
        return format!("file {} (prefix {})", file.path, file.prefix);
    }
    "memory (progress is lost on restart)".to_string()
}

fn describe_sinks(manifest: &Manifest) -> Vec<String> {
    let mut sinks = Vec::new();
    if let Some(webhook) = &manifest.streams.webhook {
        sinks.push(format!("webhook {}", webhook.url));
    }
    if let Some(kafka) = &manifest.streams.kafka {
        sinks.push(format!("kafka {} (chunks of {})", kafka.topic, kafka.chunk_size));
    }
    if let Some(websocket) = &manifest.streams.websocket {
        sinks.push(format!("websocket {}", websocket.url));
    }
    sinks
}

pub fn validate(project_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let manifest_path = validate_starkstream_yaml_exist(&project_path).map_err(|e| {
        print_error_message(&e);
        e
    })?;

    let manifest = read_manifest(&manifest_path).map_err(|e| {
        print_error_message(&format!("starkstream.yaml is not valid: {}", e));
        e
    })?;

    let sinks = describe_sinks(&manifest);
    if sinks.is_empty() {
        print_warn_message("No stream configured, `starkstream start` will refuse to run.");
    }
    if manifest.streams.kafka.is_some() && !cfg!(feature = "kafka") {
        print_warn_message("Kafka stream configured but this binary was built without the kafka feature.");
    }

    let events: Vec<&str> = manifest.event_kinds().iter().map(|kind| kind.event_name()).collect();

    print_success_message(&format!("{} is valid", manifest_path.display()));
    print_detail("name", &manifest.name);
    print_detail(
        "starting block",
        &manifest.starting_block.map_or_else(|| "0".to_string(), |block| block.to_string()),
    );
    print_detail("events", &events.join(", "));
    if !manifest.contracts.is_empty() {
        print_detail("contracts", &manifest.contracts.join(", "));
    }
    print_detail("checkpoint", &describe_checkpoint(&manifest.checkpoint));
    print_detail("streams", &sinks.join(", "));

    Ok(())
}
