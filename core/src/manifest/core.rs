use serde::{Deserialize, Serialize};

use crate::{
    decoder::{EventKind, EventSelectors, SelectorAlias},
    manifest::{checkpoint::CheckpointConfig, stream::StreamsConfig},
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Manifest {
    /// Identity of the indexer, also the checkpoint key segment.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_block: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<EventKind>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<SelectorAlias>,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub streams: StreamsConfig,

    #[serde(default)]
    pub deliver_empty_batches: bool,
}

impl Manifest {
    pub fn event_kinds(&self) -> Vec<EventKind> {
        match &self.events {
            Some(events) if !events.is_empty() => events.clone(),
            _ => EventKind::ALL.to_vec(),
        }
    }

    pub fn event_selectors(&self) -> EventSelectors {
        self.selectors.iter().fold(
            EventSelectors::for_kinds(&self.event_kinds()),
            |selectors, alias| selectors.with_alias(alias.event, &alias.selector),
        )
    }
}
