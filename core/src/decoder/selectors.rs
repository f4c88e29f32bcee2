use serde::{Deserialize, Serialize};

use crate::helpers::{normalize_hex, selector_hex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Transfer,
    TokenCreated,
    TokenUpgraded,
}

impl EventKind {
    pub const ALL: [EventKind; 3] =
        [EventKind::Transfer, EventKind::TokenCreated, EventKind::TokenUpgraded];

    /// Cairo event name, the preimage of the selector.
    pub fn event_name(&self) -> &'static str {
        match self {
            EventKind::Transfer => "Transfer",
            EventKind::TokenCreated => "TokenCreated",
            EventKind::TokenUpgraded => "TokenUpgraded",
        }
    }

    /// Number of felts after the selector (`keys[1..]` followed by `data`).
    ///
    /// - Transfer: from, to, value (u256 = 2 limbs)
    /// - TokenCreated: token, creator, name, symbol, initial_supply (u256 = 2 limbs)
    /// - TokenUpgraded: token, new_class_hash
    pub fn felt_count(&self) -> usize {
        match self {
            EventKind::Transfer => 4,
            EventKind::TokenCreated => 6,
            EventKind::TokenUpgraded => 2,
        }
    }
}

/// Extra selector accepted for an event kind, e.g. a renamed event on an older deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorAlias {
    pub event: EventKind,
    pub selector: String,
}

/// Known selectors in normalized form, matched against `keys[0]`.
#[derive(Debug, Clone)]
pub struct EventSelectors {
    entries: Vec<(String, EventKind)>,
}

impl EventSelectors {
    pub fn for_kinds(kinds: &[EventKind]) -> Self {
        let entries =
            kinds.iter().map(|kind| (normalize_hex(&selector_hex(kind.event_name())), *kind)).collect();
        Self { entries }
    }

    pub fn standard() -> Self {
        Self::for_kinds(&EventKind::ALL)
    }

    pub fn with_alias(mut self, kind: EventKind, selector: &str) -> Self {
        self.entries.push((normalize_hex(selector), kind));
        self
    }

    pub fn match_key(&self, key: &str) -> Option<EventKind> {
        let key = normalize_hex(key);
        self.entries.iter().find(|(selector, _)| *selector == key).map(|(_, kind)| *kind)
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<EventKind> = Vec::new();
        for (_, kind) in &self.entries {
            if !kinds.contains(kind) {
                kinds.push(*kind);
            }
        }
        kinds
    }
}

impl Default for EventSelectors {
    fn default() -> Self {
        Self::standard()
    }
}
