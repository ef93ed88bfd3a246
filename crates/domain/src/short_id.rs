use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display};

const SHORT_ID_LEN: usize = 8;

/// Compact stand-in for a proposal id inside callback payloads, which
/// have length and alphabet limits that raw ids may violate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortId(String);

impl ShortId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random alphanumeric id, safe inside `|` separated callback payloads
    pub fn generate() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SHORT_ID_LEN)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ShortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a `proposal_id` to its `ShortId`. An entry is created once and never changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalIdMap(BTreeMap<String, ShortId>);

impl ProposalIdMap {
    pub fn get(&self, proposal_id: &str) -> Option<&ShortId> {
        self.0.get(proposal_id)
    }

    /// Reverse lookup used by the interaction handler
    pub fn resolve(&self, short_id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, short)| short.as_str() == short_id)
            .map(|(proposal_id, _)| proposal_id.as_str())
    }

    /// Returns the existing `ShortId` for the proposal or assigns a fresh one.
    /// The boolean tells whether the map was changed and needs to be persisted.
    pub fn assign(&mut self, proposal_id: &str) -> (ShortId, bool) {
        if let Some(short_id) = self.0.get(proposal_id) {
            return (short_id.clone(), false);
        }
        let mut short_id = ShortId::generate();
        while self.resolve(short_id.as_str()).is_some() {
            short_id = ShortId::generate();
        }
        self.0.insert(proposal_id.to_string(), short_id.clone());
        (short_id, true)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
