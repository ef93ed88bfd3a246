use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalKind {
    OnChain,
    OffChain,
}

/// A time-bounded governance item that subscribers can vote on.
///
/// Sources emit these in a normalized shape, and once accepted by the
/// dispatcher they are immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Source specific identifier, unique within its source
    pub id: String,
    pub title: String,
    /// When voting opens
    pub start: DateTime<Utc>,
    /// When voting closes
    pub end: DateTime<Utc>,
    pub kind: ProposalKind,
}

/// The normalized shape every proposal source emits. It becomes a known
/// `Proposal` once the dispatcher accepts it.
pub type ProposalEvent = Proposal;

/// The append-only set of proposal ids the dispatcher has already seen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownProposals(BTreeSet<String>);

impl KnownProposals {
    pub fn contains(&self, proposal_id: &str) -> bool {
        self.0.contains(proposal_id)
    }

    /// Returns `false` if the id was already known
    pub fn insert(&mut self, proposal_id: &str) -> bool {
        self.0.insert(proposal_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every accepted `Proposal` keyed by its id. Restart reconciliation
/// needs the start and end times, which the known set does not carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalCatalog(BTreeMap<String, Proposal>);

impl ProposalCatalog {
    pub fn get(&self, proposal_id: &str) -> Option<&Proposal> {
        self.0.get(proposal_id)
    }

    /// Proposals are immutable once observed, so an existing entry is kept.
    pub fn insert(&mut self, proposal: &Proposal) {
        self.0
            .entry(proposal.id.clone())
            .or_insert_with(|| proposal.clone());
    }
}
