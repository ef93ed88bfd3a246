use super::kv::IKVRepo;
use anyhow::Context;
use govbot_domain::{KnownProposals, ProposalCatalog, ProposalIdMap, SubscriberOffsets, Subscribers};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// The independent records the bot persists. Each one is read and written
/// as a whole, there are no partial updates and no transactions across them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    KnownProposals,
    ProposalIdMap,
    Subscribers,
    Proposals,
    SubscriberOffsets,
}

impl RecordKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::KnownProposals => "known_proposals",
            Self::ProposalIdMap => "proposal_id_map",
            Self::Subscribers => "user_preferences",
            Self::Proposals => "proposals",
            Self::SubscriberOffsets => "subscriber_offsets",
        }
    }
}

/// Typed access to the persisted records. A record that was never
/// written reads as its empty default.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn IKVRepo>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn IKVRepo>) -> Self {
        Self { kv }
    }

    pub async fn get<T: DeserializeOwned + Default>(&self, kind: RecordKind) -> anyhow::Result<T> {
        match self.kv.get(kind.key()).await? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Malformed {} record", kind.key())),
            None => Ok(T::default()),
        }
    }

    pub async fn put<T: Serialize>(&self, kind: RecordKind, record: &T) -> anyhow::Result<()> {
        let raw = serde_json::to_string(record)
            .with_context(|| format!("Unable to serialize {} record", kind.key()))?;
        self.kv.set(kind.key(), &raw).await
    }

    pub async fn known_proposals(&self) -> anyhow::Result<KnownProposals> {
        self.get(RecordKind::KnownProposals).await
    }

    pub async fn save_known_proposals(&self, known: &KnownProposals) -> anyhow::Result<()> {
        self.put(RecordKind::KnownProposals, known).await
    }

    pub async fn proposal_id_map(&self) -> anyhow::Result<ProposalIdMap> {
        self.get(RecordKind::ProposalIdMap).await
    }

    pub async fn save_proposal_id_map(&self, map: &ProposalIdMap) -> anyhow::Result<()> {
        self.put(RecordKind::ProposalIdMap, map).await
    }

    pub async fn subscribers(&self) -> anyhow::Result<Subscribers> {
        self.get(RecordKind::Subscribers).await
    }

    pub async fn save_subscribers(&self, subscribers: &Subscribers) -> anyhow::Result<()> {
        self.put(RecordKind::Subscribers, subscribers).await
    }

    pub async fn proposals(&self) -> anyhow::Result<ProposalCatalog> {
        self.get(RecordKind::Proposals).await
    }

    pub async fn save_proposals(&self, catalog: &ProposalCatalog) -> anyhow::Result<()> {
        self.put(RecordKind::Proposals, catalog).await
    }

    pub async fn subscriber_offsets(&self) -> anyhow::Result<SubscriberOffsets> {
        self.get(RecordKind::SubscriberOffsets).await
    }

    pub async fn save_subscriber_offsets(&self, offsets: &SubscriberOffsets) -> anyhow::Result<()> {
        self.put(RecordKind::SubscriberOffsets, offsets).await
    }
}
