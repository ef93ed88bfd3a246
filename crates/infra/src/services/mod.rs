mod inmemory;
mod onchain;
mod snapshot;
mod telegram;

use govbot_domain::{InboundEvent, OutboundMessage};
pub use inmemory::{InMemoryChatTransport, InMemoryOffChainSource, InMemoryOnChainSource};
pub use onchain::JsonRpcEventSource;
use serde::Deserialize;
pub use snapshot::SnapshotClient;
use std::sync::Arc;
pub use telegram::TelegramBotApi;

/// A proposal as reported by the off-chain source. Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OffChainProposal {
    pub id: String,
    pub title: String,
    pub start: i64,
    pub end: i64,
    pub created: i64,
}

/// A proposal initialized log entry emitted by the DAO contract
#[derive(Debug, Clone, PartialEq)]
pub struct OnChainProposalEntry {
    pub proposal_id: String,
    pub voting_end_block: u64,
}

/// The bot messaging transport
#[async_trait::async_trait]
pub trait IChatTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()>;
    /// Acknowledges an inline button press, optionally showing `text` to the user
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()>;
    /// Waits for the next batch of inbound commands and button presses
    async fn poll_updates(&self) -> anyhow::Result<Vec<InboundEvent>>;
}

#[async_trait::async_trait]
pub trait IOffChainProposalSource: Send + Sync {
    /// The `limit` most recently created proposals of `space`, newest first
    async fn latest_proposals(&self, space: &str, limit: usize)
        -> anyhow::Result<Vec<OffChainProposal>>;
}

#[async_trait::async_trait]
pub trait IOnChainEventSource: Send + Sync {
    async fn current_block(&self) -> anyhow::Result<u64>;
    /// Entries emitted since the previous call
    async fn new_entries(&self) -> anyhow::Result<Vec<OnChainProposalEntry>>;
}

#[derive(Clone)]
pub struct Services {
    pub chat: Arc<dyn IChatTransport>,
    pub offchain: Arc<dyn IOffChainProposalSource>,
    pub onchain: Option<Arc<dyn IOnChainEventSource>>,
}
