use super::{
    IChatTransport, IOffChainProposalSource, IOnChainEventSource, OffChainProposal,
    OnChainProposalEntry,
};
use govbot_domain::{InboundEvent, OutboundMessage};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Mutex,
};

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("Inmemory service lock poisoned")
}

/// Chat transport that records everything sent through it. Used when
/// running without a bot token and by tests.
#[derive(Default)]
pub struct InMemoryChatTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    answered: Mutex<Vec<(String, Option<String>)>>,
    inbound: Mutex<Vec<InboundEvent>>,
    fail_sends: AtomicBool,
}

impl InMemoryChatTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<OutboundMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect()
    }

    pub fn answered(&self) -> Vec<(String, Option<String>)> {
        self.answered.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Queues an event for the next `poll_updates`
    pub fn push_inbound(&self, event: InboundEvent) {
        if let Ok(mut inbound) = self.inbound.lock() {
            inbound.push(event);
        }
    }

    /// Makes every following `send` fail, like a chat that blocked the bot
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl IChatTransport for InMemoryChatTransport {
    async fn send(&self, message: &OutboundMessage) -> anyhow::Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            anyhow::bail!("Unable to deliver message to chat {}", message.chat_id);
        }
        self.sent.lock().map_err(poisoned)?.push(message.clone());
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> anyhow::Result<()> {
        self.answered
            .lock()
            .map_err(poisoned)?
            .push((callback_id.to_string(), text.map(String::from)));
        Ok(())
    }

    async fn poll_updates(&self) -> anyhow::Result<Vec<InboundEvent>> {
        let mut inbound = self.inbound.lock().map_err(poisoned)?;
        Ok(std::mem::take(&mut *inbound))
    }
}

/// Off-chain source returning whatever proposals were last set on it
#[derive(Default)]
pub struct InMemoryOffChainSource {
    proposals: Mutex<Vec<OffChainProposal>>,
}

impl InMemoryOffChainSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Proposals are expected newest first, like the real source returns them
    pub fn set_proposals(&self, proposals: Vec<OffChainProposal>) {
        if let Ok(mut current) = self.proposals.lock() {
            *current = proposals;
        }
    }
}

#[async_trait::async_trait]
impl IOffChainProposalSource for InMemoryOffChainSource {
    async fn latest_proposals(
        &self,
        _space: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<OffChainProposal>> {
        let proposals = self.proposals.lock().map_err(poisoned)?;
        Ok(proposals.iter().take(limit).cloned().collect())
    }
}

/// On-chain source where tests control the chain head and emitted entries
#[derive(Default)]
pub struct InMemoryOnChainSource {
    block: AtomicU64,
    pending: Mutex<Vec<OnChainProposalEntry>>,
}

impl InMemoryOnChainSource {
    pub fn new(block: u64) -> Self {
        Self {
            block: AtomicU64::new(block),
            pending: Default::default(),
        }
    }

    pub fn set_block(&self, block: u64) {
        self.block.store(block, Ordering::SeqCst);
    }

    pub fn emit(&self, entry: OnChainProposalEntry) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push(entry);
        }
    }
}

#[async_trait::async_trait]
impl IOnChainEventSource for InMemoryOnChainSource {
    async fn current_block(&self) -> anyhow::Result<u64> {
        Ok(self.block.load(Ordering::SeqCst))
    }

    async fn new_entries(&self) -> anyhow::Result<Vec<OnChainProposalEntry>> {
        let mut pending = self.pending.lock().map_err(poisoned)?;
        Ok(std::mem::take(&mut *pending))
    }
}
