use crate::reminder::{DueReminders, ReminderScheduler};
use chrono::{DateTime, TimeZone, Utc};
use govbot_domain::{Proposal, ProposalKind};
use govbot_infra::{
    GovBotContext, IKVRepo, InMemoryChatTransport, InMemoryKVRepo, InMemoryOffChainSource,
    Repos, Services, StaticTimeSys,
};
use std::sync::Arc;

pub const NOW: i64 = 1_700_000_000_000;

pub fn now() -> DateTime<Utc> {
    Utc.timestamp_millis_opt(NOW).unwrap()
}

pub struct TestContext {
    pub ctx: GovBotContext,
    pub chat: Arc<InMemoryChatTransport>,
    pub offchain: Arc<InMemoryOffChainSource>,
    pub scheduler: ReminderScheduler,
    pub due: DueReminders,
}

pub fn setup() -> TestContext {
    setup_with_kv(Arc::new(InMemoryKVRepo::new()))
}

/// Inmemory context frozen at `NOW`, persisting through `kv`
pub fn setup_with_kv(kv: Arc<dyn IKVRepo>) -> TestContext {
    let chat = Arc::new(InMemoryChatTransport::new());
    let offchain = Arc::new(InMemoryOffChainSource::new());
    let mut ctx = GovBotContext::create_inmemory();
    ctx.repos = Repos::create_with(kv);
    ctx.sys = Arc::new(StaticTimeSys(NOW));
    ctx.services = Services {
        chat: chat.clone(),
        offchain: offchain.clone(),
        onchain: None,
    };
    let (scheduler, due) = ReminderScheduler::new(ctx.sys.clone());
    TestContext {
        ctx,
        chat,
        offchain,
        scheduler,
        due,
    }
}

pub fn proposal(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Proposal {
    Proposal {
        id: id.into(),
        title: format!("Proposal {}", id),
        start,
        end,
        kind: ProposalKind::OffChain,
    }
}

/// Key value store whose writes fail for the given keys
pub struct FailingWrites {
    inner: InMemoryKVRepo,
    failing_keys: Vec<&'static str>,
}

impl FailingWrites {
    pub fn new(failing_keys: Vec<&'static str>) -> Self {
        Self {
            inner: InMemoryKVRepo::new(),
            failing_keys,
        }
    }

    /// Writes a value bypassing the failing keys
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner.set(key, value).await.unwrap();
    }
}

#[async_trait::async_trait]
impl IKVRepo for FailingWrites {
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if self.failing_keys.contains(&key) {
            anyhow::bail!("Disk full while writing {}", key);
        }
        self.inner.set(key, value).await
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.inner.get(key).await
    }
}
