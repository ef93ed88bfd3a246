mod config;
mod repos;
mod services;
mod system;

pub use config::{
    Config, ConfigError, LinksConfig, OnChainConfig, RemindersConfig, SnapshotConfig,
    TelegramConfig,
};
pub use repos::{FileKVRepo, IKVRepo, InMemoryKVRepo, RecordKind, RecordStore, Repos};
pub use services::*;
use std::sync::Arc;
pub use system::{ISys, RealSys, StaticTimeSys};

#[derive(Clone)]
pub struct GovBotContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub services: Services,
}

impl GovBotContext {
    fn create(config: Config) -> anyhow::Result<Self> {
        let repos = Repos::create_file(&config.state_dir)?;
        let services = Services {
            chat: Arc::new(TelegramBotApi::new(&config.telegram)),
            offchain: Arc::new(SnapshotClient::new(config.snapshot.graphql_url.clone())),
            onchain: config.onchain.clone().map(|onchain| {
                Arc::new(JsonRpcEventSource::new(onchain)) as Arc<dyn IOnChainEventSource>
            }),
        };
        Ok(Self {
            repos,
            config,
            sys: Arc::new(RealSys {}),
            services,
        })
    }

    /// Context without any external dependencies
    pub fn create_inmemory() -> Self {
        Self {
            repos: Repos::create_inmemory(),
            config: Config::default(),
            sys: Arc::new(RealSys {}),
            services: Services {
                chat: Arc::new(InMemoryChatTransport::new()),
                offchain: Arc::new(InMemoryOffChainSource::new()),
                onchain: None,
            },
        }
    }
}

/// Will setup the infrastructure context given the environment
pub fn setup_context() -> anyhow::Result<GovBotContext> {
    let config = Config::from_env()?;
    GovBotContext::create(config)
}
