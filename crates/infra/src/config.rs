use govbot_domain::{parse_hours_list, InvalidHoursError, ReminderOffsets};
use std::{path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("The {0} environment variable is required but was not set")]
    Missing(&'static str),
    #[error("The {name} environment variable is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the status endpoint to run on
    pub port: usize,
    /// Directory holding the persisted JSON records
    pub state_dir: PathBuf,
    pub telegram: TelegramConfig,
    pub snapshot: SnapshotConfig,
    /// On-chain monitoring is only enabled when an RPC endpoint, a
    /// contract and an event topic are all configured
    pub onchain: Option<OnChainConfig>,
    pub links: LinksConfig,
    pub reminders: RemindersConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_url: String,
    /// Long poll timeout passed to `getUpdates`
    pub updates_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub graphql_url: String,
    pub space: String,
    pub poll_interval: Duration,
    /// How many of the most recently created proposals to look at every poll
    pub proposal_limit: usize,
    pub proposal_base_url: String,
}

#[derive(Debug, Clone)]
pub struct OnChainConfig {
    pub rpc_url: String,
    pub contract_address: String,
    /// `topic0` of the proposal initialized event
    pub event_topic: String,
    /// Index of the 32 byte data word holding the proposal id
    pub proposal_id_word: usize,
    /// Index of the 32 byte data word holding the voting end block
    pub voting_end_block_word: usize,
    pub poll_interval: Duration,
    /// Used to estimate when voting ends. Block times vary, so this is
    /// only an approximation.
    pub average_block_time_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LinksConfig {
    /// Frontend base url, always ending with `proposals/`
    pub proposals_base_url: String,
    pub frontend_contract_address: String,
    pub chain_prefix: String,
}

#[derive(Debug, Clone)]
pub struct RemindersConfig {
    /// Used for subscribers without their own offsets
    pub default_offsets: ReminderOffsets,
    /// One "Remind me in H hour(s)" button is rendered per entry
    pub button_hours: Vec<f64>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let space = required("SNAPSHOT_SPACE")?;

        let default_offsets = ReminderOffsets::new(
            hours_list("REMINDERS_FROM_START", "0")?,
            hours_list("REMINDERS_BEFORE_END", "1")?,
        );
        let button_hours = hours_list("BUTTON_REMINDERS", "1,4")?;

        let onchain = match (
            optional("ETH_RPC_URL"),
            optional("DAO_EVENT_CONTRACT_ADDRESS"),
            optional("DAO_EVENT_TOPIC"),
        ) {
            (Some(rpc_url), Some(contract_address), Some(event_topic)) => Some(OnChainConfig {
                rpc_url,
                contract_address,
                event_topic,
                proposal_id_word: parsed_or("DAO_PROPOSAL_ID_WORD", 0),
                voting_end_block_word: parsed_or("DAO_VOTING_END_BLOCK_WORD", 1),
                poll_interval: Duration::from_secs(parsed_or("ONCHAIN_POLL_INTERVAL_SECS", 10)),
                average_block_time_secs: parsed_or("AVERAGE_BLOCK_TIME_SECS", 12),
            }),
            _ => {
                info!("On-chain monitoring is disabled. Set ETH_RPC_URL, DAO_EVENT_CONTRACT_ADDRESS and DAO_EVENT_TOPIC to enable it.");
                None
            }
        };

        Ok(Self {
            port: parsed_or("PORT", 5000),
            state_dir: optional("STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("state")),
            telegram: TelegramConfig {
                bot_token,
                api_url: optional("TELEGRAM_API_URL")
                    .unwrap_or_else(|| "https://api.telegram.org".into()),
                updates_timeout_secs: parsed_or("TELEGRAM_UPDATES_TIMEOUT_SECS", 30),
            },
            snapshot: SnapshotConfig {
                graphql_url: optional("SNAPSHOT_GRAPHQL_URL")
                    .unwrap_or_else(|| "https://hub.snapshot.org/graphql".into()),
                space,
                poll_interval: Duration::from_secs(parsed_or("SNAPSHOT_POLL_INTERVAL_SECS", 60)),
                proposal_limit: parsed_or("SNAPSHOT_PROPOSAL_LIMIT", 3),
                proposal_base_url: "https://snapshot.org/#/".into(),
            },
            onchain,
            links: LinksConfig {
                proposals_base_url: proposals_base_url(
                    &optional("LINKS_BASE_URL").unwrap_or_else(|| "https://app.aragon.org".into()),
                ),
                frontend_contract_address: optional("DAO_FRONTEND_CONTRACT_ADDRESS")
                    .unwrap_or_default(),
                chain_prefix: "eth".into(),
            },
            reminders: RemindersConfig {
                default_offsets,
                button_hours,
            },
        })
    }
}

impl Default for Config {
    /// Settings without any external credentials, used by the inmemory context
    fn default() -> Self {
        Self {
            port: 0,
            state_dir: PathBuf::from("state"),
            telegram: TelegramConfig {
                bot_token: String::new(),
                api_url: "https://api.telegram.org".into(),
                updates_timeout_secs: 30,
            },
            snapshot: SnapshotConfig {
                graphql_url: "https://hub.snapshot.org/graphql".into(),
                space: "example.eth".into(),
                poll_interval: Duration::from_secs(60),
                proposal_limit: 3,
                proposal_base_url: "https://snapshot.org/#/".into(),
            },
            onchain: None,
            links: LinksConfig {
                proposals_base_url: proposals_base_url("https://app.example.org"),
                frontend_contract_address: "0x0000000000000000000000000000000000000000".into(),
                chain_prefix: "eth".into(),
            },
            reminders: RemindersConfig {
                default_offsets: ReminderOffsets::new(vec![0.0], vec![1.0]),
                button_hours: vec![1.0, 4.0],
            },
        }
    }
}

fn proposals_base_url(base_url: &str) -> String {
    let mut url = base_url.trim().to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url.push_str("proposals/");
    url
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed_or<T: FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match optional(name) {
        None => default,
        Some(value) => match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    name, value, default
                );
                default
            }
        },
    }
}

fn hours_list(name: &'static str, default: &str) -> Result<Vec<f64>, ConfigError> {
    let value = optional(name).unwrap_or_else(|| default.to_string());
    parse_hours_list(&value).map_err(|e: InvalidHoursError| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}
