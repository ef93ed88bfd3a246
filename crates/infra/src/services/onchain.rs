use super::{IOnChainEventSource, OnChainProposalEntry};
use crate::config::OnChainConfig;
use alloy_primitives::{hex, U256};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use tracing::{info, warn};

/// ABI words are 32 bytes
const WORD_LEN: usize = 32;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct Log {
    data: String,
}

/// Polls an Ethereum JSON-RPC endpoint for the DAO contract's proposal
/// initialized logs.
///
/// Mirrors a log filter created at the latest block: the first call only
/// records the chain head, later calls return logs from the blocks mined since.
pub struct JsonRpcEventSource {
    client: Client,
    config: OnChainConfig,
    /// First block not yet scanned
    cursor: Mutex<Option<u64>>,
}

impl JsonRpcEventSource {
    pub fn new(config: OnChainConfig) -> Self {
        Self {
            client: Client::new(),
            config,
            cursor: Mutex::new(None),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> anyhow::Result<T> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let res: RpcResponse<T> = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if let Some(e) = res.error {
            anyhow::bail!("{} failed with code {}: {}", method, e.code, e.message);
        }
        res.result
            .ok_or_else(|| anyhow::anyhow!("{} returned no result", method))
    }

    fn cursor(&self) -> anyhow::Result<Option<u64>> {
        self.cursor
            .lock()
            .map(|c| *c)
            .map_err(|_| anyhow::anyhow!("Block cursor lock poisoned"))
    }

    fn set_cursor(&self, next_block: u64) -> anyhow::Result<()> {
        let mut cursor = self
            .cursor
            .lock()
            .map_err(|_| anyhow::anyhow!("Block cursor lock poisoned"))?;
        *cursor = Some(next_block);
        Ok(())
    }

    fn decode_entry(&self, log: &Log) -> anyhow::Result<OnChainProposalEntry> {
        let data = hex::decode(log.data.trim_start_matches("0x"))?;
        let proposal_id = data_word(&data, self.config.proposal_id_word)?;
        let voting_end_block = data_word(&data, self.config.voting_end_block_word)?;
        Ok(OnChainProposalEntry {
            proposal_id: proposal_id.to_string(),
            voting_end_block: to_u64(voting_end_block)?,
        })
    }
}

#[async_trait::async_trait]
impl IOnChainEventSource for JsonRpcEventSource {
    async fn current_block(&self) -> anyhow::Result<u64> {
        let block: String = self.call("eth_blockNumber", json!([])).await?;
        quantity_to_u64(&block)
    }

    async fn new_entries(&self) -> anyhow::Result<Vec<OnChainProposalEntry>> {
        let head = self.current_block().await?;
        let from_block = match self.cursor()? {
            Some(from_block) => from_block,
            None => {
                info!("Watching for proposal logs after block {}", head);
                self.set_cursor(head + 1)?;
                return Ok(Vec::new());
            }
        };
        if head < from_block {
            return Ok(Vec::new());
        }

        let filter = json!([{
            "fromBlock": format!("{:#x}", from_block),
            "toBlock": format!("{:#x}", head),
            "address": self.config.contract_address,
            "topics": [self.config.event_topic],
        }]);
        let logs: Vec<Log> = self.call("eth_getLogs", filter).await?;
        self.set_cursor(head + 1)?;

        let mut entries = Vec::with_capacity(logs.len());
        for log in &logs {
            match self.decode_entry(log) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping undecodable proposal log {:?}: {:?}", log, e),
            }
        }
        Ok(entries)
    }
}

fn data_word(data: &[u8], index: usize) -> anyhow::Result<U256> {
    let start = index * WORD_LEN;
    data.get(start..start + WORD_LEN)
        .map(U256::from_be_slice)
        .ok_or_else(|| anyhow::anyhow!("Log data has no word at index {}", index))
}

fn to_u64(value: U256) -> anyhow::Result<u64> {
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Value {} does not fit in 64 bits", value))
}

/// Parses a JSON-RPC hex quantity such as `0x1b4`
fn quantity_to_u64(quantity: &str) -> anyhow::Result<u64> {
    to_u64(U256::from_str_radix(quantity.trim_start_matches("0x"), 16)?)
}
