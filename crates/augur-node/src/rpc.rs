//! Bitcoin Core JSON-RPC client.
//!
//! Fetches chain height and the verbose raw mempool in a single batched
//! request (`getblockchaininfo`, `getrawmempool true`, `getmempoolinfo`) over
//! HTTP Basic Auth, and reduces each mempool entry to weight and fee.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use augur_core::constants::SATS_PER_BTC;
use augur_core::error::RpcError;
use augur_core::traits::MempoolSource;
use augur_core::types::MempoolTransaction;

const ID_BLOCKCHAIN_INFO: &str = "getblockchaininfo";
const ID_RAW_MEMPOOL: &str = "getrawmempool";
const ID_MEMPOOL_INFO: &str = "getmempoolinfo";

/// One element of a JSON-RPC batch response.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Value,
}

#[derive(Debug, Deserialize)]
struct RawMempoolEntry {
    weight: u64,
    fees: EntryFees,
}

#[derive(Debug, Deserialize)]
struct EntryFees {
    /// Base fee in BTC.
    base: f64,
}

/// Batched JSON-RPC client for a Bitcoin Core node.
pub struct BitcoinRpcClient {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
}

impl BitcoinRpcClient {
    pub fn new(endpoint: &str, username: &str, password: &str) -> Result<Self, RpcError> {
        let client = Client::builder()
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn batch(&self) -> Result<Vec<RpcResponse>, RpcError> {
        let body = json!([
            { "jsonrpc": "1.0", "id": ID_BLOCKCHAIN_INFO, "method": "getblockchaininfo", "params": [] },
            { "jsonrpc": "1.0", "id": ID_RAW_MEMPOOL, "method": "getrawmempool", "params": [true] },
            { "jsonrpc": "1.0", "id": ID_MEMPOOL_INFO, "method": "getmempoolinfo", "params": [] },
        ]);

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::HttpStatus(status.as_u16()));
        }

        response
            .json::<Vec<RpcResponse>>()
            .await
            .map_err(|e| RpcError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl MempoolSource for BitcoinRpcClient {
    async fn mempool_state(&self) -> Result<(u64, Vec<MempoolTransaction>), RpcError> {
        let responses = self.batch().await?;
        let state = parse_batch(responses)?;
        debug!(height = state.0, transactions = state.1.len(), "mempool fetched");
        Ok(state)
    }
}

/// Reduce a batch response to `(height, transactions)`.
pub fn parse_batch(responses: Vec<RpcResponse>) -> Result<(u64, Vec<MempoolTransaction>), RpcError> {
    let mut by_id: HashMap<String, Value> = HashMap::new();
    for response in responses {
        let id = response.id.as_str().unwrap_or_default().to_owned();
        if !response.error.is_null() {
            let message = response
                .error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .unwrap_or_else(|| response.error.to_string());
            return Err(RpcError::Call { method: id, message });
        }
        by_id.insert(id, response.result);
    }

    let take = |id: &str, map: &mut HashMap<String, Value>| {
        map.remove(id)
            .ok_or_else(|| RpcError::MissingResponse(id.to_owned()))
    };
    let chain_info = take(ID_BLOCKCHAIN_INFO, &mut by_id)?;
    let raw_mempool = take(ID_RAW_MEMPOOL, &mut by_id)?;
    let mempool_info = take(ID_MEMPOOL_INFO, &mut by_id)?;

    if mempool_info.get("loaded").and_then(Value::as_bool) == Some(false) {
        return Err(RpcError::MempoolNotLoaded);
    }
    let height = chain_info
        .get("blocks")
        .and_then(Value::as_u64)
        .ok_or(RpcError::MissingHeight)?;

    let entries: HashMap<String, RawMempoolEntry> = serde_json::from_value(raw_mempool)
        .map_err(|e| RpcError::InvalidResponse(format!("getrawmempool: {e}")))?;
    let transactions = entries
        .into_values()
        .map(|entry| {
            MempoolTransaction::new(entry.weight, (entry.fees.base * SATS_PER_BTC).round() as u64)
        })
        .collect();

    Ok((height, transactions))
}
