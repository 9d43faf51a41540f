//! Thin JSON-RPC client for the chain endpoints the engine needs.
//!
//! One client per network, lazily constructed and shared. Callers
//! apply conservative defaults when a call fails; nothing here is
//! fatal on its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;

use crate::config::Config;
use crate::model::intent::SimulationReport;
use crate::model::network::Network;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Wire envelope ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulationValue {
    err: Option<Value>,
    #[serde(default)]
    logs: Option<Vec<String>>,
    units_consumed: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrioritizationFee {
    prioritization_fee: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAmountValue {
    amount: String,
    decimals: u8,
}

// ── Client ──────────────────────────────────────────────────────────

pub struct RpcClient {
    url: String,
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        RpcClient {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("rpc {method} request"))?
            .error_for_status()
            .with_context(|| format!("rpc {method}"))?
            .json()
            .await
            .with_context(|| format!("rpc {method} reply"))?;

        if let Some(err) = response.error {
            return Err(anyhow!("rpc {method} failed ({}): {}", err.code, err.message));
        }
        response
            .result
            .ok_or_else(|| anyhow!("rpc {method} returned no result"))
    }

    /// The recency token a transaction must carry.
    pub async fn latest_blockhash(&self) -> Result<Hash> {
        let value: WithContext<BlockhashValue> = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        value
            .value
            .blockhash
            .parse()
            .map_err(|_| anyhow!("invalid blockhash {}", value.value.blockhash))
    }

    /// Dry-run a base64 transaction against current chain state.
    pub async fn simulate_transaction(&self, tx_base64: &str) -> Result<SimulationReport> {
        let value: WithContext<SimulationValue> = self
            .call(
                "simulateTransaction",
                json!([
                    tx_base64,
                    {
                        "encoding": "base64",
                        "sigVerify": false,
                        "replaceRecentBlockhash": true,
                    }
                ]),
            )
            .await?;
        Ok(SimulationReport {
            err: value.value.err,
            logs: value.value.logs.unwrap_or_default(),
            units_consumed: value.value.units_consumed,
        })
    }

    /// Median of the recently observed prioritization fees, in
    /// micro-lamports per compute unit.
    pub async fn recent_prioritization_fee(&self) -> Result<u64> {
        let mut fees: Vec<u64> = self
            .call::<Vec<PrioritizationFee>>("getRecentPrioritizationFees", json!([[]]))
            .await?
            .into_iter()
            .map(|f| f.prioritization_fee)
            .collect();
        if fees.is_empty() {
            return Ok(0);
        }
        fees.sort_unstable();
        Ok(fees[fees.len() / 2])
    }

    pub async fn minimum_balance_for_rent_exemption(&self, size: u64) -> Result<u64> {
        self.call("getMinimumBalanceForRentExemption", json!([size]))
            .await
    }

    /// Balance of a token account in base units plus its decimals.
    pub async fn token_account_balance(&self, account: &Pubkey) -> Result<(u64, u8)> {
        let value: WithContext<TokenAmountValue> = self
            .call(
                "getTokenAccountBalance",
                json!([account.to_string()]),
            )
            .await?;
        let amount = value
            .value
            .amount
            .parse()
            .with_context(|| format!("token balance '{}'", value.value.amount))?;
        Ok((amount, value.value.decimals))
    }
}

// ── Shared per-network connections ──────────────────────────────────

pub struct Connections {
    config: Config,
    clients: Mutex<HashMap<Network, Arc<RpcClient>>>,
}

impl Connections {
    pub fn new(config: Config) -> Self {
        Connections {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Lazily constructed, then shared across requests.
    pub fn get(&self, network: Network) -> Arc<RpcClient> {
        let mut clients = self.clients.lock().expect("connections lock");
        clients
            .entry(network)
            .or_insert_with(|| Arc::new(RpcClient::new(self.config.rpc_url(network))))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connections_are_shared_per_network() {
        let connections = Connections::new(Config::default());
        let a = connections.get(Network::Mainnet);
        let b = connections.get(Network::Mainnet);
        assert!(Arc::ptr_eq(&a, &b));

        let c = connections.get(Network::Devnet);
        assert!(!Arc::ptr_eq(&a, &c));
        assert_ne!(a.url(), c.url());
    }

    #[test]
    fn simulation_value_parses() {
        let raw = r#"{
            "value": {
                "err": null,
                "logs": ["Program log: ok"],
                "unitsConsumed": 450
            }
        }"#;
        let parsed: WithContext<SimulationValue> = serde_json::from_str(raw).unwrap();
        assert!(parsed.value.err.is_none());
        assert_eq!(parsed.value.units_consumed, Some(450));
    }
}
