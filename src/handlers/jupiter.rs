//! The aggregator venue.
//!
//! Unlike every other handler, Jupiter's entrypoint is not `build`:
//! `swap_transaction` performs two outbound calls (quote, then swap)
//! and returns a fully baked base64 transaction. The generic `build`
//! fails on purpose: there is no instruction-list rendition of an
//! aggregator route.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use solana_sdk::instruction::Instruction;
use tracing::debug;

use super::{HandlerError, ProtocolHandler};
use crate::config::Config;
use crate::model::intent::{AMOUNT_ALL, BuildIntent, Params, ParamsExt};
use crate::model::mint;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default slippage when the prompt does not specify one: 0.5%.
const DEFAULT_SLIPPAGE_BPS: u32 = 50;

pub struct JupiterHandler {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: String,
}

impl JupiterHandler {
    pub fn new(config: &Config) -> Self {
        JupiterHandler {
            base_url: config.jupiter_api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Quote the route and ask the aggregator for a complete swap
    /// transaction. Returns the base64 blob ready for simulation.
    pub async fn swap_transaction(&self, intent: &BuildIntent) -> Result<String, HandlerError> {
        let from = intent
            .params
            .str_param("from")
            .ok_or(HandlerError::MissingParam("from"))?;
        let to = intent
            .params
            .str_param("to")
            .ok_or(HandlerError::MissingParam("to"))?;
        let amount = intent
            .params
            .f64_param("amount")
            .ok_or(HandlerError::MissingParam("amount"))?;
        if !amount.is_finite() || amount <= 0.0 {
            // The `-1` sentinel must be resolved to a balance upstream.
            return Err(HandlerError::InvalidAmount(amount));
        }

        let decimals = mint::decimals(from).unwrap_or(6);
        let base_units = super::to_base_units(amount, decimals)?;
        let slippage_bps = intent
            .params
            .f64_param("slippage")
            .map(|pct| (pct * 100.0).round() as u32)
            .unwrap_or(DEFAULT_SLIPPAGE_BPS);

        let quote_url = format!(
            "{}/quote?inputMint={from}&outputMint={to}&amount={base_units}&slippageBps={slippage_bps}",
            self.base_url
        );
        debug!("jupiter quote: {quote_url}");
        let quote: Value = self
            .client
            .get(&quote_url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| HandlerError::Other(anyhow::anyhow!("jupiter quote request: {e}")))?
            .error_for_status()
            .map_err(|e| HandlerError::Other(anyhow::anyhow!("jupiter quote: {e}")))?
            .json()
            .await
            .map_err(|e| HandlerError::Other(anyhow::anyhow!("jupiter quote reply: {e}")))?;

        // `useSharedAccounts: false` keeps the route compatible with
        // simple-AMM venues.
        let body = json!({
            "quoteResponse": quote,
            "userPublicKey": intent.payer,
            "wrapAndUnwrapSol": true,
            "useSharedAccounts": false,
        });

        let swap: SwapResponse = self
            .client
            .post(format!("{}/swap", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| HandlerError::Other(anyhow::anyhow!("jupiter swap request: {e}")))?
            .error_for_status()
            .map_err(|e| HandlerError::Other(anyhow::anyhow!("jupiter swap: {e}")))?
            .json()
            .await
            .map_err(|e| HandlerError::Other(anyhow::anyhow!("jupiter swap reply: {e}")))?;

        Ok(swap.swap_transaction)
    }
}

#[async_trait]
impl ProtocolHandler for JupiterHandler {
    fn name(&self) -> &'static str {
        "jupiter"
    }

    fn description(&self) -> &'static str {
        "Aggregator swaps routed across venues"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &["swap", "jupiter-swap", "buy", "sell"]
    }

    fn validate(&self, _intent_key: &str, params: &Params) -> bool {
        let amount_ok = params
            .f64_param("amount")
            .is_some_and(|a| a == AMOUNT_ALL || (a.is_finite() && a > 0.0));
        amount_ok && params.str_param("from").is_some() && params.str_param("to").is_some()
    }

    async fn build(&self, _intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        Err(HandlerError::Unsupported(
            "jupiter builds a complete transaction; use the swap entrypoint".to_string(),
        ))
    }
}
