//! Transaction assembly.
//!
//! Resolves the handler, validates parameters, prepends compute-budget
//! instructions, stamps the recency token and fee payer, simulates,
//! and serializes. Failures come back as values inside `BuildResult`;
//! no internal error escapes as a panic or raw propagation.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::transaction::Transaction;
use tracing::{debug, warn};

use super::decode;
use super::estimate::lamports_to_sol;
use super::rpc::Connections;
use crate::config::Config;
use crate::handlers::{ProtocolRegistry, is_swap_funnel_key};
use crate::model::intent::{
    AMOUNT_ALL, BuildDetails, BuildIntent, BuildResult, ParamsExt, SimulationReport,
};
use crate::model::network::Network;
use crate::model::mint;

const DEFAULT_COMPUTE_UNITS: u32 = 200_000;
const BASE_FEE_LAMPORTS: u64 = 5_000;

pub struct TransactionBuilder {
    registry: Arc<ProtocolRegistry>,
    connections: Arc<Connections>,
    default_network: Network,
}

impl TransactionBuilder {
    pub fn new(
        config: &Config,
        registry: Arc<ProtocolRegistry>,
        connections: Arc<Connections>,
    ) -> Self {
        TransactionBuilder {
            registry,
            connections,
            default_network: config.default_network,
        }
    }

    /// Build a signed-ready transaction for one intent.
    pub async fn build(&self, intent: &BuildIntent) -> BuildResult {
        let network = intent.network.unwrap_or(self.default_network);

        if !mint::looks_like_address(&intent.payer) {
            return BuildResult::fail(format!("Invalid payer address: {}", intent.payer));
        }

        let handler = match self.registry.get(&intent.intent) {
            Some(handler) => handler,
            None => {
                return BuildResult::fail(format!("Unsupported intent: {}", intent.intent));
            }
        };

        if !handler.validate(&intent.intent, &intent.params) {
            return BuildResult::fail(format!(
                "Invalid parameters for intent '{}'",
                intent.intent
            ));
        }

        // Swap-family intents funnel through the aggregator, which
        // returns a complete transaction. The venue-native path only
        // runs when the aggregator fails.
        if is_swap_funnel_key(&intent.intent) {
            match self.build_via_aggregator(intent, network).await {
                Ok(result) => return result,
                // The aggregator handler has no native path to fall
                // back to; everything else gets one more chance.
                Err(e) if handler.name() == "jupiter" => {
                    return BuildResult::fail(format!("Aggregator swap failed: {e}"));
                }
                Err(e) => {
                    warn!(
                        "aggregator failed for '{}', falling back to {}: {e:#}",
                        intent.intent,
                        handler.name()
                    );
                }
            }
        }

        let instructions = match handler.build(intent).await {
            Ok(instructions) => instructions,
            Err(e) => return BuildResult::fail(e.to_string()),
        };

        self.assemble(intent, network, handler.name(), instructions)
            .await
    }

    /// The aggregator path: rewrite buy/sell to a from/to route,
    /// resolve the "all" amount against the live balance, then ask
    /// for a complete swap transaction.
    async fn build_via_aggregator(
        &self,
        intent: &BuildIntent,
        network: Network,
    ) -> Result<BuildResult, crate::handlers::HandlerError> {
        let mut routed = intent.clone();
        ensure_swap_route(&mut routed);

        if routed.params.f64_param("amount") == Some(AMOUNT_ALL) {
            self.resolve_all_amount(&mut routed, network).await?;
        }

        let jupiter = self.registry.jupiter();
        let tx_base64 = jupiter.swap_transaction(&routed).await?;

        let simulation = if intent.skip_simulation {
            None
        } else {
            self.simulate(&tx_base64, network).await
        };
        if let Some(report) = &simulation {
            if report.err.is_some() {
                return Ok(BuildResult::simulation_failed(report.clone()));
            }
        }

        // Describe the returned blob by decoding it.
        let (instruction_count, accounts) =
            match decode::decode_base64(&tx_base64, &self.registry) {
                Ok(decoded) => (decoded.instructions.len(), decoded.account_keys),
                Err(e) => {
                    debug!("could not decode aggregator transaction: {e:#}");
                    (0, Vec::new())
                }
            };

        let priority_fee = self.priority_fee(intent, network).await;
        let compute_units = simulation
            .as_ref()
            .and_then(|s| s.units_consumed)
            .unwrap_or(DEFAULT_COMPUTE_UNITS as u64);
        let details = BuildDetails {
            protocol: "jupiter".to_string(),
            instruction_count,
            accounts,
            estimated_fee_sol: lamports_to_sol(estimated_fee(compute_units, priority_fee)),
            compute_units,
            priority_fee,
        };

        Ok(BuildResult::ok(tx_base64, simulation, details))
    }

    /// Compute-budget prefix, recency token, fee payer, simulation,
    /// serialization.
    async fn assemble(
        &self,
        intent: &BuildIntent,
        network: Network,
        protocol: &str,
        handler_instructions: Vec<Instruction>,
    ) -> BuildResult {
        let payer = match intent.payer.parse() {
            Ok(payer) => payer,
            Err(_) => return BuildResult::fail(format!("Invalid payer: {}", intent.payer)),
        };

        let compute_units = intent.compute_budget.unwrap_or(DEFAULT_COMPUTE_UNITS);
        let priority_fee = self.priority_fee(intent, network).await;

        let mut instructions =
            vec![ComputeBudgetInstruction::set_compute_unit_limit(compute_units)];
        if priority_fee > 0 {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_price(priority_fee));
        }
        instructions.extend(handler_instructions);

        let rpc = self.connections.get(network);
        let blockhash = match rpc.latest_blockhash().await {
            Ok(hash) => hash,
            Err(e) => {
                // A zeroed recency token still serializes; the caller
                // must refresh before submission anyway.
                warn!("blockhash fetch failed on {network}: {e:#}");
                Hash::default()
            }
        };

        let message = Message::new_with_blockhash(&instructions, Some(&payer), &blockhash);
        let accounts: Vec<String> = message.account_keys.iter().map(|k| k.to_string()).collect();
        let instruction_count = message.instructions.len();
        let tx = Transaction::new_unsigned(message);

        let tx_base64 = match bincode::serialize(&tx) {
            Ok(bytes) => BASE64.encode(bytes),
            Err(e) => return BuildResult::fail(format!("Serialization failed: {e}")),
        };

        let simulation = if intent.skip_simulation {
            None
        } else {
            self.simulate(&tx_base64, network).await
        };
        if let Some(report) = &simulation {
            if report.err.is_some() {
                return BuildResult::simulation_failed(report.clone());
            }
        }

        let units_consumed = simulation
            .as_ref()
            .and_then(|s| s.units_consumed)
            .unwrap_or(compute_units as u64);

        let details = BuildDetails {
            protocol: protocol.to_string(),
            instruction_count,
            accounts,
            estimated_fee_sol: lamports_to_sol(estimated_fee(compute_units as u64, priority_fee)),
            compute_units: units_consumed,
            priority_fee,
        };

        BuildResult::ok(tx_base64, simulation, details)
    }

    async fn simulate(&self, tx_base64: &str, network: Network) -> Option<SimulationReport> {
        let rpc = self.connections.get(network);
        match rpc.simulate_transaction(tx_base64).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("simulation unavailable on {network}: {e:#}");
                None
            }
        }
    }

    /// Explicit hint wins; otherwise ask the chain for the recent
    /// median. Zero when estimation fails.
    async fn priority_fee(&self, intent: &BuildIntent, network: Network) -> u64 {
        if let Some(fee) = intent.priority_fee {
            return fee;
        }
        if let Some(fee) = intent.params.f64_param("priorityFee") {
            return fee as u64;
        }
        let rpc = self.connections.get(network);
        rpc.recent_prioritization_fee().await.unwrap_or_else(|e| {
            debug!("priority fee estimation failed: {e:#}");
            0
        })
    }

    /// Resolve the `-1` sentinel against the holder's live balance.
    async fn resolve_all_amount(
        &self,
        intent: &mut BuildIntent,
        network: Network,
    ) -> Result<(), crate::handlers::HandlerError> {
        let from = intent
            .params
            .str_param("from")
            .ok_or(crate::handlers::HandlerError::MissingParam("from"))?
            .to_string();
        if from == mint::NATIVE_MINT {
            return Err(crate::handlers::HandlerError::Unsupported(
                "cannot sell the entire SOL balance; the fee payer needs SOL left".to_string(),
            ));
        }

        let payer = crate::handlers::parse_pubkey("payer", &intent.payer)?;
        let from_mint = crate::handlers::parse_pubkey("from", &from)?;
        let token_program =
            super::programs::pubkey(super::programs::TOKEN_PROGRAM_ID);
        let ata = crate::handlers::associated_token_address(&payer, &from_mint, &token_program);

        let rpc = self.connections.get(network);
        let (base_units, decimals) = rpc.token_account_balance(&ata).await.map_err(|e| {
            crate::handlers::HandlerError::Other(anyhow::anyhow!(
                "could not determine balance for sell-all: {e:#}"
            ))
        })?;
        let amount = base_units as f64 / 10f64.powi(decimals as i32);
        intent.params.set("amount", amount);
        intent.params.set("decimals", decimals);
        Ok(())
    }
}

/// Total fee in lamports: base signature fee plus priority charge.
fn estimated_fee(compute_units: u64, priority_fee_per_cu: u64) -> u64 {
    let priority =
        (compute_units as u128 * priority_fee_per_cu as u128).div_ceil(1_000_000) as u64;
    BASE_FEE_LAMPORTS + priority
}

/// Rewrite buy/sell shapes into an explicit from/to route. Buy spends
/// native SOL; sell liquidates into it.
fn ensure_swap_route(intent: &mut BuildIntent) {
    if intent.params.str_param("from").is_some() && intent.params.str_param("to").is_some() {
        return;
    }
    let token = match intent.params.str_param("token") {
        Some(token) => mint::resolve(token),
        None => return,
    };
    if intent.intent.ends_with("sell") {
        intent.params.set("from", token);
        intent.params.set("to", mint::NATIVE_MINT);
    } else {
        intent.params.set("from", mint::NATIVE_MINT);
        intent.params.set("to", token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn intent(key: &str, params: serde_json::Value) -> BuildIntent {
        BuildIntent {
            intent: key.into(),
            params: params.as_object().cloned().unwrap(),
            payer: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".into(),
            network: None,
            skip_simulation: true,
            priority_fee: None,
            compute_budget: None,
        }
    }

    #[test]
    fn buy_routes_native_to_token() {
        let mut buy = intent("pumpfun-buy", json!({ "amount": 1, "token": "BONK" }));
        ensure_swap_route(&mut buy);
        assert_eq!(buy.params.str_param("from"), Some(mint::NATIVE_MINT));
        assert_eq!(
            buy.params.str_param("to"),
            Some("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263")
        );
    }

    #[test]
    fn sell_routes_token_to_native() {
        let mut sell = intent("pumpfun-sell", json!({ "amount": 1, "token": "BONK" }));
        ensure_swap_route(&mut sell);
        assert_eq!(sell.params.str_param("to"), Some(mint::NATIVE_MINT));
    }

    #[test]
    fn explicit_route_is_left_alone() {
        let mut swap = intent(
            "swap",
            json!({ "amount": 1, "from": "A", "to": "B", "token": "BONK" }),
        );
        ensure_swap_route(&mut swap);
        assert_eq!(swap.params.str_param("from"), Some("A"));
    }

    #[test]
    fn fee_combines_base_and_priority() {
        assert_eq!(estimated_fee(200_000, 0), 5_000);
        // 200k CU at 1000 micro-lamports/CU = 200 lamports priority.
        assert_eq!(estimated_fee(200_000, 1_000), 5_200);
    }
}
