//! Pre-build cost estimation.
//!
//! Table-driven compute-unit figures per intent key, a per-transaction
//! overhead, and rent for account-creating intents. Nothing here
//! builds instructions; the point is a cheap answer before committing
//! to a full build.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::rpc::Connections;
use crate::model::intent::{BuildIntent, ParamsExt};
use crate::model::network::Network;

/// Base signature fee per transaction, lamports.
const BASE_FEE_LAMPORTS: u64 = 5_000;
/// Fallback rent figure when the chain cannot be asked.
const DEFAULT_RENT_LAMPORTS: u64 = 890_880;
/// Size of a token account, the common case for created accounts.
const CREATED_ACCOUNT_SIZE: u64 = 165;

const TX_OVERHEAD_CU: u64 = 1_500;
const PER_INSTRUCTION_CU: u64 = 200;

// ── Output ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentEstimate {
    pub intent: String,
    pub compute_units: u64,
    pub instruction_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResult {
    pub compute_units: u64,
    pub instruction_count: u64,
    pub base_fee_lamports: u64,
    pub priority_fee_lamports: u64,
    pub rent_lamports: u64,
    /// Micro-lamports per compute unit used for the priority figure.
    pub priority_fee_per_cu: u64,
    pub base_fee_sol: String,
    pub priority_fee_sol: String,
    pub rent_sol: String,
    pub total_sol: String,
    pub intents: Vec<IntentEstimate>,
}

/// Fixed-decimal SOL rendering, 9 fractional digits.
pub fn lamports_to_sol(lamports: u64) -> String {
    format!("{:.9}", lamports as f64 / 1e9)
}

// ── Per-intent tables ───────────────────────────────────────────────

fn base_compute_units(intent_key: &str) -> u64 {
    match intent_key {
        "transfer" | "sol-transfer" => 450,
        "spl-transfer" | "token-transfer" | "token-2022-transfer" => 2_500,
        "swap" | "jupiter-swap" => 400_000,
        "raydium-swap" | "orca-swap" | "meteora-swap" => 200_000,
        "memo" | "memo-write" => 450,
        "tip" | "jito-tip" => 1_000,
        "pumpfun-buy" | "pumpfun-sell" => 200_000,
        "pumpfun-create-token" => 150_000,
        "native-stake" => 5_000,
        "delegate-stake" => 2_500,
        "deactivate-stake" | "withdraw-stake" => 1_500,
        "marinade-stake" | "marinade-unstake" | "liquid-stake" | "liquid-unstake" => 100_000,
        "create-token-account" | "create-ata" => 25_000,
        "create-account" => 2_000,
        "close-token-account" => 3_000,
        key if key.ends_with("-supply")
            || key.ends_with("-borrow")
            || key.ends_with("-repay")
            || key.ends_with("-withdraw") =>
        {
            120_000
        }
        key if key.contains("liquidity") || key.contains("position") => 150_000,
        _ => 50_000,
    }
}

fn estimated_instruction_count(intent_key: &str) -> u64 {
    match intent_key {
        "transfer" | "sol-transfer" | "memo" | "memo-write" | "tip" | "jito-tip"
        | "create-account" | "create-token-account" | "create-ata" | "close-token-account"
        | "deactivate-stake" | "withdraw-stake" | "delegate-stake" => 1,
        "spl-transfer" | "token-transfer" | "token-2022-transfer" => 2,
        "native-stake" => 3,
        "swap" | "jupiter-swap" => 4,
        _ => 2,
    }
}

fn is_swap_family(intent_key: &str) -> bool {
    matches!(
        intent_key,
        "swap" | "jupiter-swap" | "raydium-swap" | "orca-swap" | "meteora-swap"
    )
}

/// Compute units for one intent, with the documented adjustments.
pub fn intent_compute_units(intent: &BuildIntent) -> u64 {
    let mut units = base_compute_units(&intent.intent);

    // Big swaps route through more hops.
    if is_swap_family(&intent.intent)
        && intent.params.f64_param("amount").is_some_and(|a| a > 1_000.0)
    {
        units = (units as f64 * 1.2) as u64;
    }
    if intent.intent.contains("create") {
        units += 2_000;
    }
    units
}

fn creates_account(intent_key: &str) -> bool {
    intent_key.contains("create") || intent_key == "native-stake"
}

// ── Estimator ───────────────────────────────────────────────────────

pub struct Estimator {
    connections: Arc<Connections>,
}

impl Estimator {
    pub fn new(connections: Arc<Connections>) -> Self {
        Estimator { connections }
    }

    /// Estimate one or more intents bundled into a single transaction.
    pub async fn estimate(
        &self,
        intents: &[BuildIntent],
        network: Network,
        priority_fee: Option<u64>,
    ) -> EstimateResult {
        let rpc = self.connections.get(network);

        let mut per_intent = Vec::with_capacity(intents.len());
        let mut instruction_count = 0;
        let mut compute_units = 0;
        let mut needs_rent = false;

        for intent in intents {
            let units = intent_compute_units(intent);
            let count = estimated_instruction_count(&intent.intent);
            needs_rent |= creates_account(&intent.intent);
            compute_units += units;
            instruction_count += count;
            per_intent.push(IntentEstimate {
                intent: intent.intent.clone(),
                compute_units: units,
                instruction_count: count,
            });
        }

        compute_units += TX_OVERHEAD_CU + PER_INSTRUCTION_CU * instruction_count;

        let priority_fee_per_cu = match priority_fee {
            Some(fee) => fee,
            None => rpc.recent_prioritization_fee().await.unwrap_or_else(|e| {
                warn!("prioritization fee lookup failed, assuming 0: {e:#}");
                0
            }),
        };

        let rent_lamports = if needs_rent {
            rpc.minimum_balance_for_rent_exemption(CREATED_ACCOUNT_SIZE)
                .await
                .unwrap_or_else(|e| {
                    warn!("rent lookup failed, using default: {e:#}");
                    DEFAULT_RENT_LAMPORTS
                })
        } else {
            0
        };

        let priority_fee_lamports =
            (compute_units as u128 * priority_fee_per_cu as u128).div_ceil(1_000_000) as u64;

        let total =
            BASE_FEE_LAMPORTS + priority_fee_lamports + rent_lamports;

        EstimateResult {
            compute_units,
            instruction_count,
            base_fee_lamports: BASE_FEE_LAMPORTS,
            priority_fee_lamports,
            rent_lamports,
            priority_fee_per_cu,
            base_fee_sol: lamports_to_sol(BASE_FEE_LAMPORTS),
            priority_fee_sol: lamports_to_sol(priority_fee_lamports),
            rent_sol: lamports_to_sol(rent_lamports),
            total_sol: lamports_to_sol(total),
            intents: per_intent,
        }
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
    fn table_values_match_the_contract() {
        assert_eq!(base_compute_units("transfer"), 450);
        assert_eq!(base_compute_units("spl-transfer"), 2_500);
        assert_eq!(base_compute_units("swap"), 400_000);
        assert_eq!(base_compute_units("memo"), 450);
        assert_eq!(base_compute_units("tip"), 1_000);
        assert_eq!(base_compute_units("pumpfun-buy"), 200_000);
    }

    #[test]
    fn large_swaps_get_the_surcharge() {
        let small = intent_compute_units(&intent("swap", json!({ "amount": 10 })));
        let large = intent_compute_units(&intent("swap", json!({ "amount": 5000 })));
        assert_eq!(small, 400_000);
        assert_eq!(large, 480_000);
    }

    #[test]
    fn create_intents_get_the_bump() {
        let units = intent_compute_units(&intent("create-token-account", json!({})));
        assert_eq!(units, 27_000);
    }

    #[test]
    fn sol_rendering_is_nine_decimals() {
        assert_eq!(lamports_to_sol(5_000), "0.000005000");
        assert_eq!(lamports_to_sol(1_000_000_000), "1.000000000");
    }

    #[test]
    fn priority_fee_rounds_up() {
        // 1001 CU at 1 micro-lamport/CU is just over one thousandth of
        // a lamport; the charge must round up, never down to zero.
        let lamports = (1_001u128 * 1u128).div_ceil(1_000_000) as u64;
        assert_eq!(lamports, 1);
    }
}
