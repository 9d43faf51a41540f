//! Individual AMM venue handlers.
//!
//! Swaps on these venues are funnelled through the aggregator by the
//! transaction builder; the native build paths here raise an explicit
//! not-implemented error rather than emitting placeholder
//! instructions. Validation and metadata are real, so the venues
//! participate fully in parsing, estimation and listings.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;

use super::{HandlerError, ProtocolHandler};
use crate::model::intent::{AMOUNT_ALL, BuildIntent, Params, ParamsExt};
use crate::model::mint;

fn swap_params_valid(params: &Params) -> bool {
    let amount_ok = params
        .f64_param("amount")
        .is_some_and(|a| a == AMOUNT_ALL || (a.is_finite() && a > 0.0));
    amount_ok && params.str_param("from").is_some() && params.str_param("to").is_some()
}

fn positive_amount(params: &Params, key: &str) -> bool {
    params
        .f64_param(key)
        .is_some_and(|a| a.is_finite() && a > 0.0)
}

// ── Raydium ─────────────────────────────────────────────────────────

pub struct RaydiumHandler;

#[async_trait]
impl ProtocolHandler for RaydiumHandler {
    fn name(&self) -> &'static str {
        "raydium"
    }

    fn description(&self) -> &'static str {
        "Raydium AMM swaps"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &["raydium-swap"]
    }

    fn validate(&self, _intent_key: &str, params: &Params) -> bool {
        swap_params_valid(params)
    }

    async fn build(&self, _intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        Err(HandlerError::NotImplemented {
            venue: "raydium",
            operation: "native swap",
        })
    }
}

// ── Orca ────────────────────────────────────────────────────────────

pub struct OrcaHandler;

#[async_trait]
impl ProtocolHandler for OrcaHandler {
    fn name(&self) -> &'static str {
        "orca"
    }

    fn description(&self) -> &'static str {
        "Orca whirlpool swaps and concentrated-liquidity positions"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &[
            "orca-swap",
            "orca-add-liquidity",
            "orca-remove-liquidity",
            "orca-open-position",
            "orca-close-position",
        ]
    }

    fn validate(&self, intent_key: &str, params: &Params) -> bool {
        match intent_key {
            "orca-swap" => swap_params_valid(params),
            "orca-add-liquidity" => {
                positive_amount(params, "amount")
                    || (positive_amount(params, "amountA") && positive_amount(params, "amountB"))
            }
            "orca-open-position" => {
                params.str_param("tokenA").is_some()
                    && params.str_param("tokenB").is_some()
                    && params.f64_param("tickLower").is_some()
                    && params.f64_param("tickUpper").is_some()
            }
            "orca-close-position" => params
                .str_param("position")
                .is_some_and(mint::looks_like_address),
            _ => false,
        }
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let operation = match intent.intent.as_str() {
            "orca-swap" => "native swap",
            "orca-add-liquidity" => "liquidity provision",
            "orca-remove-liquidity" => "liquidity removal",
            "orca-open-position" => "position opening",
            _ => "position closing",
        };
        Err(HandlerError::NotImplemented {
            venue: "orca",
            operation,
        })
    }
}

// ── Meteora ─────────────────────────────────────────────────────────

pub struct MeteoraHandler;

#[async_trait]
impl ProtocolHandler for MeteoraHandler {
    fn name(&self) -> &'static str {
        "meteora"
    }

    fn description(&self) -> &'static str {
        "Meteora DLMM swaps and liquidity"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &[
            "meteora-swap",
            "meteora-add-liquidity",
            "meteora-remove-liquidity",
        ]
    }

    fn validate(&self, intent_key: &str, params: &Params) -> bool {
        match intent_key {
            "meteora-swap" => swap_params_valid(params),
            "meteora-add-liquidity" => {
                (positive_amount(params, "amountA") && positive_amount(params, "amountB"))
                    || params.str_param("pair").is_some()
            }
            "meteora-remove-liquidity" => {
                let percent_ok = params
                    .f64_param("percent")
                    .is_none_or(|p| p > 0.0 && p <= 100.0);
                percent_ok
                    && (params.str_param("position").is_some()
                        || params.str_param("pair").is_some())
            }
            _ => false,
        }
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let operation = match intent.intent.as_str() {
            "meteora-swap" => "native swap",
            "meteora-add-liquidity" => "liquidity provision",
            _ => "liquidity removal",
        };
        Err(HandlerError::NotImplemented {
            venue: "meteora",
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn native_builds_are_explicit_about_missing_support() {
        let intent = BuildIntent {
            intent: "raydium-swap".into(),
            params: Params::new(),
            payer: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".into(),
            network: None,
            skip_simulation: true,
            priority_fee: None,
            compute_budget: None,
        };
        let err = RaydiumHandler.build(&intent).await.unwrap_err();
        assert!(err.to_string().contains("not implemented"));
    }

    #[test]
    fn orca_position_validation() {
        let good = json!({
            "tokenA": "SOL", "tokenB": "USDC",
            "tickLower": -100, "tickUpper": 200,
        })
        .as_object()
        .cloned()
        .unwrap();
        assert!(OrcaHandler.validate("orca-open-position", &good));

        let bad = json!({ "tokenA": "SOL" }).as_object().cloned().unwrap();
        assert!(!OrcaHandler.validate("orca-open-position", &bad));
    }

    #[test]
    fn meteora_remove_liquidity_bounds_percent() {
        let good = json!({ "percent": 50, "position": "x" })
            .as_object()
            .cloned()
            .unwrap();
        assert!(MeteoraHandler.validate("meteora-remove-liquidity", &good));

        let bad = json!({ "percent": 150, "position": "x" })
            .as_object()
            .cloned()
            .unwrap();
        assert!(!MeteoraHandler.validate("meteora-remove-liquidity", &bad));
    }
}
