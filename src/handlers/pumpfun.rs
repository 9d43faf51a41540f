//! Pump.fun bonding-curve venue.
//!
//! Buys and sells route through the aggregator at the builder layer;
//! the bonding-curve-native paths (and token creation) are explicit
//! not-implemented errors rather than placeholder instructions.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;

use super::{HandlerError, ProtocolHandler};
use crate::model::intent::{AMOUNT_ALL, BuildIntent, Params, ParamsExt};

pub struct PumpfunHandler;

#[async_trait]
impl ProtocolHandler for PumpfunHandler {
    fn name(&self) -> &'static str {
        "pumpfun"
    }

    fn description(&self) -> &'static str {
        "Pump.fun bonding-curve trades and token launches"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &["pumpfun-buy", "pumpfun-sell", "pumpfun-create-token"]
    }

    fn validate(&self, intent_key: &str, params: &Params) -> bool {
        match intent_key {
            "pumpfun-create-token" => {
                params.str_param("name").is_some_and(|n| !n.is_empty())
                    && params.str_param("symbol").is_some_and(|s| !s.is_empty())
            }
            "pumpfun-sell" => params
                .f64_param("amount")
                .is_some_and(|a| a == AMOUNT_ALL || (a.is_finite() && a > 0.0)),
            _ => params
                .f64_param("amount")
                .is_some_and(|a| a.is_finite() && a > 0.0),
        }
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let operation = match intent.intent.as_str() {
            "pumpfun-create-token" => "token creation",
            "pumpfun-sell" => "bonding-curve sell",
            _ => "bonding-curve buy",
        };
        Err(HandlerError::NotImplemented {
            venue: "pump.fun",
            operation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_token_needs_name_and_symbol() {
        let good = json!({ "name": "Dog Wif Hat", "symbol": "WIF2" })
            .as_object()
            .cloned()
            .unwrap();
        assert!(PumpfunHandler.validate("pumpfun-create-token", &good));

        let bad = json!({ "name": "Dog Wif Hat" }).as_object().cloned().unwrap();
        assert!(!PumpfunHandler.validate("pumpfun-create-token", &bad));
    }

    #[test]
    fn sell_accepts_the_all_sentinel() {
        let params = json!({ "amount": -1 }).as_object().cloned().unwrap();
        assert!(PumpfunHandler.validate("pumpfun-sell", &params));
        assert!(!PumpfunHandler.validate("pumpfun-buy", &params));
    }
}
