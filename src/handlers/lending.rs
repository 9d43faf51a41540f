//! Lending venues: Kamino, Marginfi, Solend.
//!
//! The three venues share one parameterized handler: the verb set and
//! parameter shapes are identical, only the market program differs.
//! Market-native instruction encodings are not implemented; builds
//! fail explicitly instead of emitting placeholders.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;

use super::{HandlerError, ProtocolHandler};
use crate::chain::programs;
use crate::model::intent::{BuildIntent, Params, ParamsExt};

pub struct LendingHandler {
    name: &'static str,
    description: &'static str,
    actions: &'static [&'static str],
    program_id: &'static str,
}

impl LendingHandler {
    pub fn kamino() -> Self {
        LendingHandler {
            name: "kamino",
            description: "Kamino lending market",
            actions: &[
                "kamino-supply",
                "kamino-borrow",
                "kamino-repay",
                "kamino-withdraw",
            ],
            program_id: programs::KAMINO_LEND_PROGRAM_ID,
        }
    }

    pub fn marginfi() -> Self {
        LendingHandler {
            name: "marginfi",
            description: "Marginfi lending market",
            actions: &[
                "marginfi-supply",
                "marginfi-borrow",
                "marginfi-repay",
                "marginfi-withdraw",
            ],
            program_id: programs::MARGINFI_PROGRAM_ID,
        }
    }

    pub fn solend() -> Self {
        LendingHandler {
            name: "solend",
            description: "Solend lending market",
            actions: &[
                "solend-supply",
                "solend-borrow",
                "solend-repay",
                "solend-withdraw",
            ],
            program_id: programs::SOLEND_PROGRAM_ID,
        }
    }

    fn operation(intent_key: &str) -> &'static str {
        if intent_key.ends_with("-supply") {
            "supply"
        } else if intent_key.ends_with("-borrow") {
            "borrow"
        } else if intent_key.ends_with("-repay") {
            "repay"
        } else {
            "withdraw"
        }
    }
}

#[async_trait]
impl ProtocolHandler for LendingHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        self.actions
    }

    fn validate(&self, intent_key: &str, params: &Params) -> bool {
        let token_ok = params.str_param("token").is_some_and(|t| !t.is_empty());
        match params.f64_param("amount") {
            Some(amount) => token_ok && amount.is_finite() && amount > 0.0,
            // A missing amount is full repayment of the outstanding
            // loan; every other verb needs an explicit amount.
            None => Self::operation(intent_key) == "repay",
        }
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        Err(HandlerError::NotImplemented {
            venue: self.name,
            operation: Self::operation(&intent.intent),
        })
    }

    fn required_accounts(&self, params: &Params) -> Vec<String> {
        let mut accounts = vec![self.program_id.to_string()];
        if let Some(token) = params.str_param("token") {
            accounts.push(token.to_string());
        }
        accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn amount_is_required_except_for_repay() {
        let handler = LendingHandler::kamino();
        let no_amount = json!({ "token": USDC }).as_object().cloned().unwrap();
        assert!(!handler.validate("kamino-supply", &no_amount));
        assert!(!handler.validate("kamino-withdraw", &no_amount));
        // "repay my kamino loan" carries no amount.
        assert!(handler.validate("kamino-repay", &no_amount));
    }

    #[test]
    fn all_sentinel_is_rejected_for_lending() {
        let handler = LendingHandler::solend();
        let params = json!({ "token": USDC, "amount": -1 })
            .as_object()
            .cloned()
            .unwrap();
        assert!(!handler.validate("solend-supply", &params));
    }

    #[tokio::test]
    async fn build_is_an_explicit_stub() {
        let handler = LendingHandler::marginfi();
        let intent = BuildIntent {
            intent: "marginfi-borrow".into(),
            params: json!({ "token": USDC, "amount": 10 })
                .as_object()
                .cloned()
                .unwrap(),
            payer: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".into(),
            network: None,
            skip_simulation: true,
            priority_fee: None,
            compute_budget: None,
        };
        let err = handler.build(&intent).await.unwrap_err();
        assert!(err.to_string().contains("marginfi borrow"));
    }
}
