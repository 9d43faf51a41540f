//! Jito tips: a plain SOL transfer to a published tip account.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_system_interface::instruction as system_ix;

use super::{HandlerError, ProtocolHandler, lamports, parse_pubkey};
use crate::chain::programs;
use crate::model::intent::{BuildIntent, Params, ParamsExt};

pub struct JitoHandler;

#[async_trait]
impl ProtocolHandler for JitoHandler {
    fn name(&self) -> &'static str {
        "jito"
    }

    fn description(&self) -> &'static str {
        "Tip the Jito block engine"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &["tip", "jito-tip"]
    }

    fn validate(&self, _intent_key: &str, params: &Params) -> bool {
        params
            .f64_param("amount")
            .is_some_and(|a| a.is_finite() && a > 0.0)
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let payer = parse_pubkey("payer", &intent.payer)?;
        let amount = intent
            .params
            .f64_param("amount")
            .ok_or(HandlerError::MissingParam("amount"))?;
        let tip_account = programs::pubkey(programs::JITO_TIP_ACCOUNT);

        Ok(vec![system_ix::transfer(
            &payer,
            &tip_account,
            lamports(amount)?,
        )])
    }

    fn required_accounts(&self, _params: &Params) -> Vec<String> {
        vec![programs::JITO_TIP_ACCOUNT.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn tip_goes_to_the_tip_account() {
        let intent = BuildIntent {
            intent: "tip".into(),
            params: json!({ "amount": 0.001 }).as_object().cloned().unwrap(),
            payer: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".into(),
            network: None,
            skip_simulation: true,
            priority_fee: None,
            compute_budget: None,
        };
        let instructions = JitoHandler.build(&intent).await.unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(
            instructions[0].accounts[1].pubkey.to_string(),
            programs::JITO_TIP_ACCOUNT
        );
    }
}
