//! Native SOL transfers and raw account creation.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_system_interface::instruction as system_ix;

use super::{HandlerError, ProtocolHandler, lamports, parse_pubkey};
use crate::chain::programs;
use crate::model::intent::{BuildIntent, Params, ParamsExt};
use crate::model::mint;

/// Conservative rent-exempt balance for a fresh zero-data account,
/// used when the caller does not supply one.
const DEFAULT_RENT_LAMPORTS: u64 = 890_880;

/// Seed for accounts derived off the payer, so no extra signer is
/// needed on the unsigned transaction.
const ACCOUNT_SEED: &str = "txflow:account";

pub struct SystemHandler;

#[async_trait]
impl ProtocolHandler for SystemHandler {
    fn name(&self) -> &'static str {
        "system"
    }

    fn description(&self) -> &'static str {
        "Native SOL transfers and account creation"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &["transfer", "sol-transfer", "create-account"]
    }

    fn validate(&self, intent_key: &str, params: &Params) -> bool {
        match intent_key {
            "create-account" => true,
            _ => {
                let amount_ok = params
                    .f64_param("amount")
                    .is_some_and(|a| a.is_finite() && a > 0.0);
                let to_ok = params
                    .str_param("to")
                    .is_some_and(mint::looks_like_address);
                amount_ok && to_ok
            }
        }
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let payer = parse_pubkey("payer", &intent.payer)?;

        match intent.intent.as_str() {
            "create-account" => {
                let space = intent.params.f64_param("space").unwrap_or(0.0) as u64;
                let rent = intent
                    .params
                    .f64_param("lamports")
                    .map(|l| l as u64)
                    .unwrap_or(DEFAULT_RENT_LAMPORTS);
                let owner = programs::pubkey(programs::SYSTEM_PROGRAM_ID);
                let new_account = solana_sdk::pubkey::Pubkey::create_with_seed(
                    &payer,
                    ACCOUNT_SEED,
                    &owner,
                )
                .map_err(|e| HandlerError::Other(anyhow::anyhow!("deriving account: {e}")))?;

                Ok(vec![system_ix::create_account_with_seed(
                    &payer,
                    &new_account,
                    &payer,
                    ACCOUNT_SEED,
                    rent,
                    space,
                    &owner,
                )])
            }
            _ => {
                let amount = intent
                    .params
                    .f64_param("amount")
                    .ok_or(HandlerError::MissingParam("amount"))?;
                let to = intent
                    .params
                    .str_param("to")
                    .ok_or(HandlerError::MissingParam("to"))?;
                let to = parse_pubkey("to", to)?;
                Ok(vec![system_ix::transfer(&payer, &to, lamports(amount)?)])
            }
        }
    }

    fn required_accounts(&self, params: &Params) -> Vec<String> {
        params
            .str_param("to")
            .map(|to| vec![to.to_string()])
            .unwrap_or_default()
    }
}
