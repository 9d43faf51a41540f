//! Native stake-program operations.
//!
//! Stake accounts are derived off the payer with a fixed seed, so the
//! unsigned transaction needs no signer beyond the payer itself.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_stake_interface::instruction as stake_ix;
use solana_stake_interface::state::{Authorized, Lockup};
use solana_system_interface::instruction as system_ix;

use super::{HandlerError, ProtocolHandler, lamports, parse_pubkey};
use crate::chain::programs;
use crate::model::intent::{BuildIntent, Params, ParamsExt};
use crate::model::mint;

/// Rent-exempt reserve for the 200-byte stake state.
const STAKE_RENT_LAMPORTS: u64 = 2_282_880;

const STAKE_ACCOUNT_SPACE: u64 = 200;

const STAKE_SEED: &str = "txflow:stake";

pub struct StakeHandler;

impl StakeHandler {
    fn derived_stake_account(payer: &Pubkey) -> Result<Pubkey, HandlerError> {
        let stake_program = programs::pubkey(programs::STAKE_PROGRAM_ID);
        Pubkey::create_with_seed(payer, STAKE_SEED, &stake_program)
            .map_err(|e| HandlerError::Other(anyhow::anyhow!("deriving stake account: {e}")))
    }

    fn stake_account_param(params: &Params) -> Result<Pubkey, HandlerError> {
        let account = params
            .str_param("stakeAccount")
            .ok_or(HandlerError::MissingParam("stakeAccount"))?;
        parse_pubkey("stakeAccount", account)
    }
}

#[async_trait]
impl ProtocolHandler for StakeHandler {
    fn name(&self) -> &'static str {
        "stake"
    }

    fn description(&self) -> &'static str {
        "Native stake account creation, delegation and withdrawal"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &[
            "native-stake",
            "delegate-stake",
            "deactivate-stake",
            "withdraw-stake",
        ]
    }

    fn validate(&self, intent_key: &str, params: &Params) -> bool {
        let positive_amount = || {
            params
                .f64_param("amount")
                .is_some_and(|a| a.is_finite() && a > 0.0)
        };
        match intent_key {
            "native-stake" => {
                positive_amount()
                    && params
                        .str_param("validator")
                        .is_none_or(mint::looks_like_address)
            }
            "delegate-stake" => {
                params
                    .str_param("stakeAccount")
                    .is_some_and(mint::looks_like_address)
                    && params
                        .str_param("validator")
                        .is_some_and(mint::looks_like_address)
            }
            "deactivate-stake" => params
                .str_param("stakeAccount")
                .is_some_and(mint::looks_like_address),
            "withdraw-stake" => {
                positive_amount()
                    && params
                        .str_param("stakeAccount")
                        .is_some_and(mint::looks_like_address)
            }
            _ => false,
        }
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let payer = parse_pubkey("payer", &intent.payer)?;

        match intent.intent.as_str() {
            "native-stake" => {
                let amount = intent
                    .params
                    .f64_param("amount")
                    .ok_or(HandlerError::MissingParam("amount"))?;
                let stake_account = Self::derived_stake_account(&payer)?;
                let stake_program = programs::pubkey(programs::STAKE_PROGRAM_ID);
                let authorized = Authorized {
                    staker: payer,
                    withdrawer: payer,
                };

                let mut instructions = vec![
                    system_ix::create_account_with_seed(
                        &payer,
                        &stake_account,
                        &payer,
                        STAKE_SEED,
                        lamports(amount)?.saturating_add(STAKE_RENT_LAMPORTS),
                        STAKE_ACCOUNT_SPACE,
                        &stake_program,
                    ),
                    stake_ix::initialize(&stake_account, &authorized, &Lockup::default()),
                ];
                if let Some(validator) = intent.params.str_param("validator") {
                    let vote = parse_pubkey("validator", validator)?;
                    instructions.push(stake_ix::delegate_stake(&stake_account, &payer, &vote));
                }
                Ok(instructions)
            }

            "delegate-stake" => {
                let stake_account = Self::stake_account_param(&intent.params)?;
                let validator = intent
                    .params
                    .str_param("validator")
                    .ok_or(HandlerError::MissingParam("validator"))?;
                let vote = parse_pubkey("validator", validator)?;
                Ok(vec![stake_ix::delegate_stake(&stake_account, &payer, &vote)])
            }

            "deactivate-stake" => {
                let stake_account = Self::stake_account_param(&intent.params)?;
                Ok(vec![stake_ix::deactivate_stake(&stake_account, &payer)])
            }

            "withdraw-stake" => {
                let stake_account = Self::stake_account_param(&intent.params)?;
                let amount = intent
                    .params
                    .f64_param("amount")
                    .ok_or(HandlerError::MissingParam("amount"))?;
                Ok(vec![stake_ix::withdraw(
                    &stake_account,
                    &payer,
                    &payer,
                    lamports(amount)?,
                    None,
                )])
            }

            other => Err(HandlerError::Unsupported(format!(
                "stake handler does not recognize '{other}'"
            ))),
        }
    }

    fn required_accounts(&self, params: &Params) -> Vec<String> {
        let mut accounts = Vec::new();
        if let Some(stake) = params.str_param("stakeAccount") {
            accounts.push(stake.to_string());
        }
        if let Some(validator) = params.str_param("validator") {
            accounts.push(validator.to_string());
        }
        accounts
    }
}
