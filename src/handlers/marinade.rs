//! Marinade liquid staking.
//!
//! Deposit mints mSOL against SOL; liquid unstake swaps mSOL back
//! through the liquidity pool without waiting an epoch. Instruction
//! data is the 8-byte Anchor discriminator followed by a
//! little-endian u64 amount.

use async_trait::async_trait;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use super::{
    HandlerError, ProtocolHandler, associated_token_address, lamports, parse_pubkey,
    to_base_units,
};
use crate::chain::programs;
use crate::model::intent::{BuildIntent, Params, ParamsExt};

// Mainnet state accounts.
const STATE: &str = "8szGkuLTAux9XMgZ2vtY39jVSowEcpBfFfD8hXSEqdGC";
const MSOL_MINT: &str = "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So";
const LIQ_POOL_SOL_LEG: &str = "UefNb6z6yvArqe4cJHTXCqStRsKmWhGxnZzuHbikP5Q";
const LIQ_POOL_MSOL_LEG: &str = "7GgPYjS5Dza89wV6FpZ23kUJRG5vbQ1GM25ezspYFSoE";
const LIQ_POOL_MSOL_LEG_AUTHORITY: &str = "EyaSjUtSgo9aRD1f8LWXwdvkpDTmXAW54yoSHZRF14WL";
const RESERVE_PDA: &str = "Du3Ysj1wKbxPKkuPPnvzQLQh8oMSVifs3jGZjJWXFmHN";
const MSOL_MINT_AUTHORITY: &str = "3JLPCS1qM2zRw3Dp6V4hZnYHd4toMNPkNesXdX9tg6KM";
const TREASURY_MSOL: &str = "B1aLzaNMeFVAyQ6f3XbbUyKcH2YPHu2fqiEagmiF23VR";

// sha256("global:deposit")[..8]
const DEPOSIT_DISCRIMINATOR: [u8; 8] = [242, 35, 198, 137, 82, 225, 242, 182];
// sha256("global:liquid_unstake")[..8]
const LIQUID_UNSTAKE_DISCRIMINATOR: [u8; 8] = [30, 30, 119, 240, 191, 227, 12, 16];

const MSOL_DECIMALS: u8 = 9;

pub struct MarinadeHandler;

impl MarinadeHandler {
    fn msol_ata(owner: &Pubkey) -> Pubkey {
        associated_token_address(
            owner,
            &programs::pubkey(MSOL_MINT),
            &programs::pubkey(programs::TOKEN_PROGRAM_ID),
        )
    }

    fn anchor_data(discriminator: [u8; 8], amount: u64) -> Vec<u8> {
        let mut data = discriminator.to_vec();
        data.extend_from_slice(&amount.to_le_bytes());
        data
    }
}

#[async_trait]
impl ProtocolHandler for MarinadeHandler {
    fn name(&self) -> &'static str {
        "marinade"
    }

    fn description(&self) -> &'static str {
        "Marinade liquid staking (SOL ⇄ mSOL)"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &[
            "marinade-stake",
            "marinade-unstake",
            "liquid-stake",
            "liquid-unstake",
        ]
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
        let program = programs::pubkey(programs::MARINADE_PROGRAM_ID);
        let msol_ata = Self::msol_ata(&payer);

        match intent.intent.as_str() {
            "marinade-stake" | "liquid-stake" => {
                let data = Self::anchor_data(DEPOSIT_DISCRIMINATOR, lamports(amount)?);
                Ok(vec![Instruction::new_with_bytes(
                    program,
                    &data,
                    vec![
                        AccountMeta::new(programs::pubkey(STATE), false),
                        AccountMeta::new(programs::pubkey(MSOL_MINT), false),
                        AccountMeta::new(programs::pubkey(LIQ_POOL_SOL_LEG), false),
                        AccountMeta::new(programs::pubkey(LIQ_POOL_MSOL_LEG), false),
                        AccountMeta::new_readonly(
                            programs::pubkey(LIQ_POOL_MSOL_LEG_AUTHORITY),
                            false,
                        ),
                        AccountMeta::new(programs::pubkey(RESERVE_PDA), false),
                        AccountMeta::new(payer, true),
                        AccountMeta::new(msol_ata, false),
                        AccountMeta::new_readonly(programs::pubkey(MSOL_MINT_AUTHORITY), false),
                        AccountMeta::new_readonly(
                            programs::pubkey(programs::SYSTEM_PROGRAM_ID),
                            false,
                        ),
                        AccountMeta::new_readonly(
                            programs::pubkey(programs::TOKEN_PROGRAM_ID),
                            false,
                        ),
                    ],
                )])
            }

            "marinade-unstake" | "liquid-unstake" => {
                let msol_amount = to_base_units(amount, MSOL_DECIMALS)?;
                let data = Self::anchor_data(LIQUID_UNSTAKE_DISCRIMINATOR, msol_amount);
                Ok(vec![Instruction::new_with_bytes(
                    program,
                    &data,
                    vec![
                        AccountMeta::new(programs::pubkey(STATE), false),
                        AccountMeta::new(programs::pubkey(MSOL_MINT), false),
                        AccountMeta::new(programs::pubkey(LIQ_POOL_SOL_LEG), false),
                        AccountMeta::new(programs::pubkey(LIQ_POOL_MSOL_LEG), false),
                        AccountMeta::new(programs::pubkey(TREASURY_MSOL), false),
                        AccountMeta::new(msol_ata, false),
                        AccountMeta::new_readonly(payer, true),
                        AccountMeta::new(payer, false),
                        AccountMeta::new_readonly(
                            programs::pubkey(programs::SYSTEM_PROGRAM_ID),
                            false,
                        ),
                        AccountMeta::new_readonly(
                            programs::pubkey(programs::TOKEN_PROGRAM_ID),
                            false,
                        ),
                    ],
                )])
            }

            other => Err(HandlerError::Unsupported(format!(
                "marinade handler does not recognize '{other}'"
            ))),
        }
    }

    fn required_accounts(&self, _params: &Params) -> Vec<String> {
        vec![STATE.to_string(), MSOL_MINT.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAYER: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    fn intent(key: &str, amount: f64) -> BuildIntent {
        BuildIntent {
            intent: key.into(),
            params: json!({ "amount": amount }).as_object().cloned().unwrap(),
            payer: PAYER.into(),
            network: None,
            skip_simulation: true,
            priority_fee: None,
            compute_budget: None,
        }
    }

    #[tokio::test]
    async fn deposit_carries_discriminator_and_lamports() {
        let built = MarinadeHandler
            .build(&intent("marinade-stake", 1.5))
            .await
            .unwrap();
        assert_eq!(built.len(), 1);
        assert_eq!(
            built[0].program_id.to_string(),
            programs::MARINADE_PROGRAM_ID
        );
        assert_eq!(&built[0].data[..8], &DEPOSIT_DISCRIMINATOR);
        let amount = u64::from_le_bytes(built[0].data[8..16].try_into().unwrap());
        assert_eq!(amount, 1_500_000_000);
    }

    #[tokio::test]
    async fn unstake_uses_msol_base_units() {
        let built = MarinadeHandler
            .build(&intent("marinade-unstake", 5.0))
            .await
            .unwrap();
        assert_eq!(&built[0].data[..8], &LIQUID_UNSTAKE_DISCRIMINATOR);
        let amount = u64::from_le_bytes(built[0].data[8..16].try_into().unwrap());
        assert_eq!(amount, 5_000_000_000);
    }

    #[test]
    fn zero_amount_is_invalid() {
        let params = json!({ "amount": 0 }).as_object().cloned().unwrap();
        assert!(!MarinadeHandler.validate("marinade-stake", &params));
    }
}
