//! SPL token transfers and associated-token-account management.
//!
//! One handler serves both the classic token program and Token-2022:
//! the instruction layouts are identical, only the owning program
//! differs. Instruction data is packed with the `spl-token` crate;
//! program IDs are string-parsed because the SPL crates still carry
//! 2.x `solana_program` types.

use async_trait::async_trait;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use spl_token::instruction::TokenInstruction;

use super::{
    HandlerError, ProtocolHandler, associated_token_address, parse_pubkey, to_base_units,
};
use crate::chain::programs;
use crate::model::intent::{BuildIntent, Params, ParamsExt};
use crate::model::mint;

/// Fallback when a mint is outside the documented-decimals table and
/// the caller did not pass `decimals`.
const DEFAULT_DECIMALS: u8 = 6;

pub struct SplTokenHandler {
    name: &'static str,
    description: &'static str,
    actions: &'static [&'static str],
    token_program: &'static str,
}

impl SplTokenHandler {
    pub fn classic() -> Self {
        SplTokenHandler {
            name: "spl-token",
            description: "SPL token transfers and token-account management",
            actions: &[
                "spl-transfer",
                "token-transfer",
                "create-token-account",
                "create-ata",
                "close-token-account",
            ],
            token_program: programs::TOKEN_PROGRAM_ID,
        }
    }

    pub fn token_2022() -> Self {
        SplTokenHandler {
            name: "token-2022",
            description: "Token-2022 transfers",
            actions: &["token-2022-transfer"],
            token_program: programs::TOKEN_2022_PROGRAM_ID,
        }
    }

    fn token_mint(&self, params: &Params) -> Result<Pubkey, HandlerError> {
        let token = params
            .str_param("token")
            .ok_or(HandlerError::MissingParam("token"))?;
        // `close` intents keep the raw symbol for display; resolve it
        // here where the actual mint is needed.
        let resolved = mint::resolve(token);
        parse_pubkey("token", &resolved)
    }

    fn decimals(&self, params: &Params, token_mint: &Pubkey) -> u8 {
        params
            .f64_param("decimals")
            .map(|d| d as u8)
            .or_else(|| mint::decimals(&token_mint.to_string()))
            .unwrap_or(DEFAULT_DECIMALS)
    }

    fn transfer_checked(
        &self,
        source: &Pubkey,
        token_mint: &Pubkey,
        destination: &Pubkey,
        authority: &Pubkey,
        amount: u64,
        decimals: u8,
    ) -> Instruction {
        let data = TokenInstruction::TransferChecked { amount, decimals }.pack();
        Instruction::new_with_bytes(
            programs::pubkey(self.token_program),
            &data,
            vec![
                AccountMeta::new(*source, false),
                AccountMeta::new_readonly(*token_mint, false),
                AccountMeta::new(*destination, false),
                AccountMeta::new_readonly(*authority, true),
            ],
        )
    }

    /// ATA program create instruction. Idempotent variant (data `[1]`)
    /// is used when the account may already exist.
    fn create_ata(
        &self,
        payer: &Pubkey,
        owner: &Pubkey,
        token_mint: &Pubkey,
        idempotent: bool,
    ) -> Instruction {
        let token_program = programs::pubkey(self.token_program);
        let ata = associated_token_address(owner, token_mint, &token_program);
        let data: &[u8] = if idempotent { &[1] } else { &[] };
        Instruction::new_with_bytes(
            programs::pubkey(programs::ATA_PROGRAM_ID),
            data,
            vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(ata, false),
                AccountMeta::new_readonly(*owner, false),
                AccountMeta::new_readonly(*token_mint, false),
                AccountMeta::new_readonly(programs::pubkey(programs::SYSTEM_PROGRAM_ID), false),
                AccountMeta::new_readonly(token_program, false),
            ],
        )
    }
}

#[async_trait]
impl ProtocolHandler for SplTokenHandler {
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
        match intent_key {
            "create-token-account" | "create-ata" | "close-token-account" => {
                params.str_param("token").is_some_and(|t| !t.is_empty())
            }
            _ => {
                let amount_ok = params
                    .f64_param("amount")
                    .is_some_and(|a| a.is_finite() && a > 0.0);
                let to_ok = params
                    .str_param("to")
                    .is_some_and(mint::looks_like_address);
                amount_ok && to_ok && params.str_param("token").is_some()
            }
        }
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let payer = parse_pubkey("payer", &intent.payer)?;
        let token_program = programs::pubkey(self.token_program);

        match intent.intent.as_str() {
            "create-token-account" | "create-ata" => {
                let token_mint = self.token_mint(&intent.params)?;
                Ok(vec![self.create_ata(&payer, &payer, &token_mint, false)])
            }

            "close-token-account" => {
                let token_mint = self.token_mint(&intent.params)?;
                let ata = associated_token_address(&payer, &token_mint, &token_program);
                let data = TokenInstruction::CloseAccount.pack();
                Ok(vec![Instruction::new_with_bytes(
                    token_program,
                    &data,
                    vec![
                        AccountMeta::new(ata, false),
                        AccountMeta::new(payer, false),
                        AccountMeta::new_readonly(payer, true),
                    ],
                )])
            }

            _ => {
                let token_mint = self.token_mint(&intent.params)?;
                let amount = intent
                    .params
                    .f64_param("amount")
                    .ok_or(HandlerError::MissingParam("amount"))?;
                let to = intent
                    .params
                    .str_param("to")
                    .ok_or(HandlerError::MissingParam("to"))?;
                let to = parse_pubkey("to", to)?;

                let decimals = self.decimals(&intent.params, &token_mint);
                let base_units = to_base_units(amount, decimals)?;

                let source = associated_token_address(&payer, &token_mint, &token_program);
                let destination = associated_token_address(&to, &token_mint, &token_program);

                // Recipient's token account may not exist yet.
                Ok(vec![
                    self.create_ata(&payer, &to, &token_mint, true),
                    self.transfer_checked(
                        &source,
                        &token_mint,
                        &destination,
                        &payer,
                        base_units,
                        decimals,
                    ),
                ])
            }
        }
    }

    fn required_accounts(&self, params: &Params) -> Vec<String> {
        let mut accounts = Vec::new();
        if let Some(token) = params.str_param("token") {
            accounts.push(mint::resolve(token));
        }
        if let Some(to) = params.str_param("to") {
            accounts.push(to.to_string());
        }
        accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PAYER: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn intent(key: &str, params: serde_json::Value) -> BuildIntent {
        BuildIntent {
            intent: key.into(),
            params: params.as_object().cloned().unwrap(),
            payer: PAYER.into(),
            network: None,
            skip_simulation: true,
            priority_fee: None,
            compute_budget: None,
        }
    }

    #[tokio::test]
    async fn transfer_uses_documented_decimals() {
        let handler = SplTokenHandler::classic();
        let built = handler
            .build(&intent(
                "spl-transfer",
                json!({ "amount": 2.5, "token": USDC, "to": PAYER }),
            ))
            .await
            .unwrap();

        // Idempotent ATA create followed by the transfer itself.
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].program_id.to_string(), programs::ATA_PROGRAM_ID);
        assert_eq!(built[1].program_id.to_string(), programs::TOKEN_PROGRAM_ID);

        match TokenInstruction::unpack(&built[1].data).unwrap() {
            TokenInstruction::TransferChecked { amount, decimals } => {
                assert_eq!(amount, 2_500_000); // 2.5 USDC at 6 decimals
                assert_eq!(decimals, 6);
            }
            other => panic!("expected TransferChecked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn token_2022_targets_the_other_program() {
        let handler = SplTokenHandler::token_2022();
        let built = handler
            .build(&intent(
                "token-2022-transfer",
                json!({ "amount": 1, "token": USDC, "to": PAYER }),
            ))
            .await
            .unwrap();
        assert_eq!(
            built[1].program_id.to_string(),
            programs::TOKEN_2022_PROGRAM_ID
        );
    }

    #[tokio::test]
    async fn close_resolves_the_raw_symbol() {
        let handler = SplTokenHandler::classic();
        let built = handler
            .build(&intent("close-token-account", json!({ "token": "USDC" })))
            .await
            .unwrap();
        assert_eq!(built.len(), 1);
        match TokenInstruction::unpack(&built[0].data).unwrap() {
            TokenInstruction::CloseAccount => {}
            other => panic!("expected CloseAccount, got {other:?}"),
        }
    }

    #[test]
    fn transfer_validation() {
        let handler = SplTokenHandler::classic();
        let good = json!({ "amount": 1, "token": USDC, "to": PAYER })
            .as_object()
            .cloned()
            .unwrap();
        assert!(handler.validate("spl-transfer", &good));

        let all = json!({ "amount": -1, "token": USDC, "to": PAYER })
            .as_object()
            .cloned()
            .unwrap();
        assert!(!handler.validate("spl-transfer", &all));
    }
}
