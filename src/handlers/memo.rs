//! On-chain memos via the SPL Memo program.

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;

use super::{HandlerError, ProtocolHandler};
use crate::chain::programs;
use crate::model::intent::{BuildIntent, Params, ParamsExt};

pub struct MemoHandler;

#[async_trait]
impl ProtocolHandler for MemoHandler {
    fn name(&self) -> &'static str {
        "memo"
    }

    fn description(&self) -> &'static str {
        "Write a UTF-8 memo on chain"
    }

    fn supported_actions(&self) -> &'static [&'static str] {
        &["memo", "memo-write"]
    }

    fn validate(&self, _intent_key: &str, params: &Params) -> bool {
        params.str_param("text").is_some_and(|t| !t.is_empty())
    }

    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError> {
        let text = intent
            .params
            .str_param("text")
            .ok_or(HandlerError::MissingParam("text"))?;

        // The memo program reads the instruction data as UTF-8; no
        // accounts are required for an unsigned memo.
        Ok(vec![Instruction::new_with_bytes(
            programs::pubkey(programs::MEMO_PROGRAM_ID),
            text.as_bytes(),
            vec![],
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memo_data_is_the_utf8_text() {
        let intent = BuildIntent {
            intent: "memo".into(),
            params: json!({ "text": "gm" }).as_object().cloned().unwrap(),
            payer: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".into(),
            network: None,
            skip_simulation: true,
            priority_fee: None,
            compute_budget: None,
        };
        let instructions = MemoHandler.build(&intent).await.unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].data, b"gm");
        assert_eq!(
            instructions[0].program_id.to_string(),
            programs::MEMO_PROGRAM_ID
        );
    }

    #[test]
    fn empty_text_is_invalid() {
        let params = json!({ "text": "" }).as_object().cloned().unwrap();
        assert!(!MemoHandler.validate("memo", &params));
    }
}
