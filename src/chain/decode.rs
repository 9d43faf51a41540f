//! Transaction decoding.
//!
//! Accepts a base64 transaction (legacy or versioned), resolves each
//! instruction's program, and labels programs from the well-known
//! table plus a name-substring match against the registered handlers.

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use solana_message::VersionedMessage;
use solana_transaction::versioned::VersionedTransaction;

use super::programs;
use crate::handlers::ProtocolRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedInstruction {
    pub program_id: String,
    /// Label from the well-known-programs table, when the program is
    /// one we ship.
    pub program_label: Option<String>,
    pub accounts: Vec<String>,
    pub data_hex: String,
    /// Registered handler this instruction appears to belong to.
    pub recognized_venue: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTransaction {
    /// `legacy` or `v0`.
    pub version: String,
    pub fee_payer: Option<String>,
    pub num_signatures: usize,
    pub account_keys: Vec<String>,
    pub instructions: Vec<DecodedInstruction>,
}

/// Match a program label against registered handler names. Substring
/// in either direction counts: `raydium` recognizes `raydium-clmm`
/// style labels and vice versa.
fn recognize_venue(label: &str, registry: &ProtocolRegistry) -> Option<String> {
    registry
        .list()
        .into_iter()
        .map(|handler| handler.name().to_string())
        .find(|name| label.contains(name.as_str()) || name.contains(label))
}

pub fn decode_base64(
    tx_base64: &str,
    registry: &ProtocolRegistry,
) -> Result<DecodedTransaction> {
    let bytes = BASE64
        .decode(tx_base64.trim())
        .context("transaction is not valid base64")?;
    decode_bytes(&bytes, registry)
}

pub fn decode_bytes(bytes: &[u8], registry: &ProtocolRegistry) -> Result<DecodedTransaction> {
    // VersionedTransaction deserializes both wire formats; the message
    // variant tells us which one we got.
    let tx: VersionedTransaction =
        bincode::deserialize(bytes).map_err(|e| anyhow!("not a Solana transaction: {e}"))?;

    let (version, account_keys, compiled): (&str, Vec<String>, _) = match &tx.message {
        VersionedMessage::Legacy(msg) => (
            "legacy",
            msg.account_keys.iter().map(|k| k.to_string()).collect(),
            &msg.instructions,
        ),
        VersionedMessage::V0(msg) => (
            "v0",
            msg.account_keys.iter().map(|k| k.to_string()).collect(),
            &msg.instructions,
        ),
    };

    let mut instructions = Vec::new();
    for (index, instruction) in compiled.iter().enumerate() {
        let program_id = account_keys
            .get(instruction.program_id_index as usize)
            .cloned()
            .ok_or_else(|| anyhow!("instruction {index} has an out-of-range program index"))?;

        let accounts: Vec<String> = instruction
            .accounts
            .iter()
            .filter_map(|&i| account_keys.get(i as usize).cloned())
            .collect();

        let program_label = programs::program_label(&program_id).map(str::to_string);
        let recognized_venue = program_label
            .as_deref()
            .and_then(|label| recognize_venue(label, registry));

        instructions.push(DecodedInstruction {
            program_id,
            program_label,
            accounts,
            data_hex: hex::encode(&instruction.data),
            recognized_venue,
        });
    }

    Ok(DecodedTransaction {
        version: version.to_string(),
        fee_payer: account_keys.first().cloned(),
        num_signatures: tx.signatures.len(),
        account_keys,
        instructions,
    })
}
