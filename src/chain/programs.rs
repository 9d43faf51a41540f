//! Well-known program and account identifiers.
//!
//! SPL interface crates still carry 2.x `solana_program` types, which
//! do not unify with the 3.x `solana_sdk` types at compile time, so
//! program IDs are string-parsed here. The values match the crates'
//! `declare_id!` invocations.

use solana_sdk::pubkey::Pubkey;

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
pub const ATA_PROGRAM_ID: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";
pub const MEMO_PROGRAM_ID: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";
pub const STAKE_PROGRAM_ID: &str = "Stake11111111111111111111111111111111111111";
pub const COMPUTE_BUDGET_PROGRAM_ID: &str = "ComputeBudget111111111111111111111111111111";

pub const MARINADE_PROGRAM_ID: &str = "MarBmsSgKXdrN1egZf5sqe1TMai9K1rChYNDJgjq7aD";
pub const JUPITER_PROGRAM_ID: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
pub const RAYDIUM_AMM_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
pub const RAYDIUM_CLMM_PROGRAM_ID: &str = "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK";
pub const ORCA_WHIRLPOOL_PROGRAM_ID: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";
pub const METEORA_DLMM_PROGRAM_ID: &str = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo";
pub const PUMPFUN_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";
pub const KAMINO_LEND_PROGRAM_ID: &str = "KLend2g3cP87fffoy8q1mQqGKjrxjC8boSyAYavgmjD";
pub const MARGINFI_PROGRAM_ID: &str = "MFv2hWf31Z9kbCa1snEPYctwafyhdvnV7FZnsebVacA";
pub const SOLEND_PROGRAM_ID: &str = "So1endDq2YkqhipRh3WViPa8hdiSpxWy6z3Z6tMCpAo";

/// One of the published Jito tip accounts.
pub const JITO_TIP_ACCOUNT: &str = "96gYZGLnJYVFmbjzopPSU6QiEV5fGqZNyN9nmNhvrZU5";

/// Labels for the decoder, keyed by program ID.
pub const WELL_KNOWN_PROGRAMS: &[(&str, &str)] = &[
    (SYSTEM_PROGRAM_ID, "system"),
    (TOKEN_PROGRAM_ID, "spl-token"),
    (TOKEN_2022_PROGRAM_ID, "token-2022"),
    (ATA_PROGRAM_ID, "associated-token-account"),
    (MEMO_PROGRAM_ID, "memo"),
    (STAKE_PROGRAM_ID, "stake"),
    (COMPUTE_BUDGET_PROGRAM_ID, "compute-budget"),
    (MARINADE_PROGRAM_ID, "marinade"),
    (JUPITER_PROGRAM_ID, "jupiter"),
    (RAYDIUM_AMM_PROGRAM_ID, "raydium"),
    (RAYDIUM_CLMM_PROGRAM_ID, "raydium"),
    (ORCA_WHIRLPOOL_PROGRAM_ID, "orca"),
    (METEORA_DLMM_PROGRAM_ID, "meteora"),
    (PUMPFUN_PROGRAM_ID, "pumpfun"),
    (KAMINO_LEND_PROGRAM_ID, "kamino"),
    (MARGINFI_PROGRAM_ID, "marginfi"),
    (SOLEND_PROGRAM_ID, "solend"),
];

/// Parse a known-good program ID. Only used with the constants above.
pub fn pubkey(id: &str) -> Pubkey {
    id.parse().expect("well-known id is valid base58")
}

/// Label for a program ID, if it is one we ship.
pub fn program_label(program_id: &str) -> Option<&'static str> {
    WELL_KNOWN_PROGRAMS
        .iter()
        .find(|(id, _)| *id == program_id)
        .map(|(_, label)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_program_id_parses() {
        for (id, _) in WELL_KNOWN_PROGRAMS {
            let _ = pubkey(id);
        }
        let _ = pubkey(JITO_TIP_ACCOUNT);
    }

    #[test]
    fn labels_resolve() {
        assert_eq!(program_label(MEMO_PROGRAM_ID), Some("memo"));
        assert_eq!(program_label(ORCA_WHIRLPOOL_PROGRAM_ID), Some("orca"));
        assert_eq!(program_label("nope"), None);
    }
}
