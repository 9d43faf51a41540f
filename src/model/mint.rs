//! Symbol → canonical mint substitution.
//!
//! The table is part of the external contract: callers may pass `USDC`
//! anywhere a mint is expected and get the canonical address back.
//! Anything not in the table is assumed to already be a mint address and
//! returned verbatim, which makes resolution idempotent.

/// Wrapped-SOL mint, used as the native side of buy/sell rewrites.
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

/// Well-known symbol → mint table.
const MINTS: &[(&str, &str)] = &[
    ("SOL", NATIVE_MINT),
    ("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    ("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
    ("RAY", "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R"),
    ("SRM", "SRMuApVNdxXokk5GT7XD5cUUgXMBCoAz2LHeuAoKWRt"),
    ("FTT", "AGFEad2et2ZJif9jaGpdMixQqvW5i81aBdvKe7PHNfz3"),
    ("MNGO", "MangoCzJ36AjZyKwVj3VnYU4GTonjfVEnJmvvWaxLac"),
    ("MSOL", "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So"),
    ("ORCA", "orcaEKTdK7LKz57vaAYr9QeNsVEPfiu6QeMU1kektZE"),
    ("GMT", "7i5KKsX2weiTkry7jA4ZwSuXGhs5eJBEjY8vVxR4pfRx"),
    ("BONK", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"),
    ("JUP", "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN"),
    ("WIF", "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm"),
    ("PYTH", "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3"),
    ("JTO", "jtojtomepa8beP8AuQc6eXt5FriJwfFMwQx2v2f9mCL"),
    ("RNDR", "rndrizKT3MK1iimdxRdWabcF7Zg7AR5T4nud4EkHBof"),
    ("HNT", "hntyVP6YFm1Hg25TN9WGLqM12b8TQmcknKrdu1oxWux"),
    ("MNDE", "MNDEFzGvMt87ueuHvVU9VcTqsAP5b3fTGPsHuuPA5ey"),
];

/// Documented decimals for the shipped mints. Conversions beyond this
/// table fall back to the caller-supplied `decimals` parameter.
const DECIMALS: &[(&str, u8)] = &[
    (NATIVE_MINT, 9),
    ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", 6),
    ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", 6),
    ("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R", 6),
    ("SRMuApVNdxXokk5GT7XD5cUUgXMBCoAz2LHeuAoKWRt", 6),
    ("AGFEad2et2ZJif9jaGpdMixQqvW5i81aBdvKe7PHNfz3", 6),
    ("MangoCzJ36AjZyKwVj3VnYU4GTonjfVEnJmvvWaxLac", 6),
    ("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", 9),
    ("orcaEKTdK7LKz57vaAYr9QeNsVEPfiu6QeMU1kektZE", 6),
    ("7i5KKsX2weiTkry7jA4ZwSuXGhs5eJBEjY8vVxR4pfRx", 9),
    ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", 5),
    ("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", 6),
    ("EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm", 6),
    ("HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3", 6),
    ("jtojtomepa8beP8AuQc6eXt5FriJwfFMwQx2v2f9mCL", 9),
    ("rndrizKT3MK1iimdxRdWabcF7Zg7AR5T4nud4EkHBof", 8),
    ("hntyVP6YFm1Hg25TN9WGLqM12b8TQmcknKrdu1oxWux", 8),
    ("MNDEFzGvMt87ueuHvVU9VcTqsAP5b3fTGPsHuuPA5ey", 9),
];

/// Documented decimals for a mint, if this is one of the shipped ones.
pub fn decimals(mint: &str) -> Option<u8> {
    DECIMALS
        .iter()
        .find(|(m, _)| *m == mint)
        .map(|(_, d)| *d)
}

/// Substitute a well-known symbol with its canonical mint.
///
/// Lookup is case-insensitive. Unknown input comes back verbatim (it is
/// assumed to already be a mint address); empty input stays empty.
pub fn resolve(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let upper = token.to_uppercase();
    MINTS
        .iter()
        .find(|(symbol, _)| *symbol == upper)
        .map(|(_, mint)| (*mint).to_string())
        .unwrap_or_else(|| token.to_string())
}

/// Whether a string has the shape of a mint / wallet address:
/// 32–44 characters of base58 decoding to a 32-byte key.
pub fn looks_like_address(s: &str) -> bool {
    if !(32..=44).contains(&s.len()) {
        return false;
    }
    matches!(bs58::decode(s).into_vec(), Ok(bytes) if bytes.len() == 32)
}
