//! The ordered pattern bank.
//!
//! Each rule pairs an anchored matcher with the `(protocol, action)` it
//! emits and an extractor over its captures. The bank is evaluated
//! top-to-bottom and the first hit wins, so ordering is contractual:
//!
//! - venue-qualified lending precedes the generic forms that default
//!   to Kamino;
//! - `unstake` rules precede `stake` rules;
//! - venue-qualified swaps precede the aggregator catch-all;
//! - full-address transfers precede symbol transfers;
//! - "create token account" precedes the bare "create account".
//!
//! Matching is case-insensitive while captures keep the original text,
//! so base58 addresses survive intact.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Value, json};

use super::ProtocolTag;
use crate::model::intent::{AMOUNT_ALL, Action, Params, Protocol};

// ── Pattern record ──────────────────────────────────────────────────

type Extractor = Box<dyn Fn(&Captures) -> Params + Send + Sync>;

pub struct Pattern {
    regex: Regex,
    pub tag: ProtocolTag,
    pub action: Action,
    extract: Extractor,
}

impl Pattern {
    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(text)
    }

    pub fn extract(&self, caps: &Captures) -> Params {
        (self.extract)(caps)
    }
}

/// Convert a `json!` object literal into a parameter map.
pub(crate) fn obj(value: Value) -> Params {
    value.as_object().cloned().unwrap_or_default()
}

fn num(text: &str) -> f64 {
    text.trim().parse().unwrap_or(1.0)
}

fn rule(
    pattern: &str,
    tag: ProtocolTag,
    action: Action,
    extract: impl Fn(&Captures) -> Params + Send + Sync + 'static,
) -> Pattern {
    let anchored = format!("(?i)^{pattern}$");
    Pattern {
        regex: Regex::new(&anchored).unwrap_or_else(|e| panic!("bad pattern {pattern}: {e}")),
        tag,
        action,
        extract: Box::new(extract),
    }
}

fn known(protocol: Protocol) -> ProtocolTag {
    ProtocolTag::Known(protocol)
}

// ── Capture classes ─────────────────────────────────────────────────

/// Decimal amount.
const AMT: &str = r"(\d+(?:\.\d+)?)";
/// Base58 address (mint, wallet, pool, stake account).
const ADDR: &str = r"([1-9A-HJ-NP-Za-km-z]{32,44})";
/// Short symbol, at most 10 characters.
const SYM: &str = r"([A-Za-z][A-Za-z0-9]{1,9})";
/// Symbol or address.
const TOK: &str = r"([A-Za-z0-9]{2,44})";

// ── The bank ────────────────────────────────────────────────────────

static BANK: Lazy<Vec<Pattern>> = Lazy::new(build_bank);

pub fn bank() -> &'static [Pattern] {
    &BANK
}

fn build_bank() -> Vec<Pattern> {
    let mut bank: Vec<Pattern> = Vec::with_capacity(128);
    let mut add = |p: Pattern| bank.push(p);

    // ── Memo ────────────────────────────────────────────────────────
    add(rule(
        r#"memo\s+"(.+)""#,
        known(Protocol::Memo),
        Action::Memo,
        |c| obj(json!({ "text": &c[1] })),
    ));
    add(rule(
        r"memo\s+'(.+)'",
        known(Protocol::Memo),
        Action::Memo,
        |c| obj(json!({ "text": &c[1] })),
    ));
    add(rule(
        r"write\s+(?:an?\s+)?onchain\s+memo:?\s+(.+)",
        known(Protocol::Memo),
        Action::Memo,
        |c| obj(json!({ "text": &c[1] })),
    ));
    add(rule(
        r"memo\s+(.+)",
        known(Protocol::Memo),
        Action::Memo,
        |c| obj(json!({ "text": &c[1] })),
    ));

    // ── Jito tip ────────────────────────────────────────────────────
    add(rule(
        &format!(r"tip\s+{AMT}\s+sol\s+to\s+jito"),
        known(Protocol::Jito),
        Action::Tip,
        |c| obj(json!({ "amount": num(&c[1]) })),
    ));
    add(rule(
        &format!(r"tip\s+jito\s+{AMT}(?:\s+sol)?"),
        known(Protocol::Jito),
        Action::Tip,
        |c| obj(json!({ "amount": num(&c[1]) })),
    ));
    add(rule(
        &format!(r"jito\s+tip\s+{AMT}(?:\s+sol)?"),
        known(Protocol::Jito),
        Action::Tip,
        |c| obj(json!({ "amount": num(&c[1]) })),
    ));
    add(rule(
        r"(?:send\s+)?(?:a\s+)?jito\s+tip",
        known(Protocol::Jito),
        Action::Tip,
        |_| obj(json!({ "amount": 0.001 })),
    ));

    // ── Token-2022 transfer (qualified, so it precedes plain ones) ──
    add(rule(
        &format!(r"(?:send|transfer)\s+{AMT}\s+{TOK}\s+to\s+{ADDR}\s+(?:using|with|via)\s+token-?2022"),
        known(Protocol::Token2022),
        Action::Transfer,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2], "to": &c[3] })),
    ));

    // ── Transfers ───────────────────────────────────────────────────
    add(rule(
        &format!(r"(?:send|transfer|pay)\s+{AMT}\s+sol\s+to\s+{ADDR}"),
        known(Protocol::System),
        Action::Transfer,
        |c| obj(json!({ "amount": num(&c[1]), "to": &c[2] })),
    ));
    add(rule(
        &format!(r"pay\s+{ADDR}\s+{AMT}\s+sol"),
        known(Protocol::System),
        Action::Transfer,
        |c| obj(json!({ "to": &c[1], "amount": num(&c[2]) })),
    ));
    // Full-address token transfer before the symbol form: longer,
    // more specific patterns first.
    add(rule(
        &format!(r"(?:send|transfer)\s+{AMT}\s+{ADDR}\s+to\s+{ADDR}"),
        known(Protocol::SplToken),
        Action::Transfer,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2], "to": &c[3] })),
    ));
    add(rule(
        &format!(r"(?:send|transfer)\s+{AMT}\s+{SYM}\s+to\s+{ADDR}"),
        known(Protocol::SplToken),
        Action::Transfer,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2], "to": &c[3] })),
    ));
    add(rule(
        &format!(r"pay\s+{ADDR}\s+{AMT}\s+{SYM}"),
        known(Protocol::SplToken),
        Action::Transfer,
        |c| obj(json!({ "to": &c[1], "amount": num(&c[2]), "token": &c[3] })),
    ));

    // ── Unstake before stake ────────────────────────────────────────
    add(rule(
        &format!(r"(?:liquid\s+)?unstake\s+{AMT}\s+msol(?:\s+from\s+marinade)?"),
        known(Protocol::Marinade),
        Action::Unstake,
        |c| obj(json!({ "amount": num(&c[1]), "token": "MSOL" })),
    ));
    add(rule(
        &format!(r"unstake\s+{AMT}\s+{SYM}\s+from\s+marinade"),
        known(Protocol::Marinade),
        Action::Unstake,
        |c| obj(json!({ "amount": num(&c[1]), "token": c[2].to_uppercase() })),
    ));
    add(rule(
        &format!(r"(?:deactivate|unstake)\s+(?:stake\s+)?(?:account\s+)?{ADDR}"),
        known(Protocol::Stake),
        Action::Deactivate,
        |c| obj(json!({ "stakeAccount": &c[1] })),
    ));
    add(rule(
        &format!(r"withdraw\s+{AMT}\s+sol\s+from\s+stake\s+(?:account\s+)?{ADDR}"),
        known(Protocol::Stake),
        Action::Withdraw,
        |c| obj(json!({ "amount": num(&c[1]), "stakeAccount": &c[2] })),
    ));
    add(rule(
        &format!(r"withdraw\s+stake\s+(?:from\s+)?{ADDR}"),
        known(Protocol::Stake),
        Action::Withdraw,
        |c| obj(json!({ "stakeAccount": &c[1] })),
    ));

    // ── Liquid stake (Marinade) before native stake ─────────────────
    add(rule(
        &format!(r"(?:liquid\s+)?stake\s+{AMT}(?:\s+sol)?\s+(?:with|on|to)\s+marinade"),
        known(Protocol::Marinade),
        Action::Stake,
        |c| obj(json!({ "amount": num(&c[1]) })),
    ));
    add(rule(
        &format!(r"liquid\s+stake\s+{AMT}(?:\s+sol)?"),
        known(Protocol::Marinade),
        Action::Stake,
        |c| obj(json!({ "amount": num(&c[1]) })),
    ));

    // ── Native stake ────────────────────────────────────────────────
    add(rule(
        &format!(r"(?:native\s+)?stake\s+{AMT}\s+sol\s+(?:with|to)\s+(?:validator\s+)?{ADDR}"),
        known(Protocol::Stake),
        Action::Stake,
        |c| obj(json!({ "amount": num(&c[1]), "validator": &c[2] })),
    ));
    add(rule(
        &format!(r"native\s+stake\s+{AMT}(?:\s+sol)?"),
        known(Protocol::Stake),
        Action::Stake,
        |c| obj(json!({ "amount": num(&c[1]) })),
    ));
    add(rule(
        &format!(r"stake\s+{AMT}\s+sol"),
        known(Protocol::Stake),
        Action::Stake,
        |c| obj(json!({ "amount": num(&c[1]) })),
    ));
    add(rule(
        &format!(r"delegate\s+(?:stake\s+)?{ADDR}\s+to\s+(?:validator\s+)?{ADDR}"),
        known(Protocol::Stake),
        Action::Delegate,
        |c| obj(json!({ "stakeAccount": &c[1], "validator": &c[2] })),
    ));

    // ── Lending, venue-qualified ────────────────────────────────────
    // One expansion per venue; these precede every generic lending or
    // buy form so "put 100 USDC into kamino" never reads as a buy.
    for (venue_word, protocol) in [
        ("kamino", Protocol::Kamino),
        ("marginfi", Protocol::Marginfi),
        ("solend", Protocol::Solend),
    ] {
        add(rule(
            &format!(
                r"(?:supply|deposit|lend|put|invest|lock)\s+{AMT}\s+{TOK}\s+(?:to|on|into|in)\s+{venue_word}"
            ),
            known(protocol),
            Action::Supply,
            |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
        ));
        add(rule(
            &format!(
                r"borrow\s+{AMT}\s+{TOK}\s+(?:from|on)\s+{venue_word}(?:\s+against\s+my\s+collateral)?"
            ),
            known(protocol),
            Action::Borrow,
            |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
        ));
        add(rule(
            &format!(
                r"(?:take\s+(?:out\s+)?a\s+loan\s+of|loan\s+me|get\s+a\s+loan\s+of)\s+{AMT}\s+{TOK}\s+(?:from|on)\s+{venue_word}"
            ),
            known(protocol),
            Action::Borrow,
            |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
        ));
        add(rule(
            &format!(
                r"(?:repay|pay\s+back|pay\s+off|settle|return)\s+{AMT}\s+{TOK}\s+(?:to|on)\s+{venue_word}"
            ),
            known(protocol),
            Action::Repay,
            |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
        ));
        // Full repayment: no amount means the whole outstanding loan.
        add(rule(
            &format!(r"(?:repay|pay\s+back|pay\s+off|settle)\s+my\s+{venue_word}\s+loan"),
            known(protocol),
            Action::Repay,
            |_| Params::new(),
        ));
        add(rule(
            &format!(r"(?:withdraw|pull\s+out|pull|take\s+out)\s+{AMT}\s+{TOK}\s+from\s+{venue_word}"),
            known(protocol),
            Action::Withdraw,
            |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
        ));
    }

    // ── Venue-qualified swaps, before the aggregator catch-all ──────
    for (venue_word, protocol) in [
        ("raydium", Protocol::Raydium),
        ("orca", Protocol::Orca),
        ("meteora", Protocol::Meteora),
    ] {
        add(rule(
            &format!(
                r"(?:swap|convert|trade|exchange|change)\s+{AMT}\s+{TOK}\s+(?:for|to|into)\s+{TOK}\s+on\s+{venue_word}(?:\s+with\s+{AMT}%\s+slippage)?"
            ),
            known(protocol),
            Action::Swap,
            |c| {
                let mut params = obj(json!({
                    "amount": num(&c[1]),
                    "from": &c[2],
                    "to": &c[3],
                }));
                if let Some(slip) = c.get(4) {
                    params.insert("slippage".into(), json!(num(slip.as_str())));
                }
                params
            },
        ));
    }

    // ── Pump.fun ────────────────────────────────────────────────────
    add(rule(
        &format!(r"(?:buy|ape)\s+{AMT}(?:\s+sol)?(?:\s+(?:of\s+)?{TOK})?\s+on\s+pump\.?fun"),
        known(Protocol::Pumpfun),
        Action::Buy,
        |c| {
            let mut params = obj(json!({ "amount": num(&c[1]) }));
            if let Some(token) = c.get(2) {
                params.insert("token".into(), json!(token.as_str()));
            }
            params
        },
    ));
    add(rule(
        &format!(r"sell\s+(?:all|{AMT})\s+{TOK}\s+on\s+pump\.?fun"),
        known(Protocol::Pumpfun),
        Action::Sell,
        |c| {
            let amount = c.get(1).map(|m| num(m.as_str())).unwrap_or(AMOUNT_ALL);
            obj(json!({ "amount": amount, "token": &c[2] }))
        },
    ));
    add(rule(
        r#"create\s+(?:a\s+)?token\s+on\s+pump\.?fun\s+called\s+"([^"]+)"\s+(?:with\s+)?symbol\s+(\S+)"#,
        known(Protocol::Pumpfun),
        Action::CreateToken,
        |c| obj(json!({ "name": &c[1], "symbol": &c[2] })),
    ));

    // ── Buy / sell via a pair address ───────────────────────────────
    add(rule(
        &format!(r"buy\s+{AMT}\s+sol\s+(?:of|worth\s+of|from)\s+pair\s+{ADDR}"),
        ProtocolTag::ResolvePair,
        Action::Buy,
        |c| obj(json!({ "amount": num(&c[1]), "pair": &c[2] })),
    ));
    add(rule(
        &format!(r"sell\s+(?:all\s+)?(?:{AMT}\s+)?from\s+pair\s+{ADDR}"),
        ProtocolTag::ResolvePair,
        Action::Sell,
        |c| {
            let amount = c.get(1).map(|m| num(m.as_str())).unwrap_or(AMOUNT_ALL);
            obj(json!({ "amount": amount, "pair": &c[2] }))
        },
    ));

    // ── Buy / sell via a bare mint address: venue must be resolved ──
    add(rule(
        &format!(
            r"(?:buy|ape|yolo|spend|put|invest|long)\s+{AMT}\s+sol\s+(?:of|into|in|on|worth\s+of)\s+{ADDR}"
        ),
        ProtocolTag::ResolveToken,
        Action::Buy,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"buy\s+{ADDR}\s+with\s+{AMT}\s+sol"),
        ProtocolTag::ResolveToken,
        Action::Buy,
        |c| obj(json!({ "token": &c[1], "amount": num(&c[2]) })),
    ));
    add(rule(
        &format!(r"sell\s+{AMT}\s+{ADDR}"),
        ProtocolTag::ResolveToken,
        Action::Sell,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"(?:sell\s+all|dump(?:\s+all)?|exit)\s+{ADDR}"),
        ProtocolTag::ResolveToken,
        Action::Sell,
        |c| obj(json!({ "amount": AMOUNT_ALL, "token": &c[1] })),
    ));

    // ── Buy / sell via a symbol: route straight to the aggregator ───
    add(rule(
        &format!(
            r"(?:buy|ape|yolo|spend|put|invest)\s+{AMT}\s+sol\s+(?:of|into|in|on|worth\s+of)\s+{SYM}"
        ),
        known(Protocol::Jupiter),
        Action::Buy,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"buy\s+{SYM}\s+with\s+{AMT}\s+sol"),
        known(Protocol::Jupiter),
        Action::Buy,
        |c| obj(json!({ "token": &c[1], "amount": num(&c[2]) })),
    ));
    add(rule(
        &format!(r"long\s+{SYM}\s+with\s+{AMT}\s+sol"),
        known(Protocol::Jupiter),
        Action::Buy,
        |c| obj(json!({ "token": &c[1], "amount": num(&c[2]) })),
    ));
    add(rule(
        &format!(r"short\s+{SYM}"),
        known(Protocol::Jupiter),
        Action::Sell,
        |c| obj(json!({ "amount": AMOUNT_ALL, "token": &c[1] })),
    ));
    add(rule(
        &format!(r"sell\s+{AMT}\s+{SYM}"),
        known(Protocol::Jupiter),
        Action::Sell,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"(?:sell\s+all|dump(?:\s+all)?|exit)\s+{SYM}"),
        known(Protocol::Jupiter),
        Action::Sell,
        |c| obj(json!({ "amount": AMOUNT_ALL, "token": &c[1] })),
    ));

    // ── Aggregator swaps ────────────────────────────────────────────
    add(rule(
        &format!(r"(?:swap|convert|trade|exchange|change)\s+all\s+{TOK}\s+(?:for|to|into)\s+{TOK}"),
        known(Protocol::Jupiter),
        Action::Swap,
        |c| obj(json!({ "amount": AMOUNT_ALL, "from": &c[1], "to": &c[2] })),
    ));
    add(rule(
        &format!(
            r"(?:swap|convert|trade|exchange|change)\s+{AMT}\s+{TOK}\s+(?:for|to|into)\s+{TOK}(?:\s+with\s+{AMT}%\s+slippage)?"
        ),
        known(Protocol::Jupiter),
        Action::Swap,
        |c| {
            let mut params = obj(json!({
                "amount": num(&c[1]),
                "from": &c[2],
                "to": &c[3],
            }));
            if let Some(slip) = c.get(4) {
                params.insert("slippage".into(), json!(num(slip.as_str())));
            }
            params
        },
    ));

    // ── Generic lending, defaults to Kamino ─────────────────────────
    add(rule(
        &format!(r"borrow\s+{AMT}\s+{TOK}\s+against\s+my\s+collateral"),
        known(Protocol::Kamino),
        Action::Borrow,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"(?:supply|deposit|lend)\s+{AMT}\s+{TOK}"),
        known(Protocol::Kamino),
        Action::Supply,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"borrow\s+{AMT}\s+{TOK}"),
        known(Protocol::Kamino),
        Action::Borrow,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"(?:repay|pay\s+back|pay\s+off)\s+{AMT}\s+{TOK}"),
        known(Protocol::Kamino),
        Action::Repay,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));

    // ── Venue LP operations ─────────────────────────────────────────
    add(rule(
        &format!(r"provide\s+{AMT}\s+{TOK}\s+and\s+{AMT}\s+{TOK}\s+liquidity\s+on\s+orca"),
        known(Protocol::Orca),
        Action::AddLiquidity,
        |c| {
            obj(json!({
                "amountA": num(&c[1]), "tokenA": &c[2],
                "amountB": num(&c[3]), "tokenB": &c[4],
            }))
        },
    ));
    add(rule(
        &format!(r"provide\s+{AMT}\s+{TOK}\s+liquidity\s+on\s+orca"),
        known(Protocol::Orca),
        Action::AddLiquidity,
        |c| obj(json!({ "amount": num(&c[1]), "token": &c[2] })),
    ));
    add(rule(
        &format!(r"open\s+orca\s+position\s+{TOK}/{TOK}\s+from\s+(-?\d+)\s+to\s+(-?\d+)"),
        known(Protocol::Orca),
        Action::OpenPosition,
        |c| {
            obj(json!({
                "tokenA": &c[1], "tokenB": &c[2],
                "tickLower": c[3].parse::<i64>().unwrap_or(0),
                "tickUpper": c[4].parse::<i64>().unwrap_or(0),
            }))
        },
    ));
    add(rule(
        &format!(r"close\s+orca\s+position\s+{ADDR}"),
        known(Protocol::Orca),
        Action::ClosePosition,
        |c| obj(json!({ "position": &c[1] })),
    ));
    add(rule(
        &format!(
            r"add\s+liquidity\s+{AMT}\s+{TOK}\s+and\s+{AMT}\s+{TOK}\s+to\s+meteora(?:\s+pool\s+{ADDR})?"
        ),
        known(Protocol::Meteora),
        Action::AddLiquidity,
        |c| {
            let mut params = obj(json!({
                "amountA": num(&c[1]), "tokenA": &c[2],
                "amountB": num(&c[3]), "tokenB": &c[4],
            }));
            if let Some(pool) = c.get(5) {
                params.insert("pool".into(), json!(pool.as_str()));
            }
            params
        },
    ));
    add(rule(
        &format!(r"remove\s+{AMT}%\s+liquidity\s+from\s+meteora\s+position\s+{ADDR}"),
        known(Protocol::Meteora),
        Action::RemoveLiquidity,
        |c| obj(json!({ "percent": num(&c[1]), "position": &c[2] })),
    ));
    // Bare pool address: the hosting venue must be looked up.
    add(rule(
        &format!(r"add\s+liquidity\s+to\s+(?:pool\s+)?{ADDR}"),
        ProtocolTag::ResolvePair,
        Action::AddLiquidity,
        |c| obj(json!({ "pair": &c[1] })),
    ));
    add(rule(
        &format!(r"remove\s+liquidity\s+from\s+(?:pool\s+)?{ADDR}"),
        ProtocolTag::ResolvePair,
        Action::RemoveLiquidity,
        |c| obj(json!({ "pair": &c[1] })),
    ));

    // ── Account management ──────────────────────────────────────────
    // Token-account creation before the bare "create account".
    add(rule(
        &format!(r"create\s+(?:a\s+)?(?:token\s+account|ata)\s+for\s+{TOK}"),
        known(Protocol::SplToken),
        Action::CreateTokenAccount,
        |c| obj(json!({ "token": &c[1] })),
    ));
    add(rule(
        r"create\s+(?:an?\s+)?account",
        known(Protocol::System),
        Action::CreateAccount,
        |_| Params::new(),
    ));
    add(rule(
        &format!(r"close\s+(?:token\s+)?account\s+(?:for\s+)?{TOK}"),
        known(Protocol::SplToken),
        Action::Close,
        |c| obj(json!({ "token": &c[1] })),
    ));

    bank
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::intent::ParamsExt;
    use crate::parser::parse;

    fn parsed(prompt: &str) -> crate::parser::RawIntent {
        parse(prompt).unwrap_or_else(|e| panic!("'{prompt}' should parse: {e}"))
    }

    #[test]
    fn memo_forms() {
        let raw = parsed("memo \"gm\"");
        assert_eq!(raw.tag, known(Protocol::Memo));
        assert_eq!(raw.action, Action::Memo);
        assert_eq!(raw.params.str_param("text"), Some("gm"));

        let raw = parsed("write onchain memo: hello world");
        assert_eq!(raw.params.str_param("text"), Some("hello world"));
    }

    #[test]
    fn sol_transfer() {
        let raw = parsed("send 0.1 SOL to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(raw.tag, known(Protocol::System));
        assert_eq!(raw.action, Action::Transfer);
        assert_eq!(raw.params.f64_param("amount"), Some(0.1));
        assert_eq!(
            raw.params.str_param("to"),
            Some("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")
        );
    }

    #[test]
    fn token_transfer_resolves_symbol() {
        let raw = parsed("send 5 USDC to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(raw.tag, known(Protocol::SplToken));
        assert_eq!(
            raw.params.str_param("token"),
            Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
        );
    }

    #[test]
    fn full_address_transfer_precedes_symbol_form() {
        let raw = parsed(
            "send 5 DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263 \
             to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        );
        assert_eq!(raw.tag, known(Protocol::SplToken));
        assert_eq!(
            raw.params.str_param("token"),
            Some("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263")
        );
    }

    #[test]
    fn token_2022_transfer_precedes_plain_transfer() {
        let raw = parsed(
            "send 2 PYUSD to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU using token-2022",
        );
        assert_eq!(raw.tag, known(Protocol::Token2022));
    }

    #[test]
    fn aggregator_swap_with_slippage() {
        let raw = parsed("swap 1 SOL for USDC with 0.5% slippage");
        assert_eq!(raw.tag, known(Protocol::Jupiter));
        assert_eq!(raw.action, Action::Swap);
        assert_eq!(raw.confidence, crate::model::intent::CONFIDENCE_DIRECT);
        assert_eq!(raw.params.f64_param("amount"), Some(1.0));
        assert_eq!(raw.params.f64_param("slippage"), Some(0.5));
        assert_eq!(
            raw.params.str_param("from"),
            Some(crate::model::mint::NATIVE_MINT)
        );
    }

    #[test]
    fn venue_qualified_swap_precedes_aggregator() {
        let raw = parsed("swap 1 SOL for USDC on raydium");
        assert_eq!(raw.tag, known(Protocol::Raydium));

        let raw = parsed("trade 2 USDC into BONK on orca");
        assert_eq!(raw.tag, known(Protocol::Orca));

        let raw = parsed("exchange 3 SOL for JUP on meteora");
        assert_eq!(raw.tag, known(Protocol::Meteora));
    }

    #[test]
    fn swap_all_uses_amount_sentinel() {
        let raw = parsed("convert all BONK to SOL");
        assert_eq!(raw.params.f64_param("amount"), Some(AMOUNT_ALL));
    }

    #[test]
    fn lending_venue_forms() {
        let raw = parsed("supply 100 USDC to Kamino");
        assert_eq!(raw.tag, known(Protocol::Kamino));
        assert_eq!(raw.action, Action::Supply);
        assert_eq!(raw.params.f64_param("amount"), Some(100.0));
        assert_eq!(
            raw.params.str_param("token"),
            Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
        );

        let raw = parsed("borrow 50 USDT from marginfi");
        assert_eq!(raw.tag, known(Protocol::Marginfi));
        assert_eq!(raw.action, Action::Borrow);

        let raw = parsed("pay back 25 USDC on solend");
        assert_eq!(raw.tag, known(Protocol::Solend));
        assert_eq!(raw.action, Action::Repay);

        let raw = parsed("pull out 10 USDC from kamino");
        assert_eq!(raw.action, Action::Withdraw);
    }

    #[test]
    fn generic_lending_defaults_to_kamino() {
        let raw = parsed("lend 200 USDC");
        assert_eq!(raw.tag, known(Protocol::Kamino));
        assert_eq!(raw.action, Action::Supply);
    }

    #[test]
    fn loan_phrases_are_borrows() {
        let raw = parsed("take out a loan of 100 USDC from kamino");
        assert_eq!(raw.tag, known(Protocol::Kamino));
        assert_eq!(raw.action, Action::Borrow);

        let raw = parsed("repay my solend loan");
        assert_eq!(raw.tag, known(Protocol::Solend));
        assert_eq!(raw.action, Action::Repay);
        assert!(raw.params.f64_param("amount").is_none());
    }

    #[test]
    fn marinade_unstake_keeps_raw_symbol() {
        let raw = parsed("unstake 5 mSOL from Marinade");
        assert_eq!(raw.tag, known(Protocol::Marinade));
        assert_eq!(raw.action, Action::Unstake);
        assert_eq!(raw.params.f64_param("amount"), Some(5.0));
        assert_eq!(raw.params.str_param("token"), Some("MSOL"));
    }

    #[test]
    fn marinade_stake_precedes_native_stake() {
        let raw = parsed("stake 5 SOL with marinade");
        assert_eq!(raw.tag, known(Protocol::Marinade));
        assert_eq!(raw.action, Action::Stake);

        let raw = parsed("stake 5 SOL");
        assert_eq!(raw.tag, known(Protocol::Stake));
    }

    #[test]
    fn unstake_never_reads_as_stake() {
        let raw = parsed("unstake 5 mSOL");
        assert_eq!(raw.action, Action::Unstake);
    }

    #[test]
    fn buy_by_address_needs_venue_resolution() {
        let raw = parsed("ape 2 SOL into DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263");
        assert_eq!(raw.tag, ProtocolTag::ResolveToken);
        assert_eq!(raw.action, Action::Buy);
        assert_eq!(raw.params.f64_param("amount"), Some(2.0));
    }

    #[test]
    fn buy_by_symbol_routes_to_aggregator() {
        let raw = parsed("buy 1 SOL of BONK");
        assert_eq!(raw.tag, known(Protocol::Jupiter));
        assert_eq!(raw.action, Action::Buy);
    }

    #[test]
    fn sell_all_and_dump() {
        let raw = parsed("sell all WIF");
        assert_eq!(raw.params.f64_param("amount"), Some(AMOUNT_ALL));

        let raw = parsed("dump DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263");
        assert_eq!(raw.tag, ProtocolTag::ResolveToken);
        assert_eq!(raw.params.f64_param("amount"), Some(AMOUNT_ALL));
    }

    #[test]
    fn pair_forms_resolve_the_pool() {
        let raw = parsed("buy 1 SOL of pair 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(raw.tag, ProtocolTag::ResolvePair);
        assert_eq!(raw.action, Action::Buy);
    }

    #[test]
    fn pumpfun_forms() {
        let raw = parsed("buy 0.5 SOL of WIF on pump.fun");
        assert_eq!(raw.tag, known(Protocol::Pumpfun));
        assert_eq!(raw.action, Action::Buy);

        let raw = parsed("create token on pump.fun called \"Dog Wif Hat\" symbol WIF2");
        assert_eq!(raw.action, Action::CreateToken);
        assert_eq!(raw.params.str_param("name"), Some("Dog Wif Hat"));
        assert_eq!(raw.params.str_param("symbol"), Some("WIF2"));
    }

    #[test]
    fn jito_tip_forms() {
        let raw = parsed("tip 0.1 SOL to jito");
        assert_eq!(raw.tag, known(Protocol::Jito));
        assert_eq!(raw.params.f64_param("amount"), Some(0.1));

        let raw = parsed("send jito tip");
        assert_eq!(raw.params.f64_param("amount"), Some(0.001));
    }

    #[test]
    fn orca_lp_forms() {
        let raw = parsed("provide 10 USDC liquidity on orca");
        assert_eq!(raw.tag, known(Protocol::Orca));
        assert_eq!(raw.action, Action::AddLiquidity);

        let raw = parsed("open orca position SOL/USDC from -100 to 200");
        assert_eq!(raw.action, Action::OpenPosition);
        assert_eq!(raw.params.f64_param("tickLower"), Some(-100.0));
    }

    #[test]
    fn meteora_lp_forms() {
        let raw = parsed("add liquidity 1 SOL and 150 USDC to meteora");
        assert_eq!(raw.tag, known(Protocol::Meteora));
        assert_eq!(raw.action, Action::AddLiquidity);
        assert_eq!(raw.params.f64_param("amountB"), Some(150.0));

        let raw = parsed(
            "remove 50% liquidity from meteora position \
             7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        );
        assert_eq!(raw.action, Action::RemoveLiquidity);
        assert_eq!(raw.params.f64_param("percent"), Some(50.0));
    }

    #[test]
    fn bare_pool_liquidity_resolves_the_pair() {
        let raw = parsed("add liquidity to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(raw.tag, ProtocolTag::ResolvePair);
        assert_eq!(raw.action, Action::AddLiquidity);
    }

    #[test]
    fn ata_creation_precedes_generic_account() {
        let raw = parsed("create token account for USDC");
        assert_eq!(raw.tag, known(Protocol::SplToken));
        assert_eq!(raw.action, Action::CreateTokenAccount);

        let raw = parsed("create ata for BONK");
        assert_eq!(raw.action, Action::CreateTokenAccount);

        let raw = parsed("create account");
        assert_eq!(raw.tag, known(Protocol::System));
        assert_eq!(raw.action, Action::CreateAccount);
    }

    #[test]
    fn close_keeps_raw_symbol() {
        let raw = parsed("close token account for USDC");
        assert_eq!(raw.action, Action::Close);
        // Not mint-resolved: downstream presentation needs the symbol.
        assert_eq!(raw.params.str_param("token"), Some("USDC"));
    }

    #[test]
    fn native_stake_with_validator() {
        let raw = parsed(
            "stake 2 SOL with validator 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        );
        assert_eq!(raw.tag, known(Protocol::Stake));
        assert_eq!(
            raw.params.str_param("validator"),
            Some("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU")
        );
    }

    #[test]
    fn deactivate_stake_account() {
        let raw = parsed("deactivate stake 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(raw.action, Action::Deactivate);
    }

    #[test]
    fn direct_hits_carry_direct_confidence() {
        for prompt in [
            "swap 1 SOL for USDC",
            "memo \"gm\"",
            "stake 1 SOL",
            "supply 10 USDC to kamino",
            "tip 0.01 SOL to jito",
        ] {
            assert_eq!(
                parsed(prompt).confidence,
                crate::model::intent::CONFIDENCE_DIRECT,
                "{prompt}"
            );
        }
    }

    // ── Reordering stability ────────────────────────────────────────
    //
    // Only the documented orderings may matter. Swapping an adjacent
    // pair of rules that no single prompt can reach both of must not
    // change any documented parse outcome.

    /// Every documented prompt shape, one per family, including the
    /// ordering-sensitive ones.
    const DOCUMENTED_PROMPTS: &[&str] = &[
        "memo \"gm\"",
        "write onchain memo: hello world",
        "tip 0.1 SOL to jito",
        "send jito tip",
        "send 0.1 SOL to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        "send 5 USDC to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        "send 5 DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263 \
         to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        "send 2 PYUSD to 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU using token-2022",
        "swap 1 SOL for USDC with 0.5% slippage",
        "swap 1 SOL for USDC on raydium",
        "trade 2 USDC into BONK on orca",
        "convert all BONK to SOL",
        "supply 100 USDC to Kamino",
        "borrow 50 USDT from marginfi",
        "pay back 25 USDC on solend",
        "pull out 10 USDC from kamino",
        "lend 200 USDC",
        "repay my solend loan",
        "unstake 5 mSOL from Marinade",
        "stake 5 SOL with marinade",
        "stake 5 SOL",
        "deactivate stake 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        "buy 1 SOL of BONK",
        "ape 2 SOL into DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
        "sell all WIF",
        "buy 1 SOL of pair 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
        "buy 0.5 SOL of WIF on pump.fun",
        "provide 10 USDC liquidity on orca",
        "add liquidity 1 SOL and 150 USDC to meteora",
        "create token account for USDC",
        "create account",
        "close token account for USDC",
    ];

    fn outcome(bank: &[Pattern], prompt: &str) -> Option<(ProtocolTag, Action, Params)> {
        crate::parser::parse_with_bank(prompt, bank)
            .ok()
            .map(|raw| (raw.tag, raw.action, raw.params))
    }

    fn outcomes(bank: &[Pattern]) -> Vec<Option<(ProtocolTag, Action, Params)>> {
        DOCUMENTED_PROMPTS
            .iter()
            .map(|prompt| outcome(bank, prompt))
            .collect()
    }

    /// Index of the rule that wins for a probe prompt, i.e. the first
    /// match in bank order.
    fn winning_index(bank: &[Pattern], prompt: &str) -> usize {
        bank.iter()
            .position(|p| p.captures(prompt).is_some())
            .unwrap_or_else(|| panic!("no rule matches probe '{prompt}'"))
    }

    #[test]
    fn swapping_adjacent_non_contending_rules_changes_nothing() {
        let baseline = outcomes(&build_bank());

        // Held-out adjacent pairs: the probes hit neighboring rules,
        // and neither probe's prompt shape matches the other's rule.
        let held_out = [
            ("supply 100 USDC to kamino", "borrow 50 USDC from kamino"),
            ("tip 0.1 SOL to jito", "tip jito 0.1"),
            (
                "deactivate stake 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
                "withdraw 1 SOL from stake 7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
            ),
        ];

        for (left, right) in held_out {
            let mut bank = build_bank();
            let i = winning_index(&bank, left);
            let j = winning_index(&bank, right);
            assert_eq!(j, i + 1, "'{left}' / '{right}' must probe adjacent rules");
            // Cross-check the pair really is non-contending.
            assert!(bank[i].captures(right).is_none());
            assert!(bank[j].captures(left).is_none());

            bank.swap(i, j);
            assert_eq!(
                outcomes(&bank),
                baseline,
                "swapping '{left}' / '{right}' rules changed a documented outcome"
            );
        }
    }
}
