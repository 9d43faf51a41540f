//! Natural-language intent recognition.
//!
//! The synchronous path lives here: pre-processing, the ordered pattern
//! bank, the generic `X for Y` fallback, and multi-intent segmentation.
//! Asynchronous self-healing (learned patterns, LLM fallback, venue
//! resolution) is layered on top in [`resolve`].

pub mod learned;
pub mod llm;
pub mod patterns;
pub mod resolve;
pub mod segmenter;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use thiserror::Error;

use crate::model::intent::{
    Action, CONFIDENCE_DIRECT, CONFIDENCE_FALLBACK, Params, ParamsExt, Protocol,
};
use crate::model::mint;

// ── Errors ──────────────────────────────────────────────────────────

/// Example forms surfaced when nothing recognizes a prompt.
const EXAMPLE_FORMS: &[&str] = &[
    "swap 1 SOL for USDC",
    "send 0.5 SOL to <address>",
    "stake 2 SOL with marinade",
    "supply 100 USDC to kamino",
    "memo \"gm\"",
    "tip 0.01 SOL to jito",
];

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(
        "Could not understand \"{prompt}\". Try one of: {}",
        EXAMPLE_FORMS.join("; ")
    )]
    Unparseable { prompt: String },

    #[error("Prompt is empty")]
    EmptyPrompt,

    #[error("Prompt exceeds {} characters", crate::model::intent::MAX_PROMPT_LEN)]
    PromptTooLong,
}

// ── Parser-internal protocol slot ───────────────────────────────────

/// Where a pattern routes an intent. Sentinels mark intents that need
/// a venue lookup before they may escape the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolTag {
    Known(Protocol),
    /// `params.token` names an asset; look up its deepest-liquidity venue.
    ResolveToken,
    /// `params.pair` names a pool; look up which venue hosts it.
    ResolvePair,
}

/// Raw pattern-bank output, before sentinel resolution.
#[derive(Debug, Clone)]
pub struct RawIntent {
    pub tag: ProtocolTag,
    pub action: Action,
    pub params: Params,
    pub confidence: f64,
}

// ── Priority modifiers ──────────────────────────────────────────────
//
// Trailing "with high priority" / "urgently" is stripped before the
// bank runs and merged back into the result as a fee hint. Competing
// bank patterns cannot express this reliably: an earlier literal
// pattern would swallow the whole line first.

/// Micro-lamports per compute unit for each spelled-out urgency level.
const PRIORITY_HIGH: u64 = 1_000_000;
const PRIORITY_MEDIUM: u64 = 100_000;
const PRIORITY_LOW: u64 = 10_000;

static PRIORITY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\s,]+(?:with\s+(?:(high|medium|low)\s+)?priority|(urgently))\s*$")
        .expect("priority suffix regex")
});

/// Split a trailing priority modifier off the prompt.
/// Returns the stripped prompt and the hinted fee, if any.
pub fn strip_priority_modifier(prompt: &str) -> (String, Option<u64>) {
    match PRIORITY_SUFFIX.captures(prompt) {
        Some(caps) => {
            let stripped = prompt[..caps.get(0).map(|m| m.start()).unwrap_or(prompt.len())]
                .trim()
                .to_string();
            let fee = match caps.get(1).map(|m| m.as_str().to_lowercase()) {
                Some(level) if level == "medium" => PRIORITY_MEDIUM,
                Some(level) if level == "low" => PRIORITY_LOW,
                // "with priority" and "urgently" both read as high.
                _ => PRIORITY_HIGH,
            };
            (stripped, Some(fee))
        }
        None => (prompt.to_string(), None),
    }
}

// ── Pre-processing ──────────────────────────────────────────────────

static EMOJI: Lazy<Regex> = Lazy::new(|| {
    // Pictographs plus variation selectors and ZWJ sequences. Plain
    // digits and punctuation stay untouched.
    Regex::new(r"[\p{Extended_Pictographic}\u{FE0E}\u{FE0F}\u{200D}]").expect("emoji regex")
});

/// Trim and strip emoji. Case is preserved: mint addresses are
/// case-sensitive base58 while the patterns themselves match
/// case-insensitively.
pub fn preprocess(prompt: &str) -> String {
    let stripped = EMOJI.replace_all(prompt, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Post-extraction normalization ───────────────────────────────────

/// Symbols at most this long are treated as candidates for mint
/// resolution in the `to` position; anything longer is a wallet.
const MAX_SYMBOL_LEN: usize = 10;

fn normalize_params(action: Action, params: &mut Params) {
    if let Some(from) = params.str_param("from").map(str::to_string) {
        params.set("from", mint::resolve(&from));
    }
    if let Some(to) = params.str_param("to").map(str::to_string) {
        // Only short symbol-looking values get resolved; longer values
        // are assumed to be wallet addresses.
        if to.len() <= MAX_SYMBOL_LEN {
            params.set("to", mint::resolve(&to));
        }
    }
    // `unstake`/`close` keep the raw symbol for downstream display.
    if !matches!(action, Action::Unstake | Action::Close) {
        if let Some(token) = params.str_param("token").map(str::to_string) {
            params.set("token", mint::resolve(&token));
        }
    }
}

// ── Synchronous parse ───────────────────────────────────────────────

/// Run one prompt segment through the pattern bank.
///
/// Direct hits carry confidence 0.9; the bare `X for Y` fallback 0.5.
/// Returns [`ParseError::Unparseable`] when nothing fits; the async
/// wrapper then consults the learned store and the LLM.
pub fn parse(prompt: &str) -> Result<RawIntent, ParseError> {
    parse_with_bank(prompt, patterns::bank())
}

/// Parse against an explicit rule list. Lets tests rebuild and
/// perturb the bank without touching the process-wide one.
pub(crate) fn parse_with_bank(
    prompt: &str,
    bank: &[patterns::Pattern],
) -> Result<RawIntent, ParseError> {
    let cleaned = preprocess(prompt);
    if cleaned.is_empty() {
        return Err(ParseError::EmptyPrompt);
    }

    let (stripped, priority_fee) = strip_priority_modifier(&cleaned);

    for pattern in bank {
        if let Some(caps) = pattern.captures(&stripped) {
            let mut params = pattern.extract(&caps);
            normalize_params(pattern.action, &mut params);
            if let Some(fee) = priority_fee {
                params.set("priorityFee", fee);
            }
            return Ok(RawIntent {
                tag: pattern.tag,
                action: pattern.action,
                params,
                confidence: CONFIDENCE_DIRECT,
            });
        }
    }

    if let Some(raw) = skeleton_fallback(&stripped, priority_fee) {
        return Ok(raw);
    }

    Err(ParseError::Unparseable {
        prompt: prompt.to_string(),
    })
}

static SKELETON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Za-z0-9]{2,44})\s+(?:for|to)\s+([A-Za-z0-9]{2,44})$")
        .expect("skeleton regex")
});

/// Last resort: a bare `X for Y` / `X to Y` reads as an aggregator
/// swap of 1 unit at low confidence.
fn skeleton_fallback(prompt: &str, priority_fee: Option<u64>) -> Option<RawIntent> {
    let caps = SKELETON.captures(prompt)?;
    let mut params = patterns::obj(json!({
        "from": mint::resolve(&caps[1]),
        "to": mint::resolve(&caps[2]),
        "amount": 1.0,
    }));
    if let Some(fee) = priority_fee {
        params.set("priorityFee", fee);
    }
    Some(RawIntent {
        tag: ProtocolTag::Known(Protocol::Jupiter),
        action: Action::Swap,
        params,
        confidence: CONFIDENCE_FALLBACK,
    })
}
