use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::network::Network;

// ── Confidence bands ────────────────────────────────────────────────
//
// Contractual values consumed by callers to decide whether to trust a
// parse or ask the user to rephrase.

/// Direct pattern-bank match.
pub const CONFIDENCE_DIRECT: f64 = 0.9;
/// Exact learned-pattern match.
pub const CONFIDENCE_LEARNED_EXACT: f64 = 0.8;
/// Template-level learned-pattern match (numbers/addresses substituted).
pub const CONFIDENCE_LEARNED_TEMPLATE: f64 = 0.75;
/// LLM-synthesized intent.
pub const CONFIDENCE_LLM: f64 = 0.7;
/// Generic `X for Y` fallback.
pub const CONFIDENCE_FALLBACK: f64 = 0.5;
/// Upgraded after a successful venue resolution.
pub const CONFIDENCE_RESOLVED: f64 = 0.95;

/// Amount sentinel meaning "all of the holder's balance".
/// Only sell/swap-family handlers accept it.
pub const AMOUNT_ALL: f64 = -1.0;

/// Prompts longer than this are rejected at the boundary.
pub const MAX_PROMPT_LEN: usize = 500;

// ── Protocols ───────────────────────────────────────────────────────

/// A concrete venue or program family a parsed intent targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Protocol {
    Jupiter,
    Raydium,
    Orca,
    Meteora,
    Pumpfun,
    System,
    SplToken,
    #[serde(rename = "token-2022")]
    Token2022,
    Memo,
    Jito,
    Stake,
    Marinade,
    Kamino,
    Marginfi,
    Solend,
}

impl Protocol {
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Jupiter => "jupiter",
            Protocol::Raydium => "raydium",
            Protocol::Orca => "orca",
            Protocol::Meteora => "meteora",
            Protocol::Pumpfun => "pumpfun",
            Protocol::System => "system",
            Protocol::SplToken => "spl-token",
            Protocol::Token2022 => "token-2022",
            Protocol::Memo => "memo",
            Protocol::Jito => "jito",
            Protocol::Stake => "stake",
            Protocol::Marinade => "marinade",
            Protocol::Kamino => "kamino",
            Protocol::Marginfi => "marginfi",
            Protocol::Solend => "solend",
        }
    }

    /// Match a venue identifier coming back from the market-data service
    /// (already alias-translated) to a protocol.
    pub fn from_venue(venue: &str) -> Option<Protocol> {
        match venue {
            "jupiter" => Some(Protocol::Jupiter),
            "raydium" => Some(Protocol::Raydium),
            "orca" => Some(Protocol::Orca),
            "meteora" => Some(Protocol::Meteora),
            "pumpfun" => Some(Protocol::Pumpfun),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Actions ─────────────────────────────────────────────────────────

/// Action tag attached to a parsed intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Swap,
    Buy,
    Sell,
    Transfer,
    Memo,
    Stake,
    Unstake,
    Delegate,
    Deactivate,
    Withdraw,
    Supply,
    Borrow,
    Repay,
    Tip,
    CreateAccount,
    CreateTokenAccount,
    CreateToken,
    Close,
    AddLiquidity,
    RemoveLiquidity,
    OpenPosition,
    ClosePosition,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Swap => "swap",
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Transfer => "transfer",
            Action::Memo => "memo",
            Action::Stake => "stake",
            Action::Unstake => "unstake",
            Action::Delegate => "delegate",
            Action::Deactivate => "deactivate",
            Action::Withdraw => "withdraw",
            Action::Supply => "supply",
            Action::Borrow => "borrow",
            Action::Repay => "repay",
            Action::Tip => "tip",
            Action::CreateAccount => "create-account",
            Action::CreateTokenAccount => "create-token-account",
            Action::CreateToken => "create-token",
            Action::Close => "close",
            Action::AddLiquidity => "add-liquidity",
            Action::RemoveLiquidity => "remove-liquidity",
            Action::OpenPosition => "open-position",
            Action::ClosePosition => "close-position",
        }
    }

    /// Swap-family actions accept the `-1` "all" amount sentinel.
    pub fn accepts_amount_all(&self) -> bool {
        matches!(self, Action::Swap | Action::Sell)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ── Parameter map ───────────────────────────────────────────────────

/// Extracted intent parameters. Values are heterogeneous (strings,
/// numbers, nested display info), so this stays a JSON map.
pub type Params = serde_json::Map<String, Value>;

/// Typed accessors over [`Params`]. Numeric parameters may arrive as
/// JSON numbers or numeric strings depending on the extraction path.
pub trait ParamsExt {
    fn str_param(&self, key: &str) -> Option<&str>;
    fn f64_param(&self, key: &str) -> Option<f64>;
    fn set(&mut self, key: &str, value: impl Into<Value>);
}

impl ParamsExt for Params {
    fn str_param(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    fn f64_param(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.insert(key.to_string(), value.into());
    }
}

// ── Request / response vocabulary ───────────────────────────────────

/// A user-supplied natural-language request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NaturalIntent {
    pub prompt: String,
    pub payer: String,
    #[serde(default)]
    pub network: Option<Network>,
    #[serde(default)]
    pub skip_simulation: bool,
    /// Priority fee hint in micro-lamports per compute unit.
    #[serde(default)]
    pub priority_fee: Option<u64>,
    /// Compute-unit limit override.
    #[serde(default)]
    pub compute_budget: Option<u32>,
}

/// Parser output: a fully resolved intent. The protocol here is always
/// concrete; sentinel resolution happens before one of these is handed
/// to a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub protocol: Protocol,
    pub action: Action,
    pub params: Params,
    pub confidence: f64,
}

/// Builder input: a canonical intent key plus parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildIntent {
    /// Canonical action keyword recognized by exactly one handler
    /// (e.g. `swap`, `transfer`, `marinade-stake`).
    pub intent: String,
    #[serde(default)]
    pub params: Params,
    pub payer: String,
    #[serde(default)]
    pub network: Option<Network>,
    #[serde(default)]
    pub skip_simulation: bool,
    #[serde(default)]
    pub priority_fee: Option<u64>,
    #[serde(default)]
    pub compute_budget: Option<u32>,
}

/// Dry-run report from the chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Chain-reported error value, if the dry run failed.
    pub err: Option<Value>,
    #[serde(default)]
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

/// Human-readable description of a built transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetails {
    pub protocol: String,
    pub instruction_count: usize,
    pub accounts: Vec<String>,
    /// Total estimated fee in SOL, 9 fixed decimals.
    pub estimated_fee_sol: String,
    pub compute_units: u64,
    /// Micro-lamports per compute unit.
    pub priority_fee: u64,
}

/// Builder output returned to callers. Failures are values, not
/// panics: unexpected internal errors are folded into `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub success: bool,
    /// Base64-serialized unsigned transaction, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BuildDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BuildResult {
    pub fn ok(
        transaction: String,
        simulation: Option<SimulationReport>,
        details: BuildDetails,
    ) -> Self {
        BuildResult {
            success: true,
            transaction: Some(transaction),
            simulation,
            details: Some(details),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        BuildResult {
            success: false,
            transaction: None,
            simulation: None,
            details: None,
            error: Some(error.into()),
        }
    }

    pub fn simulation_failed(report: SimulationReport) -> Self {
        BuildResult {
            success: false,
            transaction: None,
            simulation: Some(report),
            details: None,
            error: Some("Transaction simulation failed".to_string()),
        }
    }
}
