//! Protocol registry and the handler contract.
//!
//! Each handler declares its name, the canonical action keys it
//! answers to, a structural parameter validator, and a builder that
//! returns on-chain instructions. The registry maps both names and
//! action keys to handlers; the builder looks up by action key.

pub mod jito;
pub mod jupiter;
pub mod lending;
pub mod marinade;
pub mod memo;
pub mod pumpfun;
pub mod spl_token;
pub mod stake;
pub mod system;
pub mod venues;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::chain::programs;
use crate::config::Config;
use crate::model::intent::{Action, BuildIntent, Params, Protocol};

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Missing required parameter `{0}`")]
    MissingParam(&'static str),

    #[error("Invalid {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("{venue} {operation} is not implemented; no instructions are emitted for it")]
    NotImplemented {
        venue: &'static str,
        operation: &'static str,
    },

    #[error("{0}")]
    Unsupported(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ── Handler contract ────────────────────────────────────────────────

#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Canonical action keys this handler answers to.
    fn supported_actions(&self) -> &'static [&'static str];

    /// Structural parameter check. Failure surfaces to the caller as
    /// an "invalid parameters" build error.
    fn validate(&self, intent_key: &str, params: &Params) -> bool;

    /// Assemble the on-chain instructions for this intent.
    async fn build(&self, intent: &BuildIntent) -> Result<Vec<Instruction>, HandlerError>;

    /// Informational: wallets the caller should expect to appear.
    fn required_accounts(&self, _params: &Params) -> Vec<String> {
        Vec::new()
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

pub(crate) fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey, HandlerError> {
    value.parse().map_err(|_| HandlerError::InvalidAddress {
        field,
        value: value.to_string(),
    })
}

/// Convert a human amount to base units with the given decimals.
pub(crate) fn to_base_units(amount: f64, decimals: u8) -> Result<u64, HandlerError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(HandlerError::InvalidAmount(amount));
    }
    Ok((amount * 10f64.powi(decimals as i32)).round() as u64)
}

pub(crate) fn lamports(amount: f64) -> Result<u64, HandlerError> {
    to_base_units(amount, 9)
}

/// Associated token account derivation: a PDA of the ATA program with
/// seeds `[owner, token_program, mint]`.
pub(crate) fn associated_token_address(
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Pubkey {
    let seeds = &[owner.as_ref(), token_program.as_ref(), mint.as_ref()];
    let (ata, _bump) =
        Pubkey::find_program_address(seeds, &programs::pubkey(programs::ATA_PROGRAM_ID));
    ata
}

// ── Action-key mapping ──────────────────────────────────────────────

/// Translate the parser's `(protocol, action)` pair into the canonical
/// intent key a handler recognizes. Unmapped pairs default to
/// `{protocol}-{action}`.
pub fn intent_key(protocol: Protocol, action: Action) -> String {
    match (protocol, action) {
        (Protocol::Jupiter, Action::Swap | Action::Buy | Action::Sell) => "swap".into(),
        (Protocol::Raydium, Action::Swap) => "raydium-swap".into(),
        (Protocol::Orca, Action::Swap) => "orca-swap".into(),
        (Protocol::Meteora, Action::Swap) => "meteora-swap".into(),
        (Protocol::System, Action::Transfer) => "transfer".into(),
        (Protocol::System, Action::CreateAccount) => "create-account".into(),
        (Protocol::SplToken, Action::Transfer) => "spl-transfer".into(),
        (Protocol::SplToken, Action::CreateTokenAccount) => "create-token-account".into(),
        (Protocol::SplToken, Action::Close) => "close-token-account".into(),
        (Protocol::Token2022, Action::Transfer) => "token-2022-transfer".into(),
        (Protocol::Memo, Action::Memo) => "memo".into(),
        (Protocol::Jito, Action::Tip) => "tip".into(),
        (Protocol::Stake, Action::Stake) => "native-stake".into(),
        (Protocol::Stake, Action::Delegate) => "delegate-stake".into(),
        (Protocol::Stake, Action::Deactivate) => "deactivate-stake".into(),
        (Protocol::Stake, Action::Withdraw) => "withdraw-stake".into(),
        (Protocol::Marinade, Action::Stake) => "marinade-stake".into(),
        (Protocol::Marinade, Action::Unstake) => "marinade-unstake".into(),
        (protocol, action) => format!("{protocol}-{action}"),
    }
}

/// Intent keys whose builds are funnelled through the aggregator's
/// swap path: individual venue handlers only emit skeletons, while
/// the aggregator returns a fully baked transaction.
pub fn is_swap_funnel_key(intent_key: &str) -> bool {
    matches!(
        intent_key,
        "swap" | "raydium-swap" | "orca-swap" | "meteora-swap" | "pumpfun-buy" | "pumpfun-sell"
    )
}

// ── Registry ────────────────────────────────────────────────────────

pub struct ProtocolRegistry {
    handlers: HashMap<String, Arc<dyn ProtocolHandler>>,
    /// Registration order, for listings.
    names: Vec<&'static str>,
    jupiter: Arc<jupiter::JupiterHandler>,
}

impl ProtocolRegistry {
    /// Construct every handler once and register each under its name
    /// and all of its action keys. Later registrations overwrite
    /// earlier ones, so the order below is part of the contract.
    pub fn new(config: &Config) -> Self {
        let jupiter = Arc::new(jupiter::JupiterHandler::new(config));

        let ordered: Vec<Arc<dyn ProtocolHandler>> = vec![
            Arc::new(system::SystemHandler),
            Arc::new(memo::MemoHandler),
            Arc::new(spl_token::SplTokenHandler::classic()),
            Arc::new(spl_token::SplTokenHandler::token_2022()),
            Arc::new(jito::JitoHandler),
            Arc::new(stake::StakeHandler),
            Arc::new(marinade::MarinadeHandler),
            jupiter.clone(),
            Arc::new(venues::RaydiumHandler),
            Arc::new(venues::OrcaHandler),
            Arc::new(venues::MeteoraHandler),
            Arc::new(pumpfun::PumpfunHandler),
            Arc::new(lending::LendingHandler::kamino()),
            Arc::new(lending::LendingHandler::marginfi()),
            Arc::new(lending::LendingHandler::solend()),
        ];

        let mut handlers = HashMap::new();
        let mut names = Vec::new();
        for handler in ordered {
            names.push(handler.name());
            handlers.insert(handler.name().to_string(), handler.clone());
            for action in handler.supported_actions() {
                handlers.insert((*action).to_string(), handler.clone());
            }
        }

        ProtocolRegistry {
            handlers,
            names,
            jupiter,
        }
    }

    /// Look up by handler name or action key.
    pub fn get(&self, key: &str) -> Option<Arc<dyn ProtocolHandler>> {
        self.handlers.get(key).cloned()
    }

    /// The aggregator, typed: its swap entrypoint is not part of the
    /// generic handler contract.
    pub fn jupiter(&self) -> Arc<jupiter::JupiterHandler> {
        self.jupiter.clone()
    }

    /// Unique handlers in registration order.
    pub fn list(&self) -> Vec<Arc<dyn ProtocolHandler>> {
        self.names
            .iter()
            .filter_map(|name| self.handlers.get(*name).cloned())
            .collect()
    }
}
