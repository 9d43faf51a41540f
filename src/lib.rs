//! txflow: natural-language and structured blockchain intents in,
//! signed-ready serialized Solana transactions out.
//!
//! The pipeline: prompt segmentation → pattern-bank parsing (with a
//! learned-pattern store and an optional LLM fallback) → venue
//! resolution → protocol-handler dispatch → fee-bounded, simulated,
//! serialized transaction.

pub mod api;
pub mod chain;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod market;
pub mod model;
pub mod parser;

pub use config::Config;
pub use engine::Engine;
