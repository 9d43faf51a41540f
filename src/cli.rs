use clap::{Parser, Subcommand};

/// Natural-language → Solana transaction engine: parse intents,
/// dispatch to protocol handlers, and emit signed-ready transactions.
#[derive(Parser)]
#[command(name = "txflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port (overrides the PORT env var)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Build transactions from a natural-language prompt
    Build {
        /// The prompt, e.g. "swap 1 SOL for USDC"
        prompt: String,

        /// Fee payer (base58)
        #[arg(long)]
        payer: String,

        /// Network: mainnet or devnet
        #[arg(long)]
        network: Option<String>,

        /// Skip the pre-return simulation
        #[arg(long)]
        skip_simulation: bool,

        /// Priority fee in micro-lamports per compute unit
        #[arg(long)]
        priority_fee: Option<u64>,

        /// Compute-unit limit override
        #[arg(long)]
        compute_budget: Option<u32>,
    },

    /// Parse a prompt without building
    Parse {
        /// The prompt to parse
        prompt: String,
    },

    /// Estimate fees and compute for a structured intent (JSON)
    Estimate {
        /// A JSON intent, e.g. '{"intent":"transfer","params":{...},"payer":"..."}'
        intent: String,
    },

    /// Decode a base64 transaction
    Decode {
        /// Base64 transaction blob
        transaction: String,
    },

    /// Resolve a token or pair through the venue resolver
    Resolve {
        /// Mint address, symbol, or pool address
        query: String,
    },

    /// List registered protocol handlers and their actions
    Intents,
}
