//! Environment-driven configuration.

use anyhow::{Context, Result};

use crate::model::Network;

const DEFAULT_JUPITER_URL: &str = "https://quote-api.jup.ag/v6";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub default_network: Network,
    pub mainnet_rpc: Option<String>,
    pub devnet_rpc: Option<String>,
    /// Helius is preferred over the public mainnet endpoint when a key
    /// is supplied.
    pub helius_api_key: Option<String>,
    pub jupiter_api_url: String,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max_requests: usize,
    /// `None` means any origin.
    pub allowed_origins: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 3000,
            default_network: Network::Mainnet,
            mainnet_rpc: None,
            devnet_rpc: None,
            helius_api_key: None,
            jupiter_api_url: DEFAULT_JUPITER_URL.to_string(),
            rate_limit_window_ms: 60_000,
            rate_limit_max_requests: 10,
            allowed_origins: None,
        }
    }
}

impl Config {
    /// Read configuration from the environment, with defaults for
    /// everything optional. Invalid values fail loudly at startup.
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().context("PORT must be a number")?;
        }
        if let Ok(network) = std::env::var("DEFAULT_NETWORK") {
            config.default_network = network.parse()?;
        }
        config.mainnet_rpc = std::env::var("SOLANA_MAINNET_RPC").ok().filter(|s| !s.is_empty());
        config.devnet_rpc = std::env::var("SOLANA_DEVNET_RPC").ok().filter(|s| !s.is_empty());
        config.helius_api_key = std::env::var("HELIUS_API_KEY").ok().filter(|s| !s.is_empty());
        if let Ok(url) = std::env::var("JUPITER_API_URL") {
            if !url.is_empty() {
                config.jupiter_api_url = url;
            }
        }
        if let Ok(window) = std::env::var("RATE_LIMIT_WINDOW_MS") {
            config.rate_limit_window_ms =
                window.parse().context("RATE_LIMIT_WINDOW_MS must be a number")?;
        }
        if let Ok(max) = std::env::var("RATE_LIMIT_MAX_REQUESTS") {
            config.rate_limit_max_requests =
                max.parse().context("RATE_LIMIT_MAX_REQUESTS must be a number")?;
        }
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            if !origins.is_empty() && origins != "*" {
                config.allowed_origins =
                    Some(origins.split(',').map(|o| o.trim().to_string()).collect());
            }
        }

        Ok(config)
    }

    /// RPC endpoint for a network. A configured override wins; on
    /// mainnet a Helius key upgrades the public endpoint.
    pub fn rpc_url(&self, network: Network) -> String {
        match network {
            Network::Mainnet => {
                if let Some(url) = &self.mainnet_rpc {
                    return url.clone();
                }
                if let Some(key) = &self.helius_api_key {
                    return format!("https://mainnet.helius-rpc.com/?api-key={key}");
                }
                network.default_rpc_url().to_string()
            }
            Network::Devnet => self
                .devnet_rpc
                .clone()
                .unwrap_or_else(|| network.default_rpc_url().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helius_key_upgrades_mainnet() {
        let config = Config {
            helius_api_key: Some("abc".into()),
            ..Config::default()
        };
        assert!(config.rpc_url(Network::Mainnet).contains("helius"));
        assert!(!config.rpc_url(Network::Devnet).contains("helius"));
    }

    #[test]
    fn explicit_rpc_override_wins() {
        let config = Config {
            mainnet_rpc: Some("http://localhost:8899".into()),
            helius_api_key: Some("abc".into()),
            ..Config::default()
        };
        assert_eq!(config.rpc_url(Network::Mainnet), "http://localhost:8899");
    }
}
