//! Venue resolution via an external market-data service.
//!
//! Given a mint or pool address, find the venue hosting the deepest
//! liquidity. Lookups are TTL-cached, negatives included, so a nonexistent
//! token cannot hammer the upstream service. A miss is never an error
//! at this layer: callers substitute the aggregator, which routes
//! across venues anyway.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const BASE_URL: &str = "https://api.dexscreener.com/latest/dex";
const TARGET_CHAIN: &str = "solana";
const CACHE_TTL: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── Output types ────────────────────────────────────────────────────

/// Deepest-liquidity venue for a token, plus auxiliary metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    /// Primary venue, alias-translated (e.g. `whirlpool` → `orca`).
    pub protocol: String,
    /// Pool address of the deepest pair.
    pub pool: String,
    /// Every distinct venue listing this token.
    pub all_venues: Vec<String>,
    pub price_usd: Option<f64>,
    pub liquidity_usd: f64,
}

/// Which venue hosts a pool, and what trades in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairInfo {
    pub protocol: String,
    pub base_mint: String,
    pub quote_mint: String,
    pub pool: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub price_usd: Option<f64>,
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenLookupResponse {
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Deserialize)]
struct PairLookupResponse {
    pair: Option<DexPair>,
    pairs: Option<Vec<DexPair>>,
}

#[derive(Debug, Deserialize)]
struct DexPair {
    #[serde(rename = "chainId")]
    chain_id: String,
    #[serde(rename = "dexId")]
    dex_id: String,
    #[serde(rename = "pairAddress")]
    pair_address: String,
    #[serde(rename = "baseToken")]
    base_token: DexToken,
    #[serde(rename = "quoteToken")]
    quote_token: DexToken,
    /// The service reports price as a decimal string.
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    liquidity: Option<DexLiquidity>,
}

#[derive(Debug, Deserialize)]
struct DexToken {
    address: String,
    symbol: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DexLiquidity {
    usd: Option<f64>,
}

impl DexPair {
    fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    fn price(&self) -> Option<f64> {
        self.price_usd.as_deref().and_then(|p| p.parse().ok())
    }
}

/// Translate service venue identifiers into handler names.
fn venue_alias(dex_id: &str) -> String {
    match dex_id {
        "raydium-clmm" | "raydium-cpmm" | "raydium-amm" | "raydium-v4" => "raydium".into(),
        "whirlpool" => "orca".into(),
        "meteora-dlmm" | "meteora-damm" => "meteora".into(),
        "pump-fun" | "pumpfun-amm" | "pumpswap" => "pumpfun".into(),
        other => other.to_string(),
    }
}

// ── Cache ───────────────────────────────────────────────────────────

struct CacheEntry<T> {
    value: T,
    expires: Instant,
}

impl<T> CacheEntry<T> {
    fn fresh(value: T) -> Self {
        CacheEntry {
            value,
            expires: Instant::now() + CACHE_TTL,
        }
    }

    fn live(&self) -> bool {
        Instant::now() < self.expires
    }
}

// ── Resolver ────────────────────────────────────────────────────────

pub struct VenueResolver {
    base_url: String,
    client: reqwest::Client,
    tokens: Mutex<HashMap<String, CacheEntry<Option<TokenInfo>>>>,
    pairs: Mutex<HashMap<String, CacheEntry<Option<PairInfo>>>>,
}

impl Default for VenueResolver {
    fn default() -> Self {
        Self::new(BASE_URL)
    }
}

impl VenueResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        VenueResolver {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            tokens: Mutex::new(HashMap::new()),
            pairs: Mutex::new(HashMap::new()),
        }
    }

    /// Deepest-liquidity venue for a mint. `None` means the service
    /// knows nothing about it (or was unreachable); that answer is
    /// cached too.
    pub async fn resolve_token(&self, mint: &str) -> Option<TokenInfo> {
        if let Some(cached) = cache_get(&self.tokens, mint) {
            return cached;
        }

        let info = self.fetch_token(mint).await;
        cache_put(&self.tokens, mint, info.clone());
        info
    }

    /// Which venue hosts a pool address, with base/quote metadata.
    pub async fn resolve_pair(&self, pair: &str) -> Option<PairInfo> {
        if let Some(cached) = cache_get(&self.pairs, pair) {
            return cached;
        }

        let info = self.fetch_pair(pair).await;
        cache_put(&self.pairs, pair, info.clone());
        info
    }

    async fn fetch_token(&self, mint: &str) -> Option<TokenInfo> {
        let url = format!("{}/tokens/{mint}", self.base_url);
        let response: TokenLookupResponse = match self.get_json(&url).await {
            Some(r) => r,
            None => return None,
        };

        let mut pairs: Vec<DexPair> = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.chain_id == TARGET_CHAIN)
            .collect();
        if pairs.is_empty() {
            debug!("no {TARGET_CHAIN} pairs for mint {mint}");
            return None;
        }

        // Deepest liquidity first; its venue becomes the primary.
        pairs.sort_by(|a, b| {
            b.liquidity_usd()
                .partial_cmp(&a.liquidity_usd())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut all_venues: Vec<String> = Vec::new();
        for pair in &pairs {
            let venue = venue_alias(&pair.dex_id);
            if !all_venues.contains(&venue) {
                all_venues.push(venue);
            }
        }

        let top = &pairs[0];
        // The queried mint may sit on either side of the pair.
        let token = if top.base_token.address == mint {
            &top.base_token
        } else if top.quote_token.address == mint {
            &top.quote_token
        } else {
            &top.base_token
        };

        Some(TokenInfo {
            mint: mint.to_string(),
            symbol: token.symbol.clone(),
            name: token.name.clone().unwrap_or_else(|| token.symbol.clone()),
            protocol: venue_alias(&top.dex_id),
            pool: top.pair_address.clone(),
            all_venues,
            price_usd: top.price(),
            liquidity_usd: top.liquidity_usd(),
        })
    }

    async fn fetch_pair(&self, pair: &str) -> Option<PairInfo> {
        let url = format!("{}/pairs/{TARGET_CHAIN}/{pair}", self.base_url);
        let response: PairLookupResponse = match self.get_json(&url).await {
            Some(r) => r,
            None => return None,
        };

        let found = response
            .pair
            .or_else(|| response.pairs.and_then(|p| p.into_iter().next()))?;
        if found.chain_id != TARGET_CHAIN {
            return None;
        }

        Some(PairInfo {
            protocol: venue_alias(&found.dex_id),
            base_mint: found.base_token.address.clone(),
            quote_mint: found.quote_token.address.clone(),
            pool: found.pair_address.clone(),
            base_symbol: found.base_token.symbol.clone(),
            quote_symbol: found.quote_token.symbol.clone(),
            price_usd: found.price(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Option<T> {
        let result = self
            .client
            .get(url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(response) => match response.json::<T>().await {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("market data at {url}: unreadable reply: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("market data at {url}: {e}");
                None
            }
        }
    }

    #[cfg(test)]
    fn prime_token(&self, mint: &str, info: Option<TokenInfo>) {
        cache_put(&self.tokens, mint, info);
    }
}

fn cache_get<T: Clone>(
    cache: &Mutex<HashMap<String, CacheEntry<T>>>,
    key: &str,
) -> Option<T> {
    let mut map = cache.lock().ok()?;
    match map.get(key) {
        Some(entry) if entry.live() => Some(entry.value.clone()),
        Some(_) => {
            // Lazy eviction of the expired entry.
            map.remove(key);
            None
        }
        None => None,
    }
}

fn cache_put<T>(cache: &Mutex<HashMap<String, CacheEntry<T>>>, key: &str, value: T) {
    if let Ok(mut map) = cache.lock() {
        map.insert(key.to_string(), CacheEntry::fresh(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_info(venue: &str) -> TokenInfo {
        TokenInfo {
            mint: "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263".into(),
            symbol: "BONK".into(),
            name: "Bonk".into(),
            protocol: venue.into(),
            pool: "pool".into(),
            all_venues: vec![venue.into()],
            price_usd: Some(0.00002),
            liquidity_usd: 1_000_000.0,
        }
    }

    #[tokio::test]
    async fn primed_cache_short_circuits_the_network() {
        // Unroutable base URL: a cache miss would error out to None.
        let resolver = VenueResolver::new("http://127.0.0.1:1/latest/dex");
        resolver.prime_token("mint-a", Some(token_info("raydium")));

        let hit = resolver.resolve_token("mint-a").await.unwrap();
        assert_eq!(hit.protocol, "raydium");
    }

    #[tokio::test]
    async fn negative_results_are_cached() {
        let resolver = VenueResolver::new("http://127.0.0.1:1/latest/dex");
        resolver.prime_token("unknown-mint", None);
        assert!(resolver.resolve_token("unknown-mint").await.is_none());
    }

    #[test]
    fn venue_aliases_translate() {
        assert_eq!(venue_alias("raydium-clmm"), "raydium");
        assert_eq!(venue_alias("whirlpool"), "orca");
        assert_eq!(venue_alias("meteora-dlmm"), "meteora");
        assert_eq!(venue_alias("pump-fun"), "pumpfun");
        assert_eq!(venue_alias("lifinity"), "lifinity");
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache: Mutex<HashMap<String, CacheEntry<u32>>> = Mutex::new(HashMap::new());
        cache.lock().unwrap().insert(
            "stale".into(),
            CacheEntry {
                value: 7,
                expires: Instant::now() - Duration::from_secs(1),
            },
        );
        assert_eq!(cache_get(&cache, "stale"), None);
        assert!(cache.lock().unwrap().is_empty());
    }

    /// Serve one canned token-lookup reply per connection, counting
    /// every request that actually reaches the wire.
    async fn spawn_counting_endpoint(
        body: String,
    ) -> (std::net::SocketAddr, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
        use std::sync::Arc;
        use std::sync::atomic::AtomicUsize;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let served_hits = hits.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                served_hits.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                let body = body.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\n\
                         content-type: application/json\r\n\
                         content-length: {}\r\n\
                         connection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (addr, hits)
    }

    #[tokio::test]
    async fn two_immediate_lookups_trigger_one_outbound_call() {
        let mint = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
        let body = format!(
            r#"{{"pairs":[{{
                "chainId": "solana",
                "dexId": "raydium-clmm",
                "pairAddress": "PoolAddr111",
                "baseToken": {{"address": "{mint}", "symbol": "BONK", "name": "Bonk"}},
                "quoteToken": {{"address": "So11111111111111111111111111111111111111112",
                                "symbol": "SOL", "name": "Wrapped SOL"}},
                "priceUsd": "0.00002",
                "liquidity": {{"usd": 1000000.0}}
            }}]}}"#
        );
        let (addr, hits) = spawn_counting_endpoint(body).await;

        let resolver = VenueResolver::new(format!("http://{addr}/latest/dex"));
        let first = resolver.resolve_token(mint).await.expect("first lookup");
        let second = resolver.resolve_token(mint).await.expect("second lookup");

        assert_eq!(first.protocol, "raydium");
        assert_eq!(second.pool, first.pool);
        assert_eq!(second.symbol, first.symbol);
        // The second lookup lands inside the TTL and must come from
        // the cache, not the wire.
        assert_eq!(
            hits.load(std::sync::atomic::Ordering::SeqCst),
            1,
            "a cached mint re-queried the market-data service"
        );
    }

    #[test]
    fn wire_format_parses() {
        let raw = r#"{
            "pairs": [{
                "chainId": "solana",
                "dexId": "raydium-clmm",
                "pairAddress": "PoolAddr111",
                "baseToken": {"address": "MintA", "symbol": "BONK", "name": "Bonk"},
                "quoteToken": {"address": "MintB", "symbol": "SOL", "name": "Wrapped SOL"},
                "priceUsd": "0.000021",
                "liquidity": {"usd": 123456.0}
            }]
        }"#;
        let parsed: TokenLookupResponse = serde_json::from_str(raw).unwrap();
        let pair = &parsed.pairs.unwrap()[0];
        assert_eq!(pair.liquidity_usd(), 123456.0);
        assert_eq!(pair.price(), Some(0.000021));
        assert_eq!(venue_alias(&pair.dex_id), "raydium");
    }
}
