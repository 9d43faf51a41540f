//! Asynchronous parsing: the self-healing tail and venue resolution.
//!
//! Order of recovery when the pattern bank misses: learned store,
//! then LLM, then the original error. Sentinel-tagged intents get
//! their venue looked up here; no sentinel ever escapes to a caller.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use super::learned::LearnedStore;
use super::llm::LlmFallback;
use super::{ParseError, ProtocolTag, RawIntent};
use crate::market::VenueResolver;
use crate::model::intent::{
    CONFIDENCE_FALLBACK, CONFIDENCE_LLM, CONFIDENCE_RESOLVED, MAX_PROMPT_LEN, ParamsExt,
    ParsedIntent, Protocol,
};

pub struct IntentParser {
    learned: Arc<LearnedStore>,
    llm: Arc<dyn LlmFallback>,
    resolver: Arc<VenueResolver>,
}

impl IntentParser {
    pub fn new(
        learned: Arc<LearnedStore>,
        llm: Arc<dyn LlmFallback>,
        resolver: Arc<VenueResolver>,
    ) -> Self {
        IntentParser {
            learned,
            llm,
            resolver,
        }
    }

    /// Parse a single prompt into a fully resolved intent.
    pub async fn parse(&self, prompt: &str) -> Result<ParsedIntent, ParseError> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyPrompt);
        }
        if trimmed.len() > MAX_PROMPT_LEN {
            return Err(ParseError::PromptTooLong);
        }

        match super::parse(trimmed) {
            Ok(raw) => Ok(self.resolve_sentinels(raw).await),
            Err(original) => self.recover(trimmed, original).await,
        }
    }

    /// Parse a compound prompt segment by segment, preserving order.
    /// Each element pairs the segment text with its outcome; the
    /// caller chooses strict or lenient failure handling.
    pub async fn parse_multi(
        &self,
        prompt: &str,
    ) -> Result<Vec<(String, Result<ParsedIntent, ParseError>)>, ParseError> {
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyPrompt);
        }
        if trimmed.len() > MAX_PROMPT_LEN {
            return Err(ParseError::PromptTooLong);
        }

        let mut results = Vec::new();
        for segment in super::segmenter::split(trimmed) {
            let outcome = self.parse(&segment).await;
            results.push((segment, outcome));
        }
        Ok(results)
    }

    /// Pattern bank missed: consult the learned store, then the LLM.
    /// An LLM success is recorded so the next identical shape is free.
    async fn recover(
        &self,
        prompt: &str,
        original: ParseError,
    ) -> Result<ParsedIntent, ParseError> {
        if let Some(hit) = self.learned.lookup(prompt) {
            debug!("learned store hit for \"{prompt}\"");
            return Ok(hit);
        }

        if let Some(intent) = self.llm.extract(prompt).await {
            info!("llm fallback ({}) parsed \"{prompt}\"", self.llm.name());
            if let Err(e) = self.learned.save(prompt, &intent) {
                warn!("could not persist learned pattern: {e:#}");
            }
            return Ok(intent);
        }

        Err(original)
    }

    /// Replace sentinel tags with concrete venues.
    async fn resolve_sentinels(&self, raw: RawIntent) -> ParsedIntent {
        match raw.tag {
            ProtocolTag::Known(protocol) => ParsedIntent {
                protocol,
                action: raw.action,
                params: raw.params,
                confidence: raw.confidence,
            },

            ProtocolTag::ResolveToken => {
                let mut params = raw.params;
                let mint = params.str_param("token").unwrap_or_default().to_string();
                match self.resolver.resolve_token(&mint).await {
                    Some(token) => {
                        let protocol =
                            Protocol::from_venue(&token.protocol).unwrap_or(Protocol::Jupiter);
                        params.set("pool", token.pool.clone());
                        params.set(
                            "tokenInfo",
                            json!({
                                "symbol": token.symbol,
                                "name": token.name,
                                "priceUsd": token.price_usd,
                                "liquidityUsd": token.liquidity_usd,
                                "allVenues": token.all_venues,
                            }),
                        );
                        ParsedIntent {
                            protocol,
                            action: raw.action,
                            params,
                            confidence: CONFIDENCE_RESOLVED,
                        }
                    }
                    None => {
                        // The aggregator routes across venues, so it can
                        // still execute a token nobody indexed yet.
                        debug!("venue lookup missed for {mint}; using aggregator");
                        ParsedIntent {
                            protocol: Protocol::Jupiter,
                            action: raw.action,
                            params,
                            confidence: CONFIDENCE_LLM,
                        }
                    }
                }
            }

            ProtocolTag::ResolvePair => {
                let mut params = raw.params;
                let pair = params.str_param("pair").unwrap_or_default().to_string();
                match self.resolver.resolve_pair(&pair).await {
                    Some(info) => {
                        let protocol =
                            Protocol::from_venue(&info.protocol).unwrap_or(Protocol::Jupiter);
                        params.set("pool", info.pool.clone());
                        params.set("token", info.base_mint.clone());
                        params.set(
                            "pairInfo",
                            json!({
                                "baseSymbol": info.base_symbol,
                                "quoteSymbol": info.quote_symbol,
                                "quoteMint": info.quote_mint,
                                "priceUsd": info.price_usd,
                            }),
                        );
                        ParsedIntent {
                            protocol,
                            action: raw.action,
                            params,
                            confidence: CONFIDENCE_RESOLVED,
                        }
                    }
                    None => {
                        debug!("pair lookup missed for {pair}; using aggregator");
                        ParsedIntent {
                            protocol: Protocol::Jupiter,
                            action: raw.action,
                            params,
                            confidence: CONFIDENCE_FALLBACK,
                        }
                    }
                }
            }
        }
    }
}
