//! The engine: parsing, dispatch, building, estimation, decoding and
//! venue resolution behind one façade. The HTTP surface and the CLI
//! both drive this type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chain::builder::TransactionBuilder;
use crate::chain::decode::{self, DecodedTransaction};
use crate::chain::estimate::{EstimateResult, Estimator};
use crate::chain::rpc::Connections;
use crate::config::Config;
use crate::handlers::{ProtocolRegistry, intent_key};
use crate::market::{PairInfo, TokenInfo, VenueResolver};
use crate::model::intent::{
    Action, BuildIntent, BuildResult, NaturalIntent, ParamsExt, ParsedIntent,
};
use crate::model::mint;
use crate::parser::learned::LearnedStore;
use crate::parser::resolve::IntentParser;
use crate::parser::{ParseError, llm};

// ── Response shapes ─────────────────────────────────────────────────

/// One prompt segment's outcome in a natural-language build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentBuild {
    pub segment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedIntent>,
    pub result: BuildResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerInfo {
    pub name: String,
    pub description: String,
    pub actions: Vec<String>,
}

/// Venue-resolution answer for a free-form query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolveAnswer {
    Token(TokenInfo),
    Pair(PairInfo),
}

// ── Engine ──────────────────────────────────────────────────────────

pub struct Engine {
    config: Config,
    parser: IntentParser,
    registry: Arc<ProtocolRegistry>,
    builder: TransactionBuilder,
    estimator: Estimator,
    resolver: Arc<VenueResolver>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(ProtocolRegistry::new(&config));
        let connections = Arc::new(Connections::new(config.clone()));
        let resolver = Arc::new(VenueResolver::default());
        let learned = Arc::new(LearnedStore::new(LearnedStore::default_path()));
        let parser = IntentParser::new(learned, llm::from_env(), resolver.clone());
        let builder = TransactionBuilder::new(&config, registry.clone(), connections.clone());
        let estimator = Estimator::new(connections);

        Engine {
            config,
            parser,
            registry,
            builder,
            estimator,
            resolver,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse a prompt without building. Multi-intent prompts come
    /// back segment by segment, in order.
    pub async fn parse(
        &self,
        prompt: &str,
    ) -> Result<Vec<(String, Result<ParsedIntent, ParseError>)>, ParseError> {
        self.parser.parse_multi(prompt).await
    }

    /// The headline path: natural language in, signed-ready
    /// transactions out. Lenient per segment: a failed segment
    /// yields a failed result in its slot without aborting the rest.
    pub async fn build_from_natural(&self, request: &NaturalIntent) -> Vec<SegmentBuild> {
        let segments = match self.parser.parse_multi(&request.prompt).await {
            Ok(segments) => segments,
            Err(e) => {
                return vec![SegmentBuild {
                    segment: request.prompt.clone(),
                    parsed: None,
                    result: BuildResult::fail(e.to_string()),
                }];
            }
        };

        let mut builds = Vec::with_capacity(segments.len());
        for (segment, outcome) in segments {
            match outcome {
                Ok(parsed) => {
                    let build_intent = to_build_intent(&parsed, request);
                    let result = self.builder.build(&build_intent).await;
                    builds.push(SegmentBuild {
                        segment,
                        parsed: Some(parsed),
                        result,
                    });
                }
                Err(e) => builds.push(SegmentBuild {
                    segment,
                    parsed: None,
                    result: BuildResult::fail(e.to_string()),
                }),
            }
        }
        builds
    }

    /// Build one structured intent.
    pub async fn build(&self, intent: &BuildIntent) -> BuildResult {
        self.builder.build(intent).await
    }

    /// Build a list of structured intents, preserving order.
    pub async fn build_multi(&self, intents: &[BuildIntent]) -> Vec<BuildResult> {
        let mut results = Vec::with_capacity(intents.len());
        for intent in intents {
            results.push(self.builder.build(intent).await);
        }
        results
    }

    /// Fee / compute estimate for one or more intents.
    pub async fn estimate(&self, intents: &[BuildIntent]) -> EstimateResult {
        let network = intents
            .first()
            .and_then(|i| i.network)
            .unwrap_or(self.config.default_network);
        let priority_fee = intents.first().and_then(|i| i.priority_fee);
        self.estimator.estimate(intents, network, priority_fee).await
    }

    /// Decode a base64 transaction into labeled instructions.
    pub fn decode(&self, tx_base64: &str) -> anyhow::Result<DecodedTransaction> {
        decode::decode_base64(tx_base64, &self.registry)
    }

    /// Resolve a free-form query: mint symbols and addresses resolve
    /// as tokens, pool addresses as pairs.
    pub async fn resolve(&self, query: &str) -> Option<ResolveAnswer> {
        let canonical = mint::resolve(query);
        if let Some(token) = self.resolver.resolve_token(&canonical).await {
            return Some(ResolveAnswer::Token(token));
        }
        self.resolver
            .resolve_pair(&canonical)
            .await
            .map(ResolveAnswer::Pair)
    }

    /// Accounts the handler for this intent expects to touch.
    /// Informational, surfaced alongside parse results.
    pub fn required_accounts(&self, parsed: &ParsedIntent) -> Vec<String> {
        let key = intent_key(parsed.protocol, parsed.action);
        self.registry
            .get(&key)
            .map(|handler| handler.required_accounts(&parsed.params))
            .unwrap_or_default()
    }

    /// Registered handlers, in registration order.
    pub fn handlers(&self) -> Vec<HandlerInfo> {
        self.registry
            .list()
            .into_iter()
            .map(|handler| HandlerInfo {
                name: handler.name().to_string(),
                description: handler.description().to_string(),
                actions: handler
                    .supported_actions()
                    .iter()
                    .map(|a| a.to_string())
                    .collect(),
            })
            .collect()
    }
}

/// Derive the builder input from a parsed intent plus request hints.
/// Buy/sell collapse into an explicit from/to route here, where the
/// action is still known.
pub fn to_build_intent(parsed: &ParsedIntent, request: &NaturalIntent) -> BuildIntent {
    let key = intent_key(parsed.protocol, parsed.action);
    let mut params = parsed.params.clone();

    if matches!(parsed.action, Action::Buy | Action::Sell)
        && params.str_param("from").is_none()
        && params.str_param("to").is_none()
    {
        if let Some(token) = params.str_param("token").map(str::to_string) {
            let token = mint::resolve(&token);
            match parsed.action {
                Action::Sell => {
                    params.set("from", token);
                    params.set("to", mint::NATIVE_MINT);
                }
                _ => {
                    params.set("from", mint::NATIVE_MINT);
                    params.set("to", token);
                }
            }
        }
    }

    BuildIntent {
        intent: key,
        params,
        payer: request.payer.clone(),
        network: request.network,
        skip_simulation: request.skip_simulation,
        priority_fee: request.priority_fee,
        compute_budget: request.compute_budget,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::intent::{Params, Protocol};
    use serde_json::json;

    fn request() -> NaturalIntent {
        NaturalIntent {
            prompt: String::new(),
            payer: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".into(),
            network: None,
            skip_simulation: true,
            priority_fee: Some(1_000),
            compute_budget: None,
        }
    }

    #[test]
    fn sell_intents_route_token_to_native() {
        let parsed = ParsedIntent {
            protocol: Protocol::Jupiter,
            action: Action::Sell,
            params: json!({ "amount": 5, "token": "BONK" })
                .as_object()
                .cloned()
                .unwrap(),
            confidence: 0.9,
        };
        let build = to_build_intent(&parsed, &request());
        assert_eq!(build.intent, "swap");
        assert_eq!(
            build.params.str_param("from"),
            Some("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263")
        );
        assert_eq!(build.params.str_param("to"), Some(mint::NATIVE_MINT));
        assert_eq!(build.priority_fee, Some(1_000));
    }

    #[test]
    fn buy_intents_route_native_to_token() {
        let parsed = ParsedIntent {
            protocol: Protocol::Jupiter,
            action: Action::Buy,
            params: json!({ "amount": 1, "token": "WIF" })
                .as_object()
                .cloned()
                .unwrap(),
            confidence: 0.9,
        };
        let build = to_build_intent(&parsed, &request());
        assert_eq!(build.params.str_param("from"), Some(mint::NATIVE_MINT));
    }

    #[test]
    fn explicit_swap_routes_pass_through() {
        let parsed = ParsedIntent {
            protocol: Protocol::Jupiter,
            action: Action::Swap,
            params: json!({ "amount": 1, "from": "A", "to": "B" })
                .as_object()
                .cloned()
                .unwrap(),
            confidence: 0.9,
        };
        let build = to_build_intent(&parsed, &request());
        assert_eq!(build.params.str_param("from"), Some("A"));
        assert_eq!(build.params.str_param("to"), Some("B"));
    }

    #[test]
    fn non_swap_intents_keep_their_params() {
        let mut params = Params::new();
        params.set("amount", 100.0);
        params.set("token", "USDC");
        let parsed = ParsedIntent {
            protocol: Protocol::Kamino,
            action: Action::Supply,
            params,
            confidence: 0.9,
        };
        let build = to_build_intent(&parsed, &request());
        assert_eq!(build.intent, "kamino-supply");
        assert_eq!(build.params.str_param("token"), Some("USDC"));
    }
}
