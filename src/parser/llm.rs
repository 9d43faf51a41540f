//! Last-resort structured extraction from free text.
//!
//! The model is asked for a single JSON object drawn from a closed
//! vocabulary; anything else is rejected. Providers are selected by
//! environment credentials, and every failure mode (HTTP, timeout,
//! bad JSON, unknown action) logs and returns `None`; the original
//! parse error is what the caller re-raises.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::model::intent::{
    Action, CONFIDENCE_LLM, Params, ParamsExt, ParsedIntent, Protocol,
};
use crate::model::mint;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_TOKENS: u32 = 200;

const SYSTEM_PROMPT: &str = "You convert one blockchain request into JSON. \
Respond with a single JSON object {\"action\", \"params\", \"protocol\"} and nothing else. \
action must be one of: swap, buy, sell, transfer, memo, stake, unstake, tip. \
params may contain: amount (number), token, from, to (token symbols or base58 addresses), text. \
protocol is optional. Do not invent fields.";

/// Actions the adapter will accept back from the model.
const CLOSED_ACTIONS: &[&str] = &[
    "swap", "buy", "sell", "transfer", "memo", "stake", "unstake", "tip",
];

// ── Provider interface ──────────────────────────────────────────────

#[async_trait]
pub trait LlmFallback: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extract an intent from free text, or `None` on any failure.
    async fn extract(&self, prompt: &str) -> Option<ParsedIntent>;
}

/// Pick a provider from the environment: Anthropic wins over OpenAI,
/// and with neither configured the fallback is a no-op.
pub fn from_env() -> Arc<dyn LlmFallback> {
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        if !key.is_empty() {
            return Arc::new(AnthropicFallback::new(key));
        }
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        if !key.is_empty() {
            return Arc::new(OpenAiFallback::new(key));
        }
    }
    Arc::new(NullFallback)
}

// ── Null provider ───────────────────────────────────────────────────

/// Used when no credentials are configured.
pub struct NullFallback;

#[async_trait]
impl LlmFallback for NullFallback {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn extract(&self, _prompt: &str) -> Option<ParsedIntent> {
        None
    }
}

// ── Anthropic ───────────────────────────────────────────────────────

pub struct AnthropicFallback {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicFallback {
    pub fn new(api_key: String) -> Self {
        AnthropicFallback {
            api_key,
            model: "claude-3-5-haiku-latest".to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct AnthropicReply {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmFallback for AnthropicFallback {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn extract(&self, prompt: &str) -> Option<ParsedIntent> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": SYSTEM_PROMPT,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await;

        let reply: AnthropicReply = match response {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("anthropic fallback: unreadable reply: {e}");
                    return None;
                }
            },
            Ok(r) => {
                warn!("anthropic fallback: HTTP {}", r.status());
                return None;
            }
            Err(e) => {
                warn!("anthropic fallback: request failed: {e}");
                return None;
            }
        };

        let text = reply.content.first().map(|c| c.text.as_str())?;
        adapt(text)
    }
}

// ── OpenAI ──────────────────────────────────────────────────────────

pub struct OpenAiFallback {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiFallback {
    pub fn new(api_key: String) -> Self {
        OpenAiFallback {
            api_key,
            model: "gpt-4o-mini".to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct OpenAiReply {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl LlmFallback for OpenAiFallback {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract(&self, prompt: &str) -> Option<ParsedIntent> {
        let body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await;

        let reply: OpenAiReply = match response {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("openai fallback: unreadable reply: {e}");
                    return None;
                }
            },
            Ok(r) => {
                warn!("openai fallback: HTTP {}", r.status());
                return None;
            }
            Err(e) => {
                warn!("openai fallback: request failed: {e}");
                return None;
            }
        };

        let text = reply.choices.first().map(|c| c.message.content.as_str())?;
        adapt(text)
    }
}

// ── Reply adaptation ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LlmReply {
    action: String,
    #[serde(default)]
    params: Params,
    #[serde(default)]
    #[allow(dead_code)]
    protocol: Option<String>,
}

/// Turn the model's JSON into a `ParsedIntent`, or `None` when the
/// reply leaves the closed vocabulary.
pub(crate) fn adapt(text: &str) -> Option<ParsedIntent> {
    // Models occasionally wrap JSON in a code fence despite instructions.
    let trimmed = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let reply: LlmReply = match serde_json::from_str(trimmed) {
        Ok(reply) => reply,
        Err(e) => {
            debug!("llm fallback reply was not valid JSON: {e}");
            return None;
        }
    };

    let action = reply.action.to_lowercase();
    if !CLOSED_ACTIONS.contains(&action.as_str()) {
        warn!("llm fallback returned unknown action '{action}'");
        return None;
    }

    let mut params = reply.params;
    let amount = params.f64_param("amount");
    let token = params.str_param("token").map(str::to_string);

    let intent = match action.as_str() {
        "swap" | "buy" | "sell" => {
            let (from, to) = match action.as_str() {
                "buy" => (
                    mint::NATIVE_MINT.to_string(),
                    mint::resolve(token.as_deref().unwrap_or_default()),
                ),
                "sell" => (
                    mint::resolve(token.as_deref().unwrap_or_default()),
                    mint::NATIVE_MINT.to_string(),
                ),
                _ => (
                    mint::resolve(params.str_param("from").unwrap_or_default()),
                    mint::resolve(params.str_param("to").unwrap_or_default()),
                ),
            };
            params.set("from", from);
            params.set("to", to);
            params.set("amount", amount.unwrap_or(1.0));
            ParsedIntent {
                protocol: Protocol::Jupiter,
                action: Action::Swap,
                params,
                confidence: CONFIDENCE_LLM,
            }
        }
        "transfer" => {
            let is_sol = token
                .as_deref()
                .map(|t| t.eq_ignore_ascii_case("sol") || t == mint::NATIVE_MINT)
                .unwrap_or(true);
            let protocol = if is_sol {
                Protocol::System
            } else {
                params.set("token", mint::resolve(token.as_deref().unwrap_or_default()));
                Protocol::SplToken
            };
            params.set("amount", amount.unwrap_or(1.0));
            ParsedIntent {
                protocol,
                action: Action::Transfer,
                params,
                confidence: CONFIDENCE_LLM,
            }
        }
        "memo" => ParsedIntent {
            protocol: Protocol::Memo,
            action: Action::Memo,
            params,
            confidence: CONFIDENCE_LLM,
        },
        "stake" => {
            params.set("amount", amount.unwrap_or(1.0));
            ParsedIntent {
                protocol: Protocol::Stake,
                action: Action::Stake,
                params,
                confidence: CONFIDENCE_LLM,
            }
        }
        "unstake" => {
            params.set("amount", amount.unwrap_or(1.0));
            ParsedIntent {
                protocol: Protocol::Marinade,
                action: Action::Unstake,
                params,
                confidence: CONFIDENCE_LLM,
            }
        }
        "tip" => {
            params.set("amount", amount.unwrap_or(0.001));
            ParsedIntent {
                protocol: Protocol::Jito,
                action: Action::Tip,
                params,
                confidence: CONFIDENCE_LLM,
            }
        }
        _ => unreachable!("action validated against the closed set"),
    };

    Some(intent)
}
