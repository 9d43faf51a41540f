//! Request and response envelopes. Every response carries `success`
//! plus either the payload or an `error` string.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::intent::BuildIntent;

#[derive(Debug, Deserialize)]
pub struct MultiBuildRequest {
    pub intents: Vec<BuildIntent>,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EstimateRequest {
    One(BuildIntent),
    Many { intents: Vec<BuildIntent> },
}

impl EstimateRequest {
    pub fn into_intents(self) -> Vec<BuildIntent> {
        match self {
            EstimateRequest::One(intent) => vec![intent],
            EstimateRequest::Many { intents } => intents,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DecodeRequest {
    pub transaction: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(flatten)]
    pub payload: Value,
}

impl Envelope {
    pub fn ok(payload: Value) -> Self {
        Envelope {
            success: true,
            payload,
        }
    }
}
