//! Route handlers. Parsing and building never bubble raw errors: the
//! engine folds failures into `BuildResult`s, and everything else
//! maps onto the envelope.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use serde_json::json;

use crate::model::intent::{BuildIntent, BuildResult, MAX_PROMPT_LEN, NaturalIntent};

use super::error::ApiError;
use super::state::AppState;
use super::types::{
    DecodeRequest, Envelope, EstimateRequest, MultiBuildRequest, ParseRequest, ResolveRequest,
};

async fn check_rate(state: &AppState, addr: &SocketAddr) -> Result<(), ApiError> {
    if let Err(retry_after) = state.rate_limiter.check(&addr.ip().to_string()).await {
        return Err(ApiError::RateLimited(format!(
            "Rate limit exceeded. Try again in {retry_after}s"
        )));
    }
    Ok(())
}

fn check_prompt(prompt: &str) -> Result<(), ApiError> {
    if prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt is empty".into()));
    }
    if prompt.len() > MAX_PROMPT_LEN {
        return Err(ApiError::BadRequest(format!(
            "Prompt exceeds {MAX_PROMPT_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn build_natural(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Json(request): Json<NaturalIntent>,
) -> Result<Json<Envelope>, ApiError> {
    check_rate(&state, &addr).await?;
    check_prompt(&request.prompt)?;

    let builds = state.engine.build_from_natural(&request).await;
    let success = builds.iter().all(|b| b.result.success);
    Ok(Json(Envelope {
        success,
        payload: json!({ "results": builds }),
    }))
}

pub async fn build_structured(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Json(intent): Json<BuildIntent>,
) -> Result<Json<BuildResult>, ApiError> {
    check_rate(&state, &addr).await?;

    // A BuildResult is already a `{success, error?, …}` envelope.
    Ok(Json(state.engine.build(&intent).await))
}

pub async fn build_multi(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    Json(request): Json<MultiBuildRequest>,
) -> Result<Json<Envelope>, ApiError> {
    check_rate(&state, &addr).await?;
    if request.intents.is_empty() {
        return Err(ApiError::BadRequest("No intents supplied".into()));
    }

    let results = state.engine.build_multi(&request.intents).await;
    let success = results.iter().all(|r| r.success);
    Ok(Json(Envelope {
        success,
        payload: json!({ "results": results }),
    }))
}

pub async fn parse(
    State(state): State<AppState>,
    Json(request): Json<ParseRequest>,
) -> Result<Json<Envelope>, ApiError> {
    check_prompt(&request.prompt)?;

    let segments = state
        .engine
        .parse(&request.prompt)
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let parsed: Vec<_> = segments
        .into_iter()
        .map(|(segment, outcome)| match outcome {
            Ok(intent) => {
                let accounts = state.engine.required_accounts(&intent);
                json!({
                    "segment": segment,
                    "intent": intent,
                    "requiredAccounts": accounts,
                })
            }
            Err(e) => json!({ "segment": segment, "error": e.to_string() }),
        })
        .collect();
    Ok(Json(Envelope::ok(json!({ "intents": parsed }))))
}

pub async fn estimate(
    State(state): State<AppState>,
    Json(request): Json<EstimateRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let intents = request.into_intents();
    if intents.is_empty() {
        return Err(ApiError::BadRequest("No intents supplied".into()));
    }
    let estimate = state.engine.estimate(&intents).await;
    Ok(Json(Envelope::ok(serde_json::to_value(&estimate).map_err(
        |e| ApiError::Internal(e.to_string()),
    )?)))
}

pub async fn decode(
    State(state): State<AppState>,
    Json(request): Json<DecodeRequest>,
) -> Result<Json<Envelope>, ApiError> {
    let decoded = state
        .engine
        .decode(&request.transaction)
        .map_err(|e| ApiError::BadRequest(format!("{e:#}")))?;
    Ok(Json(Envelope::ok(serde_json::to_value(&decoded).map_err(
        |e| ApiError::Internal(e.to_string()),
    )?)))
}

pub async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<Envelope>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("Query is empty".into()));
    }
    match state.engine.resolve(request.query.trim()).await {
        Some(answer) => Ok(Json(Envelope::ok(serde_json::to_value(&answer).map_err(
            |e| ApiError::Internal(e.to_string()),
        )?))),
        None => Ok(Json(Envelope {
            success: false,
            payload: json!({ "error": format!("Nothing known about '{}'", request.query) }),
        })),
    }
}

pub async fn intents(State(state): State<AppState>) -> Json<Envelope> {
    Json(Envelope::ok(json!({ "handlers": state.engine.handlers() })))
}
