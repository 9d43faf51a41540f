pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod state;
pub mod types;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use crate::engine::Engine;

use state::AppState;

pub async fn serve(engine: Engine, host: &str, port: u16) -> Result<()> {
    let cors = match &engine.config().allowed_origins {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let state = AppState::new(engine);

    let app = Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Build
        .route("/api/build/natural", post(handlers::build_natural))
        .route("/api/build", post(handlers::build_structured))
        .route("/api/build/multi", post(handlers::build_multi))
        // Parse / estimate / decode / resolve
        .route("/api/parse", post(handlers::parse))
        .route("/api/estimate", post(handlers::estimate))
        .route("/api/decode", post(handlers::decode))
        .route("/api/resolve", post(handlers::resolve))
        // Listings
        .route("/api/intents", get(handlers::intents))
        .layer(cors)
        .with_state(state);

    let addr = format!("{host}:{port}");
    info!("txflow API listening on {addr}");
    info!("  Health:   GET  http://{addr}/health");
    info!("  Build:    POST http://{addr}/api/build/natural");
    info!("  Parse:    POST http://{addr}/api/parse");
    info!("  Estimate: POST http://{addr}/api/estimate");
    info!("  Decode:   POST http://{addr}/api/decode");
    info!("  Intents:  GET  http://{addr}/api/intents");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("running server")?;

    Ok(())
}
