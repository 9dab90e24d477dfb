//! HTTP API for NeuroGraph
//!
//! | Prefix              | Description                                  |
//! |---------------------|----------------------------------------------|
//! | `/health`           | Health probe                                 |
//! | `/api/v1/ingest`    | Fire-and-forget text ingestion               |
//! | `/api/v1/sources/*` | Source artifact log                          |
//! | `/api/v1/media`     | Audio/video ingestion                        |
//! | `/api/v1/graph`     | Graph snapshot                               |
//! | `/api/v1/nodes/*`   | Manual node edits and provenance             |
//! | `/api/v1/state`     | Dual-stream scores and cognitive load        |

mod handler;
mod types;

pub use handler::{engine_router, EngineState};
pub use types::*;

use crate::config::ServerConfig;
use crate::engine::SyncEngine;
use crate::error::{Error, Result};
use axum::{
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete HTTP application around `engine`.
pub fn build_app(engine: SyncEngine, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(engine_router(EngineState { engine }))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(engine: SyncEngine, config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, service = engine.service_name(), "HTTP API listening");

    let app = build_app(engine, &config.cors_origins);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP API stopped");
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
