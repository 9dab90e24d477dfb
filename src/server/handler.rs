//! HTTP handlers for the synchronization engine
//!
//! - POST /api/v1/ingest                 fire-and-forget text ingestion
//! - POST /api/v1/sources                validated artifact + ingestion
//! - GET  /api/v1/sources                artifact log (optional `?kind=`)
//! - GET  /api/v1/sources/:id            one artifact
//! - POST /api/v1/media                  transcribe/analyze, then ingest
//! - GET  /api/v1/graph                  current graph snapshot
//! - POST /api/v1/nodes                  manual node creation
//! - GET  /api/v1/nodes/:id              node with its source artifacts
//! - PUT  /api/v1/nodes/:id/position     move a node
//! - GET  /api/v1/state                  system state

use super::types::*;
use crate::engine::SyncEngine;
use crate::graph::{NodeCategory, SourceArtifactBuilder, SourceKind};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use uuid::Uuid;

/// Shared state for engine handlers
#[derive(Clone)]
pub struct EngineState {
    pub engine: SyncEngine,
}

/// Create the engine router
pub fn engine_router(state: EngineState) -> Router {
    Router::new()
        .route("/api/v1/ingest", post(ingest))
        .route("/api/v1/sources", post(record_source).get(list_sources))
        .route("/api/v1/sources/:id", get(get_source))
        .route("/api/v1/media", post(ingest_media))
        .route("/api/v1/graph", get(get_graph))
        .route("/api/v1/nodes", post(create_node))
        .route("/api/v1/nodes/:id", get(get_node))
        .route("/api/v1/nodes/:id/position", put(move_node))
        .route("/api/v1/state", get(get_state))
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiFailure> {
    Uuid::parse_str(raw).map_err(|_| ApiFailure::bad_request(format!("Invalid id '{}'", raw)))
}

fn parse_kind(raw: &str) -> Result<SourceKind, ApiFailure> {
    raw.parse::<SourceKind>().map_err(ApiFailure::from)
}

// =============================================================================
// Ingestion
// =============================================================================

/// POST /api/v1/ingest
async fn ingest(
    State(state): State<EngineState>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    if request.content.trim().is_empty() {
        return Err(ApiFailure::bad_request("Content must not be empty"));
    }
    drop(state.engine.ingest(request.content));
    Ok((StatusCode::ACCEPTED, Json(IngestAccepted { accepted: true })))
}

/// POST /api/v1/sources
async fn record_source(
    State(state): State<EngineState>,
    Json(request): Json<RecordSourceRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let kind = parse_kind(&request.kind)?;
    let mut builder = SourceArtifactBuilder::new(kind).content(request.content);
    if let Some(mime_type) = request.mime_type {
        builder = builder.mime_type(mime_type);
    }
    if let Some(summary) = request.summary {
        builder = builder.summary(summary);
    }
    for (key, value) in request.metadata {
        builder = builder.metadata(key, value);
    }

    let artifact = state.engine.submit(builder).await?;
    Ok((StatusCode::ACCEPTED, Json(artifact)))
}

/// POST /api/v1/media
async fn ingest_media(
    State(state): State<EngineState>,
    Json(request): Json<MediaRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let kind = parse_kind(&request.kind)?;
    let payload = BASE64
        .decode(request.data.as_bytes())
        .map_err(|e| ApiFailure::bad_request(format!("Invalid base64 payload: {}", e)))?;

    let artifact = state
        .engine
        .process_media(kind, &request.mime_type, &payload)
        .await?;
    Ok(Json(MediaResponse {
        recorded: artifact.is_some(),
        artifact,
    }))
}

// =============================================================================
// Sources
// =============================================================================

/// GET /api/v1/sources
async fn list_sources(
    State(state): State<EngineState>,
    Query(query): Query<SourceQuery>,
) -> Result<impl IntoResponse, ApiFailure> {
    let sources = match query.kind.as_deref() {
        Some(kind) => state.engine.sources().list_by_kind(parse_kind(kind)?).await,
        None => state.engine.sources().list().await,
    };
    Ok(Json(sources))
}

/// GET /api/v1/sources/:id
async fn get_source(
    State(state): State<EngineState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiFailure> {
    let id = parse_id(&id)?;
    state
        .engine
        .sources()
        .get(&id)
        .await
        .map(Json)
        .ok_or_else(|| crate::error::Error::NotFound(format!("Source '{}'", id)).into())
}

// =============================================================================
// Graph
// =============================================================================

/// GET /api/v1/graph
async fn get_graph(State(state): State<EngineState>) -> impl IntoResponse {
    Json(state.engine.graph().as_ref().clone())
}

/// POST /api/v1/nodes
async fn create_node(
    State(state): State<EngineState>,
    Json(request): Json<CreateNodeRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let category: NodeCategory = request
        .category
        .parse()
        .map_err(|e: String| ApiFailure::bad_request(e))?;
    let node = state.engine.add_node(&request.label, category)?;
    Ok(Json(node))
}

/// GET /api/v1/nodes/:id
async fn get_node(
    State(state): State<EngineState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiFailure> {
    let id = parse_id(&id)?;
    let (node, sources) = state.engine.trace(&id).await?;
    Ok(Json(NodeDetail { node, sources }))
}

/// PUT /api/v1/nodes/:id/position
async fn move_node(
    State(state): State<EngineState>,
    Path(id): Path<String>,
    Json(request): Json<MoveNodeRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let id = parse_id(&id)?;
    if !(request.x.is_finite() && request.y.is_finite()) {
        return Err(ApiFailure::bad_request("Coordinates must be finite"));
    }
    let node = state.engine.move_node(&id, request.x, request.y)?;
    Ok(Json(node))
}

/// GET /api/v1/state
async fn get_state(State(state): State<EngineState>) -> impl IntoResponse {
    Json(state.engine.state())
}
