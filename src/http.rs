//! HTTP transport for the semsim-kp TRAPI service.
//!
//! Axum router exposing the TRAPI query endpoint, the static metadata
//! endpoints, the single-node and one-hop lookup stubs, and a health
//! probe. CORS is wide open; the service is stateless across requests.

use crate::config::Config;
use crate::metadata::GraphMetadata;
use crate::model::ReasonerRequest;
use crate::pipeline::QueryService;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub service: Arc<QueryService>,
    pub metadata: Arc<GraphMetadata>,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

/// Handle a TRAPI Query request.
///
/// The response is the request object extended with the answered
/// message; validation and upstream failures come back as HTTP 400 with
/// a `description` field on the same object.
pub async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<ReasonerRequest>,
) -> impl IntoResponse {
    let outcome = state.service.answer(request).await;
    let status = if outcome.ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(outcome.response))
}

/// Meta knowledge graph representation of this TRAPI web service.
pub async fn meta_knowledge_graph_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metadata.meta_kg().clone())
}

/// Metadata about the knowledge graph behind this service.
pub async fn metadata_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metadata.metadata().clone())
}

/// Single-node lookup. Not backed by a local graph store; kept for
/// interface compatibility and returns an empty object.
pub async fn node_handler(
    Path((node_type, curie)): Path<(String, String)>,
) -> impl IntoResponse {
    tracing::debug!("Node lookup stub: type={} curie={}", node_type, curie);
    Json(json!({}))
}

/// One-hop lookup stub returning an empty triple list.
pub async fn one_hop_handler(
    Path((source_type, target_type, curie)): Path<(String, String, String)>,
) -> impl IntoResponse {
    tracing::debug!(
        "One-hop lookup stub: source={} target={} curie={}",
        source_type,
        target_type,
        curie
    );
    Json(json!([]))
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/meta_knowledge_graph", get(meta_knowledge_graph_handler))
        .route("/metadata", get(metadata_handler))
        .route("/health", get(health_handler))
        .route("/:node_type/:curie", get(node_handler))
        .route("/:source_type/:target_type/:curie", get(one_hop_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn start_http_server(state: AppState) -> anyhow::Result<()> {
    let bind = state.config.runtime.http_bind;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!("Starting TRAPI HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
