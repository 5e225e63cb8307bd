//! HTTP surface for the orchestrator

use std::future::Future;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use coordination::ensemble::{OrchestrationResponse, SharedOrchestrationService};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models: Vec<String>,
}

/// Build the application router around a shared service.
pub fn router(service: SharedOrchestrationService) -> Router {
    Router::new()
        .route("/api/orchestrate", post(orchestrate))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn health(State(service): State<SharedOrchestrationService>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models: service.models().to_vec(),
    })
}

// The body is taken as raw bytes so a missing or malformed payload still
// gets the JSON error shape rather than axum's plain-text rejection.
async fn orchestrate(
    State(service): State<SharedOrchestrationService>,
    body: Bytes,
) -> (StatusCode, Json<OrchestrationResponse>) {
    match service.handle_json(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(failure) => {
            let status = if failure.error.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(failure.into_response()))
        }
    }
}
