//! HTTP API server
//!
//! Thin axum surface over the pipeline: one intake endpoint mirroring the
//! public submission contract, read endpoints for the admin reporting layer,
//! and a health check. District/category access scoping is the caller's
//! concern; the reporting reads only apply the requested filter.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::error::CivicpulseError;
use crate::pipeline::Pipeline;
use crate::types::{Batch, GlobalIssue, Submission};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8080).into(),
        }
    }
}

/// API server state
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    pipeline: Arc<Pipeline>,
}

impl ApiServer {
    /// Create new API server
    pub fn new(config: ApiServerConfig, pipeline: Arc<Pipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Build router
    fn build_router(state: AppState) -> Router {
        Router::new()
            // Intake
            .route("/api/feedback", post(submit_feedback_handler))
            // Reporting reads
            .route("/api/issues", get(list_issues_handler))
            .route("/api/batches", get(list_batches_handler))
            // Health check
            .route("/health", get(health_handler))
            // State
            .with_state(state)
            // Middleware (the public form posts cross-origin)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving
    pub async fn serve(self) -> anyhow::Result<()> {
        let state = AppState {
            pipeline: self.pipeline.clone(),
        };
        let router = Self::build_router(state);

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("API server listening on http://{}", self.config.addr);
        axum::serve(listener, router).await?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Submission intake handler
///
/// 200 with a status message ("stored, N more needed" / "batch full"),
/// 400 on validation failure, 500 on anything else.
async fn submit_feedback_handler(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Response {
    match state.pipeline.submit(submission).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: outcome.message(),
            }),
        )
            .into_response(),
        Err(CivicpulseError::InvalidSubmission(msg)) => {
            (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: msg })).into_response()
        }
        Err(e) => {
            error!("Submission failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct IssueFilter {
    category: Option<String>,
}

/// Global issues, sorted by (priority tier, total reports) descending
async fn list_issues_handler(
    State(state): State<AppState>,
    Query(filter): Query<IssueFilter>,
) -> Response {
    match state.pipeline.store().list_global_issues().await {
        Ok(issues) => {
            let issues: Vec<GlobalIssue> = match &filter.category {
                Some(category) => issues
                    .into_iter()
                    .filter(|i| i.category.eq_ignore_ascii_case(category))
                    .collect(),
                None => issues,
            };
            Json(issues).into_response()
        }
        Err(e) => {
            error!("Failed to list issues: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// All batches, newest first (spotting stalled ones included)
async fn list_batches_handler(State(state): State<AppState>) -> Response {
    match state.pipeline.store().list_batches().await {
        Ok(batches) => Json::<Vec<Batch>>(batches).into_response(),
        Err(e) => {
            error!("Failed to list batches: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Health check handler
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
