//! Axum routes for the tree service.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::store::{FamilyStore, PostgresFamilyStore};
use crate::traversal::TreeError;
use crate::types::{PersonId, TreeView};
use crate::TREE_SCHEMA_VERSION;

use super::middleware::{metrics_middleware, record_tree_metrics};
use super::state::ServiceState;

/// Type alias for the service state with PostgresFamilyStore.
pub type AppState = ServiceState<PostgresFamilyStore>;

// ============================================================================
// Request/Response Types
// ============================================================================

fn default_depth() -> i32 {
    1
}

/// Depth bounds for a tree request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeQuery {
    /// Generations above the focus (default: 1).
    #[serde(default = "default_depth")]
    pub ancestor_depth: i32,
    /// Generations below the focus (default: 1).
    #[serde(default = "default_depth")]
    pub descendant_depth: i32,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Tree result schema version.
    pub schema_version: String,
    /// Hash of the layout parameters in use.
    pub layout_params_hash: String,
    /// Depth probe level cap.
    pub probe_depth_cap: u32,
    /// Store connectivity.
    pub database: DatabaseHealth,
}

/// Store health information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    /// Whether the store answered.
    pub connected: bool,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always "alive".
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service accepts traffic.
    pub ready: bool,
    /// Whether the store answered.
    pub database: bool,
    /// Failure detail.
    pub details: Option<String>,
}

/// Structured error response with correlation ID for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Correlation ID, set for server-side failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            correlation_id: None,
            details: None,
        }
    }

    /// Add a correlation ID to the error.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// HTTP status for the error code.
    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_ARGUMENT" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TreeError> for ErrorResponse {
    fn from(e: TreeError) -> Self {
        match e {
            TreeError::NotFound(id) => {
                Self::new("NOT_FOUND", "Individual not found").with_details(id.to_string())
            }
            TreeError::InvalidArgument(msg) => Self::new("INVALID_ARGUMENT", msg),
            TreeError::Store(msg) => Self::new("STORE_ERROR", "Record store unavailable")
                .with_details(msg)
                .with_correlation_id(uuid::Uuid::new_v4().to_string()),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(
                code = %self.code,
                error = %self.error,
                details = ?self.details,
                correlation_id = ?self.correlation_id,
                "Request failed"
            );
        } else {
            tracing::warn!(code = %self.code, error = %self.error, "Request error");
        }
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Build the positioned tree around an individual.
async fn tree_handler<S: FamilyStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
    Path(id): Path<i64>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<TreeView>, ErrorResponse> {
    let start = Instant::now();
    let view = state
        .builder
        .build(PersonId::new(id), query.ancestor_depth, query.descendant_depth)
        .await?;

    record_tree_metrics(
        view.nodes.len(),
        view.edges.len(),
        view.warnings.len(),
        view.max_ancestor_depth.truncated || view.max_descendant_depth.truncated,
        start.elapsed().as_millis() as u64,
    );
    Ok(Json(view))
}

/// Detailed health check.
async fn health_handler<S: FamilyStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Json<HealthResponse> {
    let connected = state.store.is_healthy().await;

    Json(HealthResponse {
        status: if connected { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: TREE_SCHEMA_VERSION.to_string(),
        layout_params_hash: state.layout_config().params_hash(),
        probe_depth_cap: state.probe_config.depth_cap,
        database: DatabaseHealth { connected },
    })
}

/// Liveness probe endpoint. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store is reachable, 503 otherwise.
async fn readiness_handler<S: FamilyStore + 'static>(
    State(state): State<Arc<ServiceState<S>>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.store.is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            database: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                database: false,
                details: Some("Record store unavailable".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the tree service.
pub fn create_router<S: FamilyStore + 'static>(state: ServiceState<S>) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/individuals/:id/tree", get(tree_handler::<S>))
        // Health checks
        .route("/health", get(health_handler::<S>))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler::<S>))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}
