//! Tree REST Service
//!
//! Exposes the tree builder as a REST API for the rendering surface.
//!
//! ## Endpoints
//!
//! - `GET /api/individuals/{id}/tree?ancestor_depth=&descendant_depth=` - Positioned tree
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_tree_metrics};
pub use routes::{create_router, AppState, ErrorResponse, TreeQuery};
pub use state::ServiceState;
