//! Service middleware for request metrics.
//!
//! ## Metrics Exposed
//!
//! Emitted as `tracing` events on the `pedigree_kernel::metrics` target so
//! they can be aggregated from logs:
//!
//! - `request_metric` - path pattern, method, status, latency
//! - `tree_metric` - node, edge and warning counts per built tree

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    info!(
        target: "pedigree_kernel::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request_metric"
    );

    response
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Numeric path segments (person ids) become `:id`.
fn normalize_path(path: &str) -> String {
    static NUMERIC: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(numeric) = NUMERIC.get_or_init(|| Regex::new(r"^-?\d+$").ok()) else {
        return path.to_string();
    };

    path.split('/')
        .map(|segment| if numeric.is_match(segment) { ":id" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

/// Record tree construction metrics.
pub fn record_tree_metrics(
    node_count: usize,
    edge_count: usize,
    warning_count: usize,
    truncated: bool,
    latency_ms: u64,
) {
    info!(
        target: "pedigree_kernel::metrics",
        metric_type = "tree",
        node_count,
        edge_count,
        warning_count,
        truncated,
        latency_ms,
        "tree_metric"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_replaces_person_id() {
        assert_eq!(normalize_path("/api/individuals/42/tree"), "/api/individuals/:id/tree");
    }

    #[test]
    fn test_normalize_path_preserves_regular_path() {
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
        assert_eq!(normalize_path("/api/v2/x"), "/api/v2/x");
    }
}
