use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Counts every request by method, matched route and status code.
/// Raw paths are never used as labels to keep cardinality bounded.
pub async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    if state.config.monitoring.metrics_enabled {
        let status = response.status().as_u16().to_string();
        state
            .http_requests
            .with_label_values(&[&method, &path, &status])
            .inc();
    }

    response
}
