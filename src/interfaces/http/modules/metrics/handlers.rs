//! `GET /metrics` in Prometheus text format

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `None` when the recorder is disabled in configuration
#[derive(Clone, Default)]
pub struct MetricsState {
    pub handle: Option<PrometheusHandle>,
}

/// Prometheus scrape endpoint, unauthenticated
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    match state.handle {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", PROMETHEUS_CONTENT_TYPE)],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [("content-type", PROMETHEUS_CONTENT_TYPE)],
            "# metrics disabled\n".to_string(),
        ),
    }
}
