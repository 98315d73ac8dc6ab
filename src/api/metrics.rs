//! Prometheus metrics endpoint and HTTP request tracking middleware.
//!
//! Counters are recorded through the `metrics` facade; when no recorder is
//! installed (tests, or metrics disabled) they are no-ops.

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::hos::AggregationOutcome;
use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const LOGS_CREATED_TOTAL: &str = "driver_logs_created_total";
pub const TRIPS_CREATED_TOTAL: &str = "trips_created_total";
pub const HOS_SUMMARIES_UPDATED_TOTAL: &str = "hos_summaries_updated_total";
pub const HOS_AGGREGATION_FAILURES_TOTAL: &str = "hos_aggregation_failures_total";
pub const USERS_TOTAL: &str = "users_total";

/// Install the global Prometheus recorder and return a handle for rendering.
///
/// Call once during startup.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(LOGS_CREATED_TOTAL, "Driver log entries stored");
    describe_counter!(TRIPS_CREATED_TOTAL, "Trips stored");
    describe_counter!(
        HOS_SUMMARIES_UPDATED_TOTAL,
        "Daily HOS summary rows written by log aggregation"
    );
    describe_counter!(
        HOS_AGGREGATION_FAILURES_TOTAL,
        "Log batches whose HOS aggregation failed"
    );
    describe_gauge!(USERS_TOTAL, "Registered users");

    Ok(handle)
}

/// GET /metrics
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Ok(count) = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await
    {
        gauge!(USERS_TOTAL).set(count as f64);
    }

    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Records `http_requests_total` (method, path, status) and
/// `http_request_duration_seconds` (method, path).
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    // Matched template (e.g. /api/trips/:trip_id) keeps label cardinality low
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

pub fn record_trip_created() {
    counter!(TRIPS_CREATED_TOTAL).increment(1);
}

pub fn record_logs_created(count: usize) {
    counter!(LOGS_CREATED_TOTAL).increment(count as u64);
}

/// Count the summaries written, or the failure, of one aggregation pass
pub fn record_hos_outcome(outcome: AggregationOutcome) {
    match outcome {
        AggregationOutcome::Skipped => {}
        AggregationOutcome::Updated(days) => {
            counter!(HOS_SUMMARIES_UPDATED_TOTAL).increment(days as u64)
        }
        AggregationOutcome::Failed => counter!(HOS_AGGREGATION_FAILURES_TOTAL).increment(1),
    }
}
