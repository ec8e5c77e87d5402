//! Telemetry 指标快照。
//!
//! - GET /metrics

use api_contract::{ApiResponse, MetricsSnapshotDto};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use eolia_telemetry::metrics;

use crate::{AppState, middleware::require_api_key};

pub async fn get_metrics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_api_key(&state, &headers) {
        return response;
    }

    let snapshot = metrics().snapshot();
    (
        StatusCode::OK,
        Json(ApiResponse::success(MetricsSnapshotDto {
            cloud_status_fetches: snapshot.cloud_status_fetches,
            cloud_status_applies: snapshot.cloud_status_applies,
            cloud_errors: snapshot.cloud_errors,
            snapshot_cache_hits: snapshot.snapshot_cache_hits,
            state_publish_success: snapshot.state_publish_success,
            state_publish_failure: snapshot.state_publish_failure,
            commands_received: snapshot.commands_received,
            commands_dropped: snapshot.commands_dropped,
            reconcile_noops: snapshot.reconcile_noops,
            reconcile_latency_ms_total: snapshot.reconcile_latency_ms_total,
            reconcile_latency_ms_count: snapshot.reconcile_latency_ms_count,
        })),
    )
        .into_response()
}
