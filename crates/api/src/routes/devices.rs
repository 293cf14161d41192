//! Route definitions for the device health signal endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::devices;
use crate::state::AppState;

/// Device routes mounted at `/devices`.
///
/// ```text
/// POST /{device_id}/heartbeat  -> post_heartbeat
/// POST /{device_id}/stats      -> post_upload_report
/// GET  /{device_id}/stats      -> get_stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{device_id}/heartbeat", post(devices::post_heartbeat))
        .route(
            "/{device_id}/stats",
            post(devices::post_upload_report).get(devices::get_stats),
        )
}
