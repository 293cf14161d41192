pub mod devices;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /devices/{device_id}/heartbeat    POST  record a heartbeat
/// /devices/{device_id}/stats        POST  record an upload report
/// /devices/{device_id}/stats        GET   derived metrics
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/devices", devices::router())
}
