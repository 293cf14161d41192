//! Handlers for the device health signal endpoints.
//!
//! Both POST routes enforce the "known devices only" policy: the store
//! itself auto-creates on access, so the existence check happens here,
//! before the store is touched.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use fleet_core::device::StatsSummary;
use fleet_core::error::CoreError;
use fleet_core::validation::is_device_id;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for the heartbeat endpoint.
#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub sent_at: DateTime<Utc>,
}

/// Request body for the upload report endpoint. `upload_time` is the upload
/// duration in nanoseconds.
#[derive(Debug, Deserialize)]
pub struct UploadReportRequest {
    #[allow(dead_code)]
    pub sent_at: DateTime<Utc>,
    pub upload_time: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /devices/{device_id}/heartbeat
///
/// Record a liveness signal, widening the device's observation window.
pub async fn post_heartbeat(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(input): Json<HeartbeatRequest>,
) -> AppResult<StatusCode> {
    validate_device_id(&device_id)?;
    ensure_known(&state, &device_id)?;

    state.store.with_device(&device_id, |stats| {
        stats.record_heartbeat(input.sent_at);
        Ok(())
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /devices/{device_id}/stats
///
/// Record an upload-duration report.
pub async fn post_upload_report(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(input): Json<UploadReportRequest>,
) -> AppResult<StatusCode> {
    validate_device_id(&device_id)?;

    if input.upload_time < 0 {
        return Err(AppError::Core(CoreError::Validation(
            "upload_time must be >= 0".to_string(),
        )));
    }

    ensure_known(&state, &device_id)?;

    state.store.with_device(&device_id, |stats| {
        stats.record_upload(input.upload_time);
        Ok(())
    })?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /devices/{device_id}/stats
///
/// Return the derived metrics for a device: uptime percentage and average
/// upload duration.
pub async fn get_stats(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> AppResult<Json<DataResponse<StatsSummary>>> {
    validate_device_id(&device_id)?;

    let snapshot = state.store.snapshot(&device_id)?;
    Ok(Json(DataResponse {
        data: snapshot.summary(),
    }))
}

// ---------------------------------------------------------------------------
// Policy helpers
// ---------------------------------------------------------------------------

fn validate_device_id(id: &str) -> Result<(), AppError> {
    if !is_device_id(id) {
        return Err(AppError::BadRequest(format!("Invalid device id: {id}")));
    }
    Ok(())
}

fn ensure_known(state: &AppState, id: &str) -> Result<(), AppError> {
    if !state.store.exists(id) {
        return Err(AppError::Core(CoreError::device_not_found(id)));
    }
    Ok(())
}
