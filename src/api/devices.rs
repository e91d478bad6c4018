use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, DeviceCreate, DeviceDto, MetricDto};
use crate::access::Principal;
use crate::services::DeviceError;

impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Forbidden(denial) => denial.into(),
            DeviceError::NotFound(id) => Self::not_found("Device", id),
            DeviceError::SiteNotFound(_) => Self::validation(err.to_string()),
            DeviceError::Validation(msg) => Self::validation(msg),
            DeviceError::Database(msg) => Self::DatabaseError(msg),
            DeviceError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeviceListQuery {
    pub site_id: Option<i32>,
}

/// GET /devices?site_id=
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<DeviceListQuery>,
) -> Result<Json<ApiResponse<Vec<DeviceDto>>>, ApiError> {
    let site_id = query
        .site_id
        .map(|id| validate_id("site", id))
        .transpose()?;

    let devices = state
        .shared
        .device_service
        .list(&principal, site_id)
        .await?;

    Ok(Json(ApiResponse::success(devices)))
}

/// POST /devices
pub async fn create_device(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<DeviceCreate>,
) -> Result<(StatusCode, Json<ApiResponse<DeviceDto>>), ApiError> {
    let device = state
        .shared
        .device_service
        .create(&principal, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(device))))
}

/// GET /devices/{id}
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<DeviceDto>>, ApiError> {
    let id = validate_id("device", id)?;
    let device = state.shared.device_service.get(&principal, id).await?;
    Ok(Json(ApiResponse::success(device)))
}

/// PUT /devices/{id}
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<DeviceCreate>,
) -> Result<Json<ApiResponse<DeviceDto>>, ApiError> {
    let id = validate_id("device", id)?;
    let device = state
        .shared
        .device_service
        .update(&principal, id, payload)
        .await?;

    Ok(Json(ApiResponse::success(device)))
}

/// DELETE /devices/{id}
/// Also removes every metric recorded by the device.
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id("device", id)?;
    state.shared.device_service.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /devices/{id}/metrics
pub async fn list_device_metrics(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<MetricDto>>>, ApiError> {
    let id = validate_id("device", id)?;
    let metrics = state.shared.device_service.metrics(&principal, id).await?;
    Ok(Json(ApiResponse::success(metrics)))
}
