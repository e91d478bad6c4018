use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, HistoryQuery, MetricCreate, MetricDto, MetricHistoryDto};
use crate::access::Principal;
use crate::history::HistoryError;
use crate::services::MetricError;

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        Self::validation(err.to_string())
    }
}

impl From<MetricError> for ApiError {
    fn from(err: MetricError) -> Self {
        match err {
            MetricError::Forbidden(denial) => denial.into(),
            MetricError::NotFound(id) => Self::not_found("Metric", id),
            MetricError::DeviceNotFound(id) => Self::not_found("Device", id),
            MetricError::NoMetrics(_) => Self::NotFound(err.to_string()),
            MetricError::UnknownDevice(_) => Self::validation(err.to_string()),
            MetricError::InvalidRange(range) => range.into(),
            MetricError::Validation(msg) => Self::validation(msg),
            MetricError::Database(msg) => Self::DatabaseError(msg),
            MetricError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MetricListQuery {
    pub device_id: Option<i32>,
}

/// GET /metrics?device_id=
pub async fn list_metrics(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<MetricListQuery>,
) -> Result<Json<ApiResponse<Vec<MetricDto>>>, ApiError> {
    let device_id = query
        .device_id
        .map(|id| validate_id("device", id))
        .transpose()?;

    let metrics = state
        .shared
        .metric_service
        .list(&principal, device_id)
        .await?;

    Ok(Json(ApiResponse::success(metrics)))
}

/// POST /metrics
pub async fn create_metric(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<MetricCreate>,
) -> Result<(StatusCode, Json<ApiResponse<MetricDto>>), ApiError> {
    let metric = state
        .shared
        .metric_service
        .create(&principal, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(metric))))
}

/// GET /metrics/{id}
pub async fn get_metric(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MetricDto>>, ApiError> {
    let id = validate_id("metric", id)?;
    let metric = state.shared.metric_service.get(&principal, id).await?;
    Ok(Json(ApiResponse::success(metric)))
}

/// PUT /metrics/{id}
pub async fn update_metric(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<MetricCreate>,
) -> Result<Json<ApiResponse<MetricDto>>, ApiError> {
    let id = validate_id("metric", id)?;
    let metric = state
        .shared
        .metric_service
        .update(&principal, id, payload)
        .await?;

    Ok(Json(ApiResponse::success(metric)))
}

/// DELETE /metrics/{id}
pub async fn delete_metric(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id("metric", id)?;
    state.shared.metric_service.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /metrics/{id}/history?start_time=&end_time=&interval_minutes=
pub async fn metric_history(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<MetricHistoryDto>>, ApiError> {
    let id = validate_id("metric", id)?;
    let history = state
        .shared
        .metric_service
        .history(&principal, id, query)
        .await?;

    Ok(Json(ApiResponse::success(history)))
}

/// GET /metrics/device/{device_id}/latest
pub async fn latest_for_device(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(device_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<MetricDto>>>, ApiError> {
    let device_id = validate_id("device", device_id)?;
    let latest = state
        .shared
        .metric_service
        .latest_for_device(&principal, device_id)
        .await?;

    Ok(Json(ApiResponse::success(latest)))
}
