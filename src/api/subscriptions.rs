use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::validation::validate_id;
use super::{
    ApiError, ApiResponse, AppState, HistoryQuery, SubscriptionCreate, SubscriptionDto,
    SubscriptionHistoryDto, SubscriptionLatestDto,
};
use crate::access::Principal;
use crate::services::SubscriptionError;

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::Forbidden(denial) => denial.into(),
            SubscriptionError::NotFound(id) => Self::not_found("Subscription", id),
            SubscriptionError::InvalidMetricIds { ref missing } => {
                tracing::debug!(?missing, "Rejected subscription with unknown metrics");
                Self::validation(err.to_string())
            }
            SubscriptionError::InvalidRange(range) => range.into(),
            SubscriptionError::Validation(msg) => Self::validation(msg),
            SubscriptionError::Database(msg) => Self::DatabaseError(msg),
            SubscriptionError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// GET /subscriptions
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<SubscriptionDto>>>, ApiError> {
    let subscriptions = state.shared.subscription_service.list(&principal).await?;
    Ok(Json(ApiResponse::success(subscriptions)))
}

/// POST /subscriptions
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<SubscriptionCreate>,
) -> Result<(StatusCode, Json<ApiResponse<SubscriptionDto>>), ApiError> {
    let subscription = state
        .shared
        .subscription_service
        .create(&principal, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(subscription))))
}

/// GET /subscriptions/{id}
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SubscriptionDto>>, ApiError> {
    let id = validate_id("subscription", id)?;
    let subscription = state
        .shared
        .subscription_service
        .get(&principal, id)
        .await?;

    Ok(Json(ApiResponse::success(subscription)))
}

/// PUT /subscriptions/{id}
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<SubscriptionCreate>,
) -> Result<Json<ApiResponse<SubscriptionDto>>, ApiError> {
    let id = validate_id("subscription", id)?;
    let subscription = state
        .shared
        .subscription_service
        .update(&principal, id, payload)
        .await?;

    Ok(Json(ApiResponse::success(subscription)))
}

/// DELETE /subscriptions/{id}
pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id("subscription", id)?;
    state
        .shared
        .subscription_service
        .delete(&principal, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /subscriptions/{id}/latest
pub async fn subscription_latest(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SubscriptionLatestDto>>, ApiError> {
    let id = validate_id("subscription", id)?;
    let latest = state
        .shared
        .subscription_service
        .latest(&principal, id)
        .await?;

    Ok(Json(ApiResponse::success(latest)))
}

/// GET /subscriptions/{id}/history?start_time=&end_time=&interval_minutes=
pub async fn subscription_history(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<SubscriptionHistoryDto>>, ApiError> {
    let id = validate_id("subscription", id)?;
    let history = state
        .shared
        .subscription_service
        .history(&principal, id, query)
        .await?;

    Ok(Json(ApiResponse::success(history)))
}
