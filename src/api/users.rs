use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, UserDto, UserUpdate};
use crate::access::Principal;
use crate::services::UserError;

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Forbidden(denial) => denial.into(),
            UserError::NotFound(id) => Self::not_found("User", id),
            UserError::SiteNotFound(id) => Self::not_found("Site", id),
            UserError::Duplicate(msg) | UserError::Validation(msg) => Self::validation(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// GET /users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let users = state.shared.user_service.list(&principal).await?;
    Ok(Json(ApiResponse::success(users)))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_id("user", id)?;
    let user = state.shared.user_service.get(&principal, id).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_id("user", id)?;
    let user = state
        .shared
        .user_service
        .update(&principal, id, payload)
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

/// PUT /users/{id}/sites/{site_id}
pub async fn grant_site(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((id, site_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_id("user", id)?;
    let site_id = validate_id("site", site_id)?;

    let user = state
        .shared
        .user_service
        .grant_site(&principal, id, site_id)
        .await?;

    Ok(Json(ApiResponse::success(user)))
}

/// DELETE /users/{id}/sites/{site_id}
pub async fn revoke_site(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path((id, site_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_id("user", id)?;
    let site_id = validate_id("site", site_id)?;

    let user = state
        .shared
        .user_service
        .revoke_site(&principal, id, site_id)
        .await?;

    Ok(Json(ApiResponse::success(user)))
}
