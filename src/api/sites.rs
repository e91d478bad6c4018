use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, SiteCreate, SiteDto};
use crate::access::Principal;
use crate::services::SiteError;

impl From<SiteError> for ApiError {
    fn from(err: SiteError) -> Self {
        match err {
            SiteError::Forbidden(denial) => denial.into(),
            SiteError::NotFound(id) => Self::not_found("Site", id),
            SiteError::HasDevices { .. } => Self::Conflict(err.to_string()),
            SiteError::Validation(msg) => Self::validation(msg),
            SiteError::Database(msg) => Self::DatabaseError(msg),
            SiteError::Internal(msg) => Self::internal(msg),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteSiteQuery {
    #[serde(default)]
    pub cascade: bool,
}

/// GET /sites
pub async fn list_sites(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<Vec<SiteDto>>>, ApiError> {
    let sites = state.shared.site_service.list(&principal).await?;
    Ok(Json(ApiResponse::success(sites)))
}

/// POST /sites
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<SiteCreate>,
) -> Result<(StatusCode, Json<ApiResponse<SiteDto>>), ApiError> {
    let site = state
        .shared
        .site_service
        .create(&principal, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(site))))
}

/// GET /sites/{id}
pub async fn get_site(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<SiteDto>>, ApiError> {
    let id = validate_id("site", id)?;
    let site = state.shared.site_service.get(&principal, id).await?;
    Ok(Json(ApiResponse::success(site)))
}

/// DELETE /sites/{id}?cascade=true
pub async fn delete_site(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i32>,
    Query(query): Query<DeleteSiteQuery>,
) -> Result<StatusCode, ApiError> {
    let id = validate_id("site", id)?;

    state
        .shared
        .site_service
        .delete(&principal, id, query.cascade)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
