use axum::{
    Extension, Form, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, TokenRequest, TokenResponse, UserCreate, UserDto};
use crate::access::Principal;
use crate::services::AuthError;

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AuthError::Unauthenticated => Self::unauthenticated(),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves `Authorization: Bearer <token>` into a [`Principal`] and makes it
/// available to handlers as an extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers).ok_or_else(ApiError::unauthenticated)?;

    let principal = state
        .shared
        .auth_service
        .resolve_principal(token)
        .await?;

    tracing::Span::current().record("user_id", principal.user_id);
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/token
/// OAuth2 password flow. The body is returned without the response envelope.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state
        .shared
        .auth_service
        .login(payload.username.trim(), &payload.password)
        .await?;

    tracing::info!(username = %payload.username.trim(), "Access token issued");

    Ok(Json(token))
}

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UserCreate>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let user = state
        .shared
        .user_service
        .register(&principal, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.shared.user_service.me(&principal).await?;
    Ok(Json(ApiResponse::success(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(&headers_with("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers_with("bearer  abc ")), Some("abc"));
        assert_eq!(extract_bearer(&headers_with("Basic abc")), None);
        assert_eq!(extract_bearer(&headers_with("Bearer ")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
