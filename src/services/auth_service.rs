//! Domain service for authentication.
//!
//! Handles password login and resolving a bearer token into the principal
//! every other service authorizes against.

use thiserror::Error;

use crate::access::Principal;
use crate::api::types::TokenResponse;
use crate::auth::TokenError;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong password and unknown user are deliberately indistinguishable.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid(_) | TokenError::Expired => Self::Unauthenticated,
            TokenError::Encode(_) | TokenError::UnsupportedAlgorithm(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues a login-lifetime access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError>;

    /// Verifies a bearer token and loads the user it names.
    ///
    /// Performs no writes. Inactive users still resolve; the access engine
    /// rejects them per operation.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] for a bad signature, an expired
    /// token, or a subject that no longer exists.
    async fn resolve_principal(&self, token: &str) -> Result<Principal, AuthError>;
}
