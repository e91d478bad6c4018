//! Domain service for user accounts and their site authorizations.

use thiserror::Error;

use crate::access::{Denial, Principal};
use crate::api::types::{UserCreate, UserDto, UserUpdate};

/// Errors specific to user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Forbidden(#[from] Denial),

    #[error("User not found: {0}")]
    NotFound(i32),

    #[error("Site not found: {0}")]
    SiteNotFound(i32),

    #[error("{0}")]
    Duplicate(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for users.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// The caller's own account.
    async fn me(&self, principal: &Principal) -> Result<UserDto, UserError>;

    /// Creates an account. Admin only.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Duplicate`] if the username or email is taken.
    async fn register(&self, principal: &Principal, input: UserCreate)
    -> Result<UserDto, UserError>;

    async fn list(&self, principal: &Principal) -> Result<Vec<UserDto>, UserError>;

    async fn get(&self, principal: &Principal, id: i32) -> Result<UserDto, UserError>;

    /// Applies a partial update. Deactivation goes through `is_active`;
    /// accounts are never hard-deleted.
    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: UserUpdate,
    ) -> Result<UserDto, UserError>;

    /// Authorizes the user for a site. Idempotent.
    async fn grant_site(
        &self,
        principal: &Principal,
        id: i32,
        site_id: i32,
    ) -> Result<UserDto, UserError>;

    /// Revokes a site authorization. Revoking an absent grant is a no-op.
    async fn revoke_site(
        &self,
        principal: &Principal,
        id: i32,
        site_id: i32,
    ) -> Result<UserDto, UserError>;
}
