//! Domain service for sites.

use thiserror::Error;

use crate::access::{Denial, Principal};
use crate::api::types::{SiteCreate, SiteDto};

/// Errors specific to site operations.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error(transparent)]
    Forbidden(#[from] Denial),

    #[error("Site not found: {0}")]
    NotFound(i32),

    #[error("Site {site_id} still has {devices} device(s); pass cascade=true to delete them")]
    HasDevices { site_id: i32, devices: u64 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SiteError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SiteError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for sites.
#[async_trait::async_trait]
pub trait SiteService: Send + Sync {
    /// Lists every site. Devices are only embedded for sites the caller may
    /// access.
    async fn list(&self, principal: &Principal) -> Result<Vec<SiteDto>, SiteError>;

    async fn get(&self, principal: &Principal, id: i32) -> Result<SiteDto, SiteError>;

    /// Admin only.
    async fn create(&self, principal: &Principal, input: SiteCreate)
    -> Result<SiteDto, SiteError>;

    /// Admin only. Without `cascade`, a site that still owns devices is kept.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::HasDevices`] when devices remain and `cascade` is false.
    async fn delete(&self, principal: &Principal, id: i32, cascade: bool)
    -> Result<(), SiteError>;
}
