//! Domain service for devices.
//!
//! Every operation is site-scoped through the access engine: callers only
//! see and change devices on sites they are authorized for.

use thiserror::Error;

use crate::access::{Denial, Principal};
use crate::api::types::{DeviceCreate, DeviceDto, MetricDto};

/// Errors specific to device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Forbidden(#[from] Denial),

    #[error("Device not found: {0}")]
    NotFound(i32),

    /// The request references a site that does not exist.
    #[error("Site not found: {0}")]
    SiteNotFound(i32),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for DeviceError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for DeviceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for devices.
#[async_trait::async_trait]
pub trait DeviceService: Send + Sync {
    /// With `site_id`, the caller must be authorized for that site. Without it,
    /// non-admins get only devices on their authorized sites.
    async fn list(
        &self,
        principal: &Principal,
        site_id: Option<i32>,
    ) -> Result<Vec<DeviceDto>, DeviceError>;

    async fn get(&self, principal: &Principal, id: i32) -> Result<DeviceDto, DeviceError>;

    /// Technician or admin, authorized for the requested site.
    ///
    /// # Errors
    ///
    /// Site authorization is checked before the site's existence, so
    /// [`DeviceError::Forbidden`] wins over [`DeviceError::SiteNotFound`].
    async fn create(
        &self,
        principal: &Principal,
        input: DeviceCreate,
    ) -> Result<DeviceDto, DeviceError>;

    /// Checks the current site always and the new site only if it differs.
    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: DeviceCreate,
    ) -> Result<DeviceDto, DeviceError>;

    /// Removes the device and every metric it owns.
    async fn delete(&self, principal: &Principal, id: i32) -> Result<(), DeviceError>;

    /// Metrics recorded by the device, newest first.
    async fn metrics(&self, principal: &Principal, id: i32)
    -> Result<Vec<MetricDto>, DeviceError>;
}
