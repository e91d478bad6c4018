//! Domain service for metrics and their synthetic history.

use thiserror::Error;

use crate::access::{Denial, Principal};
use crate::api::types::{HistoryQuery, MetricCreate, MetricDto, MetricHistoryDto};
use crate::history::HistoryError;

/// Errors specific to metric operations.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error(transparent)]
    Forbidden(#[from] Denial),

    #[error("Metric not found: {0}")]
    NotFound(i32),

    #[error("Device not found: {0}")]
    DeviceNotFound(i32),

    /// The device exists but has never recorded a metric.
    #[error("No metrics found for device {0}")]
    NoMetrics(i32),

    /// The request references a device that does not exist.
    #[error("Device {0} does not exist")]
    UnknownDevice(i32),

    #[error(transparent)]
    InvalidRange(#[from] HistoryError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for MetricError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MetricError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for metrics.
#[async_trait::async_trait]
pub trait MetricService: Send + Sync {
    /// Newest first, optionally restricted to one device.
    async fn list(
        &self,
        principal: &Principal,
        device_id: Option<i32>,
    ) -> Result<Vec<MetricDto>, MetricError>;

    async fn get(&self, principal: &Principal, id: i32) -> Result<MetricDto, MetricError>;

    /// Technician or admin, authorized for the device's site.
    async fn create(
        &self,
        principal: &Principal,
        input: MetricCreate,
    ) -> Result<MetricDto, MetricError>;

    /// Moving a metric to another device checks both devices' sites.
    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: MetricCreate,
    ) -> Result<MetricDto, MetricError>;

    /// Also removes the metric from every subscription referencing it.
    async fn delete(&self, principal: &Principal, id: i32) -> Result<(), MetricError>;

    /// Synthetic series in absolute mode, seeded by the metric id.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidRange`] when the window is empty, the
    /// interval is not positive, or the point cap is exceeded.
    async fn history(
        &self,
        principal: &Principal,
        id: i32,
        query: HistoryQuery,
    ) -> Result<MetricHistoryDto, MetricError>;

    /// Latest row per metric name on the device, ordered by name.
    async fn latest_for_device(
        &self,
        principal: &Principal,
        device_id: i32,
    ) -> Result<Vec<MetricDto>, MetricError>;
}
