//! Domain service for per-user metric subscriptions.
//!
//! Subscriptions are private to their owner. Admins get no bypass here.

use thiserror::Error;

use crate::access::{Denial, Principal};
use crate::api::types::{
    HistoryQuery, SubscriptionCreate, SubscriptionDto, SubscriptionHistoryDto,
    SubscriptionLatestDto,
};
use crate::history::HistoryError;

/// Errors specific to subscription operations.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Forbidden(#[from] Denial),

    #[error("Subscription not found: {0}")]
    NotFound(i32),

    /// At least one requested metric id does not resolve. Nothing is written.
    #[error("One or more metric IDs are invalid")]
    InvalidMetricIds { missing: Vec<i32> },

    #[error(transparent)]
    InvalidRange(#[from] HistoryError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SubscriptionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SubscriptionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Domain service trait for subscriptions.
#[async_trait::async_trait]
pub trait SubscriptionService: Send + Sync {
    /// The caller's own subscriptions.
    async fn list(&self, principal: &Principal) -> Result<Vec<SubscriptionDto>, SubscriptionError>;

    async fn get(&self, principal: &Principal, id: i32)
    -> Result<SubscriptionDto, SubscriptionError>;

    /// Owned by the caller. All metric ids must exist or nothing is created.
    async fn create(
        &self,
        principal: &Principal,
        input: SubscriptionCreate,
    ) -> Result<SubscriptionDto, SubscriptionError>;

    /// Renames and replaces the metric set atomically.
    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: SubscriptionCreate,
    ) -> Result<SubscriptionDto, SubscriptionError>;

    async fn delete(&self, principal: &Principal, id: i32) -> Result<(), SubscriptionError>;

    /// Latest value of each subscribed metric's series, with device and site.
    async fn latest(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<SubscriptionLatestDto, SubscriptionError>;

    /// Relative-mode series per subscribed metric around its latest value.
    async fn history(
        &self,
        principal: &Principal,
        id: i32,
        query: HistoryQuery,
    ) -> Result<SubscriptionHistoryDto, SubscriptionError>;
}
