use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{devices, metrics, sites, subscriptions, users};
use crate::entities::users::Role;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Auth
// ============================================================================

/// OAuth2 password-flow response body. Returned as-is, without the envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    #[must_use]
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub site_ids: Vec<i32>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserDto {
    #[must_use]
    pub fn new(user: users::Model, site_ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            site_ids: site_ids.into_iter().collect(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

// ============================================================================
// Sites, devices, metrics
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MetricDto {
    pub id: i32,
    pub device_id: i32,
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<metrics::Model> for MetricDto {
    fn from(metric: metrics::Model) -> Self {
        Self {
            id: metric.id,
            device_id: metric.device_id,
            name: metric.name,
            unit: metric.unit,
            value: metric.value,
            timestamp: metric.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeviceDto {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub site_id: i32,
    pub metrics: Vec<MetricDto>,
}

impl DeviceDto {
    #[must_use]
    pub fn new(device: devices::Model, metrics: Vec<metrics::Model>) -> Self {
        Self {
            id: device.id,
            name: device.name,
            device_type: device.device_type,
            site_id: device.site_id,
            metrics: metrics.into_iter().map(MetricDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SiteDto {
    pub id: i32,
    pub name: String,
    pub location: Option<String>,
    pub devices: Vec<DeviceDto>,
}

impl SiteDto {
    #[must_use]
    pub fn new(site: sites::Model, devices: Vec<DeviceDto>) -> Self {
        Self {
            id: site.id,
            name: site.name,
            location: site.location,
            devices,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteCreate {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCreate {
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    pub site_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricCreate {
    pub device_id: i32,
    pub name: String,
    pub unit: String,
    pub value: f64,
    /// Defaults to the time of the request.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct HistoryQuery {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub interval_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MetricHistoryDto {
    pub metric_id: i32,
    pub unit: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

// ============================================================================
// Subscriptions
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubscriptionDto {
    pub id: i32,
    pub name: String,
    pub user_id: i32,
    pub metric_ids: Vec<i32>,
}

impl SubscriptionDto {
    #[must_use]
    pub fn new(subscription: subscriptions::Model, metric_ids: Vec<i32>) -> Self {
        Self {
            id: subscription.id,
            name: subscription.name,
            user_id: subscription.user_id,
            metric_ids,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionCreate {
    pub name: String,
    #[serde(default)]
    pub metric_ids: Vec<i32>,
}

/// Where a subscribed metric lives.
#[derive(Debug, Clone, Serialize)]
pub struct MetricOrigin {
    pub device_id: i32,
    pub device_name: String,
    pub site_id: i32,
    pub site_name: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionMetricLatest {
    pub metric_id: i32,
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub origin: MetricOrigin,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionLatestDto {
    pub subscription_id: i32,
    pub subscription_name: String,
    pub metrics: Vec<SubscriptionMetricLatest>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionMetricSeries {
    pub metric_id: i32,
    pub name: String,
    pub unit: String,
    #[serde(flatten)]
    pub origin: MetricOrigin,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionHistoryDto {
    pub subscription_id: i32,
    pub subscription_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub interval_minutes: i64,
    pub metrics: Vec<SubscriptionMetricSeries>,
}
