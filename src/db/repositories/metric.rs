use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{metrics, prelude::*, subscription_metrics};

#[derive(Debug, Clone)]
pub struct MetricInput {
    pub device_id: i32,
    pub name: String,
    pub unit: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

pub struct MetricRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> MetricRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Newest first; ties broken by id so the order is stable.
    pub async fn list(&self, device_id: Option<i32>) -> Result<Vec<metrics::Model>> {
        let mut query = Metrics::find()
            .order_by_desc(metrics::Column::Timestamp)
            .order_by_desc(metrics::Column::Id);
        if let Some(device_id) = device_id {
            query = query.filter(metrics::Column::DeviceId.eq(device_id));
        }

        query.all(self.conn).await.context("Failed to list metrics")
    }

    pub async fn get(&self, id: i32) -> Result<Option<metrics::Model>> {
        Metrics::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query metric")
    }

    pub async fn get_many(&self, ids: &[i32]) -> Result<Vec<metrics::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Metrics::find()
            .filter(metrics::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(metrics::Column::Id)
            .all(self.conn)
            .await
            .context("Failed to query metrics")
    }

    /// Every row for the device, ordered by name then timestamp.
    pub async fn for_device(&self, device_id: i32) -> Result<Vec<metrics::Model>> {
        Metrics::find()
            .filter(metrics::Column::DeviceId.eq(device_id))
            .order_by_asc(metrics::Column::Name)
            .order_by_asc(metrics::Column::Timestamp)
            .all(self.conn)
            .await
            .context("Failed to query device metrics")
    }

    /// Latest row of the `(device_id, name)` series.
    pub async fn latest_in_series(
        &self,
        device_id: i32,
        name: &str,
    ) -> Result<Option<metrics::Model>> {
        Metrics::find()
            .filter(metrics::Column::DeviceId.eq(device_id))
            .filter(metrics::Column::Name.eq(name))
            .order_by_desc(metrics::Column::Timestamp)
            .order_by_desc(metrics::Column::Id)
            .one(self.conn)
            .await
            .context("Failed to query latest metric")
    }

    pub async fn create(&self, input: MetricInput) -> Result<metrics::Model> {
        metrics::ActiveModel {
            device_id: Set(input.device_id),
            name: Set(input.name),
            unit: Set(input.unit),
            value: Set(input.value),
            timestamp: Set(input.timestamp),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("Failed to insert metric")
    }

    pub async fn update(&self, metric: metrics::Model, input: MetricInput) -> Result<metrics::Model> {
        let mut active: metrics::ActiveModel = metric.into();
        active.device_id = Set(input.device_id);
        active.name = Set(input.name);
        active.unit = Set(input.unit);
        active.value = Set(input.value);
        active.timestamp = Set(input.timestamp);

        active
            .update(self.conn)
            .await
            .context("Failed to update metric")
    }

    /// Deletes the metric and the subscription links pointing at it.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        SubscriptionMetrics::delete_many()
            .filter(subscription_metrics::Column::MetricId.eq(id))
            .exec(self.conn)
            .await
            .context("Failed to unlink metric from subscriptions")?;

        let result = Metrics::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete metric")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete_for_devices(&self, device_ids: &[i32]) -> Result<u64> {
        if device_ids.is_empty() {
            return Ok(0);
        }

        let metric_ids: Vec<i32> = Metrics::find()
            .select_only()
            .column(metrics::Column::Id)
            .filter(metrics::Column::DeviceId.is_in(device_ids.iter().copied()))
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to query device metrics")?;
        if metric_ids.is_empty() {
            return Ok(0);
        }

        SubscriptionMetrics::delete_many()
            .filter(subscription_metrics::Column::MetricId.is_in(metric_ids.iter().copied()))
            .exec(self.conn)
            .await
            .context("Failed to unlink device metrics from subscriptions")?;

        let result = Metrics::delete_many()
            .filter(metrics::Column::Id.is_in(metric_ids))
            .exec(self.conn)
            .await
            .context("Failed to delete device metrics")?;

        Ok(result.rows_affected)
    }
}
