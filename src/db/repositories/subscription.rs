use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{metrics, prelude::*, subscription_metrics, subscriptions};

pub struct SubscriptionRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SubscriptionRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<subscriptions::Model>> {
        Subscriptions::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .order_by_asc(subscriptions::Column::Id)
            .all(self.conn)
            .await
            .context("Failed to list subscriptions")
    }

    pub async fn get(&self, id: i32) -> Result<Option<subscriptions::Model>> {
        Subscriptions::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query subscription")
    }

    pub async fn create(&self, name: String, user_id: i32) -> Result<subscriptions::Model> {
        subscriptions::ActiveModel {
            name: Set(name),
            user_id: Set(user_id),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("Failed to insert subscription")
    }

    pub async fn rename(
        &self,
        subscription: subscriptions::Model,
        name: String,
    ) -> Result<subscriptions::Model> {
        let mut active: subscriptions::ActiveModel = subscription.into();
        active.name = Set(name);

        active
            .update(self.conn)
            .await
            .context("Failed to update subscription")
    }

    pub async fn metric_ids(&self, subscription_id: i32) -> Result<Vec<i32>> {
        SubscriptionMetrics::find()
            .select_only()
            .column(subscription_metrics::Column::MetricId)
            .filter(subscription_metrics::Column::SubscriptionId.eq(subscription_id))
            .order_by_asc(subscription_metrics::Column::MetricId)
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to load subscription metric ids")
    }

    pub async fn metrics(&self, subscription_id: i32) -> Result<Vec<metrics::Model>> {
        Metrics::find()
            .inner_join(SubscriptionMetrics)
            .filter(subscription_metrics::Column::SubscriptionId.eq(subscription_id))
            .order_by_asc(metrics::Column::Id)
            .all(self.conn)
            .await
            .context("Failed to load subscription metrics")
    }

    /// Replaces the whole link set. Callers validate the ids first.
    pub async fn replace_metrics(&self, subscription_id: i32, metric_ids: &[i32]) -> Result<()> {
        SubscriptionMetrics::delete_many()
            .filter(subscription_metrics::Column::SubscriptionId.eq(subscription_id))
            .exec(self.conn)
            .await
            .context("Failed to clear subscription metrics")?;

        if metric_ids.is_empty() {
            return Ok(());
        }

        let links = metric_ids
            .iter()
            .map(|&metric_id| subscription_metrics::ActiveModel {
                subscription_id: Set(subscription_id),
                metric_id: Set(metric_id),
            });

        SubscriptionMetrics::insert_many(links)
            .exec(self.conn)
            .await
            .context("Failed to link subscription metrics")?;

        Ok(())
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        SubscriptionMetrics::delete_many()
            .filter(subscription_metrics::Column::SubscriptionId.eq(id))
            .exec(self.conn)
            .await
            .context("Failed to clear subscription metrics")?;

        let result = Subscriptions::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete subscription")?;

        Ok(result.rows_affected > 0)
    }
}
