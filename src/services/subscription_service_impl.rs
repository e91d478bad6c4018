//! `SeaORM` implementation of the `SubscriptionService` trait.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ConnectionTrait;
use tracing::{debug, info};

use crate::access::{self, Operation, Principal, Resource, Target};
use crate::api::types::{
    HistoryQuery, MetricOrigin, SubscriptionCreate, SubscriptionDto, SubscriptionHistoryDto,
    SubscriptionLatestDto, SubscriptionMetricLatest, SubscriptionMetricSeries,
};
use crate::api::validation::validate_name;
use crate::config::HistoryConfig;
use crate::db::{MetricRepository, Store, SubscriptionRepository};
use crate::entities::{metrics, subscriptions};
use crate::history::{self, HistoryError, SeriesMode, TimeWindow};
use crate::services::subscription_service::{SubscriptionError, SubscriptionService};

pub struct SeaOrmSubscriptionService {
    store: Store,
    history: HistoryConfig,
}

impl SeaOrmSubscriptionService {
    #[must_use]
    pub const fn new(store: Store, history: HistoryConfig) -> Self {
        Self { store, history }
    }

    /// Loads the subscription and checks ownership. Missing comes before
    /// forbidden.
    async fn owned<C: ConnectionTrait>(
        subscriptions: &SubscriptionRepository<'_, C>,
        principal: &Principal,
        operation: Operation,
        id: i32,
    ) -> Result<subscriptions::Model, SubscriptionError> {
        let subscription = subscriptions
            .get(id)
            .await?
            .ok_or(SubscriptionError::NotFound(id))?;

        access::ensure(principal, operation, &Target::OwnedBy(subscription.user_id))?;

        Ok(subscription)
    }

    /// Device and site names for each distinct device among `metrics`.
    async fn origins(
        &self,
        metrics: &[metrics::Model],
    ) -> Result<HashMap<i32, MetricOrigin>, SubscriptionError> {
        let device_ids: Vec<i32> = metrics
            .iter()
            .map(|m| m.device_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let devices = self.store.devices().get_many(&device_ids).await?;
        let sites: HashMap<i32, String> = self
            .store
            .sites()
            .list()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        Ok(devices
            .into_iter()
            .map(|d| {
                let origin = MetricOrigin {
                    device_id: d.id,
                    device_name: d.name,
                    site_id: d.site_id,
                    site_name: sites.get(&d.site_id).cloned().unwrap_or_default(),
                };
                (d.id, origin)
            })
            .collect())
    }
}

/// Sorted, deduplicated ids, or the name validation failure.
fn normalize(input: &SubscriptionCreate) -> Result<(String, Vec<i32>), SubscriptionError> {
    let name =
        validate_name("Subscription name", &input.name).map_err(SubscriptionError::Validation)?;
    let ids: BTreeSet<i32> = input.metric_ids.iter().copied().collect();
    Ok((name.to_string(), ids.into_iter().collect()))
}

/// Every id must resolve to a stored metric.
async fn validate_metric_ids<C: ConnectionTrait>(
    metrics: &MetricRepository<'_, C>,
    ids: &[i32],
) -> Result<(), SubscriptionError> {
    let found: BTreeSet<i32> = metrics.get_many(ids).await?.into_iter().map(|m| m.id).collect();
    let missing: Vec<i32> = ids.iter().copied().filter(|id| !found.contains(id)).collect();

    if missing.is_empty() {
        Ok(())
    } else {
        debug!(?missing, "Rejected unknown metric ids");
        Err(SubscriptionError::InvalidMetricIds { missing })
    }
}

#[async_trait]
impl SubscriptionService for SeaOrmSubscriptionService {
    async fn list(&self, principal: &Principal) -> Result<Vec<SubscriptionDto>, SubscriptionError> {
        access::ensure(
            principal,
            Operation::read(Resource::Subscription),
            &Target::OwnedBy(principal.user_id),
        )?;

        let subscriptions = self.store.subscriptions();
        let mut dtos = Vec::new();
        for subscription in subscriptions.list_for_user(principal.user_id).await? {
            let metric_ids = subscriptions.metric_ids(subscription.id).await?;
            dtos.push(SubscriptionDto::new(subscription, metric_ids));
        }
        Ok(dtos)
    }

    async fn get(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<SubscriptionDto, SubscriptionError> {
        let subscriptions = self.store.subscriptions();
        let subscription = Self::owned(
            &subscriptions,
            principal,
            Operation::read(Resource::Subscription),
            id,
        )
        .await?;

        let metric_ids = subscriptions.metric_ids(id).await?;
        Ok(SubscriptionDto::new(subscription, metric_ids))
    }

    async fn create(
        &self,
        principal: &Principal,
        input: SubscriptionCreate,
    ) -> Result<SubscriptionDto, SubscriptionError> {
        access::ensure(
            principal,
            Operation::create(Resource::Subscription),
            &Target::OwnedBy(principal.user_id),
        )?;

        let (name, metric_ids) = normalize(&input)?;

        let txn = self.store.begin().await?;
        validate_metric_ids(&MetricRepository::new(&txn), &metric_ids).await?;

        let subscriptions = SubscriptionRepository::new(&txn);
        let subscription = subscriptions.create(name, principal.user_id).await?;
        subscriptions
            .replace_metrics(subscription.id, &metric_ids)
            .await?;
        txn.commit().await?;

        info!(
            subscription_id = subscription.id,
            metrics = metric_ids.len(),
            "Subscription created"
        );
        Ok(SubscriptionDto::new(subscription, metric_ids))
    }

    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: SubscriptionCreate,
    ) -> Result<SubscriptionDto, SubscriptionError> {
        let txn = self.store.begin().await?;
        let subscriptions = SubscriptionRepository::new(&txn);

        let subscription = Self::owned(
            &subscriptions,
            principal,
            Operation::update(Resource::Subscription),
            id,
        )
        .await?;

        let (name, metric_ids) = normalize(&input)?;
        validate_metric_ids(&MetricRepository::new(&txn), &metric_ids).await?;

        let subscription = subscriptions.rename(subscription, name).await?;
        subscriptions.replace_metrics(id, &metric_ids).await?;
        txn.commit().await?;

        info!(subscription_id = id, "Subscription updated");
        Ok(SubscriptionDto::new(subscription, metric_ids))
    }

    async fn delete(&self, principal: &Principal, id: i32) -> Result<(), SubscriptionError> {
        let txn = self.store.begin().await?;
        let subscriptions = SubscriptionRepository::new(&txn);

        Self::owned(
            &subscriptions,
            principal,
            Operation::delete(Resource::Subscription),
            id,
        )
        .await?;

        subscriptions.delete(id).await?;
        txn.commit().await?;

        info!(subscription_id = id, "Subscription deleted");
        Ok(())
    }

    async fn latest(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<SubscriptionLatestDto, SubscriptionError> {
        let subscriptions = self.store.subscriptions();
        let subscription = Self::owned(
            &subscriptions,
            principal,
            Operation::read(Resource::Subscription),
            id,
        )
        .await?;

        let subscribed = subscriptions.metrics(id).await?;
        let metrics = self.store.metrics();
        let mut latest_rows = Vec::with_capacity(subscribed.len());
        for metric in &subscribed {
            let latest = metrics
                .latest_in_series(metric.device_id, &metric.name)
                .await?
                .unwrap_or_else(|| metric.clone());
            latest_rows.push((metric.id, latest));
        }

        let origins = self.origins(&subscribed).await?;
        let metrics = latest_rows
            .into_iter()
            .filter_map(|(metric_id, latest)| {
                let origin = origins.get(&latest.device_id)?.clone();
                Some(SubscriptionMetricLatest {
                    metric_id,
                    name: latest.name,
                    unit: latest.unit,
                    value: latest.value,
                    timestamp: latest.timestamp,
                    origin,
                })
            })
            .collect();

        Ok(SubscriptionLatestDto {
            subscription_id: subscription.id,
            subscription_name: subscription.name,
            metrics,
        })
    }

    async fn history(
        &self,
        principal: &Principal,
        id: i32,
        query: HistoryQuery,
    ) -> Result<SubscriptionHistoryDto, SubscriptionError> {
        let subscriptions = self.store.subscriptions();
        let subscription = Self::owned(
            &subscriptions,
            principal,
            Operation::read(Resource::Subscription),
            id,
        )
        .await?;

        let window = TimeWindow::from_query(
            query.start_time,
            query.end_time,
            query.interval_minutes,
            &self.history,
            Utc::now(),
        )?;

        let subscribed = subscriptions.metrics(id).await?;

        // The point cap covers the whole response, not each series.
        let total = window.len().saturating_mul(subscribed.len());
        if total > self.history.max_points {
            return Err(HistoryError::TooManyPoints {
                points: u64::try_from(total).unwrap_or(u64::MAX),
                limit: self.history.max_points,
            }
            .into());
        }

        let origins = self.origins(&subscribed).await?;
        let metric_rows = self.store.metrics();

        let mut series = Vec::with_capacity(subscribed.len());
        for metric in subscribed {
            let base = metric_rows
                .latest_in_series(metric.device_id, &metric.name)
                .await?
                .map_or(metric.value, |latest| latest.value);
            let Some(origin) = origins.get(&metric.device_id).cloned() else {
                continue;
            };

            let points = history::synthesize(metric.id, SeriesMode::Relative { base }, &window);
            series.push(SubscriptionMetricSeries {
                metric_id: metric.id,
                name: metric.name,
                unit: metric.unit,
                origin,
                timestamps: points.timestamps,
                values: points.values,
            });
        }

        debug!(
            subscription_id = id,
            metrics = series.len(),
            points = window.len(),
            "Synthesized subscription history"
        );
        Ok(SubscriptionHistoryDto {
            subscription_id: subscription.id,
            subscription_name: subscription.name,
            start_time: window.start(),
            end_time: window.end(),
            interval_minutes: window.interval().num_minutes(),
            metrics: series,
        })
    }
}
