//! `SeaORM` implementation of the `MetricService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::access::{self, Operation, Principal, Resource, Target};
use crate::api::types::{HistoryQuery, MetricCreate, MetricDto, MetricHistoryDto};
use crate::api::validation::validate_name;
use crate::config::HistoryConfig;
use crate::db::{DeviceRepository, MetricInput, MetricRepository, Store};
use crate::history::{self, SeriesMode, TimeWindow};
use crate::services::metric_service::{MetricError, MetricService};

pub struct SeaOrmMetricService {
    store: Store,
    history: HistoryConfig,
}

impl SeaOrmMetricService {
    #[must_use]
    pub const fn new(store: Store, history: HistoryConfig) -> Self {
        Self { store, history }
    }
}

/// `default_timestamp` applies when the body carries none: now on create, the
/// stored reading time on update.
fn normalize(
    input: MetricCreate,
    default_timestamp: DateTime<Utc>,
) -> Result<MetricInput, MetricError> {
    let name = validate_name("Metric name", &input.name).map_err(MetricError::Validation)?;
    let unit = input.unit.trim();
    if unit.is_empty() {
        return Err(MetricError::Validation("Unit cannot be empty".to_string()));
    }
    if !input.value.is_finite() {
        return Err(MetricError::Validation(
            "Value must be a finite number".to_string(),
        ));
    }

    Ok(MetricInput {
        device_id: input.device_id,
        name: name.to_string(),
        unit: unit.to_string(),
        value: input.value,
        timestamp: input.timestamp.unwrap_or(default_timestamp),
    })
}

#[async_trait]
impl MetricService for SeaOrmMetricService {
    async fn list(
        &self,
        principal: &Principal,
        device_id: Option<i32>,
    ) -> Result<Vec<MetricDto>, MetricError> {
        access::ensure(principal, Operation::read(Resource::Metric), &Target::Any)?;

        let metrics = self.store.metrics().list(device_id).await?;
        Ok(metrics.into_iter().map(MetricDto::from).collect())
    }

    async fn get(&self, principal: &Principal, id: i32) -> Result<MetricDto, MetricError> {
        let metric = self
            .store
            .metrics()
            .get(id)
            .await?
            .ok_or(MetricError::NotFound(id))?;

        access::ensure(principal, Operation::read(Resource::Metric), &Target::Any)?;

        Ok(metric.into())
    }

    async fn create(
        &self,
        principal: &Principal,
        input: MetricCreate,
    ) -> Result<MetricDto, MetricError> {
        // Role gate first; the site is only known once the device is loaded.
        access::ensure(principal, Operation::create(Resource::Metric), &Target::Any)?;
        let input = normalize(input, Utc::now())?;

        let txn = self.store.begin().await?;
        let device = DeviceRepository::new(&txn)
            .get(input.device_id)
            .await?
            .ok_or(MetricError::UnknownDevice(input.device_id))?;

        access::ensure(
            principal,
            Operation::create(Resource::Metric),
            &Target::Site(device.site_id),
        )?;

        let metric = MetricRepository::new(&txn).create(input).await?;
        txn.commit().await?;

        info!(metric_id = metric.id, device_id = metric.device_id, "Metric created");
        Ok(metric.into())
    }

    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: MetricCreate,
    ) -> Result<MetricDto, MetricError> {
        access::ensure(principal, Operation::update(Resource::Metric), &Target::Any)?;

        let txn = self.store.begin().await?;
        let metrics = MetricRepository::new(&txn);
        let devices = DeviceRepository::new(&txn);

        let metric = metrics.get(id).await?.ok_or(MetricError::NotFound(id))?;
        let input = normalize(input, metric.timestamp)?;

        let current = devices
            .get(metric.device_id)
            .await?
            .ok_or(MetricError::DeviceNotFound(metric.device_id))?;
        let target = devices
            .get(input.device_id)
            .await?
            .ok_or(MetricError::UnknownDevice(input.device_id))?;

        access::ensure(
            principal,
            Operation::update(Resource::Metric),
            &Target::SiteTransfer {
                from: current.site_id,
                to: target.site_id,
            },
        )?;

        let metric = metrics.update(metric, input).await?;
        txn.commit().await?;

        info!(metric_id = id, "Metric updated");
        Ok(metric.into())
    }

    async fn delete(&self, principal: &Principal, id: i32) -> Result<(), MetricError> {
        let txn = self.store.begin().await?;
        let metrics = MetricRepository::new(&txn);

        let metric = metrics.get(id).await?.ok_or(MetricError::NotFound(id))?;
        let device = DeviceRepository::new(&txn)
            .get(metric.device_id)
            .await?
            .ok_or(MetricError::DeviceNotFound(metric.device_id))?;

        access::ensure(
            principal,
            Operation::delete(Resource::Metric),
            &Target::Site(device.site_id),
        )?;

        metrics.delete(id).await?;
        txn.commit().await?;

        info!(metric_id = id, "Metric deleted");
        Ok(())
    }

    async fn history(
        &self,
        principal: &Principal,
        id: i32,
        query: HistoryQuery,
    ) -> Result<MetricHistoryDto, MetricError> {
        let metric = self
            .store
            .metrics()
            .get(id)
            .await?
            .ok_or(MetricError::NotFound(id))?;

        access::ensure(principal, Operation::read(Resource::Metric), &Target::Any)?;

        let window = TimeWindow::from_query(
            query.start_time,
            query.end_time,
            query.interval_minutes,
            &self.history,
            Utc::now(),
        )?;
        let series = history::synthesize(metric.id, SeriesMode::Absolute, &window);

        debug!(metric_id = id, points = window.len(), "Synthesized metric history");
        Ok(MetricHistoryDto {
            metric_id: metric.id,
            unit: metric.unit,
            timestamps: series.timestamps,
            values: series.values,
        })
    }

    async fn latest_for_device(
        &self,
        principal: &Principal,
        device_id: i32,
    ) -> Result<Vec<MetricDto>, MetricError> {
        access::ensure(principal, Operation::read(Resource::Metric), &Target::Any)?;

        if self.store.devices().get(device_id).await?.is_none() {
            return Err(MetricError::DeviceNotFound(device_id));
        }

        let rows = self.store.metrics().for_device(device_id).await?;
        if rows.is_empty() {
            return Err(MetricError::NoMetrics(device_id));
        }

        Ok(history::latest_per_name(rows)
            .into_iter()
            .map(MetricDto::from)
            .collect())
    }
}
