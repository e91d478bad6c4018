//! `SeaORM` implementation of the `DeviceService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::access::{self, Operation, Principal, Resource, Target};
use crate::api::types::{DeviceCreate, DeviceDto, MetricDto};
use crate::api::validation::validate_name;
use crate::db::{DeviceRepository, MetricRepository, SiteRepository, Store};
use crate::entities::devices;
use crate::services::device_service::{DeviceError, DeviceService};

pub struct SeaOrmDeviceService {
    store: Store,
}

impl SeaOrmDeviceService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn with_metrics(&self, device: devices::Model) -> Result<DeviceDto, DeviceError> {
        let metrics = self.store.metrics().list(Some(device.id)).await?;
        Ok(DeviceDto::new(device, metrics))
    }
}

fn normalize(input: &DeviceCreate) -> Result<(String, Option<String>), DeviceError> {
    let name = validate_name("Device name", &input.name).map_err(DeviceError::Validation)?;
    let device_type = input
        .device_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok((name.to_string(), device_type))
}

#[async_trait]
impl DeviceService for SeaOrmDeviceService {
    async fn list(
        &self,
        principal: &Principal,
        site_id: Option<i32>,
    ) -> Result<Vec<DeviceDto>, DeviceError> {
        let devices = if let Some(site_id) = site_id {
            access::ensure(
                principal,
                Operation::read(Resource::Device),
                &Target::Site(site_id),
            )?;
            self.store
                .devices()
                .list(Some(std::slice::from_ref(&site_id)))
                .await?
        } else {
            access::ensure(principal, Operation::read(Resource::Device), &Target::Any)?;
            if principal.is_admin() {
                self.store.devices().list(None).await?
            } else {
                let sites: Vec<i32> = principal.authorized_sites.iter().copied().collect();
                self.store.devices().list(Some(&sites)).await?
            }
        };

        let mut dtos = Vec::with_capacity(devices.len());
        for device in devices {
            dtos.push(self.with_metrics(device).await?);
        }
        Ok(dtos)
    }

    async fn get(&self, principal: &Principal, id: i32) -> Result<DeviceDto, DeviceError> {
        let device = self
            .store
            .devices()
            .get(id)
            .await?
            .ok_or(DeviceError::NotFound(id))?;

        access::ensure(
            principal,
            Operation::read(Resource::Device),
            &Target::Site(device.site_id),
        )?;

        self.with_metrics(device).await
    }

    async fn create(
        &self,
        principal: &Principal,
        input: DeviceCreate,
    ) -> Result<DeviceDto, DeviceError> {
        access::ensure(
            principal,
            Operation::create(Resource::Device),
            &Target::Site(input.site_id),
        )?;

        let (name, device_type) = normalize(&input)?;

        let txn = self.store.begin().await?;
        if !SiteRepository::new(&txn).exists(input.site_id).await? {
            return Err(DeviceError::SiteNotFound(input.site_id));
        }

        let device = DeviceRepository::new(&txn)
            .create(name, device_type, input.site_id)
            .await?;
        txn.commit().await?;

        info!(device_id = device.id, site_id = device.site_id, "Device created");
        Ok(DeviceDto::new(device, Vec::new()))
    }

    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: DeviceCreate,
    ) -> Result<DeviceDto, DeviceError> {
        let txn = self.store.begin().await?;
        let devices = DeviceRepository::new(&txn);

        let device = devices.get(id).await?.ok_or(DeviceError::NotFound(id))?;

        access::ensure(
            principal,
            Operation::update(Resource::Device),
            &Target::SiteTransfer {
                from: device.site_id,
                to: input.site_id,
            },
        )?;

        let (name, device_type) = normalize(&input)?;

        if input.site_id != device.site_id && !SiteRepository::new(&txn).exists(input.site_id).await?
        {
            return Err(DeviceError::SiteNotFound(input.site_id));
        }

        let previous_site = device.site_id;
        let device = devices.update(device, name, device_type, input.site_id).await?;
        let metrics = MetricRepository::new(&txn).list(Some(device.id)).await?;
        txn.commit().await?;

        info!(
            device_id = device.id,
            from_site = previous_site,
            to_site = device.site_id,
            "Device updated"
        );
        Ok(DeviceDto::new(device, metrics))
    }

    async fn delete(&self, principal: &Principal, id: i32) -> Result<(), DeviceError> {
        let txn = self.store.begin().await?;
        let devices = DeviceRepository::new(&txn);

        let device = devices.get(id).await?.ok_or(DeviceError::NotFound(id))?;

        access::ensure(
            principal,
            Operation::delete(Resource::Device),
            &Target::Site(device.site_id),
        )?;

        devices.delete(id).await?;
        txn.commit().await?;

        info!(device_id = id, site_id = device.site_id, "Device deleted");
        Ok(())
    }

    async fn metrics(
        &self,
        principal: &Principal,
        id: i32,
    ) -> Result<Vec<MetricDto>, DeviceError> {
        let device = self
            .store
            .devices()
            .get(id)
            .await?
            .ok_or(DeviceError::NotFound(id))?;

        access::ensure(
            principal,
            Operation::read(Resource::Metric),
            &Target::Site(device.site_id),
        )?;

        let metrics = self.store.metrics().list(Some(device.id)).await?;
        Ok(metrics.into_iter().map(MetricDto::from).collect())
    }
}
