//! `SeaORM` implementation of the `SiteService` trait.

use async_trait::async_trait;
use tracing::info;

use crate::access::{self, Operation, Principal, Resource, Target};
use crate::api::types::{DeviceDto, SiteCreate, SiteDto};
use crate::api::validation::validate_name;
use crate::db::{DeviceRepository, SiteRepository, Store};
use crate::entities::sites;
use crate::services::site_service::{SiteError, SiteService};

pub struct SeaOrmSiteService {
    store: Store,
}

impl SeaOrmSiteService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn to_dto(&self, principal: &Principal, site: sites::Model) -> Result<SiteDto, SiteError> {
        if !principal.can_access_site(site.id) {
            return Ok(SiteDto::new(site, Vec::new()));
        }

        let devices = self.store.devices().list(Some(std::slice::from_ref(&site.id))).await?;
        let mut dtos = Vec::with_capacity(devices.len());
        for device in devices {
            let metrics = self.store.metrics().list(Some(device.id)).await?;
            dtos.push(DeviceDto::new(device, metrics));
        }

        Ok(SiteDto::new(site, dtos))
    }
}

#[async_trait]
impl SiteService for SeaOrmSiteService {
    async fn list(&self, principal: &Principal) -> Result<Vec<SiteDto>, SiteError> {
        access::ensure(principal, Operation::read(Resource::Site), &Target::Any)?;

        let sites = self.store.sites().list().await?;
        let mut dtos = Vec::with_capacity(sites.len());
        for site in sites {
            dtos.push(self.to_dto(principal, site).await?);
        }
        Ok(dtos)
    }

    async fn get(&self, principal: &Principal, id: i32) -> Result<SiteDto, SiteError> {
        let site = self
            .store
            .sites()
            .get(id)
            .await?
            .ok_or(SiteError::NotFound(id))?;

        access::ensure(principal, Operation::read(Resource::Site), &Target::Any)?;

        self.to_dto(principal, site).await
    }

    async fn create(
        &self,
        principal: &Principal,
        input: SiteCreate,
    ) -> Result<SiteDto, SiteError> {
        access::ensure(principal, Operation::create(Resource::Site), &Target::Any)?;

        let name = validate_name("Site name", &input.name).map_err(SiteError::Validation)?;
        let location = input
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let site = self.store.sites().create(name.to_string(), location).await?;

        info!(site_id = site.id, "Site created");
        Ok(SiteDto::new(site, Vec::new()))
    }

    async fn delete(&self, principal: &Principal, id: i32, cascade: bool) -> Result<(), SiteError> {
        let txn = self.store.begin().await?;
        let sites = SiteRepository::new(&txn);

        if !sites.exists(id).await? {
            return Err(SiteError::NotFound(id));
        }

        access::ensure(principal, Operation::delete(Resource::Site), &Target::Site(id))?;

        let devices = sites.device_count(id).await?;
        if devices > 0 && !cascade {
            return Err(SiteError::HasDevices {
                site_id: id,
                devices,
            });
        }

        let removed = DeviceRepository::new(&txn).delete_for_site(id).await?;
        sites.delete(id).await?;
        txn.commit().await?;

        info!(site_id = id, devices_removed = removed, "Site deleted");
        Ok(())
    }
}
