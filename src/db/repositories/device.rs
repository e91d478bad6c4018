use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{devices, prelude::*};

use super::metric::MetricRepository;

pub struct DeviceRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> DeviceRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Lists devices, restricted to `site_ids` when given.
    pub async fn list(&self, site_ids: Option<&[i32]>) -> Result<Vec<devices::Model>> {
        let mut query = Devices::find().order_by_asc(devices::Column::Id);
        if let Some(ids) = site_ids {
            query = query.filter(devices::Column::SiteId.is_in(ids.iter().copied()));
        }

        query.all(self.conn).await.context("Failed to list devices")
    }

    pub async fn get(&self, id: i32) -> Result<Option<devices::Model>> {
        Devices::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query device")
    }

    pub async fn get_many(&self, ids: &[i32]) -> Result<Vec<devices::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Devices::find()
            .filter(devices::Column::Id.is_in(ids.iter().copied()))
            .all(self.conn)
            .await
            .context("Failed to query devices")
    }

    pub async fn create(
        &self,
        name: String,
        device_type: Option<String>,
        site_id: i32,
    ) -> Result<devices::Model> {
        devices::ActiveModel {
            name: Set(name),
            device_type: Set(device_type),
            site_id: Set(site_id),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("Failed to insert device")
    }

    pub async fn update(
        &self,
        device: devices::Model,
        name: String,
        device_type: Option<String>,
        site_id: i32,
    ) -> Result<devices::Model> {
        let mut active: devices::ActiveModel = device.into();
        active.name = Set(name);
        active.device_type = Set(device_type);
        active.site_id = Set(site_id);

        active
            .update(self.conn)
            .await
            .context("Failed to update device")
    }

    /// Deletes the device with every metric it owns and their subscription links.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        MetricRepository::new(self.conn)
            .delete_for_devices(&[id])
            .await?;

        let result = Devices::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete device")?;

        Ok(result.rows_affected > 0)
    }

    /// Cascade used by site deletion. Returns the number of devices removed.
    pub async fn delete_for_site(&self, site_id: i32) -> Result<u64> {
        let ids: Vec<i32> = self
            .list(Some(std::slice::from_ref(&site_id)))
            .await?
            .into_iter()
            .map(|d| d.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        MetricRepository::new(self.conn)
            .delete_for_devices(&ids)
            .await?;

        let result = Devices::delete_many()
            .filter(devices::Column::SiteId.eq(site_id))
            .exec(self.conn)
            .await
            .context("Failed to delete site devices")?;

        Ok(result.rows_affected)
    }
}
