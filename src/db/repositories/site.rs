use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{devices, prelude::*, sites, user_sites};

pub struct SiteRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> SiteRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<sites::Model>> {
        Sites::find()
            .order_by_asc(sites::Column::Id)
            .all(self.conn)
            .await
            .context("Failed to list sites")
    }

    pub async fn get(&self, id: i32) -> Result<Option<sites::Model>> {
        Sites::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query site")
    }

    pub async fn exists(&self, id: i32) -> Result<bool> {
        Ok(self.get(id).await?.is_some())
    }

    pub async fn create(&self, name: String, location: Option<String>) -> Result<sites::Model> {
        sites::ActiveModel {
            name: Set(name),
            location: Set(location),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("Failed to insert site")
    }

    pub async fn device_count(&self, id: i32) -> Result<u64> {
        Devices::find()
            .filter(devices::Column::SiteId.eq(id))
            .count(self.conn)
            .await
            .context("Failed to count site devices")
    }

    /// Removes the site row and its user grants. Devices must already be gone.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        UserSites::delete_many()
            .filter(user_sites::Column::SiteId.eq(id))
            .exec(self.conn)
            .await
            .context("Failed to delete site grants")?;

        let result = Sites::delete_by_id(id)
            .exec(self.conn)
            .await
            .context("Failed to delete site")?;

        Ok(result.rows_affected > 0)
    }
}
