use std::collections::BTreeSet;

use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QuerySelect, Set,
};

use crate::entities::{prelude::*, user_sites, users};

/// Fields for a new account. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: users::Role,
    pub is_active: bool,
}

/// Partial update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<users::Role>,
    pub is_active: Option<bool>,
}

pub struct UserRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    #[must_use]
    pub const fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<users::Model>> {
        Users::find_by_id(id)
            .one(self.conn)
            .await
            .context("Failed to query user by ID")
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Username.eq(username))
            .one(self.conn)
            .await
            .context("Failed to query user by username")
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<users::Model>> {
        Users::find()
            .filter(users::Column::Email.eq(email))
            .one(self.conn)
            .await
            .context("Failed to query user by email")
    }

    pub async fn list(&self) -> Result<Vec<users::Model>> {
        Users::find()
            .all(self.conn)
            .await
            .context("Failed to list users")
    }

    /// Returns an existing user, other than `exclude_id`, holding either
    /// `username` or `email`.
    pub async fn find_conflict(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude_id: Option<i32>,
    ) -> Result<Option<users::Model>> {
        let mut identity = Condition::any();
        if let Some(username) = username {
            identity = identity.add(users::Column::Username.eq(username));
        }
        if let Some(email) = email {
            identity = identity.add(users::Column::Email.eq(email));
        }
        if identity.is_empty() {
            return Ok(None);
        }

        let mut query = Users::find().filter(identity);
        if let Some(id) = exclude_id {
            query = query.filter(users::Column::Id.ne(id));
        }

        query
            .one(self.conn)
            .await
            .context("Failed to check for conflicting user")
    }

    pub async fn create(&self, user: NewUser) -> Result<users::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        users::ActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            role: Set(user.role),
            is_active: Set(user.is_active),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.conn)
        .await
        .context("Failed to insert user")
    }

    pub async fn update(&self, user: users::Model, changes: UserChanges) -> Result<users::Model> {
        let mut active: users::ActiveModel = user.into();

        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(password_hash) = changes.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        active
            .update(self.conn)
            .await
            .context("Failed to update user")
    }

    /// Ids of the sites this user is authorized for.
    pub async fn site_ids(&self, user_id: i32) -> Result<BTreeSet<i32>> {
        let ids: Vec<i32> = UserSites::find()
            .select_only()
            .column(user_sites::Column::SiteId)
            .filter(user_sites::Column::UserId.eq(user_id))
            .into_tuple()
            .all(self.conn)
            .await
            .context("Failed to load authorized sites")?;

        Ok(ids.into_iter().collect())
    }

    /// Idempotent: granting an existing authorization is a no-op.
    pub async fn grant_site(&self, user_id: i32, site_id: i32) -> Result<()> {
        let existing = UserSites::find_by_id((user_id, site_id))
            .one(self.conn)
            .await
            .context("Failed to query site grant")?;
        if existing.is_some() {
            return Ok(());
        }

        user_sites::ActiveModel {
            user_id: Set(user_id),
            site_id: Set(site_id),
        }
        .insert(self.conn)
        .await
        .context("Failed to grant site")?;

        Ok(())
    }

    /// Returns whether a grant was removed.
    pub async fn revoke_site(&self, user_id: i32, site_id: i32) -> Result<bool> {
        let result = UserSites::delete_by_id((user_id, site_id))
            .exec(self.conn)
            .await
            .context("Failed to revoke site")?;

        Ok(result.rows_affected > 0)
    }
}
