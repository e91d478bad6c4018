//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;
use sea_orm::ConnectionTrait;
use tracing::info;

use crate::access::{self, Operation, Principal, Resource, Target};
use crate::api::types::{UserCreate, UserDto, UserUpdate};
use crate::api::validation::{validate_email, validate_name, validate_password};
use crate::auth::hash_password;
use crate::config::SecurityConfig;
use crate::db::{NewUser, SiteRepository, Store, UserChanges, UserRepository};
use crate::services::user_service::{UserError, UserService};

pub struct SeaOrmUserService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    /// Creates an account without an authorization check. Used by
    /// registration and by the CLI.
    pub async fn provision(&self, input: UserCreate) -> Result<UserDto, UserError> {
        let username = validate_name("Username", &input.username).map_err(UserError::Validation)?;
        let email = validate_email(&input.email).map_err(UserError::Validation)?;
        validate_password(&input.password, self.security.min_password_length)
            .map_err(UserError::Validation)?;

        let password_hash = hash_password(&input.password, &self.security).await?;

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);

        ensure_unique(&users, Some(username), Some(email), None).await?;

        let user = users
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role: input.role,
                is_active: true,
            })
            .await?;

        txn.commit().await?;

        info!(user_id = user.id, role = %user.role, "User created");
        Ok(UserDto::new(user, []))
    }

    async fn load<C: ConnectionTrait>(
        users: &UserRepository<'_, C>,
        id: i32,
    ) -> Result<UserDto, UserError> {
        let user = users.get_by_id(id).await?.ok_or(UserError::NotFound(id))?;
        let sites = users.site_ids(id).await?;
        Ok(UserDto::new(user, sites))
    }
}

fn read_target(principal: &Principal, id: i32) -> Target {
    if principal.user_id == id {
        Target::OwnedBy(id)
    } else {
        Target::Any
    }
}

async fn ensure_unique<C: ConnectionTrait>(
    users: &UserRepository<'_, C>,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i32>,
) -> Result<(), UserError> {
    if let Some(existing) = users.find_conflict(username, email, exclude_id).await? {
        if username.is_some_and(|u| u == existing.username) {
            return Err(UserError::Duplicate("Username already registered".to_string()));
        }
        return Err(UserError::Duplicate("Email already registered".to_string()));
    }
    Ok(())
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn me(&self, principal: &Principal) -> Result<UserDto, UserError> {
        access::ensure(
            principal,
            Operation::read(Resource::User),
            &Target::OwnedBy(principal.user_id),
        )?;

        Self::load(&self.store.users(), principal.user_id).await
    }

    async fn register(
        &self,
        principal: &Principal,
        input: UserCreate,
    ) -> Result<UserDto, UserError> {
        access::ensure(principal, Operation::create(Resource::User), &Target::Any)?;
        self.provision(input).await
    }

    async fn list(&self, principal: &Principal) -> Result<Vec<UserDto>, UserError> {
        access::ensure(principal, Operation::read(Resource::User), &Target::Any)?;

        let users = self.store.users();
        let mut dtos = Vec::new();
        for user in users.list().await? {
            let sites = users.site_ids(user.id).await?;
            dtos.push(UserDto::new(user, sites));
        }
        Ok(dtos)
    }

    async fn get(&self, principal: &Principal, id: i32) -> Result<UserDto, UserError> {
        let users = self.store.users();
        if users.get_by_id(id).await?.is_none() {
            return Err(UserError::NotFound(id));
        }

        access::ensure(
            principal,
            Operation::read(Resource::User),
            &read_target(principal, id),
        )?;

        Self::load(&users, id).await
    }

    async fn update(
        &self,
        principal: &Principal,
        id: i32,
        input: UserUpdate,
    ) -> Result<UserDto, UserError> {
        access::ensure(principal, Operation::update(Resource::User), &Target::Any)?;

        let username = input
            .username
            .as_deref()
            .map(|u| validate_name("Username", u))
            .transpose()
            .map_err(UserError::Validation)?;
        let email = input
            .email
            .as_deref()
            .map(validate_email)
            .transpose()
            .map_err(UserError::Validation)?;

        let password_hash = match input.password.as_deref() {
            Some(password) => {
                validate_password(password, self.security.min_password_length)
                    .map_err(UserError::Validation)?;
                Some(hash_password(password, &self.security).await?)
            }
            None => None,
        };

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);

        let user = users.get_by_id(id).await?.ok_or(UserError::NotFound(id))?;
        ensure_unique(&users, username, email, Some(id)).await?;

        let changes = UserChanges {
            username: username.map(str::to_string),
            email: email.map(str::to_string),
            password_hash,
            role: input.role,
            is_active: input.is_active,
        };
        users.update(user, changes).await?;

        let dto = Self::load(&users, id).await?;
        txn.commit().await?;

        info!(user_id = id, "User updated");
        Ok(dto)
    }

    async fn grant_site(
        &self,
        principal: &Principal,
        id: i32,
        site_id: i32,
    ) -> Result<UserDto, UserError> {
        access::ensure(principal, Operation::update(Resource::User), &Target::Any)?;

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);

        if users.get_by_id(id).await?.is_none() {
            return Err(UserError::NotFound(id));
        }
        if !SiteRepository::new(&txn).exists(site_id).await? {
            return Err(UserError::SiteNotFound(site_id));
        }

        users.grant_site(id, site_id).await?;
        let dto = Self::load(&users, id).await?;
        txn.commit().await?;

        info!(user_id = id, site_id, "Site access granted");
        Ok(dto)
    }

    async fn revoke_site(
        &self,
        principal: &Principal,
        id: i32,
        site_id: i32,
    ) -> Result<UserDto, UserError> {
        access::ensure(principal, Operation::update(Resource::User), &Target::Any)?;

        let txn = self.store.begin().await?;
        let users = UserRepository::new(&txn);

        if users.get_by_id(id).await?.is_none() {
            return Err(UserError::NotFound(id));
        }

        if users.revoke_site(id, site_id).await? {
            info!(user_id = id, site_id, "Site access revoked");
        }
        let dto = Self::load(&users, id).await?;
        txn.commit().await?;

        Ok(dto)
    }
}
