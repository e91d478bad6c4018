//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{debug, info};

use crate::access::Principal;
use crate::api::types::TokenResponse;
use crate::auth::{TokenIssuer, verify_password};
use crate::config::AuthConfig;
use crate::db::Store;
use crate::services::auth_service::{AuthError, AuthService};

pub struct SeaOrmAuthService {
    store: Store,
    tokens: TokenIssuer,
    login_ttl: Duration,
}

impl SeaOrmAuthService {
    pub fn new(store: Store, config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            store,
            tokens: TokenIssuer::from_config(config)?,
            login_ttl: Duration::minutes(i64::from(config.access_token_expire_minutes)),
        })
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let Some(user) = self.store.users().get_by_username(username).await? else {
            debug!(username, "Login for unknown user");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash).await? {
            debug!(username, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&user.username, user.role, Some(self.login_ttl))?;

        info!(user_id = user.id, "User logged in");
        Ok(TokenResponse::bearer(token))
    }

    async fn resolve_principal(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.tokens.verify(token, Utc::now())?;

        let user = self
            .store
            .users()
            .get_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        let authorized_sites = self.store.users().site_ids(user.id).await?;

        Ok(Principal {
            user_id: user.id,
            username: user.username,
            role: user.role,
            is_active: user.is_active,
            authorized_sites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::users::Role;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            secret_key: "auth-service-test-secret".to_string(),
            ..AuthConfig::default()
        }
    }

    async fn service() -> SeaOrmAuthService {
        let store = Store::new("sqlite::memory:").await.unwrap();
        SeaOrmAuthService::new(store, &auth_config()).unwrap()
    }

    #[tokio::test]
    async fn test_login_and_resolve() {
        let service = service().await;

        let token = service.login("admin", "password").await.unwrap();
        assert_eq!(token.token_type, "bearer");

        let principal = service.resolve_principal(&token.access_token).await.unwrap();
        assert_eq!(principal.username, "admin");
        assert_eq!(principal.role, Role::Admin);
        assert!(principal.is_active);
    }

    #[tokio::test]
    async fn test_login_token_uses_login_ttl() {
        let service = service().await;
        let token = service.login("admin", "password").await.unwrap();

        let claims = service
            .tokens()
            .verify(&token.access_token, Utc::now())
            .unwrap();
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_indistinguishable() {
        let service = service().await;

        let wrong_password = service.login("admin", "nope").await.unwrap_err();
        let unknown_user = service.login("ghost", "password").await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_unknown_subject_is_unauthenticated() {
        let service = service().await;
        let token = service.tokens().issue("ghost", Role::Admin, None).unwrap();

        assert!(matches!(
            service.resolve_principal(&token).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthenticated() {
        let service = service().await;
        assert!(matches!(
            service.resolve_principal("garbage").await,
            Err(AuthError::Unauthenticated)
        ));
    }
}
