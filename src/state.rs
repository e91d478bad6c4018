use std::sync::Arc;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, DeviceService, MetricService, SeaOrmAuthService, SeaOrmDeviceService,
    SeaOrmMetricService, SeaOrmSiteService, SeaOrmSubscriptionService, SeaOrmUserService,
    SiteService, SubscriptionService, UserService,
};

/// Everything a request needs, built once at startup.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub site_service: Arc<dyn SiteService>,

    pub device_service: Arc<dyn DeviceService>,

    pub metric_service: Arc<dyn MetricService>,

    pub subscription_service: Arc<dyn SubscriptionService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Store) -> anyhow::Result<Self> {
        let auth_service = SeaOrmAuthService::new(store.clone(), &config.auth)
            .map_err(|e| anyhow::anyhow!("Failed to initialize token issuer: {e}"))?;

        Ok(Self {
            auth_service: Arc::new(auth_service),
            user_service: Arc::new(SeaOrmUserService::new(
                store.clone(),
                config.security.clone(),
            )),
            site_service: Arc::new(SeaOrmSiteService::new(store.clone())),
            device_service: Arc::new(SeaOrmDeviceService::new(store.clone())),
            metric_service: Arc::new(SeaOrmMetricService::new(
                store.clone(),
                config.history.clone(),
            )),
            subscription_service: Arc::new(SeaOrmSubscriptionService::new(
                store.clone(),
                config.history.clone(),
            )),
            store,
            config: Arc::new(config),
        })
    }
}
