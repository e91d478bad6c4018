//! Seed command handler

use chrono::Utc;
use tracing::info;

use crate::auth::hash_password;
use crate::config::Config;
use crate::db::{
    DeviceRepository, MetricInput, MetricRepository, NewUser, SiteRepository, Store,
    SubscriptionRepository, UserRepository,
};
use crate::entities::users::Role;

struct DemoUser {
    username: &'static str,
    email: &'static str,
    password: &'static str,
    role: Role,
}

const DEMO_USERS: [DemoUser; 2] = [
    DemoUser {
        username: "standard_user",
        email: "standard@example.com",
        password: "standardpass",
        role: Role::Standard,
    },
    DemoUser {
        username: "technician_user",
        email: "tech@example.com",
        password: "techpass",
        role: Role::Technician,
    },
];

pub async fn cmd_seed(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    if seed_demo_data(&store, config).await? {
        println!("Demo data loaded.");
        for user in &DEMO_USERS {
            println!("  {} / {} ({})", user.username, user.password, user.role);
        }
    } else {
        println!("Demo data already present; nothing to do.");
    }

    Ok(())
}

/// Inserts the demo dataset in one transaction. Returns `false` without
/// writing anything when the demo users already exist.
pub async fn seed_demo_data(store: &Store, config: &Config) -> anyhow::Result<bool> {
    if store.users().get_by_username(DEMO_USERS[0].username).await?.is_some() {
        return Ok(false);
    }

    let mut hashes = Vec::with_capacity(DEMO_USERS.len());
    for user in &DEMO_USERS {
        hashes.push(hash_password(user.password, &config.security).await?);
    }

    let txn = store.begin().await?;
    let users = UserRepository::new(&txn);
    let sites = SiteRepository::new(&txn);
    let devices = DeviceRepository::new(&txn);
    let metrics = MetricRepository::new(&txn);
    let subscriptions = SubscriptionRepository::new(&txn);

    let mut created = Vec::with_capacity(DEMO_USERS.len());
    for (user, password_hash) in DEMO_USERS.iter().zip(hashes) {
        created.push(
            users
                .create(NewUser {
                    username: user.username.to_string(),
                    email: user.email.to_string(),
                    password_hash,
                    role: user.role,
                    is_active: true,
                })
                .await?,
        );
    }

    let site_a = sites
        .create("Site A".to_string(), Some("Location A".to_string()))
        .await?;
    let site_b = sites
        .create("Site B".to_string(), Some("Location B".to_string()))
        .await?;

    // Both demo accounts are scoped to Site A; Site B is admin territory.
    for user in &created {
        users.grant_site(user.id, site_a.id).await?;
    }

    let device_1 = devices
        .create("Device 1".to_string(), Some("sensor".to_string()), site_a.id)
        .await?;
    let device_2 = devices
        .create("Device 2".to_string(), Some("sensor".to_string()), site_b.id)
        .await?;

    let now = Utc::now();
    let metric_1 = metrics
        .create(MetricInput {
            device_id: device_1.id,
            name: "Metric 1".to_string(),
            unit: "kW".to_string(),
            value: 10.5,
            timestamp: now,
        })
        .await?;
    let metric_2 = metrics
        .create(MetricInput {
            device_id: device_2.id,
            name: "Metric 2".to_string(),
            unit: "kW".to_string(),
            value: 20.5,
            timestamp: now,
        })
        .await?;

    let subscription = subscriptions
        .create("Subscription 1".to_string(), created[0].id)
        .await?;
    subscriptions
        .replace_metrics(subscription.id, &[metric_1.id, metric_2.id])
        .await?;

    txn.commit().await?;

    info!(
        sites = 2,
        devices = 2,
        metrics = 2,
        "Demo data seeded"
    );
    Ok(true)
}
