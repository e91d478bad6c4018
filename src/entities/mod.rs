pub mod prelude;

pub mod devices;
pub mod metrics;
pub mod sites;
pub mod subscription_metrics;
pub mod subscriptions;
pub mod user_sites;
pub mod users;
