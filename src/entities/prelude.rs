pub use super::devices::Entity as Devices;
pub use super::metrics::Entity as Metrics;
pub use super::sites::Entity as Sites;
pub use super::subscription_metrics::Entity as SubscriptionMetrics;
pub use super::subscriptions::Entity as Subscriptions;
pub use super::user_sites::Entity as UserSites;
pub use super::users::Entity as Users;
