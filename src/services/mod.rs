pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserError, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod site_service;
pub mod site_service_impl;
pub use site_service::{SiteError, SiteService};
pub use site_service_impl::SeaOrmSiteService;

pub mod device_service;
pub mod device_service_impl;
pub use device_service::{DeviceError, DeviceService};
pub use device_service_impl::SeaOrmDeviceService;

pub mod metric_service;
pub mod metric_service_impl;
pub use metric_service::{MetricError, MetricService};
pub use metric_service_impl::SeaOrmMetricService;

pub mod subscription_service;
pub mod subscription_service_impl;
pub use subscription_service::{SubscriptionError, SubscriptionService};
pub use subscription_service_impl::SeaOrmSubscriptionService;
