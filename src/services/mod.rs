//! Services module for the subscription service.

pub mod database;
pub mod metrics;
pub mod subscription;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics, record_subscription_operation};
pub use subscription::{SubscriptionService, SubscriptionStore};
