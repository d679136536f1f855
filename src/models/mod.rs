//! Domain models for the subscription service.

pub mod month;

mod filter;
mod subscription;

pub use filter::{ListFilter, TotalFilter, DEFAULT_LIMIT, MAX_LIMIT};
pub use subscription::{
    CostSummary, CreateSubscription, EndDateUpdate, NewSubscription, Subscription,
    SubscriptionDto, UpdateSubscription, CURRENCY,
};
