//! Subscription orchestration: input validation, patch semantics, and
//! the storage contract it drives.

use crate::error::AppError;
use crate::models::{
    month, CreateSubscription, EndDateUpdate, ListFilter, NewSubscription, Subscription,
    TotalFilter, UpdateSubscription,
};
use async_trait::async_trait;

/// Storage contract for subscriptions.
///
/// `list` expects a normalized filter; `update` is a whole-row replace
/// keyed by id and must reject a concurrently-modified row (the entity's
/// `updated_at` is the token read with it).
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn create(&self, sub: NewSubscription) -> Result<i64, AppError>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Subscription>, AppError>;
    async fn update(&self, sub: Subscription) -> Result<Subscription, AppError>;
    async fn delete(&self, id: i64) -> Result<bool, AppError>;
    async fn list(&self, filter: ListFilter) -> Result<Vec<Subscription>, AppError>;
    async fn total_cost(&self, filter: TotalFilter) -> Result<i64, AppError>;
}

/// Validates requests and drives the storage collaborator. All
/// validation happens before the first storage call; storage errors
/// propagate unchanged.
pub struct SubscriptionService<S> {
    store: S,
}

impl<S: SubscriptionStore> SubscriptionService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate and persist a new subscription, returning its id.
    pub async fn create(&self, req: CreateSubscription) -> Result<i64, AppError> {
        if req.service_name.is_empty() || req.user_id.is_empty() || req.start_date.is_empty() {
            return Err(AppError::InvalidInput(anyhow::anyhow!(
                "required fields missing"
            )));
        }
        if req.price < 0 {
            return Err(AppError::InvalidInput(anyhow::anyhow!(
                "price must be >= 0"
            )));
        }

        let start = month::parse_month(&req.start_date)?;
        let end = match &req.end_date {
            Some(token) => {
                let end = month::parse_month(token)?;
                if end < start {
                    return Err(AppError::InvalidInput(anyhow::anyhow!(
                        "end_date before start_date"
                    )));
                }
                Some(end)
            }
            None => None,
        };

        self.store
            .create(NewSubscription {
                service_name: req.service_name,
                price: req.price,
                user_id: req.user_id,
                start_date: start,
                end_date: end,
            })
            .await
    }

    pub async fn get(&self, id: i64) -> Result<Subscription, AppError> {
        if id <= 0 {
            return Err(AppError::InvalidInput(anyhow::anyhow!("invalid id")));
        }
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("subscription {} not found", id)))
    }

    /// Partial update. The end date is merged through its three states;
    /// the `end >= start` invariant is re-checked on the merged result
    /// before anything is written.
    pub async fn update(
        &self,
        id: i64,
        req: UpdateSubscription,
    ) -> Result<Subscription, AppError> {
        if id <= 0 {
            return Err(AppError::InvalidInput(anyhow::anyhow!("invalid id")));
        }

        let mut existing = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("subscription {} not found", id)))?;

        if let Some(service_name) = req.service_name {
            existing.service_name = service_name;
        }
        if let Some(price) = req.price {
            if price < 0 {
                return Err(AppError::InvalidInput(anyhow::anyhow!(
                    "price must be >= 0"
                )));
            }
            existing.price = price;
        }
        if let Some(user_id) = req.user_id {
            if user_id.is_empty() {
                return Err(AppError::InvalidInput(anyhow::anyhow!("user_id empty")));
            }
            existing.user_id = user_id;
        }
        if let Some(token) = req.start_date {
            existing.start_date = month::parse_month(&token)?;
        }
        match req.end_date {
            EndDateUpdate::Unchanged => {}
            EndDateUpdate::Clear => existing.end_date = None,
            EndDateUpdate::Set(token) => existing.end_date = Some(month::parse_month(&token)?),
        }

        if let Some(end) = existing.end_date {
            if end < existing.start_date {
                return Err(AppError::InvalidInput(anyhow::anyhow!(
                    "end_date before start_date"
                )));
            }
        }

        self.store.update(existing).await
    }

    /// Delete by id. Deleting nothing is surfaced as `NotFound`.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if id <= 0 {
            return Err(AppError::InvalidInput(anyhow::anyhow!("invalid id")));
        }
        let deleted = self.store.delete(id).await?;
        if !deleted {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "subscription {} not found",
                id
            )));
        }
        Ok(())
    }

    pub async fn list(&self, filter: ListFilter) -> Result<Vec<Subscription>, AppError> {
        self.store.list(filter.normalized()).await
    }

    /// Total monthly spend across the closed month range of `filter`.
    /// The range is validated before any storage call.
    pub async fn total_cost(&self, filter: TotalFilter) -> Result<i64, AppError> {
        filter.validate()?;
        self.store.total_cost(filter).await
    }
}
