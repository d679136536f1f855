//! Database service: PostgreSQL storage for subscriptions.

use crate::error::AppError;
use crate::models::{month, ListFilter, NewSubscription, Subscription, TotalFilter};
use crate::services::metrics::{record_subscription_operation, DB_QUERY_DURATION};
use crate::services::subscription::SubscriptionStore;
use async_trait::async_trait;
use chrono::Months;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "subscription-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for Database {
    /// Insert a subscription and return its generated id.
    #[instrument(skip(self, sub), fields(service_name = %sub.service_name))]
    async fn create(&self, sub: NewSubscription) -> Result<i64, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_subscription"])
            .start_timer();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO subscriptions (service_name, price, user_id, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&sub.service_name)
        .bind(sub.price)
        .bind(&sub.user_id)
        .bind(sub.start_date)
        .bind(sub.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create subscription: {}", e))
        })?;

        timer.observe_duration();
        record_subscription_operation("create");
        info!(subscription_id = id, "Subscription created");

        Ok(id)
    }

    /// Get a subscription by id.
    #[instrument(skip(self), fields(subscription_id = %id))]
    async fn get_by_id(&self, id: i64) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, service_name, price, user_id, start_date, end_date, created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    /// Whole-row replace guarded by the last-seen `updated_at`; a row
    /// rewritten by a concurrent caller no longer matches and the update
    /// is rejected with `Conflict`.
    #[instrument(skip(self, sub), fields(subscription_id = %sub.id))]
    async fn update(&self, sub: Subscription) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_subscription"])
            .start_timer();

        let updated = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET service_name = $1,
                price = $2,
                user_id = $3,
                start_date = $4,
                end_date = $5,
                updated_at = now()
            WHERE id = $6 AND updated_at = $7
            RETURNING id, service_name, price, user_id, start_date, end_date, created_at, updated_at
            "#,
        )
        .bind(&sub.service_name)
        .bind(sub.price)
        .bind(&sub.user_id)
        .bind(sub.start_date)
        .bind(sub.end_date)
        .bind(sub.id)
        .bind(sub.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update subscription: {}", e))
        })?;

        timer.observe_duration();

        match updated {
            Some(row) => {
                record_subscription_operation("update");
                info!(subscription_id = row.id, "Subscription updated");
                Ok(row)
            }
            // Zero rows matched: either the row is gone or a concurrent
            // writer bumped updated_at.
            None => match self.get_by_id(sub.id).await? {
                Some(_) => Err(AppError::Conflict(anyhow::anyhow!(
                    "subscription {} was modified concurrently",
                    sub.id
                ))),
                None => Err(AppError::NotFound(anyhow::anyhow!(
                    "subscription {} not found",
                    sub.id
                ))),
            },
        }
    }

    /// Delete by id, reporting whether a row was removed.
    #[instrument(skip(self), fields(subscription_id = %id))]
    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_subscription"])
            .start_timer();

        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete subscription: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            record_subscription_operation("delete");
            info!(subscription_id = id, "Subscription deleted");
        }

        Ok(deleted)
    }

    /// List subscriptions matching the filter, ordered by id.
    #[instrument(skip(self, filter))]
    async fn list(&self, filter: ListFilter) -> Result<Vec<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_subscriptions"])
            .start_timer();

        let from = filter.from.map(month::month_start);
        let to_exclusive = filter.to.map(month::next_month_start);

        let subscriptions = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT id, service_name, price, user_id, start_date, end_date, created_at, updated_at
            FROM subscriptions
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR service_name = $2)
              AND ($3::date IS NULL OR end_date IS NULL OR end_date >= $3)
              AND ($4::date IS NULL OR start_date < $4)
            ORDER BY id
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.user_id.as_deref().filter(|s| !s.is_empty()))
        .bind(filter.service_name.as_deref().filter(|s| !s.is_empty()))
        .bind(from)
        .bind(to_exclusive)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list subscriptions: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscriptions)
    }

    /// Sum the monthly price of every subscription over each month of
    /// the closed range `[from, to]`, one charge per active month.
    #[instrument(skip(self, filter))]
    async fn total_cost(&self, filter: TotalFilter) -> Result<i64, AppError> {
        filter.validate()?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["total_cost"])
            .start_timer();

        let from = month::month_start(filter.from);
        // generate_series is inclusive on both ends, so the series stops
        // one month short of the exclusive bound.
        let series_end = filter.to_exclusive() - Months::new(1);

        let total: i64 = sqlx::query_scalar(
            r#"
            WITH months AS (
                SELECT generate_series($3::date, $4::date, interval '1 month')::date AS m
            )
            SELECT COALESCE(SUM(s.price), 0)::bigint
            FROM months
            JOIN subscriptions s
              ON s.start_date <= months.m
             AND (s.end_date IS NULL OR s.end_date >= months.m)
            WHERE ($1::text IS NULL OR s.user_id = $1)
              AND ($2::text IS NULL OR s.service_name = $2)
            "#,
        )
        .bind(filter.user_id.as_deref().filter(|s| !s.is_empty()))
        .bind(filter.service_name.as_deref().filter(|s| !s.is_empty()))
        .bind(from)
        .bind(series_end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to total subscription cost: {}", e))
        })?;

        timer.observe_duration();

        Ok(total)
    }
}
