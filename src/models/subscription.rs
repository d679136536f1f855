//! Subscription model and wire shapes.

use super::filter::TotalFilter;
use super::month;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Currency label attached to cost summaries. Prices are integer minor
/// units in this single currency.
pub const CURRENCY: &str = "RUB";

/// A user's subscription to a paid service.
///
/// `start_date` and `end_date` are month starts; `end_date` of `None`
/// means the subscription is still active. Invariant: when present,
/// `end_date >= start_date`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// True when the subscription is active in the month starting at
    /// `month`.
    pub fn active_in(&self, month: NaiveDate) -> bool {
        self.start_date <= month && self.end_date.map_or(true, |end| end >= month)
    }

    /// Interval-intersection test against the half-open month window
    /// `[from, to_exclusive)`. A missing end date behaves as +infinity.
    pub fn intersects(&self, from: NaiveDate, to_exclusive: NaiveDate) -> bool {
        self.end_date.map_or(true, |end| end >= from) && self.start_date < to_exclusive
    }
}

/// Wire representation: months as `MM-YYYY`, `end_date` omitted when
/// the subscription is open-ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionDto {
    pub id: i64,
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl SubscriptionDto {
    pub fn from_entity(sub: &Subscription) -> Self {
        Self {
            id: sub.id,
            service_name: sub.service_name.clone(),
            price: sub.price,
            user_id: sub.user_id.clone(),
            start_date: month::format_month(sub.start_date),
            end_date: sub.end_date.map(month::format_month),
        }
    }
}

/// Create request as received from the transport. Dates are `MM-YYYY`
/// tokens, validated by the orchestration layer.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscription {
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: String,
    pub end_date: Option<String>,
}

/// Validated input for inserting a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// Tri-state end-date patch. The stored value is itself optional, so a
/// plain `Option` cannot distinguish "field not sent" from "field sent
/// as null".
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EndDateUpdate {
    /// Field absent from the request; keep the stored value.
    #[default]
    Unchanged,
    /// Field sent as null; clear the end date.
    Clear,
    /// Field sent with a `MM-YYYY` token.
    Set(String),
}

/// Partial update request. Every field is independently optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubscription {
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_end_date")]
    pub end_date: EndDateUpdate,
}

// Runs only when the field is present; an absent field takes the
// `Unchanged` default.
fn deserialize_end_date<'de, D>(deserializer: D) -> Result<EndDateUpdate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(match value {
        Some(token) => EndDateUpdate::Set(token),
        None => EndDateUpdate::Clear,
    })
}

/// Aggregation result echoed back with the requested window.
#[derive(Debug, Clone, Serialize)]
pub struct CostSummary {
    pub total: i64,
    pub currency: &'static str,
    pub from: String,
    pub to: String,
}

impl CostSummary {
    pub fn new(total: i64, filter: &TotalFilter) -> Self {
        Self {
            total,
            currency: CURRENCY,
            from: month::format_month(filter.from),
            to: month::format_month(filter.to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn subscription(start: NaiveDate, end: Option<NaiveDate>) -> Subscription {
        Subscription {
            id: 1,
            service_name: "Netflix".to_string(),
            price: 500,
            user_id: "60610fee-2bf1-4721-ae6f-7636e79a0cba".to_string(),
            start_date: start,
            end_date: end,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn active_in_includes_both_boundary_months() {
        let sub = subscription(ymd(2025, 7, 1), Some(ymd(2025, 9, 1)));
        assert!(sub.active_in(ymd(2025, 7, 1)));
        assert!(sub.active_in(ymd(2025, 9, 1)));
        assert!(!sub.active_in(ymd(2025, 6, 1)));
        assert!(!sub.active_in(ymd(2025, 10, 1)));
    }

    #[test]
    fn open_ended_subscription_intersects_any_later_window() {
        let sub = subscription(ymd(2024, 1, 1), None);
        assert!(sub.intersects(ymd(2024, 1, 1), ymd(2024, 2, 1)));
        assert!(sub.intersects(ymd(2030, 6, 1), ymd(2031, 6, 1)));
        assert!(sub.intersects(ymd(2099, 1, 1), ymd(2100, 1, 1)));
    }

    #[test]
    fn bounded_subscription_misses_disjoint_windows() {
        let sub = subscription(ymd(2025, 7, 1), Some(ymd(2025, 9, 1)));
        // Window [10-2025, 12-2025) starts after the subscription ended.
        assert!(!sub.intersects(ymd(2025, 10, 1), ymd(2025, 12, 1)));
        // Window [05-2025, 07-2025) ends before the subscription starts.
        assert!(!sub.intersects(ymd(2025, 5, 1), ymd(2025, 7, 1)));
        // Touching either boundary month counts.
        assert!(sub.intersects(ymd(2025, 9, 1), ymd(2025, 12, 1)));
        assert!(sub.intersects(ymd(2025, 5, 1), ymd(2025, 8, 1)));
    }

    #[test]
    fn dto_omits_open_end_date() {
        let sub = subscription(ymd(2025, 7, 19), None);
        let dto = SubscriptionDto::from_entity(&sub);
        assert_eq!(dto.start_date, "07-2025");
        assert_eq!(dto.end_date, None);

        let json = serde_json::to_string(&dto).unwrap();
        assert!(!json.contains("end_date"));
    }

    #[test]
    fn dto_formats_end_date_when_present() {
        let sub = subscription(ymd(2025, 7, 1), Some(ymd(2025, 12, 1)));
        let dto = SubscriptionDto::from_entity(&sub);
        assert_eq!(dto.end_date.as_deref(), Some("12-2025"));

        let json = serde_json::to_string(&dto).unwrap();
        assert!(json.contains(r#""end_date":"12-2025""#));
    }

    #[test]
    fn update_request_distinguishes_absent_null_and_value() {
        let absent: UpdateSubscription = serde_json::from_str(r#"{"price": 600}"#).unwrap();
        assert_eq!(absent.end_date, EndDateUpdate::Unchanged);
        assert_eq!(absent.price, Some(600));

        let null: UpdateSubscription = serde_json::from_str(r#"{"end_date": null}"#).unwrap();
        assert_eq!(null.end_date, EndDateUpdate::Clear);

        let set: UpdateSubscription =
            serde_json::from_str(r#"{"end_date": "12-2025"}"#).unwrap();
        assert_eq!(set.end_date, EndDateUpdate::Set("12-2025".to_string()));
    }

    #[test]
    fn cost_summary_echoes_requested_window() {
        let filter = TotalFilter {
            user_id: None,
            service_name: None,
            from: ymd(2025, 6, 1),
            to: ymd(2025, 9, 1),
        };
        let summary = CostSummary::new(1500, &filter);
        assert_eq!(summary.total, 1500);
        assert_eq!(summary.currency, "RUB");
        assert_eq!(summary.from, "06-2025");
        assert_eq!(summary.to, "09-2025");
    }
}
