//! Query filters for listing and cost aggregation.

use super::month;
use crate::error::AppError;
use chrono::NaiveDate;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

/// Filter parameters for listing subscriptions.
///
/// `from`/`to` are month starts; when set, the subscription must
/// intersect `[from, next_month_start(to))`, each side independently
/// optional.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

impl ListFilter {
    /// Pagination guard: a limit outside `[1, 200]` falls back to 50,
    /// a negative offset to 0.
    pub fn normalized(mut self) -> Self {
        if self.limit < 1 || self.limit > MAX_LIMIT {
            self.limit = DEFAULT_LIMIT;
        }
        if self.offset < 0 {
            self.offset = 0;
        }
        self
    }
}

/// Filter parameters for cost aggregation. The month range is mandatory
/// and `to` is inclusive by month.
#[derive(Debug, Clone)]
pub struct TotalFilter {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl TotalFilter {
    /// Reject ranges where `to` precedes `from`, compared at month
    /// granularity.
    pub fn validate(&self) -> Result<(), AppError> {
        let from = month::month_start(self.from);
        let to = month::month_start(self.to);
        if to < from {
            return Err(AppError::InvalidDateRange(anyhow::anyhow!(
                "'to' must be >= 'from'"
            )));
        }
        Ok(())
    }

    /// Exclusive upper bound of the requested window.
    /// From=07-2025, To=10-2025 -> 11-2025.
    pub fn to_exclusive(&self) -> NaiveDate {
        month::next_month_start(self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn normalized_defaults_pagination() {
        let filter = ListFilter::default().normalized();
        assert_eq!(filter.limit, DEFAULT_LIMIT);
        assert_eq!(filter.offset, 0);
    }

    #[test]
    fn normalized_rejects_out_of_range_limit() {
        let too_big = ListFilter {
            limit: 500,
            ..Default::default()
        };
        assert_eq!(too_big.normalized().limit, DEFAULT_LIMIT);

        let negative = ListFilter {
            limit: -3,
            offset: -10,
            ..Default::default()
        };
        let normalized = negative.normalized();
        assert_eq!(normalized.limit, DEFAULT_LIMIT);
        assert_eq!(normalized.offset, 0);
    }

    #[test]
    fn normalized_keeps_valid_pagination() {
        let filter = ListFilter {
            limit: 200,
            offset: 30,
            ..Default::default()
        };
        let normalized = filter.normalized();
        assert_eq!(normalized.limit, 200);
        assert_eq!(normalized.offset, 30);
    }

    #[test]
    fn validate_accepts_equal_months() {
        let filter = TotalFilter {
            user_id: None,
            service_name: None,
            from: ymd(2025, 7, 1),
            to: ymd(2025, 7, 1),
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn validate_compares_at_month_granularity() {
        // Same month, different days: still a valid range.
        let filter = TotalFilter {
            user_id: None,
            service_name: None,
            from: ymd(2025, 7, 20),
            to: ymd(2025, 7, 5),
        };
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_range() {
        let filter = TotalFilter {
            user_id: None,
            service_name: None,
            from: ymd(2025, 10, 1),
            to: ymd(2025, 7, 1),
        };
        assert!(matches!(
            filter.validate().unwrap_err(),
            AppError::InvalidDateRange(_)
        ));
    }

    #[test]
    fn to_exclusive_is_next_month_start() {
        let filter = TotalFilter {
            user_id: None,
            service_name: None,
            from: ymd(2025, 7, 1),
            to: ymd(2025, 10, 1),
        };
        assert_eq!(filter.to_exclusive(), ymd(2025, 11, 1));
    }
}
