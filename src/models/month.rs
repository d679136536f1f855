//! Month-granularity date arithmetic.
//!
//! Every stored or filtered date in this service is the first day of a
//! calendar month (UTC). The wire format for a month is `MM-YYYY`.

use crate::error::AppError;
use chrono::{Datelike, Months, NaiveDate};

/// First day of the month containing `date`. Idempotent.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
        .expect("day 1 exists in every month")
}

/// First day of the month after the one containing `date`.
pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    month_start(date) + Months::new(1)
}

/// Parse a `MM-YYYY` token (two-digit month, four-digit year) into the
/// month start it names. Anything else is rejected.
pub fn parse_month(token: &str) -> Result<NaiveDate, AppError> {
    token
        .split_once('-')
        .filter(|(m, y)| m.len() == 2 && y.len() == 4)
        .and_then(|(m, y)| {
            let month = m.parse::<u32>().ok()?;
            let year = y.parse::<u16>().ok()?;
            NaiveDate::from_ymd_opt(i32::from(year), month, 1)
        })
        .ok_or_else(|| {
            AppError::InvalidInput(anyhow::anyhow!(
                "invalid date format {:?} (expected MM-YYYY)",
                token
            ))
        })
}

/// Format the month containing `date` as `MM-YYYY`.
pub fn format_month(date: NaiveDate) -> String {
    format!("{:02}-{:04}", date.month(), date.year())
}

/// Month starts in the half-open window `[from, to_exclusive)`.
pub fn month_span(from: NaiveDate, to_exclusive: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(month_start(from)), |m| Some(*m + Months::new(1)))
        .take_while(move |m| *m < to_exclusive)
}
