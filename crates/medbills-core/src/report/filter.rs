//! Inclusive date-range filtering.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{ReportError, ReportResult};
use crate::models::Bill;

/// Number of days the report range covers by default.
pub const DEFAULT_RANGE_DAYS: i64 = 30;

/// An inclusive date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ReportResult<Self> {
        if start > end {
            return Err(ReportError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// `today - days ..= today`
    pub fn last_days(today: NaiveDate, days: i64) -> Self {
        let start = today
            .checked_sub_signed(Duration::days(days.max(0)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Bills dated inside `range`, in input order.
pub fn filter_bills(bills: &[Bill], range: &DateRange) -> Vec<Bill> {
    bills
        .iter()
        .filter(|bill| range.contains(bill.bill_date))
        .cloned()
        .collect()
}
