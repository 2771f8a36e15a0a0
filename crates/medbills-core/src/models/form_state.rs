//! Pending bill form state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bill::{non_negative, parse_date};

/// Values typed into (or extracted for) the bill form but not yet saved.
///
/// Session-scoped and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingFormState {
    pub vendor_name: String,
    pub bill_no: String,
    /// `None` when the user blanked the date field
    pub bill_date: Option<NaiveDate>,
    pub bill_amount: f64,
    pub doctor_name: Option<String>,
}

impl PendingFormState {
    /// Defaults: empty text, today's date, zero amount, no doctor.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            vendor_name: String::new(),
            bill_no: String::new(),
            bill_date: Some(today),
            bill_amount: 0.0,
            doctor_name: None,
        }
    }

    /// Overwrite every field with what the user submitted.
    ///
    /// Unparseable dates become `None` (caught by validation); unparseable
    /// or negative amounts become `0.0`.
    pub fn apply(&mut self, input: &FormInput) {
        self.vendor_name = input.vendor_name.clone();
        self.bill_no = input.bill_no.clone();
        self.bill_date = parse_date(&input.bill_date).ok();
        self.bill_amount = parse_amount(&input.bill_amount);
        self.doctor_name = Some(input.doctor_name.trim().to_string()).filter(|s| !s.is_empty());
    }
}

impl Default for PendingFormState {
    fn default() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}

/// Raw bill form fields as posted by the UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormInput {
    pub vendor_name: String,
    pub bill_no: String,
    /// `YYYY-MM-DD`
    pub bill_date: String,
    pub bill_amount: String,
    pub doctor_name: String,
}

fn parse_amount(raw: &str) -> f64 {
    raw.trim().parse::<f64>().map(non_negative).unwrap_or(0.0)
}
