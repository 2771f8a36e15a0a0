//! Bill models.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::RecordId;

/// Date format used at every store boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A stored medical bill. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Vendor (clinic, pharmacy, lab), never empty
    pub vendor_name: String,
    /// Vendor's bill or invoice number
    #[serde(default)]
    pub bill_no: Option<String>,
    /// Bill date, serialized as `YYYY-MM-DD`
    pub bill_date: NaiveDate,
    /// Non-negative amount
    #[serde(default, deserialize_with = "null_as_zero")]
    pub bill_amount: f64,
    /// Free-text doctor name (not a reference to a Doctor id)
    #[serde(default)]
    pub doctor_name: Option<String>,
}

impl Bill {
    /// Label used when picking a bill to delete.
    pub fn label(&self) -> String {
        format!("{} - {}", self.vendor_name, self.bill_date.format(DATE_FORMAT))
    }
}

/// Insert payload for a bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBill {
    pub vendor_name: String,
    pub bill_no: Option<String>,
    pub bill_date: NaiveDate,
    pub bill_amount: f64,
    pub doctor_name: Option<String>,
}

impl NewBill {
    /// Build an insert payload, normalizing blank optional text to `None`
    /// and negative or non-finite amounts to `0.0`.
    pub fn new(
        vendor_name: impl Into<String>,
        bill_no: Option<String>,
        bill_date: NaiveDate,
        bill_amount: f64,
        doctor_name: Option<String>,
    ) -> Self {
        Self {
            vendor_name: vendor_name.into(),
            bill_no: non_blank(bill_no),
            bill_date,
            bill_amount: non_negative(bill_amount),
            doctor_name: non_blank(doctor_name),
        }
    }

    /// Attach the identifier the store assigned.
    pub fn into_bill(self, id: RecordId) -> Bill {
        Bill {
            id,
            vendor_name: self.vendor_name,
            bill_no: self.bill_no,
            bill_date: self.bill_date,
            bill_amount: self.bill_amount,
            doctor_name: self.doctor_name,
        }
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub(crate) fn non_negative(amount: f64) -> f64 {
    if amount.is_finite() && amount >= 0.0 {
        amount
    } else {
        0.0
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bill_date_serializes_iso() {
        let bill = NewBill::new("Acme Clinic", None, date(2024, 3, 1), 42.5, None)
            .into_bill(RecordId::new("1"));
        let json = serde_json::to_value(&bill).unwrap();

        assert_eq!(json["bill_date"], "2024-03-01");
        assert_eq!(json["id"], "1");
    }

    #[test]
    fn test_deserialize_hosted_row() {
        let json = r#"{"id":12,"vendor_name":"City Labs","bill_no":"","bill_date":"2023-11-05","bill_amount":null,"doctor_name":null,"created_at":"2023-11-05T10:00:00Z"}"#;
        let bill: Bill = serde_json::from_str(json).unwrap();

        assert_eq!(bill.id.as_str(), "12");
        assert_eq!(bill.bill_date, date(2023, 11, 5));
        assert_eq!(bill.bill_amount, 0.0);
        assert_eq!(bill.doctor_name, None);
    }

    #[test]
    fn test_new_bill_normalizes() {
        let bill = NewBill::new(
            "Pharmacy",
            Some("  ".to_string()),
            date(2024, 1, 2),
            -5.0,
            Some(String::new()),
        );

        assert_eq!(bill.bill_no, None);
        assert_eq!(bill.doctor_name, None);
        assert_eq!(bill.bill_amount, 0.0);
    }

    #[test]
    fn test_label() {
        let bill = NewBill::new("Acme", None, date(2024, 3, 1), 0.0, None)
            .into_bill(RecordId::new("x"));
        assert_eq!(bill.label(), "Acme - 2024-03-01");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-03-01").unwrap(), date(2024, 3, 1));
        assert!(parse_date("March 1st").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }
}
