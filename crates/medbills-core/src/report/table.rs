//! Fixed-column report table.

use serde::{Deserialize, Serialize};

use crate::models::{Bill, DATE_FORMAT};

/// Header labels, left to right.
pub const COLUMNS: [&str; 6] = ["S.No", "Vendor", "Bill No.", "Bill Date", "Amount", "Doctor"];

/// Column widths in millimetres, matching `COLUMNS`.
pub const COLUMN_WIDTHS_MM: [f32; 6] = [15.0, 50.0, 30.0, 30.0, 30.0, 35.0];

/// Height of the header and of every body row.
pub const ROW_HEIGHT_MM: f32 = 10.0;

/// One table row, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub cells: [String; 6],
}

impl ReportRow {
    pub fn serial(&self) -> &str {
        &self.cells[0]
    }
}

/// Rows for the report body, numbered by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTable {
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    /// One row per bill in input order; `S.No` is 1-based.
    pub fn from_bills(bills: &[Bill]) -> Self {
        let rows = bills
            .iter()
            .enumerate()
            .map(|(i, bill)| ReportRow {
                cells: [
                    (i + 1).to_string(),
                    bill.vendor_name.clone(),
                    bill.bill_no.clone().unwrap_or_default(),
                    bill.bill_date.format(DATE_FORMAT).to_string(),
                    format_amount(bill.bill_amount),
                    bill.doctor_name.clone().unwrap_or_default(),
                ],
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `$X.XX`, no thousands separator.
pub fn format_amount(amount: f64) -> String {
    format!("${:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewBill, RecordId};
    use chrono::NaiveDate;

    #[test]
    fn test_widths_fill_printable_area() {
        let total: f32 = COLUMN_WIDTHS_MM.iter().sum();
        assert_eq!(total, 190.0);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "$0.00");
        assert_eq!(format_amount(42.5), "$42.50");
        assert_eq!(format_amount(1204.499), "$1204.50");
    }

    #[test]
    fn test_rows_numbered_and_blank_optionals() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bills = vec![
            NewBill::new("Acme Clinic", Some("INV-9".into()), date, 80.0, Some("Dr. Rao".into()))
                .into_bill(RecordId::new("41")),
            NewBill::new("City Labs", None, date, 12.0, None).into_bill(RecordId::new("7")),
        ];

        let table = ReportTable::from_bills(&bills);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows[0].cells,
            [
                "1".to_string(),
                "Acme Clinic".into(),
                "INV-9".into(),
                "2024-03-01".into(),
                "$80.00".into(),
                "Dr. Rao".into()
            ]
        );
        assert_eq!(table.rows[1].serial(), "2");
        assert_eq!(table.rows[1].cells[2], "");
        assert_eq!(table.rows[1].cells[5], "");
    }
}
