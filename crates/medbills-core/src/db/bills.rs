//! Bill database operations.

use rusqlite::params;

use super::{constraint_or, Database, StoreError, StoreResult};
use crate::models::{parse_date, Bill, NewBill, RecordId, DATE_FORMAT};

impl Database {
    /// Insert a bill. The date is stored as `YYYY-MM-DD` text.
    pub fn insert_bill(&self, bill: &NewBill) -> StoreResult<Bill> {
        let id = RecordId::generate();
        self.conn
            .execute(
                r#"
                INSERT INTO bills (
                    id, vendor_name, bill_no, bill_date, bill_amount, doctor_name
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    id.as_str(),
                    bill.vendor_name,
                    bill.bill_no,
                    bill.bill_date.format(DATE_FORMAT).to_string(),
                    bill.bill_amount,
                    bill.doctor_name,
                ],
            )
            .map_err(|e| constraint_or(e, "bill rejected by store constraints"))?;

        Ok(bill.clone().into_bill(id))
    }

    /// List all bills, newest bill date first.
    pub fn list_bills(&self) -> StoreResult<Vec<Bill>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, vendor_name, bill_no, bill_date, bill_amount, doctor_name
            FROM bills
            ORDER BY bill_date DESC, rowid DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(BillRow {
                id: row.get(0)?,
                vendor_name: row.get(1)?,
                bill_no: row.get(2)?,
                bill_date: row.get(3)?,
                bill_amount: row.get(4)?,
                doctor_name: row.get(5)?,
            })
        })?;

        let mut bills = Vec::new();
        for row in rows {
            bills.push(row?.try_into()?);
        }
        Ok(bills)
    }

    /// Delete a bill.
    pub fn delete_bill(&self, id: &RecordId) -> StoreResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM bills WHERE id = ?", [id.as_str()])?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct BillRow {
    id: String,
    vendor_name: String,
    bill_no: Option<String>,
    bill_date: String,
    bill_amount: f64,
    doctor_name: Option<String>,
}

impl TryFrom<BillRow> for Bill {
    type Error = StoreError;

    fn try_from(row: BillRow) -> Result<Self, Self::Error> {
        let bill_date = parse_date(&row.bill_date).map_err(|e| {
            StoreError::InvalidData(format!("bill {} has date '{}': {}", row.id, row.bill_date, e))
        })?;

        Ok(Bill {
            id: RecordId::new(row.id),
            vendor_name: row.vendor_name,
            bill_no: row.bill_no,
            bill_date,
            bill_amount: row.bill_amount,
            doctor_name: row.doctor_name,
        })
    }
}
