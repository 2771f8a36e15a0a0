//! Date-range report export.
//!
//! Bills are filtered to an inclusive date range, laid out as a fixed-column
//! table and rendered to PDF bytes for download.

mod filter;
mod pdf;
mod table;

pub use filter::*;
pub use pdf::*;
pub use table::*;

use thiserror::Error;

/// MIME type of a rendered report.
pub const PDF_MIME: &str = "application/pdf";

/// Shown instead of a download when the range holds no bills.
pub const EMPTY_REPORT_WARNING: &str = "No bills in the selected date range to generate a report.";

/// Report errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("Error: Start date must be before end date.")]
    InvalidRange,

    #[error("No bills in the selected date range to generate a report.")]
    Empty,

    #[error("PDF error: {0}")]
    Pdf(String),
}

pub type ReportResult<T> = Result<T, ReportError>;

/// `Medical_Bills_<start>_to_<end>.pdf`
pub fn report_file_name(range: &DateRange) -> String {
    format!(
        "Medical_Bills_{}_to_{}.pdf",
        range.start().format(crate::models::DATE_FORMAT),
        range.end().format(crate::models::DATE_FORMAT)
    )
}

/// Filter, then render. Fails with `Empty` rather than producing a blank PDF.
pub fn export_report(bills: &[crate::models::Bill], range: &DateRange) -> ReportResult<Vec<u8>> {
    let filtered = filter_bills(bills, range);
    if filtered.is_empty() {
        return Err(ReportError::Empty);
    }
    render_pdf(&ReportTable::from_bills(&filtered))
}
