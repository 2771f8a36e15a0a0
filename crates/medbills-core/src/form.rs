//! Bill form state machine.
//!
//! ```text
//! Empty ──edit/scan──▶ Populated ──save (valid)──▶ Empty
//!   ▲                     │  ▲
//!   └──────clear──────────┘  └── save (invalid): stays, nothing written
//! ```
//!
//! Transitions happen only on explicit user actions.

use std::str::FromStr;

use thiserror::Error;
use tracing::{info, warn};

use crate::db::{RecordStore, StoreError};
use crate::models::{parse_date, Bill, FormInput, NewBill, PendingFormState};
use medbills_llm::ExtractedBillFields;

/// Reasons a save or upload is refused before touching the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Vendor Name is required.")]
    MissingVendor,

    #[error("Bill Date is required.")]
    MissingDate,

    #[error("Please upload a bill image.")]
    EmptyImage,

    #[error("Unsupported image type. Upload a JPG or PNG.")]
    UnsupportedImage,
}

/// Form lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    /// Defaults, nothing entered
    Empty,
    /// Edited by the user or filled in by extraction
    Populated,
}

/// What happens to the form when the store rejects a valid bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Reset after every insert attempt, even a failed one
    #[default]
    Always,
    /// Reset only when the store confirms the insert
    OnSuccess,
}

impl FromStr for ResetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "on-success" | "on_success" => Ok(Self::OnSuccess),
            other => Err(format!("unknown reset policy '{}'", other)),
        }
    }
}

/// Result of a save attempt.
#[derive(Debug)]
pub enum SaveOutcome {
    /// Validation failed; no insert was attempted
    Invalid(ValidationError),
    /// Exactly one bill was stored
    Saved(Bill),
    /// The single insert attempt failed at the store
    StoreFailed(StoreError),
}

/// Warning raised while merging extracted fields.
pub const UNPARSEABLE_DATE_WARNING: &str = "Could not parse date from AI. Please set manually.";

/// Pending bill form plus its lifecycle state.
#[derive(Debug, Clone)]
pub struct BillForm {
    pending: PendingFormState,
    state: FormState,
}

impl BillForm {
    pub fn new() -> Self {
        Self {
            pending: PendingFormState::default(),
            state: FormState::Empty,
        }
    }

    /// Start from explicit defaults (fixes "today" for tests).
    pub fn with_defaults(defaults: PendingFormState) -> Self {
        Self {
            pending: defaults,
            state: FormState::Empty,
        }
    }

    pub fn pending(&self) -> &PendingFormState {
        &self.pending
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// User typed into the form.
    pub fn edit(&mut self, input: &FormInput) {
        self.pending.apply(input);
        self.state = FormState::Populated;
    }

    /// Merge fields extracted from a bill photo.
    ///
    /// Only vendor, amount and date are touched. A missing vendor or date
    /// leaves the current value; the amount falls back to `0.0`. A date that
    /// is not `YYYY-MM-DD` leaves the current date and returns a warning.
    pub fn merge_extraction(&mut self, fields: &ExtractedBillFields) -> Option<String> {
        if let Some(vendor) = &fields.vendor_name {
            self.pending.vendor_name = vendor.clone();
        }
        self.pending.bill_amount = fields.amount_or_zero();

        let mut warning = None;
        if let Some(raw) = fields.bill_date.as_deref().filter(|s| !s.trim().is_empty()) {
            match parse_date(raw) {
                Ok(date) => self.pending.bill_date = Some(date),
                Err(e) => {
                    warn!(raw, error = %e, "Extracted bill date is not YYYY-MM-DD");
                    warning = Some(UNPARSEABLE_DATE_WARNING.to_string());
                }
            }
        }

        self.state = FormState::Populated;
        warning
    }

    /// Check required fields and build the insert payload.
    pub fn validate(&self) -> Result<NewBill, ValidationError> {
        let vendor = self.pending.vendor_name.trim();
        if vendor.is_empty() {
            return Err(ValidationError::MissingVendor);
        }
        let date = self.pending.bill_date.ok_or(ValidationError::MissingDate)?;

        Ok(NewBill::new(
            vendor,
            Some(self.pending.bill_no.clone()),
            date,
            self.pending.bill_amount,
            self.pending.doctor_name.clone(),
        ))
    }

    /// Validate, then insert exactly once.
    ///
    /// On a validation failure nothing changes. Otherwise the form is reset
    /// according to `policy`.
    pub fn save(&mut self, store: &dyn RecordStore, policy: ResetPolicy) -> SaveOutcome {
        let bill = match self.validate() {
            Ok(bill) => bill,
            Err(e) => return SaveOutcome::Invalid(e),
        };

        match store.insert_bill(&bill) {
            Ok(saved) => {
                info!(id = %saved.id, vendor = %saved.vendor_name, "Bill saved");
                self.clear();
                SaveOutcome::Saved(saved)
            }
            Err(e) => {
                if policy == ResetPolicy::Always {
                    self.clear();
                }
                SaveOutcome::StoreFailed(e)
            }
        }
    }

    /// Back to defaults.
    pub fn clear(&mut self) {
        self.pending = PendingFormState::default();
        self.state = FormState::Empty;
    }
}

impl Default for BillForm {
    fn default() -> Self {
        Self::new()
    }
}

/// Image formats accepted for scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

/// Identify an upload by its magic bytes.
pub fn sniff_image(bytes: &[u8]) -> Result<ImageKind, ValidationError> {
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    if bytes.is_empty() {
        Err(ValidationError::EmptyImage)
    } else if bytes.starts_with(JPEG) {
        Ok(ImageKind::Jpeg)
    } else if bytes.starts_with(PNG) {
        Ok(ImageKind::Png)
    } else {
        Err(ValidationError::UnsupportedImage)
    }
}
