//! Medical Bills Core Library
//!
//! Household medical bill tracking: doctors, bills, photo scanning and
//! date-range PDF reports.
//!
//! # Architecture
//!
//! ```text
//!   Bill photo ──▶ VisionClient ──▶ ExtractedBillFields
//!                                          │ merge
//!                                          ▼
//!   User edits ───────────────────▶  BillForm (pending)
//!                                          │ save (validated)
//!                                          ▼
//!                                    RecordStore ◀── ReadCache (TTL, cleared on write)
//!                                          │
//!                             ┌────────────┴────────────┐
//!                             ▼                         ▼
//!                        Bills table             DateRange filter
//!                                                       │
//!                                                       ▼
//!                                                  PDF report
//! ```
//!
//! # Core Principle
//!
//! **Nothing reaches the store without an explicit save.** Extracted fields
//! only ever land in the pending form.
//!
//! # Modules
//!
//! - [`db`]: Record stores (hosted table API, SQLite)
//! - [`models`]: Domain types (Bill, Doctor, PendingFormState)
//! - [`cache`]: TTL read cache for the two list queries
//! - [`auth`]: Credential gate
//! - [`form`]: Bill form state machine
//! - [`report`]: Date filter and PDF renderer
//! - [`session`]: Session context and action dispatch

pub mod auth;
pub mod cache;
pub mod db;
pub mod form;
pub mod models;
pub mod report;
pub mod session;

// Re-export commonly used types
pub use auth::{AuthError, CredentialGate};
pub use cache::ReadCache;
pub use db::{open_store, Database, RecordStore, RestStore, SqliteStore, StoreError, StoreResult};
pub use form::{BillForm, FormState, ResetPolicy, SaveOutcome, ValidationError};
pub use models::{Bill, Doctor, FormInput, NewBill, NewDoctor, PendingFormState, RecordId};
pub use report::{filter_bills, render_pdf, DateRange, ReportError, ReportTable};
pub use session::{Action, App, Download, Notice, NoticeLevel, Session, ViewState};
