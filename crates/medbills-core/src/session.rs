//! Session context and action dispatch.
//!
//! [`App`] owns the process-wide services. A [`Session`] is the per-browser
//! context. Every user interaction is an [`Action`]; [`App::dispatch`] runs
//! it against the session and returns a fresh [`ViewState`] snapshot to
//! render. Failures never escape dispatch: they become notices.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::auth::CredentialGate;
use crate::cache::ReadCache;
use crate::db::{RecordStore, StoreError};
use crate::form::{sniff_image, BillForm, ResetPolicy, SaveOutcome};
use crate::models::{doctor_exists, Bill, Doctor, FormInput, NewDoctor, PendingFormState, RecordId};
use crate::report::{
    export_report, report_file_name, DateRange, ReportError, DEFAULT_RANGE_DAYS, PDF_MIME,
};
use medbills_llm::{ExtractionError, VisionClient};

/// Severity of a message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message shown once, on the next rendered view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// A file the view should hand to the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Named user interactions.
#[derive(Debug, Clone)]
pub enum Action {
    /// Re-render without changing anything
    Refresh,
    Login { username: String, password: String },
    Logout,
    AddDoctor { name: String },
    DeleteDoctor { id: RecordId },
    /// User edited the bill form fields
    EditBill(FormInput),
    /// Extract fields from a bill photo
    ScanBill { image: Vec<u8> },
    SaveBill,
    ClearBill,
    DeleteBill { id: RecordId },
    ExportReport { start: NaiveDate, end: NaiveDate },
}

impl Action {
    /// Short name for logs. Never includes payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::AddDoctor { .. } => "add_doctor",
            Self::DeleteDoctor { .. } => "delete_doctor",
            Self::EditBill(_) => "edit_bill",
            Self::ScanBill { .. } => "scan_bill",
            Self::SaveBill => "save_bill",
            Self::ClearBill => "clear_bill",
            Self::DeleteBill { .. } => "delete_bill",
            Self::ExportReport { .. } => "export_report",
        }
    }

    fn allowed_logged_out(&self) -> bool {
        matches!(self, Self::Refresh | Self::Login { .. } | Self::Logout)
    }
}

/// Immutable snapshot of everything a view renders.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub logged_in: bool,
    pub notices: Vec<Notice>,
    pub doctors: Vec<Doctor>,
    pub bills: Vec<Bill>,
    pub form: PendingFormState,
    pub report_range: DateRange,
    pub extraction_enabled: bool,
    pub download: Option<Download>,
}

/// Per-browser context.
#[derive(Debug, Clone)]
pub struct Session {
    logged_in: bool,
    form: BillForm,
    report_range: DateRange,
    notices: Vec<Notice>,
}

impl Session {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            logged_in: false,
            form: BillForm::with_defaults(PendingFormState::new(today)),
            report_range: DateRange::last_days(today, DEFAULT_RANGE_DAYS),
            notices: Vec::new(),
        }
    }

    pub fn logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn form(&self) -> &BillForm {
        &self.form
    }

    pub fn report_range(&self) -> DateRange {
        self.report_range
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice::new(level, message));
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}

/// Process-wide services shared by every session.
pub struct App {
    store: Box<dyn RecordStore>,
    cache: ReadCache,
    gate: CredentialGate,
    vision: Option<Box<dyn VisionClient>>,
    reset_policy: ResetPolicy,
}

impl App {
    /// Extraction starts disabled; see [`App::with_vision`].
    pub fn new(store: Box<dyn RecordStore>, gate: CredentialGate) -> Self {
        Self {
            store,
            cache: ReadCache::new(),
            gate,
            vision: None,
            reset_policy: ResetPolicy::default(),
        }
    }

    pub fn with_vision(mut self, client: Box<dyn VisionClient>) -> Self {
        self.vision = Some(client);
        self
    }

    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }

    pub fn with_cache(mut self, cache: ReadCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn extraction_enabled(&self) -> bool {
        self.vision.is_some()
    }

    pub fn reset_policy(&self) -> ResetPolicy {
        self.reset_policy
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &ReadCache {
        &self.cache
    }

    /// Current view without side effects.
    pub fn view(&self, session: &mut Session) -> ViewState {
        self.dispatch(session, Action::Refresh)
    }

    /// Run one action, then snapshot the resulting view.
    pub fn dispatch(&self, session: &mut Session, action: Action) -> ViewState {
        self.dispatch_all(session, std::iter::once(action))
    }

    /// Run several actions in order and snapshot once at the end.
    pub fn dispatch_all(
        &self,
        session: &mut Session,
        actions: impl IntoIterator<Item = Action>,
    ) -> ViewState {
        let mut download = None;
        for action in actions {
            if let Some(file) = self.apply(session, action) {
                download = Some(file);
            }
        }
        self.snapshot(session, download)
    }

    fn apply(&self, session: &mut Session, action: Action) -> Option<Download> {
        if !session.logged_in && !action.allowed_logged_out() {
            warn!(action = action.name(), "Action rejected for unauthenticated session");
            return None;
        }
        debug!(action = action.name(), "Dispatching");

        match action {
            Action::Refresh => {}
            Action::Login { username, password } => self.login(session, &username, &password),
            Action::Logout => {
                session.logged_in = false;
                info!("Logged out");
            }
            Action::AddDoctor { name } => self.add_doctor(session, &name),
            Action::DeleteDoctor { id } => self.delete_doctor(session, &id),
            Action::EditBill(input) => session.form.edit(&input),
            Action::ScanBill { image } => self.scan_bill(session, &image),
            Action::SaveBill => self.save_bill(session),
            Action::ClearBill => session.form.clear(),
            Action::DeleteBill { id } => self.delete_bill(session, &id),
            Action::ExportReport { start, end } => return self.export(session, start, end),
        }
        None
    }

    fn login(&self, session: &mut Session, username: &str, password: &str) {
        match self.gate.authenticate(username, password) {
            Ok(()) => {
                session.logged_in = true;
                info!("Login succeeded");
            }
            Err(e) => {
                warn!("Login failed");
                session.notify(NoticeLevel::Error, e.to_string());
            }
        }
    }

    fn add_doctor(&self, session: &mut Session, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        // A failed read still lets the store's uniqueness check decide.
        if let Ok(doctors) = self.cache.get_doctors(self.store()) {
            if doctor_exists(&doctors, name) {
                session.notify(NoticeLevel::Warning, "This doctor already exists.");
                return;
            }
        }

        match self.store.insert_doctor(&NewDoctor::new(name)) {
            Ok(doctor) => {
                self.cache.clear();
                info!(id = %doctor.id, "Doctor added");
                session.notify(NoticeLevel::Success, format!("Added Dr. {}", doctor.name));
            }
            Err(StoreError::Constraint(_)) => {
                session.notify(NoticeLevel::Warning, "This doctor already exists.");
            }
            Err(e) => {
                error!(error = %e, "Failed to add doctor");
                session.notify(NoticeLevel::Error, format!("Failed to add doctor: {e}"));
            }
        }
    }

    fn delete_doctor(&self, session: &mut Session, id: &RecordId) {
        match self.store.delete_doctor(id) {
            Ok(true) => {
                self.cache.clear();
                info!(%id, "Doctor deleted");
            }
            Ok(false) => {
                warn!(%id, "No doctor deleted");
                session.notify(NoticeLevel::Error, "Failed to delete.");
            }
            Err(e) => {
                error!(%id, error = %e, "Failed to delete doctor");
                session.notify(NoticeLevel::Error, "Failed to delete.");
            }
        }
    }

    fn scan_bill(&self, session: &mut Session, image: &[u8]) {
        let Some(vision) = &self.vision else {
            session.notify(NoticeLevel::Error, "Gemini API key is not configured.");
            return;
        };
        if let Err(e) = sniff_image(image) {
            session.notify(NoticeLevel::Warning, e.to_string());
            return;
        }

        match vision.extract(image) {
            Ok(fields) => {
                if let Some(warning) = session.form.merge_extraction(&fields) {
                    session.notify(NoticeLevel::Warning, warning);
                }
                info!("Bill details extracted");
                session.notify(NoticeLevel::Success, "Details extracted! Please review and save.");
            }
            Err(e) => {
                error!(error = %e, network = e.is_network(), "Extraction failed");
                session.notify(NoticeLevel::Warning, extraction_message(&e));
            }
        }
    }

    fn save_bill(&self, session: &mut Session) {
        match session.form.save(self.store(), self.reset_policy) {
            SaveOutcome::Saved(_) => {
                self.cache.clear();
                session.notify(NoticeLevel::Success, "Bill saved successfully!");
            }
            SaveOutcome::Invalid(e) => {
                session.notify(NoticeLevel::Warning, e.to_string());
            }
            SaveOutcome::StoreFailed(e) => {
                error!(error = %e, "Failed to save bill");
                session.notify(NoticeLevel::Error, format!("Failed to save bill: {e}"));
            }
        }
    }

    fn delete_bill(&self, session: &mut Session, id: &RecordId) {
        match self.store.delete_bill(id) {
            Ok(true) => {
                self.cache.clear();
                info!(%id, "Bill deleted");
                session.notify(NoticeLevel::Success, "Bill deleted.");
            }
            Ok(false) => {
                session.notify(NoticeLevel::Error, "Failed to delete bill: no such bill");
            }
            Err(e) => {
                error!(%id, error = %e, "Failed to delete bill");
                session.notify(NoticeLevel::Error, format!("Failed to delete bill: {e}"));
            }
        }
    }

    fn export(&self, session: &mut Session, start: NaiveDate, end: NaiveDate) -> Option<Download> {
        let range = match DateRange::new(start, end) {
            Ok(range) => range,
            Err(e) => {
                session.notify(NoticeLevel::Error, e.to_string());
                return None;
            }
        };
        session.report_range = range;

        let bills = match self.cache.get_bills(self.store()) {
            Ok(bills) => bills,
            Err(e) => {
                session.notify(NoticeLevel::Error, format!("Error fetching bills: {e}"));
                return None;
            }
        };

        match export_report(&bills, &range) {
            Ok(bytes) => {
                info!(bytes = bytes.len(), "Report rendered");
                Some(Download {
                    file_name: report_file_name(&range),
                    mime: PDF_MIME,
                    bytes,
                })
            }
            Err(ReportError::Empty) => {
                session.notify(NoticeLevel::Warning, ReportError::Empty.to_string());
                None
            }
            Err(e) => {
                error!(error = %e, "Failed to render report");
                session.notify(NoticeLevel::Error, e.to_string());
                None
            }
        }
    }

    fn snapshot(&self, session: &mut Session, download: Option<Download>) -> ViewState {
        let (doctors, bills) = if session.logged_in {
            let doctors = self.cache.get_doctors(self.store()).unwrap_or_else(|e| {
                session.notify(NoticeLevel::Error, format!("Error fetching doctors: {e}"));
                Vec::new()
            });
            let bills = match self.cache.get_bills(self.store()) {
                Ok(bills) => {
                    if bills.is_empty() {
                        session.notify(
                            NoticeLevel::Info,
                            "No bills found. Add your first bill to get started!",
                        );
                    }
                    bills
                }
                Err(e) => {
                    session.notify(NoticeLevel::Error, format!("Error fetching bills: {e}"));
                    Vec::new()
                }
            };
            (doctors, bills)
        } else {
            (Vec::new(), Vec::new())
        };

        ViewState {
            logged_in: session.logged_in,
            notices: std::mem::take(&mut session.notices),
            doctors,
            bills,
            form: session.form.pending().clone(),
            report_range: session.report_range,
            extraction_enabled: self.extraction_enabled(),
            download,
        }
    }
}

fn extraction_message(e: &ExtractionError) -> String {
    match e {
        ExtractionError::Network(_) | ExtractionError::Parse(_) => e.to_string(),
        ExtractionError::Status { .. } => format!("API request failed: {e}"),
        ExtractionError::InvalidFormat(_) => format!("Failed to parse AI response: {e}"),
    }
}
