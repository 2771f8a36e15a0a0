//! HTTP handlers. Each one maps a request onto session actions.

use std::sync::{Arc, PoisonError};

use axum::{
    extract::{Multipart, Path, Query, State as AxumState},
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    response::{Html, IntoResponse, Response},
    Form,
};
use chrono::NaiveDate;
use medbills_core::models::parse_date;
use medbills_core::{Action, FormInput, Notice, NoticeLevel, RecordId, Session, ViewState};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{error::AppError, state::State, ui};

pub const SESSION_COOKIE: &str = "medbills_session";

const INVALID_REPORT_DATES: &str = "Please select a valid start and end date.";

type SharedState = AxumState<Arc<State>>;

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub struct DoctorForm {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
pub struct BillSubmission {
    #[serde(default)]
    vendor_name: String,
    #[serde(default)]
    bill_no: String,
    #[serde(default)]
    bill_date: String,
    #[serde(default)]
    bill_amount: String,
    #[serde(default)]
    doctor_name: String,
    #[serde(default)]
    intent: String,
}

#[derive(Deserialize)]
pub struct ReportQuery {
    start: Option<String>,
    end: Option<String>,
}

impl ReportQuery {
    fn dates(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = parse_date(self.start.as_deref()?).ok()?;
        let end = parse_date(self.end.as_deref()?).ok()?;
        Some((start, end))
    }
}

pub async fn index(AxumState(state): SharedState, headers: HeaderMap) -> Result<Response, AppError> {
    run(state, &headers, vec![Action::Refresh]).await
}

pub async fn login(
    AxumState(state): SharedState,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let action = Action::Login {
        username: form.username,
        password: form.password,
    };
    run(state, &headers, vec![action]).await
}

pub async fn logout(AxumState(state): SharedState, headers: HeaderMap) -> Result<Response, AppError> {
    let (id, view) = dispatch(&state, &headers, vec![Action::Logout]).await?;
    if let SessionId::Existing(id) = id {
        state.end_session(id);
    }
    Ok(respond(view, SessionCookie::Clear))
}

pub async fn add_doctor(
    AxumState(state): SharedState,
    headers: HeaderMap,
    Form(form): Form<DoctorForm>,
) -> Result<Response, AppError> {
    run(state, &headers, vec![Action::AddDoctor { name: form.name }]).await
}

pub async fn delete_doctor(
    AxumState(state): SharedState,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    run(state, &headers, vec![Action::DeleteDoctor { id: RecordId::new(id) }]).await
}

pub async fn submit_bill(
    AxumState(state): SharedState,
    headers: HeaderMap,
    Form(form): Form<BillSubmission>,
) -> Result<Response, AppError> {
    let mut actions = vec![Action::EditBill(FormInput {
        vendor_name: form.vendor_name,
        bill_no: form.bill_no,
        bill_date: form.bill_date,
        bill_amount: form.bill_amount,
        doctor_name: form.doctor_name,
    })];
    match form.intent.as_str() {
        "save" => actions.push(Action::SaveBill),
        "clear" => actions.push(Action::ClearBill),
        _ => {}
    }
    run(state, &headers, actions).await
}

pub async fn scan_bill(
    AxumState(state): SharedState,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut image = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("image") {
            image = field.bytes().await?.to_vec();
        }
    }
    debug!(bytes = image.len(), "Bill image uploaded");
    run(state, &headers, vec![Action::ScanBill { image }]).await
}

pub async fn delete_bill(
    AxumState(state): SharedState,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    run(state, &headers, vec![Action::DeleteBill { id: RecordId::new(id) }]).await
}

pub async fn report(
    AxumState(state): SharedState,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<Response, AppError> {
    let Some((start, end)) = query.dates() else {
        let (id, mut view) = dispatch(&state, &headers, vec![Action::Refresh]).await?;
        if view.logged_in {
            view.notices.push(Notice::new(NoticeLevel::Error, INVALID_REPORT_DATES));
        }
        return Ok(respond(view, id.cookie()));
    };
    run(state, &headers, vec![Action::ExportReport { start, end }]).await
}

enum SessionId {
    Existing(Uuid),
    Created(Uuid),
    /// Logged-out caller with no stored session.
    Anonymous,
}

impl SessionId {
    fn cookie(&self) -> SessionCookie {
        match self {
            Self::Created(id) => SessionCookie::Set(*id),
            Self::Existing(_) | Self::Anonymous => SessionCookie::Keep,
        }
    }
}

enum SessionCookie {
    Keep,
    Set(Uuid),
    Clear,
}

async fn run(state: Arc<State>, headers: &HeaderMap, actions: Vec<Action>) -> Result<Response, AppError> {
    let (id, view) = dispatch(&state, headers, actions).await?;
    Ok(respond(view, id.cookie()))
}

/// Run the actions on a blocking worker; store and AI calls block.
///
/// Callers without a stored session get a scratch one, kept only if it
/// ends up logged in.
async fn dispatch(
    state: &Arc<State>,
    headers: &HeaderMap,
    actions: Vec<Action>,
) -> Result<(SessionId, ViewState), AppError> {
    let cookie = session_id(headers);
    let app = state.app.clone();

    if let (Some(id), Some(shared)) = (cookie, state.session(cookie)) {
        let view = tokio::task::spawn_blocking(move || {
            let mut session = shared.lock().unwrap_or_else(PoisonError::into_inner);
            app.dispatch_all(&mut session, actions)
        })
        .await?;
        return Ok((SessionId::Existing(id), view));
    }

    let (session, view) = tokio::task::spawn_blocking(move || {
        let mut session = Session::default();
        let view = app.dispatch_all(&mut session, actions);
        (session, view)
    })
    .await?;

    let id = if session.logged_in() {
        SessionId::Created(state.register(session))
    } else {
        SessionId::Anonymous
    };
    Ok((id, view))
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value).ok())
}

fn respond(mut view: ViewState, cookie: SessionCookie) -> Response {
    let mut response = match view.download.take() {
        Some(file) => (
            [
                (CONTENT_TYPE, file.mime.to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.file_name),
                ),
            ],
            file.bytes,
        )
            .into_response(),
        None => Html(ui::render(&view)).into_response(),
    };

    let cookie = match cookie {
        SessionCookie::Keep => None,
        SessionCookie::Set(id) => Some(format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")),
        SessionCookie::Clear => Some(format!("{SESSION_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax")),
    };
    let headers = response.headers_mut();
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        headers.insert(SET_COOKIE, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
