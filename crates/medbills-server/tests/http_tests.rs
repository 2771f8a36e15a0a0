//! HTTP surface tests against an in-memory store.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use medbills_core::{App, CredentialGate, RecordStore, SqliteStore};
use medbills_llm::MockVisionClient;
use medbills_server::{router, routes::SESSION_COOKIE, state::State};
use tower::ServiceExt;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn test_state(with_vision: bool) -> Arc<State> {
    let mut app = App::new(
        Box::new(SqliteStore::open_in_memory().unwrap()),
        CredentialGate::new("household", "s3cret"),
    );
    if with_vision {
        app = app.with_vision(Box::new(MockVisionClient::new(
            r#"{"vendorName":"City Labs","billAmount":"19.99","billDate":"2024-03-01"}"#,
        )));
    }
    State::new(app)
}

fn cookie_from(response: &Response<Body>) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

fn form_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(form_post("/login", None, "username=household&password=s3cret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_from(&response);
    assert!(body_text(response).await.contains("Medical Bill Manager"));
    cookie
}

#[tokio::test]
async fn index_shows_login_without_session() {
    let state = test_state(false);
    let app = router(state.clone());

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.contains("action=\"/login\""));
    }
    assert_eq!(state.session_count(), 0);
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let state = test_state(false);
    let app = router(state.clone());
    let cookie = login(&app).await;

    assert!(cookie.starts_with(SESSION_COOKIE));
    assert_eq!(state.session_count(), 1);
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let state = test_state(false);
    let app = router(state.clone());
    let response = app
        .oneshot(form_post("/login", None, "username=household&password=nope"))
        .await
        .unwrap();

    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(state.session_count(), 0);
    let html = body_text(response).await;
    assert!(html.contains("Incorrect username or password"));
    assert!(!html.contains("Manage Doctors"));
}

#[tokio::test]
async fn unauthenticated_write_changes_nothing() {
    let state = test_state(false);
    let app = router(state.clone());
    app.oneshot(form_post("/doctors", None, "name=Rao"))
        .await
        .unwrap();

    assert!(state.app.store().list_doctors().unwrap().is_empty());
}

#[tokio::test]
async fn add_doctor_and_save_bill() {
    let state = test_state(false);
    let app = router(state.clone());
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(form_post("/doctors", Some(&cookie), "name=Rao"))
        .await
        .unwrap();
    assert!(body_text(response).await.contains("Added Dr. Rao"));

    let response = app
        .clone()
        .oneshot(form_post(
            "/bills",
            Some(&cookie),
            "vendor_name=Acme+Clinic&bill_no=INV-1&bill_date=2024-03-01&bill_amount=80&doctor_name=Rao&intent=save",
        ))
        .await
        .unwrap();
    let html = body_text(response).await;
    assert!(html.contains("Bill saved successfully!"));
    assert!(html.contains("$80.00"));

    let bills = state.app.store().list_bills().unwrap();
    assert_eq!(bills.len(), 1);
    assert_eq!(bills[0].doctor_name.as_deref(), Some("Rao"));
}

#[tokio::test]
async fn missing_vendor_warns() {
    let state = test_state(false);
    let app = router(state.clone());
    let cookie = login(&app).await;

    let response = app
        .oneshot(form_post(
            "/bills",
            Some(&cookie),
            "vendor_name=&bill_date=2024-03-01&bill_amount=5&intent=save",
        ))
        .await
        .unwrap();

    assert!(body_text(response).await.contains("Vendor Name is required."));
    assert!(state.app.store().list_bills().unwrap().is_empty());
}

#[tokio::test]
async fn scan_fills_form() {
    let app = router(test_state(true));
    let cookie = login(&app).await;

    let boundary = "XBOUNDARYX";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"bill.jpg\"\r\n\
Content-Type: image/jpeg\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(JPEG);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/bills/scan")
        .header(header::COOKIE, &cookie)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();
    let html = body_text(app.oneshot(request).await.unwrap()).await;

    assert!(html.contains("Details extracted! Please review and save."));
    assert!(html.contains("value=\"City Labs\""));
    assert!(html.contains("value=\"19.99\""));
    assert!(html.contains("value=\"2024-03-01\""));
}

#[tokio::test]
async fn report_downloads_pdf() {
    let app = router(test_state(false));
    let cookie = login(&app).await;
    app.clone()
        .oneshot(form_post(
            "/bills",
            Some(&cookie),
            "vendor_name=Acme&bill_date=2024-03-01&bill_amount=10&intent=save",
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(get("/report?start=2024-03-01&end=2024-03-31", &cookie))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Medical_Bills_2024-03-01_to_2024-03-31.pdf\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn inverted_report_range_shows_error() {
    let app = router(test_state(false));
    let cookie = login(&app).await;

    let response = app
        .oneshot(get("/report?start=2024-03-31&end=2024-03-01", &cookie))
        .await
        .unwrap();

    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(body_text(response)
        .await
        .contains("Error: Start date must be before end date."));
}

#[tokio::test]
async fn malformed_report_dates_show_notice() {
    let app = router(test_state(false));
    let cookie = login(&app).await;

    for uri in ["/report", "/report?start=2024-03-01", "/report?start=March&end=2024-03-31"] {
        let response = app.clone().oneshot(get(uri, &cookie)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let html = body_text(response).await;
        assert!(html.contains("Please select a valid start and end date."));
        assert!(html.contains("Generate Report"));
    }
}

#[tokio::test]
async fn logout_ends_session() {
    let state = test_state(false);
    let app = router(state.clone());
    let cookie = login(&app).await;
    assert_eq!(state.session_count(), 1);

    let response = app
        .clone()
        .oneshot(form_post("/logout", Some(&cookie), ""))
        .await
        .unwrap();
    assert!(response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));
    assert_eq!(state.session_count(), 0);

    let html = body_text(app.oneshot(get("/", &cookie)).await.unwrap()).await;
    assert!(html.contains("action=\"/login\""));
}
