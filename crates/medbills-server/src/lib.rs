//! Web front end for the medical bill manager.
//!
//! # Request flow
//!
//! ```text
//! browser ──▶ axum route ──▶ Action(s) ──spawn_blocking──▶ App::dispatch_all
//!                                                              │
//!    HTML page / PDF attachment ◀──────── ViewState ◀──────────┘
//! ```
//!
//! A browser gets a [`medbills_core::Session`], keyed by the
//! `medbills_session` cookie, once it logs in.
//!
//! # Configuration
//!
//! See [`config::Config`]. Required: `SUPABASE_URL`, `MEDBILLS_USERNAME`,
//! `MEDBILLS_PASSWORD` (and `SUPABASE_KEY` for hosted stores). Optional:
//! `GEMINI_API_KEY` enables bill scanning.
//!
//! # Running
//!
//! ```sh
//! SUPABASE_URL=sqlite:bills.db MEDBILLS_USERNAME=me MEDBILLS_PASSWORD=pw cargo run -p medbills-server
//! ```

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use medbills_core::{open_store, App, CredentialGate};
use medbills_llm::GeminiClient;
use tokio::{net::TcpListener, signal::ctrl_c};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod ui;

use config::Config;
use state::State;

/// Upload cap for bill photos.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Target prefixes match every `medbills_*` crate.
const DEFAULT_LOG_FILTER: &str = "info,medbills=debug";

/// Initialise the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();
}

/// Wire the services named by `config`.
///
/// Must run outside the async runtime: both HTTP clients are blocking.
pub fn build_app(config: &Config) -> anyhow::Result<App> {
    let store = open_store(&config.store_url, config.store_key.as_deref())
        .context("Failed to open record store")?;
    let gate = CredentialGate::new(config.username.clone(), config.password.clone());
    let mut app = App::new(store, gate).with_reset_policy(config.reset_policy);

    match &config.gemini {
        Some(gemini) => {
            let client = GeminiClient::new(
                &gemini.base_url,
                &gemini.model,
                &gemini.api_key,
                gemini.timeout_secs,
            )
            .context("Failed to build vision client")?;
            info!(model = %gemini.model, "Bill scanning enabled");
            app = app.with_vision(Box::new(client));
        }
        None => warn!("Gemini API key not found. Bill scanning feature will be disabled."),
    }

    Ok(app)
}

pub fn router(state: Arc<State>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/login", post(routes::login))
        .route("/logout", post(routes::logout))
        .route("/doctors", post(routes::add_doctor))
        .route("/doctors/:id/delete", post(routes::delete_doctor))
        .route("/bills", post(routes::submit_bill))
        .route("/bills/scan", post(routes::scan_bill))
        .route("/bills/:id/delete", post(routes::delete_bill))
        .route("/report", get(routes::report))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub async fn serve(state: Arc<State>, port: u16) -> anyhow::Result<()> {
    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
