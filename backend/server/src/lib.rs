//! Documentation of a QR code generator with scan analytics.
//!
//!
//!
//! # General Infrastructure
//! - Single process serving a JSON API under `/api` and the SPA shell for everything else
//! - QR symbols are encoded by the `qrcode` crate, rasters by `image`
//! - Analytics live in memory only, a restart forgets every code and scan
//! - No authentication and no rate limiting, put a reverse proxy in front if needed
//!
//!
//!
//! # API
//!
//! | Route                       | Body                                   | Result                                 |
//! |-----------------------------|----------------------------------------|----------------------------------------|
//! | `POST /api/generate-qr`     | text, size?, color?, backgroundColor?, errorCorrection? | PNG data URI, qrId, analytics |
//! | `POST /api/generate-qr-svg` | same                                   | raw `image/svg+xml`                    |
//! | `POST /api/generate-qr-format` | same + format                       | data URI, contentType, filename        |
//! | `POST /api/track-scan`      | qrId? and/or text?                     | scans, lastScanned                     |
//! | `GET /api/analytics/{qrId}` |                                        | one record or 404                      |
//! | `GET /api/analytics`        |                                        | every record plus totals               |
//! | `GET /api/health`           |                                        | status, timestamp, uptime              |
//!
//! Errors are always `{ "error": ..., "details": ... }` with `details` optional.
//!
//!
//!
//! # Notes
//!
//! ## Identity keys
//! Keys are the first 16 alphanumeric characters of the base64 text, see [`identity`].
//! Texts sharing a 12 byte prefix share analytics. Known and accepted for now.
//!
//! ## PDF
//! `pdf` downloads are PNG bytes labelled `application/pdf`, see [`render::OutputFormat`].
//!
//!
//!
//! # Setup
//!
//! Run locally.
//! ```sh
//! APP_ENV=development RUST_LOG=debug cargo run -p qrgen-backend -- --port 3000 --static-dir public
//! ```
//!
//! Production.
//! ```sh
//! APP_ENV=production PORT=8080 cargo run --release -p qrgen-backend
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header::CONTENT_TYPE},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod analytics;
pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod payloads;
pub mod render;
pub mod routes;
pub mod state;
pub mod utils;

use config::Config;
use middleware::{panic_response, reveal_error_details, trace_requests};
use routes::{
    all_analytics_handler, analytics_handler, generate_qr_format_handler, generate_qr_handler,
    generate_qr_svg_handler, health_handler, track_scan_handler,
};
use state::AppState;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).init();
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/generate-qr", post(generate_qr_handler))
        .route("/generate-qr-svg", post(generate_qr_svg_handler))
        .route("/generate-qr-format", post(generate_qr_format_handler))
        .route("/track-scan", post(track_scan_handler))
        .route("/analytics", get(all_analytics_handler))
        .route("/analytics/{qr_id}", get(analytics_handler))
        .route("/health", get(health_handler));

    let static_dir = &state.config.static_dir;
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api)
        .fallback_service(spa)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(state.clone(), reveal_error_details))
        .layer(from_fn(trace_requests))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    info!("Initializing state...");
    let state = AppState::new(config);

    info!("Starting server...");
    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!(
        environment = %state.config.environment,
        static_dir = %state.config.static_dir.display(),
        "Server running on {address}"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
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
