use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, Path, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use crate::{
    analytics::{AnalyticsError, AnalyticsRecord},
    error::AppError,
    identity::qr_id,
    payloads::{
        AnalyticsListResponse, AnalyticsResponse, FormatRequest, FormatResponse, GenerateRequest,
        GenerateResponse, HealthResponse, TrackScanRequest, TrackScanResponse,
    },
    render::OutputFormat,
    state::AppState,
    utils::{output_format, render_blocking, render_options, require_text},
};

/// JSON body extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

pub async fn generate_qr_handler(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let text = require_text(payload.text.as_deref())?;
    let options = render_options(&payload, &state.config)?;

    let image = render_blocking(text, &options, OutputFormat::Png).await?;

    let qr_id = qr_id(text);
    let analytics = state.registry.get_or_create(&qr_id, text, &options).await;

    info!(qr_id = %qr_id, scans = analytics.scans, "QR code generated");

    Ok(Json(GenerateResponse {
        success: true,
        qr_code: image.data_uri(),
        qr_id,
        text: text.to_string(),
        size: options.size,
        color: options.foreground,
        background_color: options.background,
        error_correction: options.error_correction,
        analytics,
    }))
}

pub async fn generate_qr_svg_handler(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let text = require_text(payload.text.as_deref())?;
    let options = render_options(&payload, &state.config)?;

    let image = render_blocking(text, &options, OutputFormat::Svg).await?;

    Ok(([(CONTENT_TYPE, image.content_type())], image.bytes))
}

pub async fn generate_qr_format_handler(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<FormatRequest>,
) -> Result<Json<FormatResponse>, AppError> {
    let text = require_text(payload.generate.text.as_deref())?;
    let format = output_format(payload.format.as_deref())?;
    let options = render_options(&payload.generate, &state.config)?;

    let image = render_blocking(text, &options, format).await?;

    info!(format = format.as_str(), filename = %image.filename, "QR code rendered");

    Ok(Json(FormatResponse {
        success: true,
        qr_code: image.data_uri(),
        format: format.as_str(),
        content_type: image.content_type(),
        filename: image.filename,
    }))
}

pub async fn track_scan_handler(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<TrackScanRequest>,
) -> Result<Json<TrackScanResponse>, AppError> {
    let qr_id_field = payload.qr_id.as_deref().filter(|id| !id.trim().is_empty());
    let text = payload.text.as_deref().filter(|text| !text.trim().is_empty());

    let record = match (qr_id_field, text) {
        (Some(id), text) => match (state.registry.record_scan(id, None).await, text) {
            (Ok(record), _) => record,
            (Err(AnalyticsError::NotFound(_)), Some(text)) => scan_by_text(&state, text).await?,
            (Err(e), _) => return Err(e.into()),
        },
        (None, Some(text)) => scan_by_text(&state, text).await?,
        (None, None) => {
            return Err(AppError::Validation(
                "Either qrId or text is required".to_string(),
            ));
        }
    };

    info!(qr_id = %record.qr_id, scans = record.scans, "Scan tracked");

    Ok(Json(record.into()))
}

/// Unknown keys are only ever created under the identity of their text.
async fn scan_by_text(state: &AppState, text: &str) -> Result<AnalyticsRecord, AppError> {
    Ok(state.registry.record_scan(&qr_id(text), Some(text)).await?)
}

pub async fn analytics_handler(
    State(state): State<Arc<AppState>>,
    Path(qr_id): Path<String>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let analytics = state.registry.get(&qr_id).await?;

    Ok(Json(AnalyticsResponse {
        success: true,
        analytics,
    }))
}

pub async fn all_analytics_handler(
    State(state): State<Arc<AppState>>,
) -> Json<AnalyticsListResponse> {
    Json(state.registry.list_all().await.into())
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}
