use std::{any::Any, sync::Arc, time::Instant};

use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{Instrument, info, info_span};

use crate::{
    error::{AppError, ErrorBody, ErrorDetail, INTERNAL_ERROR},
    state::AppState,
};

pub async fn trace_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let span = info_span!("http.request", method = %method, path = %path);
    let response = next.run(request).instrument(span).await;

    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

/// Swaps the generic internal error body for the real cause in development.
pub async fn reveal_error_details(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    if !state.config.environment.is_development() {
        return response;
    }

    (
        response.status(),
        Json(ErrorBody::new(INTERNAL_ERROR, Some(detail))),
    )
        .into_response()
}

pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    AppError::InternalError(format!("Handler panicked: {message}").into()).into_response()
}
