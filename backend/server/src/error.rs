use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::error;

use crate::{
    analytics::AnalyticsError,
    render::{OptionsError, RenderError},
};

pub const INTERNAL_ERROR: &str = "Internal server error";
pub const GENERIC_DETAILS: &str = "Something went wrong";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Malformed payload")]
    MalformedPayload(#[from] JsonRejection),

    #[error("QR code not found")]
    NotFound(String),

    #[error("Failed to generate QR code")]
    Encoding(#[from] RenderError),

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<OptionsError> for AppError {
    fn from(err: OptionsError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::NotFound(qr_id) => AppError::NotFound(qr_id),
        }
    }
}

impl From<JoinError> for AppError {
    fn from(err: JoinError) -> Self {
        AppError::InternalError(Box::new(err))
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error: error.into(),
            details,
        }
    }
}

/// Real cause of an internal error, attached to the response so a
/// development build can reveal it.
#[derive(Clone, Debug)]
pub struct ErrorDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new(message, None))
            }
            AppError::MalformedPayload(rejection) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new(self.to_string(), Some(rejection.body_text())),
            ),
            AppError::NotFound(qr_id) => (
                StatusCode::NOT_FOUND,
                ErrorBody::new(self.to_string(), Some(format!("No analytics for {qr_id}"))),
            ),
            AppError::Encoding(err) => {
                error!("Error generating QR code: {err}");

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new(self.to_string(), Some(err.to_string())),
                )
            }
            AppError::InternalError(err) => {
                error!("Unhandled error: {err}");

                let mut response = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new(INTERNAL_ERROR, Some(GENERIC_DETAILS.to_string()))),
                )
                    .into_response();
                response
                    .extensions_mut()
                    .insert(ErrorDetail(err.to_string()));

                return response;
            }
        };

        (status, Json(body)).into_response()
    }
}
