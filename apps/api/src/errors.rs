use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::export::error::{ExportError, RasterizeError};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Export(e) => export_parts(e),
        }
    }
}

/// Export failures are reported generically; the details stay in the logs.
fn export_parts(error: &ExportError) -> (StatusCode, &'static str, String) {
    match error {
        ExportError::MissingSource => (
            StatusCode::BAD_REQUEST,
            "MISSING_SOURCE",
            error.to_string(),
        ),
        ExportError::Busy => (
            StatusCode::CONFLICT,
            "EXPORT_IN_PROGRESS",
            error.to_string(),
        ),
        ExportError::EmptyCapture { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "EMPTY_CAPTURE",
            "The resume preview rendered as an empty image".to_string(),
        ),
        ExportError::TooManyPages { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "MAX_PAGES",
            error.to_string(),
        ),
        ExportError::InvalidGeometry(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        ExportError::Rasterize(RasterizeError::Unavailable(reason)) => {
            tracing::warn!("Export requested but rasterizer is unavailable: {reason}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "RENDERER_UNAVAILABLE",
                "PDF generation is not available on this server".to_string(),
            )
        }
        ExportError::Rasterize(_) | ExportError::Serialize(_) | ExportError::Task(_) => {
            tracing::error!("PDF generation failed: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PDF_GENERATION_FAILED",
                "PDF generation failed".to_string(),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
