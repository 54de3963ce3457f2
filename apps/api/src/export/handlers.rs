//! Axum route handlers for the Export API.

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::export::source::SourceElement;
use crate::export::capture::MAX_DEVICE_SCALE;
use crate::export::split::{plan_pages, PagePlan};
use crate::export::units::DeviceScale;
use crate::state::AppState;

const PAGES_HEADER: HeaderName = HeaderName::from_static("x-export-pages");

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// The preview element. `null` or absent when nothing is mounted.
    #[serde(default)]
    pub element: Option<SourceElement>,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExportStatusResponse {
    pub busy: bool,
    pub rasterizer: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub width_px: u32,
    pub height_px: u32,
    #[serde(default)]
    pub device_scale: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub page_count: usize,
    pub plan: PagePlan,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/export
///
/// Captures the posted preview element and returns it as a paginated A4 PDF
/// download. Responds 409 while another export is running.
pub async fn handle_export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, AppError> {
    let mut element = request.element;
    let document = state
        .exporter
        .export(element.as_mut(), request.filename.as_deref())
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", document.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (PAGES_HEADER, document.page_count.to_string()),
        ],
        Bytes::from(document.bytes),
    )
        .into_response())
}

/// GET /api/v1/export/status
///
/// Reports whether an export is in flight, so clients can disable the trigger.
pub async fn handle_export_status(State(state): State<AppState>) -> Json<ExportStatusResponse> {
    Json(ExportStatusResponse {
        busy: state.exporter.is_busy(),
        rasterizer: state.exporter.rasterizer_backend(),
    })
}

/// POST /api/v1/export/plan
///
/// Returns the page plan for a raster of the given size without rendering.
/// `device_scale` defaults to the configured capture scale and must lie in
/// `(0, MAX_DEVICE_SCALE]`.
pub async fn handle_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    if request.width_px == 0 || request.height_px == 0 {
        return Err(AppError::Validation(
            "width_px and height_px must be positive".to_string(),
        ));
    }

    let settings = state.exporter.settings();
    let device_scale = match request.device_scale {
        Some(scale) if !(scale > 0.0 && scale <= MAX_DEVICE_SCALE) => {
            return Err(AppError::Validation(format!(
                "device_scale must be in (0, {MAX_DEVICE_SCALE}], got {scale}"
            )));
        }
        Some(scale) => DeviceScale(scale),
        None => settings.capture.device_scale,
    };

    let plan = plan_pages(
        request.width_px,
        request.height_px,
        device_scale,
        &settings.geometry,
        settings.max_pages,
    )?;

    Ok(Json(PlanResponse {
        page_count: plan.page_count(),
        plan,
    }))
}
