//! Export pipeline: capture → page split → assembly, one export at a time.
//!
//! # Architecture
//! - `Exporter::export` is the public async entry point.
//! - Capture runs on the async executor (the rasterizer decides where its own
//!   blocking work goes).
//! - Slice rendering and PDF encoding are CPU-bound and run together inside
//!   `tokio::task::spawn_blocking`, on owned data.
//! - `ExportGate` is the busy flag. `BusyGuard` clears it on drop, so the flag
//!   is released on success, on error, and on unwinding alike.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::export::assemble::{
    sanitize_filename, DocumentInfo, DocumentWriter, OutputDocument, PlacedImage,
};
use crate::export::capture::{capture_element, CaptureOptions};
use crate::export::error::ExportError;
use crate::export::geometry::PageGeometry;
use crate::export::rasterizer::Rasterizer;
use crate::export::source::SourceElement;
use crate::export::split::{plan_pages, render_slice};

// ────────────────────────────────────────────────────────────────────────────
// Busy state
// ────────────────────────────────────────────────────────────────────────────

/// In-flight flag that keeps exports from overlapping.
#[derive(Debug, Default)]
pub struct ExportGate {
    busy: AtomicBool,
}

impl ExportGate {
    /// Claims the gate, or returns `None` if an export is already running.
    pub fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Holds the gate for the lifetime of one export.
pub struct BusyGuard<'a> {
    gate: &'a ExportGate,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Exporter
// ────────────────────────────────────────────────────────────────────────────

/// Fixed parameters for every export this process runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub geometry: PageGeometry,
    pub capture: CaptureOptions,
    pub filename: String,
    pub max_pages: usize,
}

/// Owns the capture and document backends plus the busy flag.
pub struct Exporter {
    rasterizer: Arc<dyn Rasterizer>,
    writer: Arc<dyn DocumentWriter>,
    settings: ExportSettings,
    gate: ExportGate,
}

impl Exporter {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        writer: Arc<dyn DocumentWriter>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            rasterizer,
            writer,
            settings,
            gate: ExportGate::default(),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    pub fn rasterizer_backend(&self) -> &'static str {
        self.rasterizer.backend()
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Runs one export of `element`.
    ///
    /// `filename` overrides the configured download name after sanitizing.
    /// Fails with `Busy` without touching the element if another export holds
    /// the gate. Every failure is logged here before it is returned.
    pub async fn export(
        &self,
        element: Option<&mut SourceElement>,
        filename: Option<&str>,
    ) -> Result<OutputDocument, ExportError> {
        let Some(_busy) = self.gate.try_begin() else {
            return Err(ExportError::Busy);
        };

        let export_id = Uuid::new_v4();
        let span = info_span!("export", %export_id, backend = self.rasterizer.backend());

        let result = self.run(element, filename).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(doc) => info!(
                "Export complete: {} page(s), {} bytes as {}",
                doc.page_count,
                doc.bytes.len(),
                doc.filename
            ),
            Err(e) => error!("Export failed: {e}"),
        });
        result
    }

    async fn run(
        &self,
        element: Option<&mut SourceElement>,
        filename: Option<&str>,
    ) -> Result<OutputDocument, ExportError> {
        let filename = match filename {
            Some(requested) => sanitize_filename(requested, &self.settings.filename),
            None => self.settings.filename.clone(),
        };

        let capture =
            capture_element(element, self.rasterizer.as_ref(), &self.settings.capture).await?;

        let plan = plan_pages(
            capture.width_px(),
            capture.height_px(),
            capture.device_scale,
            &self.settings.geometry,
            self.settings.max_pages,
        )?;
        info!(
            "Capture {}x{}px → {} page(s) at scale {:.4}",
            plan.raster_width,
            plan.raster_height,
            plan.page_count(),
            plan.scale.0
        );

        let writer = Arc::clone(&self.writer);
        let geometry = self.settings.geometry;
        let info = DocumentInfo::for_filename(&filename);
        let slices = plan.slices.clone();
        let raster = capture.image;

        let bytes = tokio::task::spawn_blocking(move || {
            let pages: Vec<PlacedImage> = slices
                .iter()
                .map(|slice| PlacedImage {
                    image: render_slice(&raster, slice),
                    placement: slice.placement,
                })
                .collect();
            writer.write(&geometry, &pages, &info)
        })
        .await
        .map_err(|e| ExportError::Task(format!("spawn_blocking failed in export: {e}")))??;

        Ok(OutputDocument {
            filename,
            page_count: plan.page_count(),
            plan,
            bytes,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::export::assemble::{PdfDocumentWriter, DEFAULT_FILENAME};
    use crate::export::error::RasterizeError;
    use crate::export::split::DEFAULT_MAX_PAGES;
    use crate::export::testing::{resume_element, FakeRasterizer};
    use crate::export::units::{DeviceScale, LogicalPixels, Points};

    fn settings() -> ExportSettings {
        ExportSettings {
            geometry: PageGeometry::new(Points(820.0), Points(1020.0), Points(10.0)).unwrap(),
            capture: CaptureOptions {
                logical_width: LogicalPixels(794.0),
                device_scale: DeviceScale(1.0),
                settle_delay: Duration::from_millis(100),
            },
            filename: DEFAULT_FILENAME.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    fn exporter(rasterizer: Arc<FakeRasterizer>) -> Exporter {
        Exporter::new(rasterizer, Arc::new(PdfDocumentWriter::new()), settings())
    }

    fn slice_heights(doc: &OutputDocument) -> Vec<u32> {
        doc.plan.slices.iter().map(|s| s.source_height).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_splits_into_expected_pages() {
        let cases = [(2000, vec![1000, 1000]), (1500, vec![1000, 500]), (800, vec![800])];
        for (height, expected) in cases {
            let exporter = exporter(Arc::new(FakeRasterizer::with_logical_height(height)));
            let mut element = resume_element();

            let doc = exporter.export(Some(&mut element), None).await.unwrap();

            assert_eq!(doc.page_count, expected.len(), "height {height}");
            assert_eq!(slice_heights(&doc), expected);
            assert_eq!(doc.filename, "resume.pdf");
            assert!(doc.bytes.starts_with(b"%PDF-"));
            assert!(!exporter.is_busy());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_restores_element_on_success() {
        let exporter = exporter(Arc::new(FakeRasterizer::with_logical_height(1500)));
        let mut element = resume_element();
        let before = element.clone();

        exporter.export(Some(&mut element), None).await.unwrap();

        assert_eq!(element, before);
    }

    #[tokio::test]
    async fn test_missing_source_aborts_without_capture() {
        let rasterizer = Arc::new(FakeRasterizer::with_logical_height(1000));
        let exporter = exporter(Arc::clone(&rasterizer));

        let result = exporter.export(None, None).await;

        assert!(matches!(result, Err(ExportError::MissingSource)));
        assert_eq!(rasterizer.calls(), 0);
        assert!(!exporter.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rasterizer_failure_reverts_and_releases() {
        let rasterizer = Arc::new(FakeRasterizer::failing("cross-origin image"));
        let exporter = exporter(Arc::clone(&rasterizer));
        let mut element = resume_element();
        let before = element.clone();

        let result = exporter.export(Some(&mut element), None).await;

        assert!(matches!(
            result,
            Err(ExportError::Rasterize(RasterizeError::Capture(_)))
        ));
        assert_eq!(rasterizer.calls(), 1);
        assert_eq!(element, before);
        assert!(!exporter.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_exports_are_identical() {
        let exporter = exporter(Arc::new(FakeRasterizer::with_logical_height(3333)));
        let mut element = resume_element();

        let first = exporter.export(Some(&mut element), None).await.unwrap();
        let second = exporter.export(Some(&mut element), None).await.unwrap();

        assert_eq!(first.page_count, second.page_count);
        assert_eq!(first.plan, second.plan);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filename_override_is_sanitized() {
        let exporter = exporter(Arc::new(FakeRasterizer::with_logical_height(400)));
        let mut element = resume_element();

        let doc = exporter
            .export(Some(&mut element), Some("../Grace Hopper"))
            .await
            .unwrap();

        assert_eq!(doc.filename, "Grace_Hopper.pdf");
    }

    #[tokio::test]
    async fn test_busy_gate_rejects_overlapping_export() {
        let rasterizer = Arc::new(FakeRasterizer::with_logical_height(400));
        let exporter = exporter(Arc::clone(&rasterizer));
        let mut element = resume_element();
        let before = element.clone();

        let held = exporter.gate.try_begin().unwrap();
        assert!(exporter.is_busy());
        let result = exporter.export(Some(&mut element), None).await;
        drop(held);

        assert!(matches!(result, Err(ExportError::Busy)));
        assert_eq!(rasterizer.calls(), 0);
        assert_eq!(element, before);
        assert!(!exporter.is_busy());
    }

    #[test]
    fn test_gate_releases_on_drop() {
        let gate = ExportGate::default();
        {
            let _guard = gate.try_begin().unwrap();
            assert!(gate.try_begin().is_none());
        }
        assert!(!gate.is_busy());
        assert!(gate.try_begin().is_some());
    }
}
