// Resume export: HTML preview → raster → paginated A4 PDF.
// Capture (rasterizer backends), page split, and assembly run as one
// pipeline behind a busy flag. CPU-bound work runs inside spawn_blocking.

pub mod assemble;
pub mod capture;
pub mod error;
pub mod geometry;
pub mod handlers;
pub mod pipeline;
pub mod rasterizer;
pub mod source;
pub mod split;
pub mod style;
pub mod units;

#[cfg(test)]
pub mod testing;

// Re-export the public API consumed by main, state, and the router.
pub use assemble::{PdfDocumentWriter, DEFAULT_FILENAME};
pub use capture::CaptureOptions;
pub use geometry::PageGeometry;
pub use pipeline::{ExportSettings, Exporter};
pub use rasterizer::select_rasterizer;
