//! Assembly stage: places each rendered slice on its own page and serializes
//! the document.
//!
//! `PdfDocumentWriter` embeds every slice as a Flate-compressed RGB image
//! XObject and draws it with a single `cm`/`Do` pair. Placements are given
//! from the top-left corner of the page; PDF user space starts bottom-left, so
//! the y offset is flipped when the content stream is written.

use chrono::{DateTime, Datelike, Timelike, Utc};
use image::RgbImage;
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect, Ref, TextStr};
use serde::Serialize;

use crate::export::error::ExportError;
use crate::export::geometry::PageGeometry;
use crate::export::split::{PagePlan, Placement};

pub const DEFAULT_FILENAME: &str = "resume.pdf";
pub const PRODUCER: &str = concat!("folio ", env!("CARGO_PKG_VERSION"));

const IMAGE_NAME: &[u8] = b"Im1";
const DEFAULT_COMPRESSION_LEVEL: u8 = 6;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A rendered slice and where it goes on its page.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub image: RgbImage,
    pub placement: Placement,
}

/// Metadata written into the document-info dictionary.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub producer: String,
    pub created_at: DateTime<Utc>,
}

impl DocumentInfo {
    pub fn for_filename(filename: &str) -> Self {
        let title = filename
            .strip_suffix(".pdf")
            .unwrap_or(filename)
            .to_string();
        Self {
            title,
            producer: PRODUCER.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// The finished export, ready to hand to the client.
#[derive(Debug, Clone, Serialize)]
pub struct OutputDocument {
    pub filename: String,
    pub page_count: usize,
    pub plan: PagePlan,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

// ────────────────────────────────────────────────────────────────────────────
// Writer trait
// ────────────────────────────────────────────────────────────────────────────

/// Serializes placed page images into a document. CPU-bound; callers run it
/// on the blocking pool.
pub trait DocumentWriter: Send + Sync {
    fn write(
        &self,
        geometry: &PageGeometry,
        pages: &[PlacedImage],
        info: &DocumentInfo,
    ) -> Result<Vec<u8>, ExportError>;
}

/// PDF output via `pdf-writer`, one image per page.
pub struct PdfDocumentWriter {
    compression_level: u8,
}

impl PdfDocumentWriter {
    pub fn new() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl Default for PdfDocumentWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentWriter for PdfDocumentWriter {
    fn write(
        &self,
        geometry: &PageGeometry,
        pages: &[PlacedImage],
        info: &DocumentInfo,
    ) -> Result<Vec<u8>, ExportError> {
        if pages.is_empty() {
            return Err(ExportError::Serialize("document has no pages".to_string()));
        }

        let mut pdf = Pdf::new();
        let mut next_id = 1i32;
        let mut alloc = || {
            let r = Ref::new(next_id);
            next_id += 1;
            r
        };

        let catalog_id = alloc();
        let pages_id = alloc();
        let info_id = alloc();

        let page_width = geometry.width.get() as f32;
        let page_height = geometry.height.get() as f32;
        let mut page_ids = Vec::with_capacity(pages.len());

        for page in pages {
            let page_id = alloc();
            let content_id = alloc();
            let image_id = alloc();

            let (px_width, px_height) = page.image.dimensions();
            let rgb = miniz_oxide::deflate::compress_to_vec_zlib(
                page.image.as_raw(),
                self.compression_level,
            );
            {
                let mut xobj = pdf.image_xobject(image_id, &rgb);
                xobj.filter(Filter::FlateDecode);
                xobj.width(px_width as i32);
                xobj.height(px_height as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
            }

            let Placement {
                x,
                y,
                width,
                height,
            } = page.placement;
            let bottom = geometry.height - y - height;

            let mut content = Content::new();
            content.save_state();
            content.transform([
                width.get() as f32,
                0.0,
                0.0,
                height.get() as f32,
                x.get() as f32,
                bottom.get() as f32,
            ]);
            content.x_object(Name(IMAGE_NAME));
            content.restore_state();
            let raw = content.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, self.compression_level);
            pdf.stream(content_id, &compressed).filter(Filter::FlateDecode);

            {
                let mut pdf_page = pdf.page(page_id);
                pdf_page
                    .media_box(Rect::new(0.0, 0.0, page_width, page_height))
                    .parent(pages_id)
                    .contents(content_id);
                let mut resources = pdf_page.resources();
                let mut xobjects = resources.x_objects();
                xobjects.pair(Name(IMAGE_NAME), image_id);
            }
            page_ids.push(page_id);
        }

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        pdf.document_info(info_id)
            .title(TextStr(&info.title))
            .producer(TextStr(&info.producer))
            .creation_date(pdf_date(&info.created_at));

        Ok(pdf.finish())
    }
}

fn pdf_date(at: &DateTime<Utc>) -> Date {
    Date::new(at.year().clamp(0, 9999) as u16)
        .month(at.month() as u8)
        .day(at.day() as u8)
        .hour(at.hour() as u8)
        .minute(at.minute() as u8)
        .second(at.second() as u8)
        .utc_offset_hour(0)
        .utc_offset_minute(0)
}

// ────────────────────────────────────────────────────────────────────────────
// Filenames
// ────────────────────────────────────────────────────────────────────────────

/// Reduces a requested download name to a safe basename ending in `.pdf`.
///
/// Path components are stripped, characters outside `[A-Za-z0-9._-]` become
/// `_`, and an empty result falls back to `fallback`.
pub fn sanitize_filename(requested: &str, fallback: &str) -> String {
    let base = requested
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');

    let stem = cleaned
        .strip_suffix(".pdf")
        .or_else(|| cleaned.strip_suffix(".PDF"))
        .unwrap_or(cleaned);
    if stem.is_empty() || stem.chars().all(|c| c == '_') {
        return fallback.to_string();
    }
    format!("{stem}.pdf")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
