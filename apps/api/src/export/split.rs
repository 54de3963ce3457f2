//! Page splitting: partitions a captured raster into page-sized bands.
//!
//! # Algorithm
//! 1. `scale = min(usable_width / logical_width, 1)`; content is never upscaled.
//! 2. `scaled_height = logical_height * scale`. If it fits the usable page
//!    height (inclusive), the whole raster is one slice.
//! 3. Otherwise `pages = ceil(scaled_height / usable_height)`.
//! 4. Page `p` starts at raster row `floor(p * rows_per_page)`, where
//!    `rows_per_page` is the usable height converted back into device pixels.
//!    The last page ends exactly at the raster height.
//!
//! Boundaries are derived from the page index rather than by summing slice
//! heights, so rounding cannot drift and consecutive slices share an edge:
//! the slices always tile `0..raster_height` with no gap or overlap.

use image::{Rgb, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::export::error::ExportError;
use crate::export::geometry::PageGeometry;
use crate::export::units::{DevicePixels, DeviceScale, FitScale, Points};

/// Absorbs float noise in `scaled_height / usable_height` so an exact fit
/// does not spill into a near-empty trailing page.
const PAGE_COUNT_EPSILON: f64 = 1e-9;

/// Upper bound on pages per export unless `EXPORT_MAX_PAGES` overrides it.
pub const DEFAULT_MAX_PAGES: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Where a slice lands on its output page, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: Points,
    pub y: Points,
    pub width: Points,
    pub height: Points,
}

/// One page's band of the raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSlice {
    pub index: usize,
    /// First raster row of the band.
    pub source_y: u32,
    /// Number of raster rows in the band.
    pub source_height: u32,
    pub placement: Placement,
}

impl PageSlice {
    pub fn source_end(&self) -> u32 {
        self.source_y + self.source_height
    }
}

/// The full pagination decision for one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagePlan {
    pub raster_width: u32,
    pub raster_height: u32,
    pub device_scale: DeviceScale,
    pub scale: FitScale,
    pub scaled_height: Points,
    pub usable_height: Points,
    pub slices: Vec<PageSlice>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.slices.len()
    }

    pub fn is_single_page(&self) -> bool {
        self.slices.len() == 1
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Planning
// ────────────────────────────────────────────────────────────────────────────

/// Number of pages needed for content of `scaled_height` on pages with
/// `usable_height` of room. An exact fit is one page.
pub fn pages_needed(scaled_height: Points, usable_height: Points) -> usize {
    if scaled_height <= usable_height {
        return 1;
    }
    let ratio = scaled_height / usable_height;
    (ratio - PAGE_COUNT_EPSILON).ceil().max(1.0) as usize
}

/// Computes the slice plan for a `raster_width` × `raster_height` capture
/// taken at `device_scale`.
///
/// Fails with `EmptyCapture` when either raster dimension is zero, with
/// `InvalidGeometry` when a page would hold less than one raster row, and
/// with `TooManyPages` when more than `max_pages` pages are needed. All
/// checks run before any slice is allocated.
pub fn plan_pages(
    raster_width: u32,
    raster_height: u32,
    device_scale: DeviceScale,
    geometry: &PageGeometry,
    max_pages: usize,
) -> Result<PagePlan, ExportError> {
    if raster_width == 0 || raster_height == 0 {
        return Err(ExportError::EmptyCapture {
            width: raster_width,
            height: raster_height,
        });
    }
    if !(device_scale.0 > 0.0 && device_scale.0.is_finite()) {
        return Err(ExportError::InvalidGeometry(format!(
            "device scale must be positive, got {}",
            device_scale.0
        )));
    }

    let logical_width = device_scale.to_logical(DevicePixels::from_rows(raster_width));
    let logical_height = device_scale.to_logical(DevicePixels::from_rows(raster_height));

    let scale = geometry.fit_scale(logical_width);
    let scaled_height = scale.to_points(logical_height);
    let usable_height = geometry.usable_height();

    let dest_width = scale.to_points(logical_width);
    let offset_x = (geometry.width - dest_width) / 2.0;
    let offset_y = geometry.margin;

    let page_count = pages_needed(scaled_height, usable_height);
    if page_count > max_pages {
        return Err(ExportError::TooManyPages {
            needed: page_count,
            max: max_pages,
        });
    }

    let rows_per_page = device_scale.to_device(scale.to_logical(usable_height));
    if page_count > 1 && rows_per_page.get() < 1.0 {
        return Err(ExportError::InvalidGeometry(format!(
            "a page holds {:.3} raster rows at device scale {}",
            rows_per_page.get(),
            device_scale.0
        )));
    }

    let boundary = |page: usize| -> u32 {
        if page >= page_count {
            raster_height
        } else {
            (rows_per_page * page as f64).floor_rows().min(raster_height)
        }
    };

    let mut slices = Vec::with_capacity(page_count);
    for page in 0..page_count {
        let start = boundary(page);
        let end = boundary(page + 1);
        if end <= start {
            continue;
        }
        let rows = end - start;
        let dest_height = scale.to_points(device_scale.to_logical(DevicePixels::from_rows(rows)));

        slices.push(PageSlice {
            index: slices.len(),
            source_y: start,
            source_height: rows,
            placement: Placement {
                x: offset_x,
                y: offset_y,
                width: dest_width,
                height: dest_height,
            },
        });
    }

    Ok(PagePlan {
        raster_width,
        raster_height,
        device_scale,
        scale,
        scaled_height,
        usable_height,
        slices,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// Copies a slice's rows onto a white, opaque canvas of the raster's width.
///
/// Transparent capture pixels are composited over white so slice edges never
/// show as black or see-through bands in the output.
pub fn render_slice(raster: &RgbaImage, slice: &PageSlice) -> RgbImage {
    let width = raster.width();
    let start = slice.source_y.min(raster.height());
    let end = slice.source_end().min(raster.height());
    let mut canvas = RgbImage::from_pixel(width, end - start, Rgb([255, 255, 255]));

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let [r, g, b, a] = raster.get_pixel(x, start + y).0;
        *pixel = Rgb([over_white(r, a), over_white(g, a), over_white(b, a)]);
    }
    canvas
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let c = channel as u32;
    let a = alpha as u32;
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
