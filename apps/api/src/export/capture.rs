//! Capture stage: snapshot the source element into a raster at a fixed
//! logical width.
//!
//! The style overrides live only inside `capture_element`: they are applied
//! through a `StyleScope` after the source is validated and reverted when the
//! scope drops, whether the rasterizer succeeds or fails.
//!
//! The settle delay travels with the `RasterRequest`. Backends wait it out
//! once the overridden element is rendered and before they measure it.

use std::time::Duration;

use image::RgbaImage;
use tracing::{debug, warn};

use crate::export::error::ExportError;
use crate::export::rasterizer::{RasterRequest, Rasterizer};
use crate::export::source::SourceElement;
use crate::export::style::{ExportStyleProfile, StyleScope};
use crate::export::units::{DevicePixels, DeviceScale, LogicalPixels};

/// Logical width of an A4 page at 96 DPI.
pub const A4_LOGICAL_WIDTH_PX: f64 = 794.0;
pub const DEFAULT_DEVICE_SCALE: f64 = 2.0;
/// Largest accepted device scale; rasters grow with its square.
pub const MAX_DEVICE_SCALE: f64 = 8.0;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOptions {
    pub logical_width: LogicalPixels,
    pub device_scale: DeviceScale,
    /// Pause between rendering the overridden element and capturing it, so
    /// restyling, font loading and reflow have settled.
    pub settle_delay: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            logical_width: LogicalPixels(A4_LOGICAL_WIDTH_PX),
            device_scale: DeviceScale(DEFAULT_DEVICE_SCALE),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// A captured raster together with the scale it was taken at.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub image: RgbaImage,
    pub device_scale: DeviceScale,
}

impl CaptureResult {
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }

    pub fn height_px(&self) -> u32 {
        self.image.height()
    }

    pub fn logical_width(&self) -> LogicalPixels {
        self.device_scale.to_logical(DevicePixels::from_rows(self.width_px()))
    }

    pub fn logical_height(&self) -> LogicalPixels {
        self.device_scale.to_logical(DevicePixels::from_rows(self.height_px()))
    }
}

/// Captures `element` with the print-safe profile applied.
///
/// An absent or empty element fails with `MissingSource` before any override
/// is applied and before the rasterizer is called. A zero-sized raster fails
/// with `EmptyCapture`.
pub async fn capture_element(
    element: Option<&mut SourceElement>,
    rasterizer: &dyn Rasterizer,
    options: &CaptureOptions,
) -> Result<CaptureResult, ExportError> {
    let element = match element {
        Some(el) if el.is_mounted() => el,
        _ => return Err(ExportError::MissingSource),
    };

    let measured_height = element.scroll_height;
    let profile = ExportStyleProfile::print_safe(options.logical_width);

    let image = {
        let scope = StyleScope::acquire(element, &profile);
        let request = RasterRequest {
            element: scope.element(),
            stylesheet: scope.stylesheet(),
            selector: scope.selector(),
            logical_width: options.logical_width,
            device_scale: options.device_scale,
            settle_delay: options.settle_delay,
        };
        rasterizer.rasterize(&request).await?
    };

    if image.width() == 0 || image.height() == 0 {
        return Err(ExportError::EmptyCapture {
            width: image.width(),
            height: image.height(),
        });
    }

    let capture = CaptureResult {
        image,
        device_scale: options.device_scale,
    };

    let expected_width = options.device_scale.to_device(options.logical_width).rows();
    if capture.width_px() != expected_width {
        warn!(
            "Capture width {}px differs from expected {}px",
            capture.width_px(),
            expected_width
        );
    }
    debug!(
        "Captured {}x{}px at {}x (measured scroll height: {:?})",
        capture.width_px(),
        capture.height_px(),
        options.device_scale.0,
        measured_height
    );

    Ok(capture)
}
