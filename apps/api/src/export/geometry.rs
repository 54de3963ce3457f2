//! Output page geometry and the width-fit scale derived from it.

use serde::{Deserialize, Serialize};

use crate::export::error::ExportError;
use crate::export::units::{FitScale, LogicalPixels, Points};

/// A4 portrait in PDF points.
pub const A4_WIDTH_PT: f64 = 595.28;
pub const A4_HEIGHT_PT: f64 = 841.89;

/// Uniform page margin used unless `EXPORT_MARGIN_PT` overrides it.
pub const DEFAULT_MARGIN_PT: f64 = 10.0;

/// Target page size plus a uniform margin on all four sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: Points,
    pub height: Points,
    pub margin: Points,
}

impl PageGeometry {
    /// Builds a geometry, rejecting margins that leave no content area.
    pub fn new(width: Points, height: Points, margin: Points) -> Result<Self, ExportError> {
        if !(width.get() > 0.0 && height.get() > 0.0) {
            return Err(ExportError::InvalidGeometry(format!(
                "page size must be positive, got {}x{}pt",
                width.get(),
                height.get()
            )));
        }
        if margin.get() < 0.0 {
            return Err(ExportError::InvalidGeometry(format!(
                "margin must not be negative, got {}pt",
                margin.get()
            )));
        }

        let geometry = Self {
            width,
            height,
            margin,
        };
        if geometry.usable_width().get() <= 0.0 || geometry.usable_height().get() <= 0.0 {
            return Err(ExportError::InvalidGeometry(format!(
                "{}pt margins leave no content area on a {}x{}pt page",
                margin.get(),
                width.get(),
                height.get()
            )));
        }
        Ok(geometry)
    }

    pub fn a4(margin: Points) -> Result<Self, ExportError> {
        Self::new(Points(A4_WIDTH_PT), Points(A4_HEIGHT_PT), margin)
    }

    pub fn usable_width(&self) -> Points {
        self.width - self.margin * 2.0
    }

    pub fn usable_height(&self) -> Points {
        self.height - self.margin * 2.0
    }

    /// Width-fit scale for content of the given logical width.
    ///
    /// Only shrinks: content narrower than the usable width is placed 1:1.
    pub fn fit_scale(&self, content_width: LogicalPixels) -> FitScale {
        let fit = self.usable_width().get() / content_width.get();
        FitScale(fit.min(1.0))
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: Points(A4_WIDTH_PT),
            height: Points(A4_HEIGHT_PT),
            margin: Points(DEFAULT_MARGIN_PT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_usable_area_subtracts_both_margins() {
        let geometry = PageGeometry::a4(Points(10.0)).unwrap();
        assert!((geometry.usable_width().get() - 575.28).abs() < 1e-9);
        assert!((geometry.usable_height().get() - 821.89).abs() < 1e-9);
    }

    #[test]
    fn test_fit_scale_shrinks_wide_content() {
        let geometry = PageGeometry::default();
        let scale = geometry.fit_scale(LogicalPixels(794.0));
        assert!((scale.0 - 575.28 / 794.0).abs() < 1e-12);
        assert!(scale.0 < 1.0);
    }

    #[test]
    fn test_fit_scale_never_upscales_narrow_content() {
        let geometry = PageGeometry::default();
        let scale = geometry.fit_scale(LogicalPixels(200.0));
        assert_eq!(scale.0, 1.0);
    }

    #[test]
    fn test_margins_consuming_page_are_rejected() {
        let result = PageGeometry::new(Points(100.0), Points(100.0), Points(50.0));
        assert!(matches!(result, Err(ExportError::InvalidGeometry(_))));
    }

    #[test]
    fn test_negative_margin_is_rejected() {
        let result = PageGeometry::a4(Points(-1.0));
        assert!(matches!(result, Err(ExportError::InvalidGeometry(_))));
    }
}
