use async_trait::async_trait;
use image::RgbaImage;

use crate::export::error::RasterizeError;
use crate::export::rasterizer::{RasterRequest, Rasterizer};

/// Null backend used when no rendering capability could be set up.
/// Every capture fails with `RasterizeError::Unavailable`.
pub struct UnavailableRasterizer {
    reason: String,
}

impl UnavailableRasterizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Rasterizer for UnavailableRasterizer {
    fn backend(&self) -> &'static str {
        "unavailable"
    }

    async fn rasterize(&self, _request: &RasterRequest<'_>) -> Result<RgbaImage, RasterizeError> {
        Err(RasterizeError::Unavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::export::source::SourceElement;
    use crate::export::units::{DeviceScale, LogicalPixels};

    #[tokio::test]
    async fn test_rasterize_reports_reason() {
        let element = SourceElement::new("<p>x</p>");
        let request = RasterRequest {
            element: &element,
            stylesheet: "",
            selector: "div",
            logical_width: LogicalPixels(794.0),
            device_scale: DeviceScale(2.0),
            settle_delay: Duration::ZERO,
        };
        let err = UnavailableRasterizer::new("no browser")
            .rasterize(&request)
            .await
            .unwrap_err();
        assert!(matches!(err, RasterizeError::Unavailable(ref r) if r == "no browser"));
    }
}
