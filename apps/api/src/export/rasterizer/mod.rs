//! Rasterizer: pluggable capture backend that turns an element into pixels.
//!
//! Default: `ChromeRasterizer` (headless Chrome, cargo feature `chrome`).
//! Fallback: `UnavailableRasterizer`, chosen at startup when no rendering
//! capability exists, so the service still boots and answers exports with a
//! clear error instead of failing at the first request.
//!
//! `Exporter` holds an `Arc<dyn Rasterizer>`, swapped at startup via `RASTERIZER`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use tracing::{info, warn};

use crate::config::{Config, RasterizerKind};
use crate::export::error::RasterizeError;
use crate::export::source::SourceElement;
use crate::export::units::{DeviceScale, LogicalPixels};

#[cfg(feature = "chrome")]
pub mod chrome;
pub mod unavailable;

#[cfg(feature = "chrome")]
pub use chrome::ChromeRasterizer;
pub use unavailable::UnavailableRasterizer;

/// Everything a backend needs to capture one element.
#[derive(Debug, Clone, Copy)]
pub struct RasterRequest<'a> {
    /// The element with export overrides already applied.
    pub element: &'a SourceElement,
    /// Stylesheet scoped to `selector`, injected alongside the element.
    pub stylesheet: &'a str,
    /// Selector that locates the element once rendered.
    pub selector: &'a str,
    pub logical_width: LogicalPixels,
    pub device_scale: DeviceScale,
    /// Wait between rendering the element and measuring or capturing it.
    pub settle_delay: Duration,
}

/// The rasterizer trait. Implement this to swap capture backends without
/// touching the pipeline or the handlers.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Short backend name reported by `/health`.
    fn backend(&self) -> &'static str;

    /// Captures the element. The returned image is in device pixels, i.e.
    /// `logical size * device_scale`.
    async fn rasterize(&self, request: &RasterRequest<'_>) -> Result<RgbaImage, RasterizeError>;
}

/// Picks the capture backend for this process.
///
/// Never fails: a backend that cannot start degrades to `UnavailableRasterizer`.
pub fn select_rasterizer(config: &Config) -> Arc<dyn Rasterizer> {
    match config.rasterizer {
        RasterizerKind::None => {
            info!("Rasterizer disabled by configuration");
            Arc::new(UnavailableRasterizer::new("rasterizer disabled by configuration"))
        }
        RasterizerKind::Chrome => launch_chrome(config),
    }
}

#[cfg(feature = "chrome")]
fn launch_chrome(config: &Config) -> Arc<dyn Rasterizer> {
    match ChromeRasterizer::launch(config.chrome_path.clone(), config.logical_width) {
        Ok(rasterizer) => {
            info!("Headless Chrome rasterizer ready");
            Arc::new(rasterizer)
        }
        Err(e) => {
            warn!("Headless Chrome unavailable, exports disabled: {e}");
            Arc::new(UnavailableRasterizer::new(e.to_string()))
        }
    }
}

#[cfg(not(feature = "chrome"))]
fn launch_chrome(_config: &Config) -> Arc<dyn Rasterizer> {
    warn!("Built without the `chrome` feature, exports disabled");
    Arc::new(UnavailableRasterizer::new(
        "built without the `chrome` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_rasterizer_falls_back() {
        let config = Config {
            rasterizer: RasterizerKind::None,
            ..Config::default()
        };
        assert_eq!(select_rasterizer(&config).backend(), "unavailable");
    }

    #[cfg(not(feature = "chrome"))]
    #[test]
    fn test_chrome_without_feature_falls_back() {
        let config = Config {
            rasterizer: RasterizerKind::Chrome,
            ..Config::default()
        };
        assert_eq!(select_rasterizer(&config).backend(), "unavailable");
    }
}
