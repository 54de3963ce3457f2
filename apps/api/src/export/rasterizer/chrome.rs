//! Headless Chrome capture backend (uses the `headless_chrome` crate).
//!
//! The element is written into a standalone HTML document together with the
//! scoped export stylesheet, loaded into a fresh tab, measured, and captured
//! with a clip rectangle that covers its full scroll height. The browser API
//! is blocking, so each capture runs on the blocking pool.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use image::RgbaImage;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::export::error::RasterizeError;
use crate::export::rasterizer::{RasterRequest, Rasterizer};
use crate::export::units::LogicalPixels;

/// Window height for the capture browser. Tall enough that multi-page resumes
/// are laid out without a viewport clip.
const WINDOW_HEIGHT: u32 = 16_384;

/// Position and scroll size of the rendered element, in logical pixels.
#[derive(Debug, Deserialize)]
struct ElementBounds {
    x: f64,
    y: f64,
    height: f64,
}

pub struct ChromeRasterizer {
    browser: Browser,
}

impl ChromeRasterizer {
    pub fn launch(path: Option<PathBuf>, logical_width: LogicalPixels) -> Result<Self, RasterizeError> {
        let window_width = logical_width.get().ceil() as u32;
        let options = LaunchOptions::default_builder()
            .headless(true)
            .path(path)
            .window_size(Some((window_width, WINDOW_HEIGHT)))
            .build()
            .map_err(|e| RasterizeError::Launch(format!("Failed to build launch options: {e}")))?;

        let browser = Browser::new(options)
            .map_err(|e| RasterizeError::Launch(format!("Failed to launch browser: {e}")))?;

        Ok(Self { browser })
    }
}

#[async_trait]
impl Rasterizer for ChromeRasterizer {
    fn backend(&self) -> &'static str {
        "chrome"
    }

    async fn rasterize(&self, request: &RasterRequest<'_>) -> Result<RgbaImage, RasterizeError> {
        let document = build_document(request);
        let selector = request.selector.to_string();
        let width = request.logical_width.get();
        let scale = request.device_scale.0;
        let settle_delay = request.settle_delay;
        let browser = self.browser.clone();

        tokio::task::spawn_blocking(move || {
            capture_blocking(&browser, &document, &selector, width, scale, settle_delay)
        })
        .await
        .map_err(|e| RasterizeError::Capture(format!("capture task failed: {e}")))?
    }
}

fn build_document(request: &RasterRequest<'_>) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
         <style>html, body {{ margin: 0; padding: 0; background: #ffffff; }}</style>\
         <style>{}</style></head><body>{}</body></html>",
        request.stylesheet,
        request.element.outer_html()
    )
}

fn capture_blocking(
    browser: &Browser,
    document: &str,
    selector: &str,
    width: f64,
    scale: f64,
    settle_delay: Duration,
) -> Result<RgbaImage, RasterizeError> {
    let mut file = tempfile::Builder::new()
        .prefix("folio-export-")
        .suffix(".html")
        .tempfile()?;
    file.write_all(document.as_bytes())?;
    file.flush()?;
    let url = format!("file://{}", file.path().display());

    let tab = browser.new_tab().map_err(step_failed("open tab"))?;
    let result = (|| -> Result<RgbaImage, RasterizeError> {
        tab.navigate_to(&url).map_err(step_failed("navigate"))?;
        tab.wait_until_navigated().map_err(step_failed("load document"))?;
        tab.wait_for_element(selector)
            .map_err(step_failed("locate element"))?;
        if !settle_delay.is_zero() {
            std::thread::sleep(settle_delay);
        }

        let bounds = measure(&tab, selector)?;
        debug!(
            "Element bounds: {}x{} at ({}, {})",
            width, bounds.height, bounds.x, bounds.y
        );
        if bounds.height <= 0.0 {
            return Ok(RgbaImage::new((width * scale).round() as u32, 0));
        }

        let clip = Page::Viewport {
            x: bounds.x,
            y: bounds.y,
            width,
            height: bounds.height,
            scale,
        };
        let png = tab
            .capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                Some(clip),
                true,
            )
            .map_err(step_failed("screenshot"))?;

        let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)?;
        Ok(decoded.to_rgba8())
    })();

    if let Err(e) = tab.close(true) {
        warn!("Failed to close capture tab: {e}");
    }
    result
}

fn measure(tab: &headless_chrome::Tab, selector: &str) -> Result<ElementBounds, RasterizeError> {
    let quoted = serde_json::to_string(selector)
        .map_err(|e| RasterizeError::Capture(format!("bad selector: {e}")))?;
    let script = format!(
        "JSON.stringify((() => {{ \
            const el = document.querySelector({quoted}); \
            const r = el.getBoundingClientRect(); \
            return {{ x: r.left + window.scrollX, y: r.top + window.scrollY, height: el.scrollHeight }}; \
        }})())"
    );

    let remote = tab
        .evaluate(&script, false)
        .map_err(step_failed("measure element"))?;
    let raw = remote
        .value
        .as_ref()
        .and_then(|v| v.as_str())
        .ok_or_else(|| RasterizeError::Capture("element bounds unavailable".to_string()))?;

    serde_json::from_str(raw)
        .map_err(|e| RasterizeError::Capture(format!("unreadable element bounds: {e}")))
}

fn step_failed<E: std::fmt::Display>(step: &'static str) -> impl FnOnce(E) -> RasterizeError {
    move |e| RasterizeError::Capture(format!("{step} failed: {e}"))
}
