//! Test doubles shared by the export and route tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::export::error::RasterizeError;
use crate::export::rasterizer::{RasterRequest, Rasterizer};
use crate::export::source::SourceElement;

enum Script {
    Render { logical_height: u32 },
    Fail(String),
}

/// Scripted rasterizer: renders a striped raster of a fixed logical height or
/// fails with a capture error. Records calls plus the element and settle delay
/// it was handed, and waits out the delay on the tokio clock.
pub struct FakeRasterizer {
    script: Script,
    calls: AtomicUsize,
    last_seen: Mutex<Option<SourceElement>>,
    last_settle_delay: Mutex<Option<Duration>>,
}

impl FakeRasterizer {
    pub fn with_logical_height(logical_height: u32) -> Self {
        Self::new(Script::Render { logical_height })
    }

    pub fn failing(reason: &str) -> Self {
        Self::new(Script::Fail(reason.to_string()))
    }

    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            last_seen: Mutex::new(None),
            last_settle_delay: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Option<SourceElement> {
        self.last_seen.lock().unwrap().clone()
    }

    pub fn last_settle_delay(&self) -> Option<Duration> {
        *self.last_settle_delay.lock().unwrap()
    }
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    fn backend(&self) -> &'static str {
        "fake"
    }

    async fn rasterize(&self, request: &RasterRequest<'_>) -> Result<RgbaImage, RasterizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_seen.lock().unwrap() = Some(request.element.clone());
        *self.last_settle_delay.lock().unwrap() = Some(request.settle_delay);
        if !request.settle_delay.is_zero() {
            tokio::time::sleep(request.settle_delay).await;
        }

        match &self.script {
            Script::Fail(reason) => Err(RasterizeError::Capture(reason.clone())),
            Script::Render { logical_height } => {
                let scale = request.device_scale.0;
                let width = (request.logical_width.get() * scale).round() as u32;
                let height = (*logical_height as f64 * scale).round() as u32;
                Ok(RgbaImage::from_fn(width, height, |_, y| {
                    let shade = (y % 256) as u8;
                    Rgba([shade, shade, shade, 255])
                }))
            }
        }
    }
}

pub fn resume_element() -> SourceElement {
    SourceElement::new(
        "<header><h1>Grace Hopper</h1></header>\
         <section><h2>Experience</h2><ul><li>Built the first compiler</li></ul></section>",
    )
    .with_attribute("class", "resume-preview shadow-xl")
    .with_attribute("id", "resume")
    .with_attribute("style", "transform: scale(0.75); width: 100%")
}
