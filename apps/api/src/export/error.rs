use thiserror::Error;

/// Failures raised by a rendering backend while capturing the source element.
#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("rasterizer unavailable: {0}")]
    Unavailable(String),

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("screenshot decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Every way an export attempt can fail. Mapped onto HTTP responses by `AppError`.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No resume preview is available to export")]
    MissingSource,

    #[error("An export is already in progress")]
    Busy,

    #[error("Rasterization failed: {0}")]
    Rasterize(#[from] RasterizeError),

    #[error("Captured image is empty ({width}x{height})")]
    EmptyCapture { width: u32, height: u32 },

    #[error("Document needs {needed} pages, limit is {max}")]
    TooManyPages { needed: usize, max: usize },

    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),

    #[error("Document serialization failed: {0}")]
    Serialize(String),

    #[error("Export task failed: {0}")]
    Task(String),
}
