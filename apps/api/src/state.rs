use std::sync::Arc;

use crate::export::Exporter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Export pipeline. Holds the pluggable rasterizer (headless Chrome or the
    /// unavailable fallback, chosen at startup) and the busy flag.
    pub exporter: Arc<Exporter>,
}
