mod config;
mod errors;
mod export;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::export::{
    select_rasterizer, CaptureOptions, ExportSettings, Exporter, PageGeometry, PdfDocumentWriter,
};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Folio API v{}", env!("CARGO_PKG_VERSION"));

    // Pick the capture backend; falls back to the unavailable rasterizer
    let rasterizer = select_rasterizer(&config);

    let geometry = PageGeometry::a4(config.margin)?;
    info!(
        "Page geometry: {:.2}x{:.2}pt, margin {}pt, device scale {}",
        geometry.width.get(),
        geometry.height.get(),
        geometry.margin.get(),
        config.device_scale.0
    );

    let settings = ExportSettings {
        geometry,
        capture: CaptureOptions {
            logical_width: config.logical_width,
            device_scale: config.device_scale,
            settle_delay: config.settle_delay,
        },
        filename: config.filename.clone(),
        max_pages: config.max_pages,
    };
    let exporter = Exporter::new(rasterizer, Arc::new(PdfDocumentWriter::new()), settings);
    info!("Rasterizer backend: {}", exporter.rasterizer_backend());

    // Build app state
    let state = AppState {
        exporter: Arc::new(exporter),
    };

    // Build router
    let app = build_router(state, config.max_body_bytes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
