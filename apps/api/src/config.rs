use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::export::assemble::{sanitize_filename, DEFAULT_FILENAME};
use crate::export::capture::{
    A4_LOGICAL_WIDTH_PX, DEFAULT_DEVICE_SCALE, DEFAULT_SETTLE_DELAY, MAX_DEVICE_SCALE,
};
use crate::export::geometry::DEFAULT_MARGIN_PT;
use crate::export::split::DEFAULT_MAX_PAGES;
use crate::export::units::{DeviceScale, LogicalPixels, Points};

const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Which capture backend to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterizerKind {
    Chrome,
    None,
}

impl FromStr for RasterizerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "none" | "off" => Ok(Self::None),
            other => bail!("unknown rasterizer '{other}' (expected 'chrome' or 'none')"),
        }
    }
}

impl Default for RasterizerKind {
    fn default() -> Self {
        if cfg!(feature = "chrome") {
            Self::Chrome
        } else {
            Self::None
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub logical_width: LogicalPixels,
    pub device_scale: DeviceScale,
    pub margin: Points,
    pub settle_delay: Duration,
    pub filename: String,
    pub max_body_bytes: usize,
    pub max_pages: usize,
    pub rasterizer: RasterizerKind,
    pub chrome_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            logical_width: LogicalPixels(A4_LOGICAL_WIDTH_PX),
            device_scale: DeviceScale(DEFAULT_DEVICE_SCALE),
            margin: Points(DEFAULT_MARGIN_PT),
            settle_delay: DEFAULT_SETTLE_DELAY,
            filename: DEFAULT_FILENAME.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_pages: DEFAULT_MAX_PAGES,
            rasterizer: RasterizerKind::default(),
            chrome_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let logical_width: f64 = parse_or(&lookup, "EXPORT_LOGICAL_WIDTH", defaults.logical_width.get())?;
        let device_scale: f64 = parse_or(&lookup, "EXPORT_DEVICE_SCALE", defaults.device_scale.0)?;
        let margin: f64 = parse_or(&lookup, "EXPORT_MARGIN_PT", defaults.margin.get())?;
        let settle_ms: u64 = parse_or(&lookup, "EXPORT_SETTLE_MS", defaults.settle_delay.as_millis() as u64)?;

        if !(logical_width > 0.0 && logical_width.is_finite()) {
            bail!("EXPORT_LOGICAL_WIDTH must be a positive number");
        }
        if !(device_scale > 0.0 && device_scale <= MAX_DEVICE_SCALE) {
            bail!("EXPORT_DEVICE_SCALE must be in (0, {MAX_DEVICE_SCALE}]");
        }
        let max_pages: usize = parse_or(&lookup, "EXPORT_MAX_PAGES", defaults.max_pages)?;
        if max_pages == 0 {
            bail!("EXPORT_MAX_PAGES must be at least 1");
        }

        Ok(Config {
            port: parse_or(&lookup, "PORT", defaults.port)?,
            rust_log: lookup("RUST_LOG").unwrap_or(defaults.rust_log),
            logical_width: LogicalPixels(logical_width),
            device_scale: DeviceScale(device_scale),
            margin: Points(margin),
            settle_delay: Duration::from_millis(settle_ms),
            filename: lookup("EXPORT_FILENAME")
                .map(|f| sanitize_filename(&f, DEFAULT_FILENAME))
                .unwrap_or(defaults.filename),
            max_body_bytes: parse_or(&lookup, "EXPORT_MAX_BODY_BYTES", defaults.max_body_bytes)?,
            max_pages,
            rasterizer: match lookup("RASTERIZER") {
                Some(value) => value.parse().context("RASTERIZER is invalid")?,
                None => defaults.rasterizer,
            },
            chrome_path: lookup("CHROME_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.logical_width, LogicalPixels(794.0));
        assert_eq!(config.device_scale, DeviceScale(2.0));
        assert_eq!(config.margin, Points(10.0));
        assert_eq!(config.settle_delay, Duration::from_millis(100));
        assert_eq!(config.filename, "resume.pdf");
        assert_eq!(config.max_pages, 50);
        assert_eq!(config.rasterizer, RasterizerKind::default());
        assert!(config.chrome_path.is_none());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9000"),
            ("EXPORT_MARGIN_PT", "18.5"),
            ("EXPORT_DEVICE_SCALE", "3"),
            ("EXPORT_SETTLE_MS", "0"),
            ("EXPORT_FILENAME", "cv.pdf"),
            ("EXPORT_MAX_PAGES", "4"),
            ("RASTERIZER", "None"),
            ("CHROME_PATH", "/usr/bin/chromium"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.margin, Points(18.5));
        assert_eq!(config.device_scale, DeviceScale(3.0));
        assert!(config.settle_delay.is_zero());
        assert_eq!(config.filename, "cv.pdf");
        assert_eq!(config.max_pages, 4);
        assert_eq!(config.rasterizer, RasterizerKind::None);
        assert_eq!(config.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_malformed_values_fail() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EXPORT_DEVICE_SCALE", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("RASTERIZER", "firefox")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EXPORT_DEVICE_SCALE", "12")])).is_err());
        assert!(Config::from_lookup(lookup(&[("EXPORT_MAX_PAGES", "0")])).is_err());
    }

    #[test]
    fn test_default_filename_is_made_header_safe() {
        let config =
            Config::from_lookup(lookup(&[("EXPORT_FILENAME", "Grace \"Amazing\" Hopper")])).unwrap();
        assert_eq!(config.filename, "Grace__Amazing__Hopper.pdf");

        let config = Config::from_lookup(lookup(&[("EXPORT_FILENAME", "Lebenslauf_Müller")])).unwrap();
        assert_eq!(config.filename, "Lebenslauf_M_ller.pdf");

        let config = Config::from_lookup(lookup(&[("EXPORT_FILENAME", "  ")])).unwrap();
        assert_eq!(config.filename, "resume.pdf");
    }
}
