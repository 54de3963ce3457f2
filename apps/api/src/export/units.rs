//! Typed coordinate units for the export pipeline.
//!
//! Three spaces are in play:
//! - `LogicalPixels`: CSS pixels the source element is laid out in.
//! - `DevicePixels`: raster pixels, `logical * device_scale`.
//! - `Points`: PDF user space (1/72 inch).
//!
//! Arithmetic is only defined within one unit. Crossing units goes through
//! `DeviceScale` (logical ↔ device) or `FitScale` (logical ↔ points).

use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

macro_rules! unit {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: Self = Self(0.0);

            pub fn get(self) -> f64 {
                self.0
            }

            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $name {
            type Output = Self;
            fn div(self, rhs: f64) -> Self {
                Self(self.0 / rhs)
            }
        }

        /// Same-unit division yields a dimensionless ratio.
        impl Div for $name {
            type Output = f64;
            fn div(self, rhs: Self) -> f64 {
                self.0 / rhs.0
            }
        }
    };
}

unit! {
    /// Nominal CSS pixels, independent of device scaling.
    LogicalPixels
}

unit! {
    /// Raster pixels. Fractional while computing boundaries; snapped to whole
    /// rows with [`DevicePixels::floor_rows`] or [`DevicePixels::rows`] before touching the pixel buffer.
    DevicePixels
}

unit! {
    /// PDF points (1/72 inch).
    Points
}

impl DevicePixels {
    pub fn from_rows(rows: u32) -> Self {
        Self(rows as f64)
    }

    /// Rounds to the nearest whole raster row.
    pub fn rows(self) -> u32 {
        self.0.round().max(0.0) as u32
    }

    /// Whole rows at or below this position. Values within `1e-6` of the next
    /// row snap up so float noise on an exact boundary is not lost.
    pub fn floor_rows(self) -> u32 {
        (self.0 + 1e-6).floor().max(0.0) as u32
    }
}

/// Multiplier from logical to device pixels (e.g. 2.0 for a 2x capture).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceScale(pub f64);

impl DeviceScale {
    pub fn to_device(self, logical: LogicalPixels) -> DevicePixels {
        DevicePixels(logical.0 * self.0)
    }

    pub fn to_logical(self, device: DevicePixels) -> LogicalPixels {
        LogicalPixels(device.0 / self.0)
    }
}

impl Default for DeviceScale {
    fn default() -> Self {
        Self(1.0)
    }
}

/// Points per logical pixel used when placing a capture on the page.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FitScale(pub f64);

impl FitScale {
    pub fn to_points(self, logical: LogicalPixels) -> Points {
        Points(logical.0 * self.0)
    }

    pub fn to_logical(self, points: Points) -> LogicalPixels {
        LogicalPixels(points.0 / self.0)
    }
}
