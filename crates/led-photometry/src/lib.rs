//! LED Photometry Library
//!
//! Center luminous intensity of a lensed LED, illuminance fields produced on a
//! receiver plane by a ring of tilted Lambertian sources, and the min/max
//! uniformity metric used to rank ring layouts.
//!
//! # Pipeline
//!
//! ```text
//! SourceSpec ──► I₀ (cd) ──► IrradianceField (Ny × Nx) ──► −min/max
//! ```
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Photometric model | [`photometry`] | I₀ in candela |
//! | Irradiance field | [`field`] | illuminance grid + X/Y coordinates |
//! | Uniformity objective | [`uniformity`] | score in [-1, 0] |
//!
//! Angles are degrees at every public boundary, lengths are centimeters,
//! power is milliwatts and efficacy is lumens per watt.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod field;
pub mod photometry;
pub mod uniformity;

pub use field::{
    compute_field, lambertian_order, receiver_grid, ring_poses, FieldSummary, IrradianceField,
    IrradianceModel, LedPose, ZeroRadiusPolicy,
};
pub use photometry::{compute_center_intensity, detailed_intensity, solid_angle_sr, PhotometricBreakdown};
pub use uniformity::{uniformity_objective, uniformity_score, ParamVector};

/// Receiver sampling density, samples per cm on both axes
pub const SAMPLES_PER_CM: f64 = 25.0;

/// Largest LED count a ring may carry
pub const MAX_LEDS: usize = 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhotometryError {
    #[error("Invalid angle: {0}")]
    InvalidAngle(String),
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
    #[error("Invalid source: {0}")]
    InvalidSource(String),
    #[error("Degenerate field: maximum illuminance is {0}")]
    DegenerateField(f64),
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

pub type Result<T> = std::result::Result<T, PhotometryError>;

/// Electrical and optical description of one LED
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSpec {
    /// Typical radiant power in mW
    pub power_mw: f64,
    /// Semi-angle at half power of the bare LED (degrees)
    pub theta_led_deg: f64,
    /// Semi-angle at half power with the lens fitted (degrees)
    pub theta_lens_deg: f64,
    /// Luminous efficacy in lm/W
    pub efficacy_lm_per_w: f64,
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            power_mw: 880.0,
            theta_led_deg: 70.0,
            theta_lens_deg: 45.0,
            efficacy_lm_per_w: 683.0,
        }
    }
}

impl SourceSpec {
    pub fn validate(&self) -> Result<()> {
        photometry::check_half_angle("theta_led", self.theta_led_deg)?;
        photometry::check_half_angle("theta_lens", self.theta_lens_deg)?;
        photometry::check_positive("power_mw", self.power_mw)?;
        photometry::check_positive("efficacy_lm_per_w", self.efficacy_lm_per_w)
    }

    /// On-axis luminous intensity I₀ in candela
    pub fn center_intensity(&self) -> Result<f64> {
        compute_center_intensity(
            self.power_mw,
            self.efficacy_lm_per_w,
            self.theta_lens_deg,
            self.theta_led_deg,
        )
    }

    pub fn breakdown(&self) -> Result<PhotometricBreakdown> {
        detailed_intensity(
            self.power_mw,
            self.efficacy_lm_per_w,
            self.theta_lens_deg,
            self.theta_led_deg,
        )
    }
}

/// Placement of the LED ring above the receiver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// Height of the ring above the receiver plane (cm)
    pub height_cm: f64,
    /// Ring radius (cm)
    pub radius_cm: f64,
    /// Number of LEDs evenly spaced on the ring
    pub num_leds: usize,
    /// Tilt of every LED toward the ring center (degrees)
    pub tilt_deg: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            height_cm: 10.0,
            radius_cm: 10.0,
            num_leds: 1,
            tilt_deg: 0.0,
        }
    }
}

impl LayoutParams {
    pub fn new(height_cm: f64, radius_cm: f64, num_leds: usize, tilt_deg: f64) -> Self {
        Self {
            height_cm,
            radius_cm,
            num_leds,
            tilt_deg,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_leds < 1 {
            return Err(PhotometryError::InvalidLayout(
                "at least one LED is required".to_string(),
            ));
        }
        if self.num_leds > MAX_LEDS {
            return Err(PhotometryError::InvalidLayout(format!(
                "{} LEDs exceeds the maximum of {}",
                self.num_leds, MAX_LEDS
            )));
        }
        if !self.height_cm.is_finite() || self.height_cm <= 0.0 {
            return Err(PhotometryError::InvalidLayout(format!(
                "height must be positive, got {} cm",
                self.height_cm
            )));
        }
        if !self.radius_cm.is_finite() || self.radius_cm < 0.0 {
            return Err(PhotometryError::InvalidLayout(format!(
                "ring radius must be non-negative, got {} cm",
                self.radius_cm
            )));
        }
        if !self.tilt_deg.is_finite() || !(0.0..=90.0).contains(&self.tilt_deg) {
            return Err(PhotometryError::InvalidAngle(format!(
                "tilt = {}° must lie within [0°, 90°]",
                self.tilt_deg
            )));
        }
        Ok(())
    }
}

/// Receiver plane dimensions; the grid is centered on the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverGeometry {
    /// Width along X (cm)
    pub width_cm: f64,
    /// Length along Y (cm)
    pub length_cm: f64,
}

impl Default for ReceiverGeometry {
    fn default() -> Self {
        Self {
            width_cm: 2.5,
            length_cm: 2.5,
        }
    }
}

impl ReceiverGeometry {
    pub fn new(width_cm: f64, length_cm: f64) -> Self {
        Self {
            width_cm,
            length_cm,
        }
    }

    /// Grid shape as `(rows, cols)` = `(round(25·ly), round(25·lx))`
    pub fn grid_shape(&self) -> Result<(usize, usize)> {
        let rows = samples_along("length", self.length_cm)?;
        let cols = samples_along("width", self.width_cm)?;
        Ok((rows, cols))
    }
}

fn samples_along(axis: &str, extent_cm: f64) -> Result<usize> {
    if !extent_cm.is_finite() || extent_cm <= 0.0 {
        return Err(PhotometryError::InvalidLayout(format!(
            "receiver {} must be positive, got {} cm",
            axis, extent_cm
        )));
    }
    let samples = (SAMPLES_PER_CM * extent_cm).round();
    if samples < 1.0 {
        return Err(PhotometryError::InvalidLayout(format!(
            "receiver {} of {} cm yields no grid samples",
            axis, extent_cm
        )));
    }
    Ok(samples as usize)
}
