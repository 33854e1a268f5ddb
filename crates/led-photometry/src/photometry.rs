//! Photometric Model
//!
//! On-axis luminous intensity of a LED whose beam is narrowed by a lens.
//! Accounts for:
//! - Spherical-cap solid angle of the bare and the lensed beam
//! - Fraction of radiant power accepted into the lensed cone
//! - Radiant to luminous conversion through the efficacy constant
//!
//! The accepted fraction `Ω_lens / Ω_led` is an energy-conservation
//! approximation, not a ray-traced lens model.

use crate::{PhotometryError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const MW_PER_W: f64 = 1000.0;

/// Solid angle (sr) of a cone with the given half-angle, `2π(1 − cos θ)`
pub fn solid_angle_sr(half_angle_deg: f64) -> f64 {
    2.0 * PI * (1.0 - half_angle_deg.to_radians().cos())
}

/// Half-angles must lie strictly inside (0°, 90°)
pub(crate) fn check_half_angle(name: &str, half_angle_deg: f64) -> Result<()> {
    if !half_angle_deg.is_finite() || half_angle_deg <= 0.0 || half_angle_deg >= 90.0 {
        return Err(PhotometryError::InvalidAngle(format!(
            "{} = {}° must lie strictly between 0° and 90°",
            name, half_angle_deg
        )));
    }
    Ok(())
}

pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PhotometryError::InvalidSource(format!(
            "{} must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Calculate center luminous intensity I₀ in candela
pub fn compute_center_intensity(
    power_mw: f64,
    efficacy_lm_per_w: f64,
    theta_lens_deg: f64,
    theta_led_deg: f64,
) -> Result<f64> {
    detailed_intensity(power_mw, efficacy_lm_per_w, theta_lens_deg, theta_led_deg)
        .map(|b| b.center_intensity_cd)
}

/// Detailed photometric breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotometricBreakdown {
    pub solid_angle_led_sr: f64,
    pub solid_angle_lens_sr: f64,
    pub accepted_power_mw: f64,
    pub luminous_flux_lm: f64,
    pub center_intensity_cd: f64,
}

/// Get detailed breakdown
pub fn detailed_intensity(
    power_mw: f64,
    efficacy_lm_per_w: f64,
    theta_lens_deg: f64,
    theta_led_deg: f64,
) -> Result<PhotometricBreakdown> {
    check_half_angle("theta_led", theta_led_deg)?;
    check_half_angle("theta_lens", theta_lens_deg)?;
    check_positive("power_mw", power_mw)?;
    check_positive("efficacy_lm_per_w", efficacy_lm_per_w)?;

    let omega_led = solid_angle_sr(theta_led_deg);
    let omega_lens = solid_angle_sr(theta_lens_deg);

    // cos θ rounds to 1 for sub-nanodegree angles
    if omega_led <= 0.0 || omega_lens <= 0.0 {
        return Err(PhotometryError::InvalidAngle(format!(
            "solid angle vanishes (theta_led = {}°, theta_lens = {}°)",
            theta_led_deg, theta_lens_deg
        )));
    }

    let accepted_power_mw = power_mw * omega_lens / omega_led;
    let luminous_flux_lm = accepted_power_mw / MW_PER_W * efficacy_lm_per_w;
    let center_intensity_cd = luminous_flux_lm / omega_lens;

    Ok(PhotometricBreakdown {
        solid_angle_led_sr: omega_led,
        solid_angle_lens_sr: omega_lens,
        accepted_power_mw,
        luminous_flux_lm,
        center_intensity_cd,
    })
}
