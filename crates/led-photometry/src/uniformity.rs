//! Uniformity Objective
//!
//! Reduces a field to `min/max` and exposes the negated ratio as a quantity to
//! minimize. The LED count arrives as a real number from the search and is
//! rounded to the nearest integer before the field is evaluated.

use crate::field::{IrradianceField, IrradianceModel};
use crate::{LayoutParams, PhotometryError, ReceiverGeometry, Result, MAX_LEDS};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Search vector `[h, R1, num_LEDs, beta]` with the count carried as a real
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamVector(pub [f64; 4]);

impl ParamVector {
    pub const HEIGHT: usize = 0;
    pub const RADIUS: usize = 1;
    pub const COUNT: usize = 2;
    pub const TILT: usize = 3;

    pub fn new(height_cm: f64, radius_cm: f64, num_leds: f64, tilt_deg: f64) -> Self {
        Self([height_cm, radius_cm, num_leds, tilt_deg])
    }

    /// Rounded LED count; anything outside `1..=MAX_LEDS` is rejected
    pub fn rounded_count(&self) -> Result<usize> {
        let count = self.0[Self::COUNT].round();
        if !count.is_finite() || count < 1.0 || count > MAX_LEDS as f64 {
            return Err(PhotometryError::InvalidLayout(format!(
                "LED count {} rounds to {}",
                self.0[Self::COUNT],
                count
            )));
        }
        Ok(count as usize)
    }

    pub fn to_layout(&self) -> Result<LayoutParams> {
        Ok(LayoutParams {
            height_cm: self.0[Self::HEIGHT],
            radius_cm: self.0[Self::RADIUS],
            num_leds: self.rounded_count()?,
            tilt_deg: self.0[Self::TILT],
        })
    }
}

impl From<&LayoutParams> for ParamVector {
    fn from(layout: &LayoutParams) -> Self {
        Self::new(
            layout.height_cm,
            layout.radius_cm,
            layout.num_leds as f64,
            layout.tilt_deg,
        )
    }
}

/// `min/max` of the field; 1.0 is perfectly even
pub fn uniformity_score(field: &IrradianceField) -> Result<f64> {
    let max = field.max();
    if !max.is_finite() || max <= 0.0 {
        return Err(PhotometryError::DegenerateField(max));
    }
    Ok(field.min() / max)
}

impl IrradianceModel {
    /// Negated uniformity of the layout described by `params`
    pub fn uniformity_objective(&self, params: &ParamVector, receiver: &ReceiverGeometry) -> Result<f64> {
        let layout = params.to_layout()?;
        let field = self.field(&layout, receiver)?;
        let score = -uniformity_score(&field)?;
        debug!("Objective {:?} -> {:.6}", params.0, score);
        Ok(score)
    }
}

/// Negated uniformity for a raw search vector
pub fn uniformity_objective(
    params: &ParamVector,
    center_intensity_cd: f64,
    theta_lens_deg: f64,
    receiver: &ReceiverGeometry,
) -> Result<f64> {
    IrradianceModel::new(center_intensity_cd, theta_lens_deg)?.uniformity_objective(params, receiver)
}
