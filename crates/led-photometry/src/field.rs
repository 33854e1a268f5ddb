//! Irradiance Field
//!
//! Superposes `n` tilted Lambertian point sources, evenly spaced on a ring of
//! radius R1 at height h, onto the receiver grid.
//!
//! For a source at `(x_led, y_led)` aimed toward the ring center:
//!
//! ```text
//! d       = √((X − x_led)² + (Y − y_led)² + h²)
//! (ux,uy) = (−x_led, −y_led) / R1
//! cos φ   = (h/d)·cos β + ((ux·(X − x_led) + uy·(Y − y_led)) / d)·sin β
//! E       = I₀ · cos^m φ / d²          m = −ln 2 / ln(cos θ_lens)
//! ```
//!
//! Contributions are independent and summed element-wise. Grid points behind
//! an emitter (`cos φ < 0`) get nothing from it.

use crate::photometry::check_half_angle;
use crate::{LayoutParams, PhotometryError, ReceiverGeometry, Result};
use nalgebra::{Point2, Vector2};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Handling of a ring with zero radius, where "toward the center" has no direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZeroRadiusPolicy {
    /// Sources sit above the origin and are evaluated untilted
    #[default]
    CenterUntilted,
    /// A tilted zero-radius ring is a `DegenerateGeometry` error
    Reject,
}

/// Lambertian mode number for a half-power semi-angle
pub fn lambertian_order(theta_lens_deg: f64) -> Result<f64> {
    check_half_angle("theta_lens", theta_lens_deg)?;
    let m = -(2.0f64).ln() / theta_lens_deg.to_radians().cos().ln();
    if !m.is_finite() {
        return Err(PhotometryError::InvalidAngle(format!(
            "Lambertian order diverges for theta_lens = {}°",
            theta_lens_deg
        )));
    }
    Ok(m)
}

/// One source on the ring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedPose {
    pub position: Point2<f64>,
    /// Unit vector toward the ring center; `None` when the ring has no radius
    pub toward_center: Option<Vector2<f64>>,
}

/// Evenly spaced poses at angles `k·360/n`, starting on the +X axis
pub fn ring_poses(num_leds: usize, radius_cm: f64) -> Vec<LedPose> {
    (0..num_leds)
        .map(|k| {
            let alpha = 2.0 * PI * k as f64 / num_leds as f64;
            let position = Point2::new(radius_cm * alpha.cos(), radius_cm * alpha.sin());
            let toward_center = if radius_cm > 0.0 {
                Some(-position.coords / radius_cm)
            } else {
                None
            };
            LedPose {
                position,
                toward_center,
            }
        })
        .collect()
}

/// Receiver coordinate matrices `(X, Y)`, both shaped `(Ny, Nx)`
pub fn receiver_grid(receiver: &ReceiverGeometry) -> Result<(Array2<f64>, Array2<f64>)> {
    let (rows, cols) = receiver.grid_shape()?;
    let xs = Array1::linspace(-receiver.width_cm / 2.0, receiver.width_cm / 2.0, cols);
    let ys = Array1::linspace(-receiver.length_cm / 2.0, receiver.length_cm / 2.0, rows);

    let x = Array2::from_shape_fn((rows, cols), |(_, j)| xs[j]);
    let y = Array2::from_shape_fn((rows, cols), |(i, _)| ys[i]);
    Ok((x, y))
}

/// Illuminance over the receiver grid plus its coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct IrradianceField {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub lux: Array2<f64>,
}

impl IrradianceField {
    /// `(rows, cols)` = `(Ny, Nx)`
    pub fn shape(&self) -> (usize, usize) {
        self.lux.dim()
    }

    pub fn min(&self) -> f64 {
        self.lux.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.lux.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        self.lux.mean().unwrap_or(0.0)
    }

    /// Sample positions along X (first row of `x`)
    pub fn x_axis(&self) -> ArrayView1<'_, f64> {
        self.x.row(0)
    }

    /// Sample positions along Y (first column of `y`)
    pub fn y_axis(&self) -> ArrayView1<'_, f64> {
        self.y.column(0)
    }

    /// Line scan through the middle row (constant Y)
    pub fn center_row(&self) -> ArrayView1<'_, f64> {
        self.lux.row(self.lux.nrows() / 2)
    }

    /// Line scan through the middle column (constant X)
    pub fn center_column(&self) -> ArrayView1<'_, f64> {
        self.lux.column(self.lux.ncols() / 2)
    }

    pub fn summary(&self) -> FieldSummary {
        let (rows, cols) = self.shape();
        FieldSummary {
            rows,
            cols,
            min: self.min(),
            max: self.max(),
            mean: self.mean(),
            uniformity: crate::uniformity_score(self).ok(),
        }
    }
}

/// Scalar statistics of a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSummary {
    pub rows: usize,
    pub cols: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// `min/max`, absent when the field is degenerate
    pub uniformity: Option<f64>,
}

/// Fixed photometric inputs of a session: I₀, lens angle and the derived order `m`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrradianceModel {
    center_intensity_cd: f64,
    theta_lens_deg: f64,
    order: f64,
    zero_radius: ZeroRadiusPolicy,
}

impl IrradianceModel {
    pub fn new(center_intensity_cd: f64, theta_lens_deg: f64) -> Result<Self> {
        if !center_intensity_cd.is_finite() || center_intensity_cd < 0.0 {
            return Err(PhotometryError::InvalidSource(format!(
                "center intensity must be non-negative, got {} cd",
                center_intensity_cd
            )));
        }
        let order = lambertian_order(theta_lens_deg)?;
        debug!(
            "Irradiance model: I0={:.3} cd, theta_lens={}°, m={:.4}",
            center_intensity_cd, theta_lens_deg, order
        );
        Ok(Self {
            center_intensity_cd,
            theta_lens_deg,
            order,
            zero_radius: ZeroRadiusPolicy::default(),
        })
    }

    pub fn with_zero_radius_policy(mut self, policy: ZeroRadiusPolicy) -> Self {
        self.zero_radius = policy;
        self
    }

    pub fn center_intensity_cd(&self) -> f64 {
        self.center_intensity_cd
    }

    pub fn theta_lens_deg(&self) -> f64 {
        self.theta_lens_deg
    }

    pub fn lambertian_order(&self) -> f64 {
        self.order
    }

    pub fn zero_radius_policy(&self) -> ZeroRadiusPolicy {
        self.zero_radius
    }

    /// Total illuminance of the ring on the receiver grid
    pub fn field(&self, layout: &LayoutParams, receiver: &ReceiverGeometry) -> Result<IrradianceField> {
        layout.validate()?;
        let (x, y) = receiver_grid(receiver)?;

        let mut tilt_rad = layout.tilt_deg.to_radians();
        if layout.radius_cm == 0.0 && layout.tilt_deg > 0.0 {
            match self.zero_radius {
                ZeroRadiusPolicy::Reject => {
                    return Err(PhotometryError::DegenerateGeometry(format!(
                        "tilt of {}° needs a radial direction but the ring radius is 0",
                        layout.tilt_deg
                    )));
                }
                ZeroRadiusPolicy::CenterUntilted => {
                    warn!(
                        "Ring radius is 0: ignoring tilt of {}° for {} centered LED(s)",
                        layout.tilt_deg, layout.num_leds
                    );
                    tilt_rad = 0.0;
                }
            }
        }

        let poses = ring_poses(layout.num_leds, layout.radius_cm);
        let lux = self.superpose(&poses, layout.height_cm, tilt_rad, &x, &y);

        if lux.iter().any(|v| !v.is_finite()) {
            return Err(PhotometryError::DegenerateField(f64::NAN));
        }

        debug!(
            "Field h={:.3} R1={:.3} n={} beta={:.3}: shape {:?}",
            layout.height_cm,
            layout.radius_cm,
            layout.num_leds,
            layout.tilt_deg,
            lux.dim()
        );

        Ok(IrradianceField { x, y, lux })
    }

    #[cfg(not(feature = "parallel"))]
    fn superpose(
        &self,
        poses: &[LedPose],
        height_cm: f64,
        tilt_rad: f64,
        x: &Array2<f64>,
        y: &Array2<f64>,
    ) -> Array2<f64> {
        let mut total = Array2::zeros(x.raw_dim());
        for pose in poses {
            total += &self.source_contribution(pose, height_cm, tilt_rad, x, y);
        }
        total
    }

    #[cfg(feature = "parallel")]
    fn superpose(
        &self,
        poses: &[LedPose],
        height_cm: f64,
        tilt_rad: f64,
        x: &Array2<f64>,
        y: &Array2<f64>,
    ) -> Array2<f64> {
        poses
            .par_iter()
            .map(|pose| self.source_contribution(pose, height_cm, tilt_rad, x, y))
            .reduce(|| Array2::zeros(x.raw_dim()), |a, b| a + b)
    }

    /// Illuminance from a single source
    fn source_contribution(
        &self,
        pose: &LedPose,
        height_cm: f64,
        tilt_rad: f64,
        x: &Array2<f64>,
        y: &Array2<f64>,
    ) -> Array2<f64> {
        let (sin_b, cos_b) = tilt_rad.sin_cos();
        let (x_led, y_led) = (pose.position.x, pose.position.y);
        let h2 = height_cm * height_cm;

        Zip::from(x).and(y).map_collect(|&xr, &yr| {
            let dx = xr - x_led;
            let dy = yr - y_led;
            let d2 = dx * dx + dy * dy + h2;
            let d = d2.sqrt();

            let radial = match pose.toward_center {
                Some(u) => (u.x * dx + u.y * dy) / d * sin_b,
                None => 0.0,
            };
            let cos_phi = (height_cm / d * cos_b + radial).clamp(-1.0, 1.0);

            if cos_phi <= 0.0 {
                0.0
            } else {
                self.center_intensity_cd * cos_phi.powf(self.order) / d2
            }
        })
    }
}

/// Illuminance field for one layout with the default zero-radius policy
pub fn compute_field(
    center_intensity_cd: f64,
    theta_lens_deg: f64,
    layout: &LayoutParams,
    receiver: &ReceiverGeometry,
) -> Result<IrradianceField> {
    IrradianceModel::new(center_intensity_cd, theta_lens_deg)?.field(layout, receiver)
}
