//! LED Ring Layout Optimizer
//!
//! Searches ring height, radius, LED count and tilt for the layout whose
//! illuminance field is most uniform (largest `min/max`) on the receiver.
//!
//! # Search Model
//!
//! ```text
//! minimize  −min(E)/max(E)   over (h, R1, n, β) ∈ bounds
//! ```
//!
//! | Parameter | Default bounds | Kind |
//! |-----------|----------------|------|
//! | h   (cm)  | 1 – 20  | continuous |
//! | R1  (cm)  | 2 – 10  | continuous |
//! | n         | 1 – 6   | integer (rounded at evaluation) |
//! | β   (deg) | 0 – 60  | continuous |
//!
//! # Count Strategies
//!
//! The field only sees the rounded LED count, so the objective is flat in `n`
//! between integers and jumps at them. [`CountStrategy::IntegerSweep`] runs the
//! continuous search over (h, R1, β) once per integer count and keeps the best.
//! [`CountStrategy::Relaxed`] treats `n` as a fourth continuous dimension with
//! finite-difference gradients, which leaves the count wherever it started in
//! almost every case.
//!
//! The local search is single-start and gradient based; it accepts only
//! improving steps and carries no global optimality guarantee.

use led_photometry::{ParamVector, PhotometryError, ZeroRadiusPolicy, MAX_LEDS};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

pub mod config;
pub mod optimize;
pub mod report;
pub mod sampler;
pub mod search;

pub use config::{load_session_config, SessionConfig};
pub use optimize::{optimize_from, optimize_layout, CountTrial, OptimizationResult};
pub use sampler::{InitialGuessRange, InitialGuessSampler, StartRange};

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error(transparent)]
    Photometry(#[from] PhotometryError),
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("No feasible layout: every evaluated layout produced a degenerate field")]
    NoFeasibleLayout,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OptimizeError>;

/// How the LED count is searched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CountStrategy {
    /// Continuous search per integer count, best count wins
    #[default]
    IntegerSweep,
    /// Count as a continuous dimension, rounded at evaluation
    Relaxed,
}

/// Box bounds for `(h, R1, n, β)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBounds {
    pub height_cm: (f64, f64),
    pub radius_cm: (f64, f64),
    pub num_leds: (f64, f64),
    pub tilt_deg: (f64, f64),
}

impl Default for SearchBounds {
    fn default() -> Self {
        Self {
            height_cm: (1.0, 20.0),
            radius_cm: (2.0, 10.0),
            num_leds: (1.0, 6.0),
            tilt_deg: (0.0, 60.0),
        }
    }
}

impl SearchBounds {
    pub fn from_pairs(pairs: [(f64, f64); 4]) -> Self {
        Self {
            height_cm: pairs[ParamVector::HEIGHT],
            radius_cm: pairs[ParamVector::RADIUS],
            num_leds: pairs[ParamVector::COUNT],
            tilt_deg: pairs[ParamVector::TILT],
        }
    }

    /// Pairs in [`ParamVector`] order
    pub fn pairs(&self) -> [(f64, f64); 4] {
        [self.height_cm, self.radius_cm, self.num_leds, self.tilt_deg]
    }

    pub fn validate(&self) -> Result<()> {
        let names = ["height", "radius", "LED count", "tilt"];
        for (name, (lo, hi)) in names.iter().zip(self.pairs()) {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(OptimizeError::InvalidBounds(format!(
                    "{} bounds ({}, {}) are not an ordered finite interval",
                    name, lo, hi
                )));
            }
        }
        if self.height_cm.0 <= 0.0 {
            return Err(OptimizeError::InvalidBounds(format!(
                "height lower bound must be positive, got {}",
                self.height_cm.0
            )));
        }
        if self.radius_cm.0 < 0.0 {
            return Err(OptimizeError::InvalidBounds(format!(
                "radius lower bound must be non-negative, got {}",
                self.radius_cm.0
            )));
        }
        if self.tilt_deg.0 < 0.0 || self.tilt_deg.1 > 90.0 {
            return Err(OptimizeError::InvalidBounds(format!(
                "tilt bounds ({}, {}) must lie within [0, 90]",
                self.tilt_deg.0, self.tilt_deg.1
            )));
        }
        if self.num_leds.1 > MAX_LEDS as f64 {
            return Err(OptimizeError::InvalidBounds(format!(
                "LED count upper bound {} exceeds the maximum of {}",
                self.num_leds.1, MAX_LEDS
            )));
        }
        if self.integer_counts().is_empty() {
            return Err(OptimizeError::InvalidBounds(format!(
                "LED count bounds ({}, {}) contain no integer >= 1",
                self.num_leds.0, self.num_leds.1
            )));
        }
        Ok(())
    }

    /// Integer LED counts inside the count bounds
    pub fn integer_counts(&self) -> RangeInclusive<usize> {
        let lo = self.num_leds.0.max(1.0).ceil();
        let hi = self.num_leds.1.floor();
        if hi < lo {
            // Empty range
            return 1..=0;
        }
        (lo as usize)..=(hi as usize)
    }

    pub fn contains(&self, params: &ParamVector) -> bool {
        self.pairs()
            .iter()
            .zip(params.0)
            .all(|(&(lo, hi), v)| (lo..=hi).contains(&v))
    }

    /// Project a vector onto the box
    pub fn clamp(&self, params: &ParamVector) -> ParamVector {
        let mut out = *params;
        for (v, (lo, hi)) in out.0.iter_mut().zip(self.pairs()) {
            *v = v.clamp(lo, hi);
        }
        out
    }
}

/// Local search settings plus the LED-count, start and zero-radius policies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Maximum descent iterations per local search
    pub max_iterations: usize,
    /// Stop when the projected gradient norm falls below this
    pub gradient_tolerance: f64,
    /// Stop when an accepted step improves the objective by less than this (relative)
    pub function_tolerance: f64,
    /// Finite-difference step in normalized coordinates (fraction of each bound width)
    pub fd_step: f64,
    /// First trial step length in normalized coordinates
    pub initial_step: f64,
    /// Backtracking gives up below this step length
    pub min_step: f64,
    pub count_strategy: CountStrategy,
    pub start_range: StartRange,
    /// Seed for the initial guess; `None` draws from entropy
    pub seed: Option<u64>,
    pub zero_radius: ZeroRadiusPolicy,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            gradient_tolerance: 1e-6,
            function_tolerance: 1e-9,
            fd_step: 1e-5,
            initial_step: 0.25,
            min_step: 1e-7,
            count_strategy: CountStrategy::default(),
            start_range: StartRange::default(),
            seed: None,
            zero_radius: ZeroRadiusPolicy::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }

    pub fn count_strategy(mut self, strategy: CountStrategy) -> Self {
        self.count_strategy = strategy;
        self
    }

    pub fn start_range(mut self, range: StartRange) -> Self {
        self.start_range = range;
        self
    }

    pub fn zero_radius(mut self, policy: ZeroRadiusPolicy) -> Self {
        self.zero_radius = policy;
        self
    }

    pub(crate) fn search_settings(&self) -> search::SearchSettings {
        search::SearchSettings {
            max_iterations: self.max_iterations,
            gradient_tolerance: self.gradient_tolerance,
            function_tolerance: self.function_tolerance,
            fd_step: self.fd_step,
            initial_step: self.initial_step,
            min_step: self.min_step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds_are_valid() {
        let bounds = SearchBounds::default();
        assert!(bounds.validate().is_ok());
        assert_eq!(bounds.integer_counts(), 1..=6);
    }

    #[test]
    fn test_integer_counts_respect_fractional_bounds() {
        let bounds = SearchBounds {
            num_leds: (1.5, 4.9),
            ..SearchBounds::default()
        };
        assert_eq!(bounds.integer_counts(), 2..=4);

        let bounds = SearchBounds {
            num_leds: (0.0, 0.8),
            ..SearchBounds::default()
        };
        assert!(bounds.integer_counts().is_empty());
        assert!(matches!(bounds.validate(), Err(OptimizeError::InvalidBounds(_))));
    }

    #[test]
    fn test_rejects_unbounded_led_count() {
        let bounds = SearchBounds {
            num_leds: (1.0, 1e12),
            ..SearchBounds::default()
        };
        assert!(matches!(bounds.validate(), Err(OptimizeError::InvalidBounds(_))));

        let bounds = SearchBounds {
            num_leds: (1.0, MAX_LEDS as f64),
            ..SearchBounds::default()
        };
        assert!(bounds.validate().is_ok());
        assert_eq!(bounds.integer_counts(), 1..=MAX_LEDS);
    }

    #[test]
    fn test_rejects_unordered_bounds() {
        let bounds = SearchBounds {
            height_cm: (20.0, 1.0),
            ..SearchBounds::default()
        };
        assert!(matches!(bounds.validate(), Err(OptimizeError::InvalidBounds(_))));

        let bounds = SearchBounds {
            tilt_deg: (0.0, 120.0),
            ..SearchBounds::default()
        };
        assert!(matches!(bounds.validate(), Err(OptimizeError::InvalidBounds(_))));
    }

    #[test]
    fn test_clamp_projects_into_box() {
        let bounds = SearchBounds::default();
        let wild = ParamVector::new(45.0, 1.0, 30.0, 10.0);
        assert!(!bounds.contains(&wild));

        let clamped = bounds.clamp(&wild);
        assert!(bounds.contains(&clamped));
        assert_eq!(clamped, ParamVector::new(20.0, 2.0, 6.0, 10.0));
    }

    #[test]
    fn test_pairs_round_trip_order() {
        let pairs = [(1.0, 2.0), (3.0, 4.0), (1.0, 5.0), (0.0, 30.0)];
        assert_eq!(SearchBounds::from_pairs(pairs).pairs(), pairs);
    }
}
