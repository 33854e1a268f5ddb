//! Random initial guesses for the layout search
//!
//! The start point is drawn uniformly from an explicit range. By default that
//! range is the search box itself. [`InitialGuessRange::wide`] reproduces the
//! broader exploration range (h 5–50 cm, R1 5–30 cm, 1–50 LEDs, β 0–45°),
//! which is partly outside the default bounds; such a guess is clamped into
//! the box before the search starts.

use crate::{OptimizeError, Result, SearchBounds};
use led_photometry::{ParamVector, MAX_LEDS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sampling intervals for the initial guess
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialGuessRange {
    pub height_cm: (f64, f64),
    pub radius_cm: (f64, f64),
    /// Inclusive integer range
    pub num_leds: (usize, usize),
    pub tilt_deg: (f64, f64),
}

impl InitialGuessRange {
    /// Broad exploration range, independent of the search bounds
    pub fn wide() -> Self {
        Self {
            height_cm: (5.0, 50.0),
            radius_cm: (5.0, 30.0),
            num_leds: (1, 50),
            tilt_deg: (0.0, 45.0),
        }
    }

    /// Same intervals as the search box, counts restricted to its integers
    pub fn from_bounds(bounds: &SearchBounds) -> Self {
        let counts = bounds.integer_counts();
        Self {
            height_cm: bounds.height_cm,
            radius_cm: bounds.radius_cm,
            num_leds: (*counts.start(), *counts.end()),
            tilt_deg: bounds.tilt_deg,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, (lo, hi)) in [
            ("height", self.height_cm),
            ("radius", self.radius_cm),
            ("tilt", self.tilt_deg),
        ] {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(OptimizeError::InvalidBounds(format!(
                    "initial {} range ({}, {}) is not an ordered finite interval",
                    name, lo, hi
                )));
            }
        }
        if self.num_leds.1 > MAX_LEDS {
            return Err(OptimizeError::InvalidBounds(format!(
                "initial LED count upper bound {} exceeds the maximum of {}",
                self.num_leds.1, MAX_LEDS
            )));
        }
        if self.num_leds.0 > self.num_leds.1 {
            return Err(OptimizeError::InvalidBounds(format!(
                "initial LED count range ({}, {}) is empty",
                self.num_leds.0, self.num_leds.1
            )));
        }
        Ok(())
    }
}

/// Where the initial guess is drawn from
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum StartRange {
    /// Sample inside the search bounds
    #[default]
    MatchBounds,
    /// [`InitialGuessRange::wide`], clamped into the bounds afterwards
    Wide,
    Custom(InitialGuessRange),
}

impl StartRange {
    pub fn resolve(&self, bounds: &SearchBounds) -> InitialGuessRange {
        match self {
            StartRange::MatchBounds => InitialGuessRange::from_bounds(bounds),
            StartRange::Wide => InitialGuessRange::wide(),
            StartRange::Custom(range) => *range,
        }
    }
}

/// Uniform sampler over an [`InitialGuessRange`]
pub struct InitialGuessSampler {
    range: InitialGuessRange,
    rng: StdRng,
}

impl InitialGuessSampler {
    pub fn new(range: InitialGuessRange, seed: Option<u64>) -> Result<Self> {
        range.validate()?;
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self { range, rng })
    }

    pub fn range(&self) -> &InitialGuessRange {
        &self.range
    }

    pub fn sample(&mut self) -> ParamVector {
        let r = &self.range;
        let guess = ParamVector::new(
            self.rng.gen_range(r.height_cm.0..=r.height_cm.1),
            self.rng.gen_range(r.radius_cm.0..=r.radius_cm.1),
            self.rng.gen_range(r.num_leds.0..=r.num_leds.1) as f64,
            self.rng.gen_range(r.tilt_deg.0..=r.tilt_deg.1),
        );
        debug!("Initial guess {:?}", guess.0);
        guess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_start_lies_inside_bounds() {
        let bounds = SearchBounds::default();
        let range = StartRange::default().resolve(&bounds);
        let mut sampler = InitialGuessSampler::new(range, Some(7)).unwrap();
        for _ in 0..200 {
            let guess = sampler.sample();
            assert!(bounds.contains(&guess), "{:?}", guess);
            assert_eq!(guess.0[ParamVector::COUNT].fract(), 0.0);
        }
    }

    #[test]
    fn test_wide_range_can_leave_bounds() {
        let bounds = SearchBounds::default();
        let mut sampler = InitialGuessSampler::new(InitialGuessRange::wide(), Some(11)).unwrap();
        let outside = (0..200).filter(|_| !bounds.contains(&sampler.sample())).count();
        assert!(outside > 0);
    }

    #[test]
    fn test_seeded_sampler_is_reproducible() {
        let range = InitialGuessRange::wide();
        let mut a = InitialGuessSampler::new(range, Some(42)).unwrap();
        let mut b = InitialGuessSampler::new(range, Some(42)).unwrap();
        for _ in 0..10 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_rejects_empty_range() {
        let range = InitialGuessRange {
            num_leds: (5, 2),
            ..InitialGuessRange::wide()
        };
        assert!(matches!(
            InitialGuessSampler::new(range, None),
            Err(OptimizeError::InvalidBounds(_))
        ));
    }
}
