//! Layout search over (h, R1, n, β)
//!
//! Draws an initial guess, clamps it into the bounds, then runs the local
//! descent either once per integer LED count or once over the relaxed
//! four-dimensional vector. The winning layout's field is recomputed for display.

use crate::sampler::InitialGuessSampler;
use crate::search::{projected_descent, LocalMinimum};
use crate::{CountStrategy, OptimizeError, OptimizerConfig, Result, SearchBounds};
use led_photometry::{
    IrradianceField, IrradianceModel, LayoutParams, ParamVector, ReceiverGeometry,
};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Local search result for one LED count (or for the relaxed search)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountTrial {
    pub num_leds: usize,
    pub params: ParamVector,
    /// `min/max` at the end of the search, absent if nothing feasible was found
    pub uniformity: Option<f64>,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

/// Best layout found plus the search history
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub layout: LayoutParams,
    /// Winning search vector before rounding the count
    pub params: ParamVector,
    /// `min/max` of `field`
    pub uniformity: f64,
    pub field: IrradianceField,
    /// Guess as drawn, possibly outside the bounds
    pub initial_guess: ParamVector,
    /// Guess after clamping, count confined to the integers in bounds
    pub start: ParamVector,
    pub start_clamped: bool,
    /// `min/max` at `start`, absent when the start layout was degenerate
    pub initial_uniformity: Option<f64>,
    pub trials: Vec<CountTrial>,
    pub evaluations: usize,
    pub converged: bool,
}

/// Draw a random start and search the bounds for the most uniform layout
pub fn optimize_layout(
    center_intensity_cd: f64,
    theta_lens_deg: f64,
    receiver: &ReceiverGeometry,
    bounds: &SearchBounds,
    config: &OptimizerConfig,
) -> Result<OptimizationResult> {
    bounds.validate()?;
    let model = IrradianceModel::new(center_intensity_cd, theta_lens_deg)?
        .with_zero_radius_policy(config.zero_radius);

    let range = config.start_range.resolve(bounds);
    let mut sampler = InitialGuessSampler::new(range, config.seed)?;
    let initial_guess = sampler.sample();

    optimize_from(&model, receiver, bounds, config, initial_guess)
}

/// Search the bounds starting from a given guess
pub fn optimize_from(
    model: &IrradianceModel,
    receiver: &ReceiverGeometry,
    bounds: &SearchBounds,
    config: &OptimizerConfig,
    initial_guess: ParamVector,
) -> Result<OptimizationResult> {
    bounds.validate()?;
    receiver.grid_shape()?;

    let mut start = bounds.clamp(&initial_guess);
    let start_clamped = start != initial_guess;
    if start_clamped {
        warn!(
            "Initial guess {:?} lies outside the search bounds; starting from {:?}",
            initial_guess.0, start.0
        );
    }

    // Counts stay between the outermost integers inside the bounds
    let counts = bounds.integer_counts();
    let (count_lo, count_hi) = (*counts.start() as f64, *counts.end() as f64);
    let count = start.0[ParamVector::COUNT];
    start.0[ParamVector::COUNT] = match config.count_strategy {
        CountStrategy::IntegerSweep => count.round().clamp(count_lo, count_hi),
        CountStrategy::Relaxed => count.clamp(count_lo, count_hi),
    };

    let initial_score = model.uniformity_objective(&start, receiver);
    let initial_uniformity = initial_score.as_ref().ok().map(|s| -s);
    match &initial_score {
        Ok(s) => info!("Start {:?}: uniformity {:.4}", start.0, -s),
        Err(e) => warn!("Start {:?} is infeasible: {}", start.0, e),
    }

    let settings = config.search_settings();
    let mut evaluations = 1;
    let mut trials = Vec::new();

    match config.count_strategy {
        CountStrategy::IntegerSweep => {
            let lower = DVector::from_vec(vec![
                bounds.height_cm.0,
                bounds.radius_cm.0,
                bounds.tilt_deg.0,
            ]);
            let upper = DVector::from_vec(vec![
                bounds.height_cm.1,
                bounds.radius_cm.1,
                bounds.tilt_deg.1,
            ]);
            let x0 = DVector::from_vec(vec![
                start.0[ParamVector::HEIGHT],
                start.0[ParamVector::RADIUS],
                start.0[ParamVector::TILT],
            ]);

            for count in counts {
                let objective = |x: &DVector<f64>| {
                    let params = ParamVector::new(x[0], x[1], count as f64, x[2]);
                    model
                        .uniformity_objective(&params, receiver)
                        .unwrap_or(f64::INFINITY)
                };
                let local = projected_descent(objective, &x0, &lower, &upper, &settings);
                let params = ParamVector::new(local.x[0], local.x[1], count as f64, local.x[2]);
                evaluations += local.evaluations;
                trials.push(trial(count, params, &local));
            }
        }
        CountStrategy::Relaxed => {
            let mut pairs = bounds.pairs();
            pairs[ParamVector::COUNT] = (count_lo, count_hi);
            let lower = DVector::from_iterator(4, pairs.iter().map(|p| p.0));
            let upper = DVector::from_iterator(4, pairs.iter().map(|p| p.1));
            let x0 = DVector::from_row_slice(&start.0);

            let objective = |x: &DVector<f64>| {
                let params = ParamVector::new(x[0], x[1], x[2], x[3]);
                model
                    .uniformity_objective(&params, receiver)
                    .unwrap_or(f64::INFINITY)
            };
            let local = projected_descent(objective, &x0, &lower, &upper, &settings);
            let params = ParamVector::new(local.x[0], local.x[1], local.x[2], local.x[3]);
            evaluations += local.evaluations;
            let count = params.rounded_count().unwrap_or(0);
            trials.push(trial(count, params, &local));
        }
    }

    // Ties keep the earlier (smaller) count
    let best = trials
        .iter()
        .filter(|t| t.uniformity.is_some())
        .fold(None::<&CountTrial>, |best, t| match best {
            Some(b) if b.uniformity >= t.uniformity => Some(b),
            _ => Some(t),
        })
        .ok_or(OptimizeError::NoFeasibleLayout)?;

    let layout = best.params.to_layout()?;
    let field = model.field(&layout, receiver)?;
    let uniformity = led_photometry::uniformity_score(&field)?;
    let converged = trials.iter().all(|t| t.converged);

    info!(
        "Optimized layout: h={:.2} cm, R1={:.2} cm, n={}, beta={:.2}° (uniformity {:.4}, {} evaluations)",
        layout.height_cm, layout.radius_cm, layout.num_leds, layout.tilt_deg, uniformity, evaluations
    );

    Ok(OptimizationResult {
        layout,
        params: best.params,
        uniformity,
        field,
        initial_guess,
        start,
        start_clamped,
        initial_uniformity,
        trials,
        evaluations,
        converged,
    })
}

fn trial(num_leds: usize, params: ParamVector, local: &LocalMinimum) -> CountTrial {
    let uniformity = local.value.is_finite().then(|| -local.value);
    debug!(
        "Trial n={}: {:?} uniformity={:?} ({} iterations)",
        num_leds, params.0, uniformity, local.iterations
    );
    CountTrial {
        num_leds,
        params,
        uniformity,
        iterations: local.iterations,
        evaluations: local.evaluations,
        converged: local.converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{InitialGuessRange, StartRange};
    use led_photometry::{PhotometryError, SourceSpec, ZeroRadiusPolicy};

    fn model() -> IrradianceModel {
        let i0 = SourceSpec::default().center_intensity().unwrap();
        IrradianceModel::new(i0, 45.0).unwrap()
    }

    fn quick_config() -> OptimizerConfig {
        OptimizerConfig::new().max_iterations(25).seed(3)
    }

    fn receiver() -> ReceiverGeometry {
        ReceiverGeometry::new(1.0, 1.0)
    }

    #[test]
    fn test_result_within_bounds_and_not_worse_than_start() {
        let bounds = SearchBounds::from_pairs([(1.0, 20.0), (2.0, 10.0), (1.0, 6.0), (0.0, 60.0)]);
        let i0 = SourceSpec::default().center_intensity().unwrap();

        for seed in [1, 2, 3] {
            let config = quick_config().seed(seed);
            let result = optimize_layout(i0, 45.0, &receiver(), &bounds, &config).unwrap();

            assert!(bounds.contains(&ParamVector::from(&result.layout)), "{:?}", result.layout);
            assert!(bounds.contains(&result.params));
            let initial = result.initial_uniformity.unwrap();
            assert!(
                result.uniformity >= initial,
                "seed {}: {} < {}",
                seed,
                result.uniformity,
                initial
            );
            assert!(result.uniformity > 0.0 && result.uniformity <= 1.0);
            assert_eq!(result.trials.len(), 6);
        }
    }

    #[test]
    fn test_uniformity_matches_recomputed_field() {
        let config = quick_config();
        let result = optimize_from(
            &model(),
            &receiver(),
            &SearchBounds::default(),
            &config,
            ParamVector::new(10.0, 5.0, 3.0, 20.0),
        )
        .unwrap();
        let best_trial = result
            .trials
            .iter()
            .find(|t| t.num_leds == result.layout.num_leds)
            .unwrap();
        assert!((best_trial.uniformity.unwrap() - result.uniformity).abs() < 1e-12);
        assert_eq!(result.field.shape(), (25, 25));
        assert!(!result.start_clamped);
    }

    #[test]
    fn test_out_of_bounds_guess_is_clamped() {
        let result = optimize_from(
            &model(),
            &receiver(),
            &SearchBounds::default(),
            &quick_config(),
            ParamVector::new(45.0, 25.0, 37.0, 30.0),
        )
        .unwrap();
        assert!(result.start_clamped);
        assert_eq!(result.start, ParamVector::new(20.0, 10.0, 6.0, 30.0));
        assert!(result.uniformity >= result.initial_uniformity.unwrap());
    }

    #[test]
    fn test_wide_start_range_is_clamped() {
        let i0 = SourceSpec::default().center_intensity().unwrap();
        let bounds = SearchBounds::default();
        let draw = |seed| {
            InitialGuessSampler::new(InitialGuessRange::wide(), Some(seed))
                .unwrap()
                .sample()
        };
        // Fewer than 1% of wide draws land inside the default bounds
        let seed = (0..100u64).find(|&s| !bounds.contains(&draw(s))).unwrap();

        let config = quick_config().start_range(StartRange::Wide).seed(seed);
        let result = optimize_layout(i0, 45.0, &receiver(), &bounds, &config).unwrap();
        assert_eq!(result.initial_guess, draw(seed));
        assert!(result.start_clamped);
        assert_ne!(result.start, result.initial_guess);
        assert!(bounds.contains(&result.start));
        assert!(result.uniformity >= result.initial_uniformity.unwrap());
    }

    #[test]
    fn test_relaxed_count_keeps_monotonic_improvement() {
        let config = quick_config().count_strategy(CountStrategy::Relaxed);
        let result = optimize_from(
            &model(),
            &receiver(),
            &SearchBounds::default(),
            &config,
            ParamVector::new(8.0, 4.0, 2.7, 10.0),
        )
        .unwrap();
        assert_eq!(result.trials.len(), 1);
        assert!(result.uniformity >= result.initial_uniformity.unwrap());
        // The count dimension sees no slope between integers
        assert_eq!(result.layout.num_leds, 3);
    }

    #[test]
    fn test_relaxed_count_stays_within_fractional_bounds() {
        let bounds = SearchBounds {
            num_leds: (1.2, 5.7),
            ..SearchBounds::default()
        };
        let config = quick_config().count_strategy(CountStrategy::Relaxed);
        for count in [1.2, 5.7] {
            let result = optimize_from(
                &model(),
                &receiver(),
                &bounds,
                &config,
                ParamVector::new(6.0, 3.0, count, 10.0),
            )
            .unwrap();
            assert!(bounds.contains(&result.params), "{:?}", result.params);
            assert!(
                bounds.contains(&ParamVector::from(&result.layout)),
                "{:?}",
                result.layout
            );
            assert!((2..=5).contains(&result.layout.num_leds));
            assert!(result.uniformity >= result.initial_uniformity.unwrap());
        }
    }

    #[test]
    fn test_integer_sweep_beats_each_trial() {
        let result = optimize_from(
            &model(),
            &receiver(),
            &SearchBounds::default(),
            &quick_config(),
            ParamVector::new(5.0, 3.0, 1.0, 0.0),
        )
        .unwrap();
        for t in &result.trials {
            assert!(result.uniformity + 1e-12 >= t.uniformity.unwrap_or(0.0));
        }
    }

    #[test]
    fn test_dark_source_has_no_feasible_layout() {
        let dark = IrradianceModel::new(0.0, 45.0).unwrap();
        let result = optimize_from(
            &dark,
            &receiver(),
            &SearchBounds::default(),
            &quick_config(),
            ParamVector::new(5.0, 3.0, 2.0, 10.0),
        );
        assert!(matches!(result, Err(OptimizeError::NoFeasibleLayout)));
    }

    #[test]
    fn test_invalid_inputs_surface_errors() {
        let config = quick_config();
        let bad_bounds = SearchBounds {
            radius_cm: (5.0, 1.0),
            ..SearchBounds::default()
        };
        assert!(matches!(
            optimize_layout(145.0, 45.0, &receiver(), &bad_bounds, &config),
            Err(OptimizeError::InvalidBounds(_))
        ));
        assert!(matches!(
            optimize_layout(145.0, 0.0, &receiver(), &SearchBounds::default(), &config),
            Err(OptimizeError::Photometry(PhotometryError::InvalidAngle(_)))
        ));
    }

    #[test]
    fn test_zero_radius_bounds_with_reject_policy() {
        // Every tilted candidate is rejected; untilted ones remain feasible
        let bounds = SearchBounds {
            radius_cm: (0.0, 0.0),
            tilt_deg: (0.0, 0.0),
            ..SearchBounds::default()
        };
        let config = quick_config().zero_radius(ZeroRadiusPolicy::Reject);
        let model = model().with_zero_radius_policy(ZeroRadiusPolicy::Reject);
        let result = optimize_from(
            &model,
            &receiver(),
            &bounds,
            &config,
            ParamVector::new(5.0, 0.0, 2.0, 0.0),
        )
        .unwrap();
        assert_eq!(result.layout.radius_cm, 0.0);
        assert_eq!(result.layout.tilt_deg, 0.0);
    }
}
