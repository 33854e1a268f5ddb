//! Box-constrained local descent
//!
//! Projected gradient descent with finite-difference gradients and Armijo
//! backtracking. Each dimension is rescaled to `[0, 1]` over its bounds so a
//! single step length fits centimeters and degrees alike. Non-finite objective
//! values are treated as infeasible. Only steps that strictly lower the
//! objective are accepted.

use nalgebra::DVector;
use tracing::debug;

/// Armijo sufficient-decrease constant
const ARMIJO_C1: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub max_iterations: usize,
    pub gradient_tolerance: f64,
    pub function_tolerance: f64,
    pub fd_step: f64,
    pub initial_step: f64,
    pub min_step: f64,
}

/// Outcome of one local search
#[derive(Debug, Clone, PartialEq)]
pub struct LocalMinimum {
    pub x: DVector<f64>,
    pub value: f64,
    /// Objective value at the (clamped) start
    pub start_value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

/// Objective in normalized coordinates, counting evaluations
struct Scaled<F> {
    objective: F,
    lower: DVector<f64>,
    upper: DVector<f64>,
    width: DVector<f64>,
    evaluations: usize,
}

impl<F: FnMut(&DVector<f64>) -> f64> Scaled<F> {
    fn to_original(&self, u: &DVector<f64>) -> DVector<f64> {
        (&self.lower + u.component_mul(&self.width)).zip_map(&self.upper, |v, hi| v.min(hi))
    }

    fn eval_original(&mut self, x: &DVector<f64>) -> f64 {
        self.evaluations += 1;
        let value = (self.objective)(x);
        if value.is_finite() {
            value
        } else {
            f64::INFINITY
        }
    }

    fn eval(&mut self, u: &DVector<f64>) -> f64 {
        let x = self.to_original(u);
        self.eval_original(&x)
    }

    /// Central differences, one-sided at the bounds; fixed dimensions get zero
    fn gradient(&mut self, u: &DVector<f64>, f_u: f64, step: f64) -> DVector<f64> {
        let mut grad = DVector::zeros(u.len());
        for i in 0..u.len() {
            if self.width[i] <= 0.0 {
                continue;
            }
            let up = (u[i] + step).min(1.0);
            let down = (u[i] - step).max(0.0);

            let f_up = if up > u[i] {
                let mut probe = u.clone();
                probe[i] = up;
                self.eval(&probe)
            } else {
                f_u
            };
            let f_down = if down < u[i] {
                let mut probe = u.clone();
                probe[i] = down;
                self.eval(&probe)
            } else {
                f_u
            };

            if f_up.is_finite() && f_down.is_finite() && up > down {
                grad[i] = (f_up - f_down) / (up - down);
            }
        }
        grad
    }
}

fn project(u: &DVector<f64>) -> DVector<f64> {
    u.map(|v| v.clamp(0.0, 1.0))
}

/// Zero the components that would push an active bound further out
fn projected_gradient(u: &DVector<f64>, grad: &DVector<f64>, width: &DVector<f64>) -> DVector<f64> {
    DVector::from_fn(u.len(), |i, _| {
        let g = grad[i];
        let pinned_low = u[i] <= 0.0 && g > 0.0;
        let pinned_high = u[i] >= 1.0 && g < 0.0;
        if width[i] <= 0.0 || pinned_low || pinned_high {
            0.0
        } else {
            g
        }
    })
}

/// Minimize `objective` over the box `[lower, upper]` starting from `start`
///
/// `start` is clamped into the box. Dimensions with `lower == upper` stay fixed.
/// Requires `lower <= upper` componentwise.
pub fn projected_descent<F>(
    objective: F,
    start: &DVector<f64>,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
    settings: &SearchSettings,
) -> LocalMinimum
where
    F: FnMut(&DVector<f64>) -> f64,
{
    let width = upper - lower;
    let mut scaled = Scaled {
        objective,
        lower: lower.clone(),
        upper: upper.clone(),
        width: width.clone(),
        evaluations: 0,
    };

    // The returned point is always one the objective was evaluated at
    let mut x = DVector::from_fn(start.len(), |i, _| start[i].clamp(lower[i], upper[i]));
    let mut u = DVector::from_fn(start.len(), |i, _| {
        if width[i] > 0.0 {
            ((x[i] - lower[i]) / width[i]).clamp(0.0, 1.0)
        } else {
            0.0
        }
    });
    let mut f_u = scaled.eval_original(&x);
    let start_value = f_u;

    let mut step = settings.initial_step;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        iterations += 1;

        let grad = scaled.gradient(&u, f_u, settings.fd_step);
        let pg = projected_gradient(&u, &grad, &width);
        let pg_norm = pg.norm();
        if pg_norm < settings.gradient_tolerance {
            converged = true;
            break;
        }
        let direction = -pg / pg_norm;

        // Backtrack until the projected step gives sufficient decrease
        let mut accepted = None;
        let mut t = step;
        while t >= settings.min_step {
            let candidate = project(&(&u + &direction * t));
            let f_c = scaled.eval(&candidate);
            let predicted = grad.dot(&(&u - &candidate));
            if f_c < f_u && f_c <= f_u - ARMIJO_C1 * predicted.max(0.0) {
                accepted = Some((candidate, f_c, t));
                break;
            }
            t *= 0.5;
        }

        let Some((candidate, f_c, t)) = accepted else {
            debug!("Line search stalled at iteration {} (f={:.6})", iterations, f_u);
            converged = true;
            break;
        };

        let improvement = f_u - f_c;
        x = scaled.to_original(&candidate);
        u = candidate;
        f_u = f_c;
        step = (2.0 * t).min(settings.initial_step);

        debug!(
            "Iteration {}: f={:.6} step={:.2e} |pg|={:.3e}",
            iterations, f_u, t, pg_norm
        );

        if improvement < settings.function_tolerance * f_u.abs().max(1.0) {
            converged = true;
            break;
        }
    }

    LocalMinimum {
        x,
        value: f_u,
        start_value,
        iterations,
        evaluations: scaled.evaluations,
        converged,
    }
}
