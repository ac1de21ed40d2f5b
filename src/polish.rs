//! Local polishing of basin representatives and deduplication of the
//! resulting minima.
//!
//! One representative per basin is pulled slightly inside the box (so that
//! the local optimizer does not start exactly on the boundary) and handed to
//! a local optimizer. Polishing falls back through a fixed chain: the
//! configured quasi-Newton method, then the derivative-free Nelder-Mead
//! method, and ultimately the unpolished representative itself. A failure in
//! one basin never affects the others.

use std::error::Error as StdError;

use log::{debug, warn};
use nalgebra::DVector;

use crate::core::{Domain, Objective, Optimizer};

/// One found local minimum: a minimizer inside the box and its objective
/// value.
#[derive(Debug, Clone)]
pub struct MinimumPoint {
    minimizer: DVector<f64>,
    objective: f64,
}

impl MinimumPoint {
    pub(crate) fn new(minimizer: DVector<f64>, objective: f64) -> Self {
        Self {
            minimizer,
            objective,
        }
    }

    /// Gets the minimizer coordinates.
    pub fn minimizer(&self) -> &DVector<f64> {
        &self.minimizer
    }

    /// Gets the objective value in the minimizer.
    pub fn objective(&self) -> f64 {
        self.objective
    }
}

/// Pulls a starting point inside the box by a safety margin of
/// `max(1e-10, span * 1e-6)` per axis, avoiding boundary artifacts in the
/// local optimizer.
pub fn inset_start(dom: &Domain, mut x: DVector<f64>) -> DVector<f64> {
    for i in 0..dom.dim() {
        let margin = 1e-10f64.max(dom.span(i) * 1e-6);
        let lower = dom.lower()[i] + margin;
        let upper = dom.upper()[i] - margin;

        // A degenerate box thinner than two margins is left alone.
        if lower < upper {
            x[i] = x[i].clamp(lower, upper);
        }
    }

    x
}

/// Number of consecutive non-improving iterations after which the polish
/// loop stops.
const STALL_ITERS: usize = 30;

/// Relative improvement under which an iteration counts as non-improving.
const IMPROVEMENT_EPS: f64 = 1e-12;

/// Drives one local optimizer from the given starting point until the value
/// stops improving or the iteration budget is exhausted.
///
/// Returns the best visited point, or [`None`] when the optimizer fails
/// before producing any finite value.
pub fn polish_one<F, A>(
    f: &F,
    dom: &Domain,
    mut optimizer: A,
    x0: DVector<f64>,
    max_iters: usize,
) -> Option<MinimumPoint>
where
    F: Objective,
    A: Optimizer<F>,
    A::Error: StdError,
{
    let mut x = x0;
    let mut best: Option<MinimumPoint> = None;
    let mut stall = 0;

    for _ in 0..max_iters {
        match optimizer.opt_next(f, dom, &mut x) {
            Ok(fx) => {
                if !fx.is_finite() {
                    stall += 1;
                } else {
                    match &mut best {
                        Some(minimum) if fx < minimum.objective => {
                            let improvement = minimum.objective - fx;
                            if improvement <= IMPROVEMENT_EPS * (1.0 + fx.abs()) {
                                stall += 1;
                            } else {
                                stall = 0;
                            }

                            minimum.minimizer.copy_from(&x);
                            minimum.objective = fx;
                        }
                        Some(_) => stall += 1,
                        None => {
                            best = Some(MinimumPoint::new(x.clone(), fx));
                            stall = 0;
                        }
                    }
                }

                if stall >= STALL_ITERS {
                    break;
                }
            }
            Err(error) => {
                debug!("{} terminated: {}", A::NAME, error);
                break;
            }
        }
    }

    best
}

/// Polishes the representative of one basin through the fallback chain:
/// the provided quasi-Newton optimizer, then Nelder-Mead, then the raw
/// starting point.
pub fn polish_with_fallback<F, A>(
    f: &F,
    dom: &Domain,
    primary: A,
    x0: DVector<f64>,
    raw_value: f64,
    max_iters: usize,
) -> MinimumPoint
where
    F: Objective,
    A: Optimizer<F>,
    A::Error: StdError,
{
    if let Some(minimum) = polish_one(f, dom, primary, x0.clone(), max_iters) {
        return minimum;
    }

    debug!("{} produced nothing, falling back to Nelder-Mead", A::NAME);

    let fallback = crate::algo::NelderMead::new(f, dom);
    if let Some(minimum) = polish_one(f, dom, fallback, x0.clone(), max_iters) {
        return minimum;
    }

    warn!("all polishers failed, reporting the unpolished representative");
    MinimumPoint::new(x0, raw_value)
}

/// Deduplicates minima.
///
/// The minima are sorted by objective ascending and accepted greedily: a
/// candidate is dropped iff it lies closer than `dist_tol` to an already
/// accepted minimum *and* its value is close to that minimum's value (within
/// `max(1e-6, |value| * 1e-4)`). Two minima that are geometrically close but
/// differ in value are both kept.
///
/// The procedure is idempotent.
pub fn dedup(mut minima: Vec<MinimumPoint>, dist_tol: f64) -> Vec<MinimumPoint> {
    minima.retain(|m| m.objective.is_finite());
    minima.sort_by(|a, b| {
        a.objective
            .partial_cmp(&b.objective)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut accepted: Vec<MinimumPoint> = Vec::new();

    for minimum in minima {
        let duplicate = accepted.iter().any(|u| {
            let close = (minimum.minimizer() - u.minimizer()).norm() < dist_tol;
            let value_close = (minimum.objective - u.objective).abs()
                < 1e-6f64.max(u.objective.abs() * 1e-4);
            close && value_close
        });

        if !duplicate {
            accepted.push(minimum);
        }
    }

    accepted
}
