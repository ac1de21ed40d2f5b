//! Nelder-Mead (simplex) optimization method.
//!
//! [Nelder-Mead](https://en.wikipedia.org/wiki/Nelder%E2%80%93Mead_method)
//! simplex-reflection method is a popular derivative-free optimization
//! algorithm. It keeps a [simplex](https://en.wikipedia.org/wiki/Simplex) of
//! _n + 1_ points and the simplex is reflected, expanded or contracted based
//! on the function values comparison. Being derivative-free, it is the
//! fallback polisher for objectives whose gradient misbehaves.
//!
//! # References
//!
//! \[1\] [Numerical
//! Optimization](https://link.springer.com/book/10.1007/978-0-387-40065-5)
//!
//! \[2\] [Implementing the Nelder-Mead simplex algorithm with adaptive
//! parameters](https://link.springer.com/article/10.1007/s10589-010-9329-3)
//!
//! \[3\] [Less is more: Simplified Nelder-Mead method for large unconstrained
//! optimization](https://api.semanticscholar.org/CorpusID:59403095)

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::{
    storage::{Storage, StorageMut},
    DVector, Dim, Dyn, IsContiguous, Vector,
};
use thiserror::Error;

use crate::core::{Domain, Objective, Optimizer};
use crate::derivatives::EPSILON_SQRT;

/// Family of coefficients for reflection, expansion and contractions.
#[derive(Debug, Clone, Copy)]
pub enum CoefficientsFamily {
    /// Standard ("textbook") choice.
    Standard,
    /// The coefficients are adjusted compared to standard by taking the
    /// problem dimension into account to avoid diminishing of expansion and
    /// contraction steps in higher dimensions.
    Balanced,
    /// The coefficients are left unchanged so it is the responsibility of the
    /// user to set them through [`NelderMeadOptions`].
    Fixed,
}

/// Options for [`NelderMead`] optimizer.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct NelderMeadOptions {
    /// Family for coefficients adaptation or fixed coefficients. Default:
    /// standard (see [`CoefficientsFamily`]).
    family: CoefficientsFamily,
    /// Coefficient for reflection operation. Default: `-1`.
    reflection_coeff: f64,
    /// Coefficient for expansion operation. Default: `-2`.
    expansion_coeff: f64,
    /// Coefficient for outer contraction operation. Default: `-0.5`.
    outer_contraction_coeff: f64,
    /// Coefficient for inner contraction operation. Default: `0.5`.
    inner_contraction_coeff: f64,
    /// Coefficient for shrinking operation. Default: `0.5`.
    shrink_coeff: f64,
    /// Size of the initial simplex as a fraction of the domain span in each
    /// dimension. Default: `0.05`.
    init_step_ratio: f64,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            family: CoefficientsFamily::Standard,
            reflection_coeff: -1.0,
            expansion_coeff: -2.0,
            outer_contraction_coeff: -0.5,
            inner_contraction_coeff: 0.5,
            shrink_coeff: 0.5,
            init_step_ratio: 0.05,
        }
    }
}

impl NelderMeadOptions {
    fn overwrite_coeffs(&mut self, dom: &Domain) {
        let Self {
            family,
            reflection_coeff,
            expansion_coeff,
            outer_contraction_coeff,
            inner_contraction_coeff,
            shrink_coeff,
            ..
        } = self;

        match family {
            CoefficientsFamily::Standard => {
                *reflection_coeff = -1.0;
                *expansion_coeff = -2.0;
                *outer_contraction_coeff = -0.5;
                *inner_contraction_coeff = -*outer_contraction_coeff;
                *shrink_coeff = 0.5;
            }
            CoefficientsFamily::Balanced => {
                let n_inv = 1.0 / dom.dim() as f64;

                *reflection_coeff = -1.0;
                *expansion_coeff = -(n_inv * 2.0 + 1.0);
                *outer_contraction_coeff = -(1.0 - n_inv);
                *inner_contraction_coeff = -*outer_contraction_coeff;
                *shrink_coeff = 1.0 - n_inv;
            }
            CoefficientsFamily::Fixed => {
                // Leave unchanged.
            }
        }
    }
}

/// Error returned from [`NelderMead`] optimizer.
#[derive(Debug, Error)]
pub enum NelderMeadError {
    /// Simplex collapsed so it is impossible to make any progress.
    #[error("simplex collapsed")]
    SimplexCollapsed,
    /// Simplex contains too many invalid values (NaN, infinity).
    #[error("simplex contains too many invalid values")]
    SimplexInvalid,
}

/// Nelder-Mead optimizer.
///
/// See [module](self) documentation for more details.
pub struct NelderMead {
    options: NelderMeadOptions,
    steps: DVector<f64>,
    centroid: DVector<f64>,
    reflection: DVector<f64>,
    expansion: DVector<f64>,
    contraction: DVector<f64>,
    simplex: Vec<DVector<f64>>,
    errors: Vec<f64>,
    sort_perm: Vec<usize>,
}

impl NelderMead {
    /// Initializes Nelder-Mead optimizer with default options.
    pub fn new<F: Objective>(f: &F, dom: &Domain) -> Self {
        Self::with_options(f, dom, NelderMeadOptions::default())
    }

    /// Initializes Nelder-Mead optimizer with given options.
    pub fn with_options<F: Objective>(
        _: &F,
        dom: &Domain,
        mut options: NelderMeadOptions,
    ) -> Self {
        let dim = dom.dim();

        options.overwrite_coeffs(dom);

        let steps = DVector::from_iterator(
            dim,
            (0..dim).map(|i| {
                let span = dom.span(i);
                if span.is_finite() {
                    options.init_step_ratio() * span
                } else {
                    1.0
                }
            }),
        );

        Self {
            options,
            steps,
            centroid: DVector::zeros(dim),
            reflection: DVector::zeros(dim),
            expansion: DVector::zeros(dim),
            contraction: DVector::zeros(dim),
            simplex: Vec::with_capacity(dim + 1),
            errors: Vec::with_capacity(dim + 1),
            sort_perm: Vec::with_capacity(dim + 1),
        }
    }

    /// Resets the internal state of the optimizer.
    pub fn reset(&mut self) {
        // Causes the simplex to be initialized again.
        self.simplex.clear();
        self.errors.clear();
        self.sort_perm.clear();
    }
}

impl<F: Objective> Optimizer<F> for NelderMead {
    const NAME: &'static str = "Nelder-Mead";

    type Error = NelderMeadError;

    fn opt_next<Sx>(
        &mut self,
        f: &F,
        dom: &Domain,
        x: &mut Vector<f64, Dyn, Sx>,
    ) -> Result<f64, Self::Error>
    where
        Sx: StorageMut<f64, Dyn> + IsContiguous,
    {
        let NelderMeadOptions {
            reflection_coeff,
            expansion_coeff,
            outer_contraction_coeff,
            inner_contraction_coeff,
            shrink_coeff,
            ..
        } = self.options;

        let Self {
            steps,
            simplex,
            errors,
            sort_perm,
            centroid,
            reflection,
            expansion,
            contraction,
            ..
        } = self;

        let n = dom.dim();

        if simplex.is_empty() {
            // Simplex initialization.
            let mut error_best = f.value(x).nan_to_inf();
            errors.push(error_best);
            simplex.push(x.clone_owned());

            for j in 0..n {
                let mut xi = x.clone_owned();
                xi[j] += steps[j];
                dom.project_in(&mut xi, j);

                let error = f.value(&xi).nan_to_inf();

                if error < error_best {
                    error_best = error;
                }

                errors.push(error);
                simplex.push(xi);
            }

            let error_count = errors.iter().filter(|e| !e.is_finite()).count();

            if error_count >= simplex.len() / 2 {
                // The simplex is too degenerate.
                debug!(
                    "{} out of {} points in simplex have invalid value, returning error",
                    error_count,
                    simplex.len()
                );
                simplex.clear();
                errors.clear();
                return Err(NelderMeadError::SimplexInvalid);
            }

            sort_perm.extend(0..=n);
            sort_perm.sort_by(|a, b| {
                errors[*a]
                    .partial_cmp(&errors[*b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        // Calculate the centroid.
        centroid.fill(0.0);
        (0..n)
            .map(|i| &simplex[sort_perm[i]])
            .for_each(|xi| *centroid += xi);
        *centroid /= n as f64;

        #[derive(Debug, Clone, Copy, PartialEq)]
        enum Transformation {
            Reflection,
            Expansion,
            OuterContraction,
            InnerContraction,
            Shrinkage,
        }

        impl Transformation {
            fn as_str(&self) -> &str {
                match self {
                    Transformation::Reflection => "reflection",
                    Transformation::Expansion => "expansion",
                    Transformation::OuterContraction => "outer contraction",
                    Transformation::InnerContraction => "inner contraction",
                    Transformation::Shrinkage => "shrinkage",
                }
            }
        }

        // Perform one of possible simplex transformations.
        reflection.on_line2_mut(centroid, &simplex[sort_perm[n]], reflection_coeff);
        let reflection_not_feasible = dom.project(reflection);
        let reflection_error = f.value(reflection).nan_to_inf();

        #[allow(clippy::suspicious_else_formatting)]
        let (transformation, not_feasible) = if errors[sort_perm[0]] <= reflection_error
            && reflection_error < errors[sort_perm[n - 1]]
        {
            // Reflected point is neither best nor worst in the new simplex.
            // Just replace the worst point.
            simplex[sort_perm[n]].copy_from(reflection);
            errors[sort_perm[n]] = reflection_error;
            (Transformation::Reflection, reflection_not_feasible)
        } else if reflection_error < errors[sort_perm[0]] {
            // Reflected point is better than the current best. Try to go
            // farther along this direction.
            expansion.on_line2_mut(centroid, &simplex[sort_perm[n]], expansion_coeff);
            let expansion_not_feasible = dom.project(expansion);
            let expansion_error = f.value(expansion).nan_to_inf();

            if expansion_error < reflection_error {
                // Expansion indeed helped, replace the worst point.
                simplex[sort_perm[n]].copy_from(expansion);
                errors[sort_perm[n]] = expansion_error;
                (Transformation::Expansion, expansion_not_feasible)
            } else {
                // Expansion didn't help, replace the worst point with the
                // reflected point.
                simplex[sort_perm[n]].copy_from(reflection);
                errors[sort_perm[n]] = reflection_error;
                (Transformation::Reflection, reflection_not_feasible)
            }
        } else
        /* reflection_error >= errors[sort_perm[n - 1]] */
        {
            // Reflected point is still worse than the second to last point.
            // Try to do a contraction.
            let (transformation, not_feasible) = if errors[sort_perm[n - 1]] <= reflection_error
                && reflection_error < errors[sort_perm[n]]
            {
                // Try to perform outer contraction.
                contraction.on_line2_mut(centroid, &simplex[sort_perm[n]], outer_contraction_coeff);
                let contraction_not_feasible = dom.project(contraction);
                let contraction_error = f.value(contraction).nan_to_inf();

                if contraction_error <= reflection_error {
                    // Use the contracted point instead of the reflected point
                    // because it's better.
                    simplex[sort_perm[n]].copy_from(contraction);
                    errors[sort_perm[n]] = contraction_error;
                    (
                        Some(Transformation::OuterContraction),
                        contraction_not_feasible,
                    )
                } else {
                    (None, false)
                }
            } else {
                // Try to perform inner contraction.
                contraction.on_line2_mut(centroid, &simplex[sort_perm[n]], inner_contraction_coeff);
                let contraction_not_feasible = dom.project(contraction);
                let contraction_error = f.value(contraction).nan_to_inf();

                if contraction_error <= errors[sort_perm[n]] {
                    // The contracted point is better than the worst point.
                    simplex[sort_perm[n]].copy_from(contraction);
                    errors[sort_perm[n]] = contraction_error;
                    (
                        Some(Transformation::InnerContraction),
                        contraction_not_feasible,
                    )
                } else {
                    (None, false)
                }
            };

            match transformation {
                Some(transformation) => (transformation, not_feasible),
                None => {
                    // Neither outside nor inside contraction was acceptable.
                    // Shrink the simplex towards the best point.
                    contraction.copy_from(&simplex[sort_perm[0]]);
                    let mut error_best = errors[sort_perm[0]];

                    for i in 1..=n {
                        let xi = &mut simplex[sort_perm[i]];
                        xi.on_line_mut(contraction, shrink_coeff);
                        let error = f.value(xi).nan_to_inf();
                        errors[sort_perm[i]] = error;

                        if error < error_best {
                            error_best = error;
                        }
                    }

                    (Transformation::Shrinkage, false)
                }
            }
        };

        // Establish the ordering of simplex points.
        sort_perm.sort_by(|a, b| {
            errors[*a]
                .partial_cmp(&errors[*b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            "performed {}{},\tfx = {} - {}",
            transformation.as_str(),
            if not_feasible { " with projection" } else { "" },
            errors[sort_perm[0]],
            errors[sort_perm[n]]
        );

        // Return the best simplex point.
        x.copy_from(&simplex[sort_perm[0]]);

        if transformation == Transformation::Shrinkage
            || transformation == Transformation::InnerContraction
            || not_feasible
        {
            // Check whether the simplex collapsed or not. It can happen only
            // when shrinkage or, when n = 1, inner contraction is performed or
            // a new point was projected into the feasible domain, because
            // otherwise an error reduction was achieved. This criterion is
            // taken from "Less is more: Simplified Nelder-Mead method for
            // large unconstrained optimization".
            let eps = EPSILON_SQRT;

            let worst = errors[sort_perm[n]];
            let best = errors[sort_perm[0]];
            let numer = (worst - best) * 2.0;
            let denom = worst + best + eps;

            if numer / denom <= eps {
                debug!("simplex collapsed: {} / {} <= {}", numer, denom, eps);
                return Err(NelderMeadError::SimplexCollapsed);
            }
        }

        Ok(errors[sort_perm[0]])
    }
}

trait VectorNelderMeadExt<D: Dim> {
    fn on_line_mut<Sto>(&mut self, to: &Vector<f64, D, Sto>, t: f64)
    where
        Sto: Storage<f64, D>;

    fn on_line2_mut<Sfrom, Sto>(&mut self, from: &Vector<f64, D, Sfrom>, to: &Vector<f64, D, Sto>, t: f64)
    where
        Sfrom: Storage<f64, D>,
        Sto: Storage<f64, D>;
}

impl<D: Dim, S> VectorNelderMeadExt<D> for Vector<f64, D, S>
where
    S: StorageMut<f64, D>,
{
    fn on_line_mut<Sto>(&mut self, to: &Vector<f64, D, Sto>, t: f64)
    where
        Sto: Storage<f64, D>,
    {
        *self += to;
        *self *= t;
    }

    fn on_line2_mut<Sfrom, Sto>(&mut self, from: &Vector<f64, D, Sfrom>, to: &Vector<f64, D, Sto>, t: f64)
    where
        Sfrom: Storage<f64, D>,
        Sto: Storage<f64, D>,
    {
        to.sub_to(from, self);
        *self *= t;
        *self += from;
    }
}

trait RealNelderMeadExt {
    fn nan_to_inf(self) -> Self;
}

impl RealNelderMeadExt for f64 {
    fn nan_to_inf(self) -> Self {
        if self.is_finite() {
            self
        } else {
            // Not finite also covers NaN and negative infinity.
            f64::INFINITY
        }
    }
}
