//! Quasi-Newton (BFGS) method with backtracking line search.
//!
//! The inverse Hessian approximation is updated by the standard BFGS formula
//! and the step length is chosen by backtracking until the Armijo
//! sufficient-decrease condition holds. Steps are projected into the domain
//! box, which makes the method usable as a bound-constrained polisher.
//!
//! # References
//!
//! \[1\] [Numerical
//! Optimization](https://link.springer.com/book/10.1007/978-0-387-40065-5)

use getset::{CopyGetters, Setters};
use log::debug;
use nalgebra::{storage::StorageMut, DMatrix, DVector, Dyn, IsContiguous, Vector};
use thiserror::Error;

use crate::core::{Domain, Objective, Optimizer};

/// Options for [`Bfgs`] optimizer.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct BfgsOptions {
    /// Coefficient of the Armijo sufficient-decrease condition. Default:
    /// `1e-4`.
    armijo_coeff: f64,
    /// Multiplicative factor by which the step is shrunk during backtracking.
    /// Default: `0.5`.
    backtrack_factor: f64,
    /// Maximum number of backtracking steps within one iteration. Default:
    /// `40`.
    max_backtracks: usize,
    /// Gradient norm under which the current point is declared stationary.
    /// Default: `1e-12`.
    grad_tol: f64,
}

impl Default for BfgsOptions {
    fn default() -> Self {
        Self {
            armijo_coeff: 1e-4,
            backtrack_factor: 0.5,
            max_backtracks: 40,
            grad_tol: 1e-12,
        }
    }
}

/// Error returned from [`Bfgs`] optimizer.
#[derive(Debug, Error)]
pub enum BfgsError {
    /// The objective value or gradient is not finite in the current point.
    #[error("objective value or gradient is not finite")]
    InvalidPoint,
}

/// BFGS optimizer.
///
/// See [module](self) documentation for more details.
pub struct Bfgs {
    options: BfgsOptions,
    inv_hessian: DMatrix<f64>,
    grad: DVector<f64>,
    grad_next: DVector<f64>,
    direction: DVector<f64>,
    x_next: DVector<f64>,
    fresh: bool,
}

impl Bfgs {
    /// Initializes BFGS optimizer with default options.
    pub fn new<F: Objective>(f: &F, dom: &Domain) -> Self {
        Self::with_options(f, dom, BfgsOptions::default())
    }

    /// Initializes BFGS optimizer with given options.
    pub fn with_options<F: Objective>(_: &F, dom: &Domain, options: BfgsOptions) -> Self {
        let dim = dom.dim();

        Self {
            options,
            inv_hessian: DMatrix::identity(dim, dim),
            grad: DVector::zeros(dim),
            grad_next: DVector::zeros(dim),
            direction: DVector::zeros(dim),
            x_next: DVector::zeros(dim),
            fresh: true,
        }
    }

    /// Resets the internal state of the optimizer.
    pub fn reset(&mut self) {
        self.inv_hessian.fill_with_identity();
        self.fresh = true;
    }
}

impl<F: Objective> Optimizer<F> for Bfgs {
    const NAME: &'static str = "BFGS";

    type Error = BfgsError;

    fn opt_next<Sx>(
        &mut self,
        f: &F,
        dom: &Domain,
        x: &mut Vector<f64, Dyn, Sx>,
    ) -> Result<f64, Self::Error>
    where
        Sx: StorageMut<f64, Dyn> + IsContiguous,
    {
        let BfgsOptions {
            armijo_coeff,
            backtrack_factor,
            max_backtracks,
            grad_tol,
        } = self.options;

        let fx = f.value(x);
        if !fx.is_finite() {
            return Err(BfgsError::InvalidPoint);
        }

        if self.fresh {
            self.inv_hessian.fill_with_identity();
            f.gradient(x, &mut self.grad);
            self.fresh = false;
        }

        if self.grad.iter().any(|g| !g.is_finite()) {
            return Err(BfgsError::InvalidPoint);
        }

        if self.grad.norm() <= grad_tol * (1.0 + fx.abs()) {
            // Stationary point; nothing to do.
            return Ok(fx);
        }

        // Quasi-Newton direction, falling back to steepest descent when the
        // approximation loses positive definiteness.
        self.direction.gemv(-1.0, &self.inv_hessian, &self.grad, 0.0);

        if self.direction.dot(&self.grad) >= 0.0 {
            debug!("inverse Hessian not positive definite, restarting from identity");
            self.inv_hessian.fill_with_identity();
            self.direction.copy_from(&self.grad);
            self.direction.neg_mut();
        }

        // Backtracking line search with projection into the box. The Armijo
        // condition is checked against the actual (projected) step.
        let mut step = 1.0;
        let mut accepted = false;
        let mut fx_next = fx;

        for _ in 0..max_backtracks {
            self.x_next
                .iter_mut()
                .zip(x.iter().zip(self.direction.iter()))
                .for_each(|(xn, (xi, di))| *xn = xi + step * di);
            dom.project(&mut self.x_next);

            fx_next = f.value(&self.x_next);

            let predicted = self
                .grad
                .iter()
                .zip(self.x_next.iter().zip(x.iter()))
                .map(|(g, (xn, xi))| g * (xn - xi))
                .sum::<f64>();

            let sufficient = if predicted < 0.0 {
                fx_next <= fx + armijo_coeff * predicted
            } else {
                // Projection reversed the direction; accept only a strict
                // improvement.
                fx_next < fx
            };

            if fx_next.is_finite() && sufficient {
                accepted = true;
                break;
            }

            step *= backtrack_factor;
        }

        if !accepted {
            // No decreasing step exists within the line-search resolution; the
            // point is numerically stationary.
            debug!("line search stalled, keeping the current point");
            return Ok(fx);
        }

        f.gradient(&self.x_next, &mut self.grad_next);
        if self.grad_next.iter().any(|g| !g.is_finite()) {
            return Err(BfgsError::InvalidPoint);
        }

        // BFGS update of the inverse Hessian approximation:
        // H ← (I - ρ s yᵀ) H (I - ρ y sᵀ) + ρ s sᵀ with s the step and y the
        // gradient difference.
        let s = &self.x_next - &*x;
        let y = &self.grad_next - &self.grad;
        let sy = s.dot(&y);

        if sy > f64::EPSILON * s.norm() * y.norm() {
            let rho = 1.0 / sy;
            let n = s.nrows();
            let identity = DMatrix::identity(n, n);

            let left = &identity - (&s * y.transpose()) * rho;
            let right = &identity - (&y * s.transpose()) * rho;
            self.inv_hessian = &left * &self.inv_hessian * right + (&s * s.transpose()) * rho;
        } else {
            debug!("skipping BFGS update, curvature condition violated");
        }

        x.copy_from(&self.x_next);
        self.grad.copy_from(&self.grad_next);

        Ok(fx_next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::Problem;
    use crate::testing::{optimize, Rosenbrock, Sphere, TestFunction, TestProblem};

    #[test]
    fn sphere() {
        let f = Sphere::new(4);
        let dom = f.domain();

        let x = optimize(&f, &dom, Bfgs::new(&f, &dom), f.initials().remove(0), 100).unwrap();
        assert!(f.is_optimum(&x, 1e-6));
    }

    #[test]
    fn rosenbrock() {
        let f = Rosenbrock::default();
        let dom = f.domain();

        let x = optimize(&f, &dom, Bfgs::new(&f, &dom), f.initials().remove(0), 500).unwrap();
        assert!(f.is_optimum(&x, 1e-3));
    }

    #[test]
    fn stationary_start() {
        let f = Sphere::new(2);
        let dom = f.domain();
        let mut x = nalgebra::dvector![0.0, 0.0];

        let mut bfgs = Bfgs::new(&f, &dom);
        let fx = bfgs.opt_next(&f, &dom, &mut x).unwrap();

        assert_eq!(fx, 0.0);
        assert_eq!(x, nalgebra::dvector![0.0, 0.0]);
    }

    #[test]
    fn stays_in_bounds() {
        // The unconstrained minimum of the shifted sphere lies outside the
        // box; the iterates must stay inside.
        struct Shifted;

        impl Problem for Shifted {
            fn domain(&self) -> Domain {
                Domain::rect(vec![-1.0, -1.0], vec![1.0, 1.0])
            }
        }

        impl Objective for Shifted {
            fn value<Sx>(&self, x: &nalgebra::Vector<f64, Dyn, Sx>) -> f64
            where
                Sx: nalgebra::storage::Storage<f64, Dyn> + IsContiguous,
            {
                (x[0] - 3.0).powi(2) + (x[1] - 3.0).powi(2)
            }
        }

        let f = Shifted;
        let dom = f.domain();

        let x = optimize(
            &f,
            &dom,
            Bfgs::new(&f, &dom),
            nalgebra::dvector![0.0, 0.0],
            100,
        )
        .unwrap();

        assert!(x.iter().all(|xi| (-1.0..=1.0).contains(xi)));
        assert!((x[0] - 1.0).abs() < 1e-6);
        assert!((x[1] - 1.0).abs() < 1e-6);
    }
}
