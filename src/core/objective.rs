//! Definition of the analyzed objective.

use nalgebra::{
    storage::{Storage, StorageMut},
    Dyn, IsContiguous, Vector,
};

use super::domain::Domain;
use crate::derivatives;

/// The base trait for [`Objective`].
///
/// A problem is any type that can describe the box in which its variables
/// live.
pub trait Problem {
    /// Gets the domain (search box) of the problem.
    fn domain(&self) -> Domain;
}

/// Definition of a scalar objective over the problem domain.
///
/// ## Defining an objective
///
/// An objective is any type that implements [`Objective`] and [`Problem`]
/// traits. Only the value is required; the gradient has a finite-difference
/// default and needs to be provided only when an analytic form is available.
///
/// ```rust
/// use relief::nalgebra as na;
/// use relief::{Domain, Objective, Problem};
/// use na::{Dyn, IsContiguous};
///
/// struct Paraboloid;
///
/// impl Problem for Paraboloid {
///     fn domain(&self) -> Domain {
///         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
///     }
/// }
///
/// impl Objective for Paraboloid {
///     fn value<Sx>(&self, x: &na::Vector<f64, Dyn, Sx>) -> f64
///     where
///         Sx: na::storage::Storage<f64, Dyn> + IsContiguous,
///     {
///         x[0].powi(2) + x[1].powi(2)
///     }
/// }
/// ```
///
/// Values that are not finite (NaN or infinity) are understood as evaluation
/// failures. They are never cached as poisoned NaN entries and disqualify the
/// affected grid vertex from candidacy, so returning them is a legitimate way
/// of signalling a failed evaluation.
pub trait Objective: Problem {
    /// Calculates the objective value in given point.
    fn value<Sx>(&self, x: &Vector<f64, Dyn, Sx>) -> f64
    where
        Sx: Storage<f64, Dyn> + IsContiguous;

    /// Calculates the gradient of the objective in given point.
    ///
    /// The default implementation approximates the gradient by forward finite
    /// differences (see [derivatives](crate::derivatives)). Override it when
    /// an analytic gradient is available.
    fn gradient<Sx, Sg>(&self, x: &Vector<f64, Dyn, Sx>, out: &mut Vector<f64, Dyn, Sg>)
    where
        Sx: Storage<f64, Dyn> + IsContiguous,
        Sg: StorageMut<f64, Dyn>,
        Self: Sized,
    {
        derivatives::forward_gradient(self, x, out);
    }
}
