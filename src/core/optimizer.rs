//! Interface of local optimizers.

use nalgebra::{storage::StorageMut, Dyn, IsContiguous, Vector};

use super::{domain::Domain, objective::Objective};

/// Interface of a local optimizer.
///
/// An optimizer is an iterative algorithm which takes a point _x_ and computes
/// the next step in the optimization process. Repeated calls to the next step
/// should eventually converge into a minimum _x'_. The basin polisher drives
/// one optimizer per basin representative and treats it as a black box; any
/// type implementing this trait can be plugged in through
/// [`AnalyzerBuilder::with_local`](crate::driver::AnalyzerBuilder::with_local).
///
/// ## Implementing an optimizer
///
/// Here is an implementation of a fixed-step steepest descent, the simplest
/// thing that qualifies as an optimizer.
///
/// ```rust
/// use relief::nalgebra as na;
/// use relief::{Domain, Objective, Optimizer};
/// use na::{storage::StorageMut, DVector, Dyn, IsContiguous, Vector};
///
/// struct SteepestDescent {
///     step: f64,
///     grad: DVector<f64>,
/// }
///
/// impl SteepestDescent {
///     fn new<F: Objective>(_f: &F, dom: &Domain) -> Self {
///         Self {
///             step: 1e-3,
///             grad: DVector::zeros(dom.dim()),
///         }
///     }
/// }
///
/// impl<F: Objective> Optimizer<F> for SteepestDescent {
///     const NAME: &'static str = "Steepest descent";
///     type Error = std::convert::Infallible;
///
///     fn opt_next<Sx>(
///         &mut self,
///         f: &F,
///         dom: &Domain,
///         x: &mut Vector<f64, Dyn, Sx>,
///     ) -> Result<f64, Self::Error>
///     where
///         Sx: StorageMut<f64, Dyn> + IsContiguous,
///     {
///         f.gradient(x, &mut self.grad);
///         self.grad *= self.step;
///         *x -= &self.grad;
///         dom.project(x);
///         Ok(f.value(x))
///     }
/// }
/// ```
pub trait Optimizer<F: Objective> {
    /// Name of the optimizer.
    const NAME: &'static str;

    /// Error type of the iteration. Represents an invalid operation during
    /// computing the next step.
    type Error;

    /// Computes the next step in the optimization process.
    ///
    /// The value of `x` is the current values of variables. After the method
    /// returns, `x` should hold the variable values of the performed step and
    /// the return value *must* be the objective value of that step.
    ///
    /// It is implementation error not to return the objective value
    /// corresponding to the computed step.
    ///
    /// The implementations *can* assume that subsequent calls to `opt_next`
    /// pass the value of `x` as was outputted in the previous iteration by the
    /// same method.
    fn opt_next<Sx>(
        &mut self,
        f: &F,
        dom: &Domain,
        x: &mut Vector<f64, Dyn, Sx>,
    ) -> Result<f64, Self::Error>
    where
        Sx: StorageMut<f64, Dyn> + IsContiguous;
}
