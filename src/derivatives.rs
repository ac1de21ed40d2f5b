//! Tools for derivative-based methods.

use nalgebra::{
    storage::{Storage, StorageMut},
    Dyn, IsContiguous, Vector,
};

use crate::core::Objective;

/// Square root of double precision machine epsilon. This value is a standard
/// constant for epsilons in approximating derivative-based concepts.
pub const EPSILON_SQRT: f64 = 0.000000014901161193847656;

/// Approximates the gradient of the objective by forward finite differences.
///
/// The step size for each component is scaled by the component magnitude. We
/// would like to have the step as small as possible (to be as close to the
/// real derivative as possible), but at the same time a very small step could
/// cause `f(x + e_j * step_j) ~= f(x)` with a very small number of good
/// digits. Scaling the step by `max(|x_j|, 1)` balances these competing
/// needs.
pub fn forward_gradient<F, Sx, Sg>(f: &F, x: &Vector<f64, Dyn, Sx>, out: &mut Vector<f64, Dyn, Sg>)
where
    F: Objective + ?Sized,
    Sx: Storage<f64, Dyn> + IsContiguous,
    Sg: StorageMut<f64, Dyn>,
{
    let mut xt = x.clone_owned();
    let fx = f.value(&xt);

    for j in 0..xt.nrows() {
        let xj = xt[j];

        let step = EPSILON_SQRT * xj.abs().max(1.0) * 1f64.copysign(xj);
        let step = if step == 0.0 { EPSILON_SQRT } else { step };

        xt[j] = xj + step;
        out[j] = (f.value(&xt) - fx) / step;
        xt[j] = xj;
    }
}
