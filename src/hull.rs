//! Gradient-hull test for pruning simplices.
//!
//! At an interior local minimum the gradient vanishes, and for a smooth
//! objective the zero gradient is a convex combination of the gradients at the
//! vertices of any simplex containing the minimum (mean value argument). A
//! simplex whose vertex-gradient hull does *not* contain the zero vector can
//! therefore be discarded from the search. The converse does not hold, so the
//! test is a filter, not a detector; the refinement driver never relies on it
//! for correctness and it is disabled by default.

use nalgebra::{DMatrix, DVector};

/// Numerical inflation of the hull. Barycentric coordinates are accepted down
/// to this much below zero to tolerate roundoff.
pub const HULL_TOLERANCE: f64 = 1e-9;

/// Checks whether the zero vector lies in the convex hull of the given `N + 1`
/// gradient vectors of dimension `N`.
///
/// The membership is decided exactly (up to [`HULL_TOLERANCE`] inflation) by
/// solving for the barycentric coordinates `λ` of the origin:
/// `Σ λᵢ gᵢ = 0`, `Σ λᵢ = 1`; the origin is inside iff all `λᵢ ≥ 0`.
///
/// Degenerate inputs err on the side of containment: a non-finite gradient or
/// an affinely dependent gradient set returns `true`, because such a simplex
/// cannot be safely pruned.
pub fn zero_in_hull(gradients: &[DVector<f64>]) -> bool {
    if gradients
        .iter()
        .any(|g| g.iter().any(|c| !c.is_finite()))
    {
        return true;
    }

    let dim = gradients[0].nrows();
    debug_assert!(gradients.len() == dim + 1, "hull needs N + 1 gradients");

    // The (N + 1) × (N + 1) barycentric system [G; 1ᵀ] λ = [0; 1].
    let mut system = DMatrix::zeros(dim + 1, gradients.len());
    for (j, gradient) in gradients.iter().enumerate() {
        for i in 0..dim {
            system[(i, j)] = gradient[i];
        }
        system[(dim, j)] = 1.0;
    }

    let mut rhs = DVector::zeros(dim + 1);
    rhs[dim] = 1.0;

    match system.lu().solve(&rhs) {
        Some(lambda) => lambda.iter().all(|l| *l >= -HULL_TOLERANCE),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    #[test]
    fn origin_surrounded() {
        // Gradients pointing in three spread directions around the origin.
        let gradients = vec![dvector![1.0, 0.0], dvector![-1.0, 1.0], dvector![-1.0, -1.0]];
        assert!(zero_in_hull(&gradients));
    }

    #[test]
    fn origin_outside_one_sided_hull() {
        // All gradients in the right half-plane; no descent direction flips.
        let gradients = vec![dvector![1.0, 0.0], dvector![2.0, 1.0], dvector![3.0, -1.0]];
        assert!(!zero_in_hull(&gradients));
    }

    #[test]
    fn origin_on_vertex() {
        let gradients = vec![dvector![0.0, 0.0], dvector![1.0, 0.0], dvector![0.0, 1.0]];
        assert!(zero_in_hull(&gradients));
    }

    #[test]
    fn degenerate_hull_is_retained() {
        // Affinely dependent gradients make the system singular.
        let gradients = vec![dvector![1.0, 1.0], dvector![2.0, 2.0], dvector![3.0, 3.0]];
        assert!(zero_in_hull(&gradients));
    }

    #[test]
    fn non_finite_gradient_is_retained() {
        let gradients = vec![
            dvector![f64::NAN, 0.0],
            dvector![1.0, 0.0],
            dvector![0.0, 1.0],
        ];
        assert!(zero_in_hull(&gradients));
    }

    #[test]
    fn one_dimensional_hull() {
        assert!(zero_in_hull(&[dvector![-1.0], dvector![2.0]]));
        assert!(!zero_in_hull(&[dvector![1.0], dvector![2.0]]));
    }
}
