//! Problem domain definition (the search box).

use std::iter::FromIterator;

use nalgebra as na;
use nalgebra::{storage::StorageMut, Dim, DimName, OVector, Vector};

/// Rectangular domain for a problem.
///
/// The analysis operates on a box `[lower, upper]` in N dimensions. Bounds may
/// be written as any floats, but the landscape analysis requires a finite box
/// with strictly ordered bounds (checked by the driver before any evaluation).
#[derive(Debug, Clone)]
pub struct Domain {
    lower: OVector<f64, na::Dyn>,
    upper: OVector<f64, na::Dyn>,
}

impl Domain {
    /// Creates rectangular domain with given lower and upper bounds.
    ///
    /// Empty bounds are representable so that the analysis driver can reject
    /// them as a typed error instead of panicking inside a user-supplied
    /// [`Problem::domain`](crate::core::Problem::domain) implementation.
    ///
    /// # Panics
    ///
    /// Panics if the bounds differ in length.
    pub fn rect(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        assert!(
            lower.len() == upper.len(),
            "lower and upper have different size"
        );

        let dim = na::Dyn(lower.len());
        let lower = OVector::from_vec_generic(dim, na::U1::name(), lower);
        let upper = OVector::from_vec_generic(dim, na::U1::name(), upper);

        Self { lower, upper }
    }

    /// Gets the dimensionality of the domain.
    pub fn dim(&self) -> usize {
        self.lower.nrows()
    }

    /// Gets the lower bounds.
    pub fn lower(&self) -> &OVector<f64, na::Dyn> {
        &self.lower
    }

    /// Gets the upper bounds.
    pub fn upper(&self) -> &OVector<f64, na::Dyn> {
        &self.upper
    }

    /// Gets the extent of the box in given dimension.
    pub fn span(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    /// Checks that every bound is finite and every lower bound is strictly
    /// below its upper bound.
    pub fn is_bounded(&self) -> bool {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .all(|(li, ui)| li.is_finite() && ui.is_finite() && li < ui)
    }

    /// Projects given point into the domain.
    ///
    /// Returns true if the point was not feasible and had to be clamped.
    pub fn project<D, Sx>(&self, x: &mut Vector<f64, D, Sx>) -> bool
    where
        D: Dim,
        Sx: StorageMut<f64, D>,
    {
        let mut not_feasible = false;

        self.lower
            .iter()
            .zip(self.upper.iter())
            .zip(x.iter_mut())
            .for_each(|((li, ui), xi)| {
                if *xi < *li {
                    *xi = *li;
                    not_feasible = true;
                } else if *xi > *ui {
                    *xi = *ui;
                    not_feasible = true;
                }
            });

        not_feasible
    }

    /// Projects given point into the domain in given dimension.
    pub fn project_in<D, Sx>(&self, x: &mut Vector<f64, D, Sx>, i: usize) -> bool
    where
        D: Dim,
        Sx: StorageMut<f64, D>,
    {
        let li = self.lower[i];
        let ui = self.upper[i];
        let xi = &mut x[i];

        if *xi < li {
            *xi = li;
            true
        } else if *xi > ui {
            *xi = ui;
            true
        } else {
            false
        }
    }
}

impl FromIterator<(f64, f64)> for Domain {
    fn from_iter<I: IntoIterator<Item = (f64, f64)>>(iter: I) -> Self {
        let (lower, upper): (Vec<_>, Vec<_>) = iter.into_iter().unzip();
        Self::rect(lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use nalgebra::dvector;

    #[test]
    fn rect_accessors() {
        let dom = Domain::rect(vec![-1.0, 0.0], vec![2.0, 4.0]);

        assert_eq!(dom.dim(), 2);
        assert_eq!(dom.span(0), 3.0);
        assert_eq!(dom.span(1), 4.0);
        assert!(dom.is_bounded());
    }

    #[test]
    fn empty_bounds_are_representable() {
        let dom = Domain::rect(Vec::new(), Vec::new());
        assert_eq!(dom.dim(), 0);
    }

    #[test]
    fn unbounded_detection() {
        let infinite = Domain::rect(vec![f64::NEG_INFINITY], vec![1.0]);
        assert!(!infinite.is_bounded());

        let inverted = Domain::rect(vec![1.0], vec![-1.0]);
        assert!(!inverted.is_bounded());

        let degenerate = Domain::rect(vec![1.0], vec![1.0]);
        assert!(!degenerate.is_bounded());
    }

    #[test]
    fn projection() {
        let dom = [(0.0, 1.0), (0.0, 1.0)].into_iter().collect::<Domain>();

        let mut x = dvector![10.0, -10.0];
        assert!(dom.project(&mut x));
        assert_eq!(x, dvector![1.0, 0.0]);

        let mut x = dvector![0.5, 0.5];
        assert!(!dom.project(&mut x));
        assert_eq!(x, dvector![0.5, 0.5]);

        let mut x = dvector![2.0, 0.5];
        assert!(dom.project_in(&mut x, 0));
        assert_eq!(x, dvector![1.0, 0.5]);
    }
}
