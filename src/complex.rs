//! Kuhn triangulation of the grid into simplices.
//!
//! Every grid cell (a hypercube with lower corner `idx0`) decomposes into `N!`
//! simplices, one per permutation of the coordinate axes: the simplex of
//! permutation `π` is the convex hull of the monotone path
//! `idx0, idx0 + e_{π(1)}, idx0 + e_{π(1)} + e_{π(2)}, …`, ending in the upper
//! corner of the cell. The enumeration over all `(cell, permutation)` pairs is
//! streaming; the full simplex set is never materialized.
//!
//! # References
//!
//! \[1\] [Simplicial Homology Global Optimisation
//! ](https://link.springer.com/article/10.1007/s10898-018-0645-y)

use crate::grid::{Grid, IndexIter};

/// Restartable generator of all permutations of the axes `0..n` in
/// lexicographic order.
///
/// The permutations are produced in place; [`next`](Permutations::next)
/// returns a borrow of the internal buffer, so iteration does not allocate.
/// For `n = 0` the generator yields nothing.
#[derive(Debug, Clone)]
pub struct Permutations {
    axes: Vec<usize>,
    started: bool,
    done: bool,
}

impl Permutations {
    /// Creates the generator for axes `0..n`.
    pub fn new(n: usize) -> Self {
        Self {
            axes: (0..n).collect(),
            started: false,
            done: n == 0,
        }
    }

    /// Restarts the generator from the identity permutation.
    pub fn reset(&mut self) {
        let n = self.axes.len();
        self.axes.clear();
        self.axes.extend(0..n);
        self.started = false;
        self.done = n == 0;
    }

    /// Produces the next permutation, or [`None`] when all `n!` permutations
    /// were exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&[usize]> {
        if self.done {
            return None;
        }

        if !self.started {
            self.started = true;
            return Some(self.axes.as_slice());
        }

        // Find the longest non-increasing suffix. The permutation before it is
        // the pivot; if there is none, the lexicographic order is exhausted.
        let n = self.axes.len();
        let mut i = n - 1;
        while i > 0 && self.axes[i - 1] >= self.axes[i] {
            i -= 1;
        }

        if i == 0 {
            self.done = true;
            return None;
        }

        // Swap the pivot with the rightmost element above it and reverse the
        // suffix.
        let pivot = i - 1;
        let mut j = n - 1;
        while self.axes[j] <= self.axes[pivot] {
            j -= 1;
        }
        self.axes.swap(pivot, j);
        self.axes[i..].reverse();

        Some(self.axes.as_slice())
    }
}

/// One simplex of the Kuhn triangulation, identified by its `N + 1` vertex
/// indices.
///
/// Two simplices are equal iff they have the same vertex multiset, regardless
/// of the path order in which the vertices were produced.
#[derive(Debug, Clone)]
pub struct Simplex {
    vertices: Vec<Vec<i64>>,
}

impl Simplex {
    /// Builds the simplex of the monotone Kuhn path starting in the cell
    /// corner `cell` and increasing the axes in the order given by `perm`.
    pub fn from_kuhn_path(cell: &[i64], perm: &[usize]) -> Self {
        let mut vertices = Vec::with_capacity(perm.len() + 1);
        let mut vertex = cell.to_vec();

        vertices.push(vertex.clone());
        for axis in perm {
            vertex[*axis] += 1;
            vertices.push(vertex.clone());
        }

        Self { vertices }
    }

    /// Gets the vertex indices in path order, from the lower to the upper
    /// corner of the cell.
    pub fn vertices(&self) -> &[Vec<i64>] {
        &self.vertices
    }

    /// Gets the dimensionality of the simplex.
    pub fn dim(&self) -> usize {
        self.vertices.len() - 1
    }

    fn sorted_vertices(&self) -> Vec<&Vec<i64>> {
        let mut sorted = self.vertices.iter().collect::<Vec<_>>();
        sorted.sort();
        sorted
    }
}

impl PartialEq for Simplex {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_vertices() == other.sorted_vertices()
    }
}

impl Eq for Simplex {}

/// Streaming enumeration of all simplices of the Kuhn triangulation of a
/// grid: the disjoint union over all cells and all axis permutations.
///
/// Cells are visited in lexicographic order and permutations in lexicographic
/// order within each cell, so the stream is deterministic and two passes over
/// a fresh instance produce the same sequence.
pub struct KuhnComplex {
    cells: IndexIter,
    current: Option<Vec<i64>>,
    perms: Permutations,
}

impl KuhnComplex {
    /// Creates the enumeration for given grid.
    pub fn new(grid: &Grid) -> Self {
        Self {
            cells: grid.cells(),
            current: None,
            perms: Permutations::new(grid.dim()),
        }
    }
}

impl Iterator for KuhnComplex {
    type Item = Simplex;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                self.current = Some(self.cells.next()?);
                self.perms.reset();
            }

            match self.perms.next() {
                Some(perm) => {
                    let cell = self.current.as_ref().unwrap();
                    return Some(Simplex::from_kuhn_path(cell, perm));
                }
                None => self.current = None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use crate::core::Domain;

    fn factorial(n: usize) -> usize {
        (1..=n).product()
    }

    fn parity(perm: &[usize]) -> usize {
        let mut inversions = 0;
        for i in 0..perm.len() {
            for j in i + 1..perm.len() {
                if perm[i] > perm[j] {
                    inversions += 1;
                }
            }
        }
        inversions % 2
    }

    #[test]
    fn permutation_properties() {
        for n in 0..=6 {
            let mut perms = Permutations::new(n);
            let mut seen = HashSet::new();
            let mut even = 0;
            let mut odd = 0;

            while let Some(perm) = perms.next() {
                let mut sorted = perm.to_vec();
                sorted.sort();
                assert_eq!(sorted, (0..n).collect::<Vec<_>>());

                if parity(perm) == 0 {
                    even += 1;
                } else {
                    odd += 1;
                }

                assert!(seen.insert(perm.to_vec()), "duplicate permutation");
            }

            assert_eq!(seen.len(), if n == 0 { 0 } else { factorial(n) });

            if n >= 2 {
                assert_eq!(even, odd, "parity is not balanced for n = {}", n);
            }
        }
    }

    #[test]
    fn permutations_restart() {
        let mut perms = Permutations::new(3);

        let mut first = Vec::new();
        while let Some(perm) = perms.next() {
            first.push(perm.to_vec());
        }

        perms.reset();

        let mut second = Vec::new();
        while let Some(perm) = perms.next() {
            second.push(perm.to_vec());
        }

        assert_eq!(first, second);
        assert_eq!(first.len(), 6);
        assert_eq!(first[0], vec![0, 1, 2]);
        assert_eq!(first[5], vec![2, 1, 0]);
    }

    #[test]
    fn single_axis() {
        let mut perms = Permutations::new(1);
        assert_eq!(perms.next(), Some(&[0][..]));
        assert_eq!(perms.next(), None);
    }

    #[test]
    fn kuhn_path_vertices() {
        let simplex = Simplex::from_kuhn_path(&[1, 2], &[1, 0]);

        assert_eq!(simplex.dim(), 2);
        assert_eq!(
            simplex.vertices(),
            &[vec![1, 2], vec![1, 3], vec![2, 3]][..]
        );
    }

    #[test]
    fn simplex_equality_is_multiset_equality() {
        // The two diagonal simplices of a cell share the diagonal but differ
        // in the off-diagonal vertex.
        let lower = Simplex::from_kuhn_path(&[0, 0], &[0, 1]);
        let upper = Simplex::from_kuhn_path(&[0, 0], &[1, 0]);
        assert_ne!(lower, upper);

        // Same multiset, different construction order, still equal.
        let again = Simplex::from_kuhn_path(&[0, 0], &[0, 1]);
        assert_eq!(lower, again);
    }

    #[test]
    fn complex_enumerates_cells_times_permutations() {
        let dom = Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0]);

        for divisions in [1, 2, 3] {
            let grid = crate::grid::Grid::new(&dom, divisions);
            let simplices = KuhnComplex::new(&grid).collect::<Vec<_>>();

            assert_eq!(simplices.len(), divisions * divisions * 2);

            // All simplices are pairwise distinct.
            for (i, a) in simplices.iter().enumerate() {
                for b in simplices.iter().skip(i + 1) {
                    assert_ne!(a, b);
                }
            }
        }
    }

    #[test]
    fn degenerate_grid_is_one_cell() {
        let dom = Domain::rect(vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]);
        let grid = crate::grid::Grid::new(&dom, 1);

        let simplices = KuhnComplex::new(&grid).collect::<Vec<_>>();
        assert_eq!(simplices.len(), 6);

        // Every simplex runs from the lower to the upper corner of the box.
        for simplex in &simplices {
            assert_eq!(simplex.vertices().first().unwrap(), &vec![0, 0, 0]);
            assert_eq!(simplex.vertices().last().unwrap(), &vec![1, 1, 1]);
        }
    }
}
