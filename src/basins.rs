//! Star-minimum detection and basin clustering.
//!
//! A grid vertex is a *star minimum* when its value does not exceed the value
//! of any of its `3^N - 1` axis-and-diagonal neighbors, up to a tolerance
//! relative to the vertex value. Out-of-box neighbors read as positive
//! infinity through the cache, so vertices on the boundary of the box are
//! admissible candidates without special casing.
//!
//! Candidates are then partitioned into *basins*: two candidates belong to the
//! same basin when they are neighbors in the star graph and their values
//! differ by less than a threshold relative to the spread of all cached
//! values. The partition is computed with an index-based union-find, so the
//! procedure stays near-linear in the number of candidates.

use std::collections::HashMap;

use crate::core::Objective;
use crate::grid::PointCache;

/// Floor for all relative tolerances, preventing zero-tolerance degeneracy on
/// flat landscapes.
pub const MIN_EPS: f64 = 1e-12;

/// Restartable generator of all nonzero offsets in `{-1, 0, +1}^n`.
///
/// Offsets are produced in place in lexicographic order (`-1` first);
/// [`next`](NeighborDeltas::next) returns a borrow of the internal buffer.
#[derive(Debug, Clone)]
pub struct NeighborDeltas {
    delta: Vec<i64>,
    started: bool,
    done: bool,
}

impl NeighborDeltas {
    /// Creates the generator for `n` dimensions.
    pub fn new(n: usize) -> Self {
        Self {
            delta: vec![-1; n],
            started: false,
            done: n == 0,
        }
    }

    /// Restarts the generator.
    pub fn reset(&mut self) {
        self.delta.iter_mut().for_each(|d| *d = -1);
        self.started = false;
        self.done = self.delta.is_empty();
    }

    /// Produces the next offset, or [`None`] when all `3^n - 1` offsets were
    /// exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&[i64]> {
        if self.done {
            return None;
        }

        if !self.started {
            self.started = true;
            return Some(self.delta.as_slice());
        }

        loop {
            // Advance the odometer with the last axis fastest.
            let mut advanced = false;
            for i in (0..self.delta.len()).rev() {
                if self.delta[i] < 1 {
                    self.delta[i] += 1;
                    self.delta[i + 1..].iter_mut().for_each(|d| *d = -1);
                    advanced = true;
                    break;
                }
            }

            if !advanced {
                self.done = true;
                return None;
            }

            // The zero offset is the center itself, not a neighbor.
            if self.delta.iter().any(|d| *d != 0) {
                return Some(self.delta.as_slice());
            }
        }
    }
}

/// Finds all star minima among the given candidate centers.
///
/// Centers must come in lexicographic order for the output order to be
/// deterministic; the grid vertex stream and the pruned-vertex set both
/// satisfy this. Centers with a non-finite value are disqualified outright.
/// A neighbor disqualifies a center iff its value is below the center value
/// by more than `max(MIN_EPS, |value| * rel_tol)`.
pub fn star_minima<F, I>(cache: &PointCache<'_, F>, centers: I, rel_tol: f64) -> Vec<Vec<i64>>
where
    F: Objective,
    I: IntoIterator<Item = Vec<i64>>,
{
    let mut deltas = NeighborDeltas::new(cache.grid().dim());
    let mut minima = Vec::new();
    let mut neighbor = vec![0; cache.grid().dim()];

    for center in centers {
        let value = cache.value(&center);

        if !value.is_finite() {
            continue;
        }

        let tolerance = MIN_EPS.max(value.abs() * rel_tol);
        let mut is_minimum = true;

        deltas.reset();
        while let Some(delta) = deltas.next() {
            neighbor
                .iter_mut()
                .zip(center.iter().zip(delta.iter()))
                .for_each(|(n, (c, d))| *n = c + d);

            if cache.value(&neighbor) < value - tolerance {
                is_minimum = false;
                break;
            }
        }

        if is_minimum {
            minima.push(center);
        }
    }

    minima
}

/// Index-based disjoint-set with union by rank and path compression.
#[derive(Debug)]
pub struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// Creates `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Finds the representative of the set containing `x`, compressing the
    /// path along the way.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    /// Merges the sets containing `a` and `b`. Returns false when they
    /// already were the same set.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);

        if ra == rb {
            return false;
        }

        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }

        true
    }
}

/// One basin: an equivalence class of star-minimum candidates.
#[derive(Debug, Clone)]
pub struct Basin {
    members: Vec<Vec<i64>>,
    representative: usize,
    value: f64,
}

impl Basin {
    /// Gets the grid indices of all member candidates.
    pub fn members(&self) -> &[Vec<i64>] {
        &self.members
    }

    /// Gets the grid index of the lowest-valued member.
    pub fn representative(&self) -> &[i64] {
        &self.members[self.representative]
    }

    /// Gets the cached objective value at the representative.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Partitions star-minimum candidates into basins.
///
/// Two candidates are merged when they are `3^N - 1` neighbors of each other
/// and their values differ by less than `threshold_ratio` of the spread of
/// all finite cached values. The output does not depend on the order of the
/// candidate list beyond the order of the basins themselves, which follow the
/// first appearance of their members.
pub fn cluster<F: Objective>(
    cache: &PointCache<'_, F>,
    candidates: &[Vec<i64>],
    threshold_ratio: f64,
) -> Vec<Basin> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let range = match cache.value_bounds() {
        Some((min, max)) => (max - min).max(MIN_EPS),
        None => MIN_EPS,
    };
    let threshold = range * threshold_ratio;

    let lookup: HashMap<&[i64], usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, idx)| (idx.as_slice(), i))
        .collect();

    let mut sets = DisjointSet::new(candidates.len());
    let mut deltas = NeighborDeltas::new(cache.grid().dim());
    let mut neighbor = vec![0; cache.grid().dim()];

    for (i, candidate) in candidates.iter().enumerate() {
        let value = cache.value(candidate);

        deltas.reset();
        while let Some(delta) = deltas.next() {
            neighbor
                .iter_mut()
                .zip(candidate.iter().zip(delta.iter()))
                .for_each(|(n, (c, d))| *n = c + d);

            if let Some(j) = lookup.get(neighbor.as_slice()) {
                if (value - cache.value(&neighbor)).abs() < threshold {
                    sets.union(i, *j);
                }
            }
        }
    }

    // Group members by root, keeping the first-appearance order of both the
    // basins and the members within each basin.
    let mut basin_of_root = HashMap::new();
    let mut basins: Vec<Basin> = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        let root = sets.find(i);
        let value = cache.value(candidate);

        let position = *basin_of_root.entry(root).or_insert_with(|| {
            basins.push(Basin {
                members: Vec::new(),
                representative: 0,
                value: f64::INFINITY,
            });
            basins.len() - 1
        });

        let basin = &mut basins[position];
        basin.members.push(candidate.clone());
        if value < basin.value {
            basin.value = value;
            basin.representative = basin.members.len() - 1;
        }
    }

    basins
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::{Domain, Problem};
    use crate::grid::Grid;
    use crate::testing::{Himmelblau, Sphere};

    #[test]
    fn neighbor_deltas_count() {
        for n in 1..=4 {
            let mut deltas = NeighborDeltas::new(n);
            let mut count = 0;

            while let Some(delta) = deltas.next() {
                assert!(delta.iter().all(|d| (-1..=1).contains(d)));
                assert!(delta.iter().any(|d| *d != 0));
                count += 1;
            }

            assert_eq!(count, 3usize.pow(n as u32) - 1);
        }
    }

    #[test]
    fn neighbor_deltas_restart() {
        let mut deltas = NeighborDeltas::new(2);

        let mut first = Vec::new();
        while let Some(delta) = deltas.next() {
            first.push(delta.to_vec());
        }

        deltas.reset();

        let mut second = Vec::new();
        while let Some(delta) = deltas.next() {
            second.push(delta.to_vec());
        }

        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
    }

    #[test]
    fn sphere_has_single_star_minimum() {
        let f = Sphere::new(2);
        let cache = PointCache::new(&f, Grid::new(&f.domain(), 4));

        let minima = star_minima(&cache, cache.grid().vertices(), 1e-10);

        // The origin is the grid center at 4 divisions of [-5, 5].
        assert_eq!(minima, vec![vec![2, 2]]);
    }

    #[test]
    fn star_minima_have_no_smaller_neighbor() {
        let f = Himmelblau;
        let cache = PointCache::new(&f, Grid::new(&f.domain(), 20));

        let minima = star_minima(&cache, cache.grid().vertices(), 1e-10);
        assert!(!minima.is_empty());

        let mut deltas = NeighborDeltas::new(2);
        for center in &minima {
            let value = cache.value(center);
            let tolerance = MIN_EPS.max(value.abs() * 1e-10);

            deltas.reset();
            let mut neighbor = vec![0; 2];
            while let Some(delta) = deltas.next() {
                neighbor
                    .iter_mut()
                    .zip(center.iter().zip(delta.iter()))
                    .for_each(|(n, (c, d))| *n = c + d);

                assert!(cache.value(&neighbor) >= value - tolerance);
            }
        }
    }

    #[test]
    fn boundary_corner_is_admissible() {
        // A linear slope has its minimum in the lower corner of the box; with
        // infinity padding the corner vertex must be reported.
        struct Slope;

        impl Problem for Slope {
            fn domain(&self) -> Domain {
                Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0])
            }
        }

        impl Objective for Slope {
            fn value<Sx>(&self, x: &nalgebra::Vector<f64, nalgebra::Dyn, Sx>) -> f64
            where
                Sx: nalgebra::storage::Storage<f64, nalgebra::Dyn> + nalgebra::IsContiguous,
            {
                x[0] + x[1]
            }
        }

        let f = Slope;
        let cache = PointCache::new(&f, Grid::new(&f.domain(), 4));

        let minima = star_minima(&cache, cache.grid().vertices(), 1e-10);
        assert_eq!(minima, vec![vec![0, 0]]);
    }

    #[test]
    fn union_find_basics() {
        let mut sets = DisjointSet::new(5);

        assert!(sets.union(0, 1));
        assert!(sets.union(3, 4));
        assert!(!sets.union(1, 0));

        assert_eq!(sets.find(0), sets.find(1));
        assert_eq!(sets.find(3), sets.find(4));
        assert_ne!(sets.find(0), sets.find(3));
        assert_eq!(sets.find(2), 2);
    }

    #[test]
    fn clustering_groups_adjacent_candidates() {
        let f = Sphere::new(2);
        let cache = PointCache::new(&f, Grid::new(&f.domain(), 4));

        // Force the cache to know the full value spread.
        cache.populate(cache.grid().vertices());

        let candidates = vec![vec![2, 2], vec![2, 3], vec![0, 0]];
        let basins = cluster(&cache, &candidates, 0.9);

        // [2, 2] and [2, 3] are neighbors with close values; [0, 0] is far in
        // both senses.
        assert_eq!(basins.len(), 2);
        assert_eq!(basins[0].members().len(), 2);
        assert_eq!(basins[0].representative(), &[2, 2][..]);
        assert_eq!(basins[0].value(), 0.0);
        assert_eq!(basins[1].members().len(), 1);
    }

    #[test]
    fn clustering_is_order_invariant() {
        let f = Himmelblau;
        let cache = PointCache::new(&f, Grid::new(&f.domain(), 20));

        let forward = star_minima(&cache, cache.grid().vertices(), 1e-10);
        let mut reversed = forward.clone();
        reversed.reverse();

        let basins_fwd = cluster(&cache, &forward, 0.1);
        let basins_rev = cluster(&cache, &reversed, 0.1);

        assert_eq!(basins_fwd.len(), basins_rev.len());

        // The partitions are equal as sets of sets.
        let normalize = |basins: &[Basin]| {
            let mut sets = basins
                .iter()
                .map(|b| {
                    let mut members = b.members().to_vec();
                    members.sort();
                    members
                })
                .collect::<Vec<_>>();
            sets.sort();
            sets
        };

        assert_eq!(normalize(&basins_fwd), normalize(&basins_rev));
    }

    #[test]
    fn plateau_merges_into_one_basin() {
        struct Flat;

        impl Problem for Flat {
            fn domain(&self) -> Domain {
                Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0])
            }
        }

        impl Objective for Flat {
            fn value<Sx>(&self, _x: &nalgebra::Vector<f64, nalgebra::Dyn, Sx>) -> f64
            where
                Sx: nalgebra::storage::Storage<f64, nalgebra::Dyn> + nalgebra::IsContiguous,
            {
                1.0
            }
        }

        let f = Flat;
        let cache = PointCache::new(&f, Grid::new(&f.domain(), 3));

        let candidates = star_minima(&cache, cache.grid().vertices(), 1e-10);
        // Everything is a minimum on a plateau.
        assert_eq!(candidates.len(), 16);

        let basins = cluster(&cache, &candidates, 0.1);
        assert_eq!(basins.len(), 1);
    }

    #[test]
    fn zero_and_single_candidates() {
        let f = Sphere::new(2);
        let cache = PointCache::new(&f, Grid::new(&f.domain(), 4));
        cache.populate(cache.grid().vertices());

        assert!(cluster(&cache, &[], 0.1).is_empty());

        let single = cluster(&cache, &[vec![2, 2]], 0.1);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].members().len(), 1);
    }
}
