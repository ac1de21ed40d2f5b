//! Uniform grid over the search box and the memoized point cache.
//!
//! The grid fixes the coordinate system of one refinement iteration: a
//! rectilinear lattice with a configurable number of divisions per axis.
//! Vertices are addressed by signed integer index tuples so that
//! out-of-range neighbor offsets stay representable; looking such an index up
//! in the [`PointCache`] yields positive infinity (*infinity padding*), which
//! makes boundary vertices behave like interior ones everywhere downstream.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use nalgebra::DVector;
use parking_lot::RwLock;

use crate::core::{Domain, Objective};

/// Marker bound for types shared across worker threads.
///
/// With the `parallel` feature enabled this is an alias for [`Sync`];
/// otherwise it is implemented for everything and imposes nothing.
#[cfg(feature = "parallel")]
pub trait MaybeSync: Sync {}
#[cfg(feature = "parallel")]
impl<T: Sync + ?Sized> MaybeSync for T {}

/// Marker bound for types shared across worker threads.
///
/// With the `parallel` feature enabled this is an alias for [`Sync`];
/// otherwise it is implemented for everything and imposes nothing.
#[cfg(not(feature = "parallel"))]
pub trait MaybeSync {}
#[cfg(not(feature = "parallel"))]
impl<T: ?Sized> MaybeSync for T {}

/// Uniform rectilinear lattice over the domain box.
#[derive(Debug, Clone)]
pub struct Grid {
    lower: DVector<f64>,
    upper: DVector<f64>,
    divisions: Vec<i64>,
}

impl Grid {
    /// Creates the grid over given domain with the same number of divisions
    /// per axis.
    ///
    /// # Panics
    ///
    /// Panics if `divisions` is zero.
    pub fn new(dom: &Domain, divisions: usize) -> Self {
        assert!(divisions > 0, "grid needs at least one division per axis");

        Self {
            lower: dom.lower().clone_owned(),
            upper: dom.upper().clone_owned(),
            divisions: vec![divisions as i64; dom.dim()],
        }
    }

    /// Gets the dimensionality of the grid.
    pub fn dim(&self) -> usize {
        self.divisions.len()
    }

    /// Gets the number of divisions per axis.
    pub fn divisions(&self) -> &[i64] {
        &self.divisions
    }

    /// Checks whether the index addresses a vertex of the lattice.
    pub fn contains(&self, idx: &[i64]) -> bool {
        idx.len() == self.dim()
            && idx
                .iter()
                .zip(self.divisions.iter())
                .all(|(i, k)| (0..=*k).contains(i))
    }

    /// Computes the physical position of a vertex.
    ///
    /// The position is always computed by the direct formula
    /// `lower + idx * span / divisions`, never by cumulative addition, which
    /// keeps the floating-point error independent of the index.
    pub fn position(&self, idx: &[i64]) -> DVector<f64> {
        DVector::from_iterator(
            self.dim(),
            idx.iter().enumerate().map(|(i, j)| {
                self.lower[i] + *j as f64 * (self.upper[i] - self.lower[i]) / self.divisions[i] as f64
            }),
        )
    }

    /// Gets the number of lattice vertices.
    pub fn vertex_count(&self) -> usize {
        self.divisions.iter().map(|k| (*k + 1) as usize).product()
    }

    /// Iterates over all vertex indices in lexicographic order.
    pub fn vertices(&self) -> IndexIter {
        IndexIter::new(self.divisions.clone())
    }

    /// Iterates over the lower corners of all grid cells in lexicographic
    /// order.
    pub fn cells(&self) -> IndexIter {
        IndexIter::new(self.divisions.iter().map(|k| *k - 1).collect())
    }
}

/// Lexicographic iterator over integer index tuples `0..=max[i]`.
#[derive(Debug, Clone)]
pub struct IndexIter {
    max: Vec<i64>,
    next: Option<Vec<i64>>,
}

impl IndexIter {
    fn new(max: Vec<i64>) -> Self {
        let next = if max.iter().all(|m| *m >= 0) {
            Some(vec![0; max.len()])
        } else {
            None
        };

        Self { max, next }
    }
}

impl Iterator for IndexIter {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.clone()?;

        // Advance the odometer with the last axis fastest.
        let mut idx = current.clone();
        let mut done = true;
        for i in (0..idx.len()).rev() {
            if idx[i] < self.max[i] {
                idx[i] += 1;
                idx[i + 1..].iter_mut().for_each(|x| *x = 0);
                done = false;
                break;
            }
        }

        self.next = if done { None } else { Some(idx) };

        Some(current)
    }
}

#[derive(Debug, Clone)]
struct VertexRecord {
    value: f64,
    gradient: Option<DVector<f64>>,
}

const SHARD_COUNT: usize = 16;

/// Memoized store of objective evaluations on grid vertices.
///
/// The cache guarantees at most one objective evaluation per vertex index,
/// also under concurrent access. It is sharded: a miss takes the write lock of
/// the shard owning the index and holds it across the objective call, so
/// contending callers for the *same* index wait for the in-flight evaluation
/// while misses on other shards proceed. Callers hitting a different index in
/// the same shard also wait; this is the documented contention point of the
/// sharded design.
///
/// Failure handling: a NaN value is reported to the caller but never retained,
/// so the next access retries the evaluation. Infinite values are retained
/// (the vertex is permanently disqualified from candidacy) and logged.
pub struct PointCache<'a, F> {
    f: &'a F,
    grid: Grid,
    shards: Vec<RwLock<HashMap<Vec<i64>, VertexRecord>>>,
    evaluations: AtomicUsize,
}

impl<'a, F: Objective> PointCache<'a, F> {
    /// Creates an empty cache over given grid.
    pub fn new(f: &'a F, grid: Grid) -> Self {
        Self {
            f,
            grid,
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
            evaluations: AtomicUsize::new(0),
        }
    }

    /// Gets the underlying grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Gets the number of objective evaluations charged to the cache. Only
    /// misses are counted; looking up cached or out-of-range indices is free.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    fn shard(&self, idx: &[i64]) -> &RwLock<HashMap<Vec<i64>, VertexRecord>> {
        let mut hasher = DefaultHasher::new();
        idx.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % SHARD_COUNT]
    }

    /// Gets the objective value at given vertex, evaluating the objective on
    /// first demand. Out-of-range indices yield positive infinity.
    pub fn value(&self, idx: &[i64]) -> f64 {
        if !self.grid.contains(idx) {
            return f64::INFINITY;
        }

        let shard = self.shard(idx);

        if let Some(record) = shard.read().get(idx) {
            return record.value;
        }

        let mut map = shard.write();

        // Somebody else may have won the race for the write lock.
        if let Some(record) = map.get(idx) {
            return record.value;
        }

        let value = self.f.value(&self.grid.position(idx));
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        if value.is_nan() {
            warn!("objective returned NaN at vertex {:?}, not caching", idx);
            return value;
        }

        if value.is_infinite() {
            warn!("objective returned {} at vertex {:?}", value, idx);
        }

        map.insert(
            idx.to_vec(),
            VertexRecord {
                value,
                gradient: None,
            },
        );

        value
    }

    /// Gets the objective value and gradient at given vertex, evaluating them
    /// on first demand. For out-of-range indices the value is positive
    /// infinity and the gradient is unspecified (zeros).
    pub fn vertex(&self, idx: &[i64]) -> (f64, DVector<f64>) {
        if !self.grid.contains(idx) {
            return (f64::INFINITY, DVector::zeros(self.grid.dim()));
        }

        let shard = self.shard(idx);

        if let Some(record) = shard.read().get(idx) {
            if let Some(gradient) = &record.gradient {
                return (record.value, gradient.clone());
            }
        }

        let mut map = shard.write();

        if let Some(record) = map.get(idx) {
            if let Some(gradient) = &record.gradient {
                return (record.value, gradient.clone());
            }
        }

        let position = self.grid.position(idx);

        let value = match map.get(idx) {
            Some(record) => record.value,
            None => {
                let value = self.f.value(&position);
                self.evaluations.fetch_add(1, Ordering::Relaxed);

                if value.is_nan() {
                    warn!("objective returned NaN at vertex {:?}, not caching", idx);
                    return (value, DVector::zeros(self.grid.dim()));
                }

                if value.is_infinite() {
                    warn!("objective returned {} at vertex {:?}", value, idx);
                }

                value
            }
        };

        let mut gradient = DVector::zeros(self.grid.dim());
        self.f.gradient(&position, &mut gradient);

        map.insert(
            idx.to_vec(),
            VertexRecord {
                value,
                gradient: Some(gradient.clone()),
            },
        );

        (value, gradient)
    }

    /// Evaluates the objective on all given vertices, filling the cache.
    ///
    /// With the `parallel` feature enabled the evaluation is fanned out with
    /// rayon; the resulting cache content does not depend on the order of
    /// evaluation.
    pub fn populate<I>(&self, indices: I)
    where
        I: Iterator<Item = Vec<i64>> + Send,
        F: MaybeSync,
    {
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::{ParallelBridge, ParallelIterator};

            indices.par_bridge().for_each(|idx| {
                self.value(&idx);
            });
        }

        #[cfg(not(feature = "parallel"))]
        for idx in indices {
            self.value(&idx);
        }
    }

    /// Gets the minimum and maximum of all finite cached values, or [`None`]
    /// when nothing finite has been evaluated yet.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        let mut bounds: Option<(f64, f64)> = None;

        for shard in &self.shards {
            for record in shard.read().values() {
                if record.value.is_finite() {
                    let (min, max) = bounds.get_or_insert((record.value, record.value));
                    *min = min.min(record.value);
                    *max = max.max(record.value);
                }
            }
        }

        bounds
    }
}
