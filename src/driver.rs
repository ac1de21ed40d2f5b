//! High-level API for the landscape analysis.
//!
//! The analysis enumerates every basin of attraction of the objective within
//! its box and polishes one representative per basin with a local optimizer.
//! The simplest way of using it is the [`analyze`] function with the default
//! settings:
//!
//! ```rust
//! use relief::nalgebra as na;
//! use relief::{analyze, Domain, Objective, Problem};
//! use na::{Dyn, IsContiguous};
//!
//! struct Paraboloid;
//!
//! impl Problem for Paraboloid {
//!     fn domain(&self) -> Domain {
//!         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
//!     }
//! }
//!
//! impl Objective for Paraboloid {
//!     fn value<Sx>(&self, x: &na::Vector<f64, Dyn, Sx>) -> f64
//!     where
//!         Sx: na::storage::Storage<f64, Dyn> + IsContiguous,
//!     {
//!         x[0].powi(2) + x[1].powi(2)
//!     }
//! }
//!
//! let analysis = analyze(&Paraboloid).expect("analysis failed");
//!
//! assert_eq!(analysis.num_basins(), 1);
//! assert!(analysis.converged());
//! ```
//!
//! If you need to specify additional settings, use the builder:
//!
//! ```rust
//! # use relief::nalgebra as na;
//! # use relief::{Analyzer, AnalyzerOptions, Domain, Objective, Problem};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct Paraboloid;
//! #
//! # impl Problem for Paraboloid {
//! #     fn domain(&self) -> Domain {
//! #         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
//! #     }
//! # }
//! #
//! # impl Objective for Paraboloid {
//! #     fn value<Sx>(&self, x: &na::Vector<f64, Dyn, Sx>) -> f64
//! #     where
//! #         Sx: na::storage::Storage<f64, Dyn> + IsContiguous,
//! #     {
//! #         x[0].powi(2) + x[1].powi(2)
//! #     }
//! # }
//! #
//! let f = Paraboloid;
//!
//! let mut options = AnalyzerOptions::default();
//! options.set_n_div_initial(12).set_stability_count(3);
//!
//! let analysis = Analyzer::builder(&f)
//!     .with_options(options)
//!     .with_local(relief::algo::NelderMead::new)
//!     .build()
//!     .run()
//!     .expect("analysis failed");
//! #
//! # assert_eq!(analysis.num_basins(), 1);
//! ```

use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use getset::{CopyGetters, Setters};
use log::debug;
use thiserror::Error;

use crate::algo::Bfgs;
use crate::basins::{cluster, star_minima, Basin};
use crate::complex::KuhnComplex;
use crate::core::{Domain, Objective, Optimizer};
use crate::grid::{Grid, MaybeSync, PointCache};
use crate::hull::zero_in_hull;
use crate::polish::{dedup, inset_start, polish_with_fallback, MinimumPoint};

/// Options for the [`Analyzer`].
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct AnalyzerOptions {
    /// Number of grid divisions per axis in the first refinement iteration.
    /// Default: `8`.
    n_div_initial: usize,
    /// Maximum number of grid divisions per axis. Default: `25`.
    n_div_max: usize,
    /// Number of consecutive iterations with equal positive basin count after
    /// which the analysis is declared converged. Default: `2`.
    stability_count: usize,
    /// Basin-merge value tolerance as a fraction of the spread of cached
    /// values. Default: `0.1`.
    threshold_ratio: f64,
    /// Minimum L2 distance between distinct reported minima. Default: `0.05`.
    min_distance_tolerance: f64,
    /// Iteration budget for the local polisher, per basin. Default: `500`.
    local_maxiters: usize,
    /// Whether to discard simplices whose vertex-gradient hull does not
    /// contain zero (see [hull](crate::hull)). A performance option; may
    /// miss narrow basins at coarse resolutions. Default: `false`.
    use_gradient_pruning: bool,
    /// Relative tolerance of the star-minimum comparison. Default: `1e-10`.
    rel_tol_star: f64,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            n_div_initial: 8,
            n_div_max: 25,
            stability_count: 2,
            threshold_ratio: 0.1,
            min_distance_tolerance: 0.05,
            local_maxiters: 500,
            use_gradient_pruning: false,
            rel_tol_star: 1e-10,
        }
    }
}

impl AnalyzerOptions {
    fn validate(&self) -> Result<(), AnalyzeError> {
        if self.n_div_initial < 1 {
            return Err(AnalyzeError::InvalidOptions(
                "n_div_initial must be at least 1",
            ));
        }

        if self.n_div_max < self.n_div_initial {
            return Err(AnalyzeError::InvalidOptions(
                "n_div_max must not be below n_div_initial",
            ));
        }

        if self.stability_count < 1 {
            return Err(AnalyzeError::InvalidOptions(
                "stability_count must be at least 1",
            ));
        }

        if !self.threshold_ratio.is_finite() || self.threshold_ratio < 0.0 {
            return Err(AnalyzeError::InvalidOptions(
                "threshold_ratio must be finite and non-negative",
            ));
        }

        if !self.min_distance_tolerance.is_finite() || self.min_distance_tolerance < 0.0 {
            return Err(AnalyzeError::InvalidOptions(
                "min_distance_tolerance must be finite and non-negative",
            ));
        }

        if self.local_maxiters < 1 {
            return Err(AnalyzeError::InvalidOptions(
                "local_maxiters must be at least 1",
            ));
        }

        if !self.rel_tol_star.is_finite() || self.rel_tol_star < 0.0 {
            return Err(AnalyzeError::InvalidOptions(
                "rel_tol_star must be finite and non-negative",
            ));
        }

        Ok(())
    }
}

/// Error of the landscape analysis.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The options are inconsistent. Reported before any evaluation.
    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),
    /// The domain box is unbounded, inverted or degenerate. Reported before
    /// any evaluation.
    #[error("invalid domain: {0}")]
    InvalidDomain(&'static str),
    /// The cancellation token was triggered. Carries the partial analysis of
    /// the last completed refinement iteration.
    #[error("analysis cancelled after {} iterations", .0.iterations())]
    Cancelled(Box<Analysis>),
}

/// Token for cooperative cancellation of a running analysis.
///
/// The token is checked between refinement iterations and between basins
/// during polishing. An in-flight objective evaluation always runs to
/// completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token in the non-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Checks whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of the landscape analysis.
#[derive(Debug, Clone)]
pub struct Analysis {
    local_minima: Vec<MinimumPoint>,
    num_basins: usize,
    iterations: usize,
    converged: bool,
    evaluations: usize,
}

impl Analysis {
    /// Gets all found local minima, sorted by objective value ascending.
    pub fn local_minima(&self) -> &[MinimumPoint] {
        &self.local_minima
    }

    /// Gets the lowest found minimum, if any.
    pub fn best(&self) -> Option<&MinimumPoint> {
        self.local_minima.first()
    }

    /// Gets the number of distinct basins of attraction.
    pub fn num_basins(&self) -> usize {
        self.num_basins
    }

    /// Gets the number of performed refinement iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Checks whether the basin count stabilized before the resolution budget
    /// was exhausted.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Gets the total number of objective evaluations charged to the grid
    /// caches across all iterations.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

/// Builder for the [`Analyzer`].
pub struct AnalyzerBuilder<'a, F, L> {
    f: &'a F,
    options: AnalyzerOptions,
    local: L,
    cancellation: CancellationToken,
}

impl<'a, F: Objective, L> AnalyzerBuilder<'a, F, L> {
    /// Sets the analyzer options.
    pub fn with_options(mut self, options: AnalyzerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the cancellation token observed by the analysis.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Sets the factory of the local optimizer used to polish basin
    /// representatives.
    ///
    /// The factory is invoked once per basin with the objective and its
    /// domain. For the algorithms in this crate, the `new` constructor can be
    /// passed directly (e.g., `NelderMead::new`). If the optimizer fails on a
    /// basin, the analysis falls back to Nelder-Mead and ultimately to the
    /// unpolished representative.
    pub fn with_local<A2, L2>(self, local: L2) -> AnalyzerBuilder<'a, F, L2>
    where
        L2: Fn(&F, &Domain) -> A2,
    {
        AnalyzerBuilder {
            f: self.f,
            options: self.options,
            local,
            cancellation: self.cancellation,
        }
    }

    /// Builds the [`Analyzer`].
    pub fn build(self) -> Analyzer<'a, F, L> {
        Analyzer {
            f: self.f,
            options: self.options,
            local: self.local,
            cancellation: self.cancellation,
        }
    }
}

/// The driver of the whole landscape analysis: the refinement loop over
/// progressively finer grids and the final polishing of basin
/// representatives.
///
/// For default settings, use [`analyze`]. For more flexibility, use
/// [`Analyzer::builder`]. See [module](self) documentation for usage.
pub struct Analyzer<'a, F, L> {
    f: &'a F,
    options: AnalyzerOptions,
    local: L,
    cancellation: CancellationToken,
}

impl<'a, F: Objective> Analyzer<'a, F, fn(&F, &Domain) -> Bfgs> {
    /// Returns the builder for specifying additional settings.
    pub fn builder(f: &'a F) -> AnalyzerBuilder<'a, F, fn(&F, &Domain) -> Bfgs> {
        AnalyzerBuilder {
            f,
            options: AnalyzerOptions::default(),
            local: |f, dom| Bfgs::new(f, dom),
            cancellation: CancellationToken::new(),
        }
    }

    /// Initializes the analyzer with the default settings.
    pub fn new(f: &'a F) -> Self {
        Analyzer::builder(f).build()
    }
}

impl<'a, F, A, L> Analyzer<'a, F, L>
where
    F: Objective + MaybeSync,
    A: Optimizer<F>,
    A::Error: StdError,
    L: Fn(&F, &Domain) -> A,
{
    /// Runs the analysis to completion.
    pub fn run(&self) -> Result<Analysis, AnalyzeError> {
        self.options.validate()?;

        let dom = self.f.domain();
        if dom.dim() == 0 {
            return Err(AnalyzeError::InvalidDomain("the bounds are empty"));
        }
        if !dom.is_bounded() {
            return Err(AnalyzeError::InvalidDomain(
                "the analysis requires finite bounds with lower < upper",
            ));
        }

        let mut k = self.options.n_div_initial();
        let mut prev: Option<usize> = None;
        let mut streak = 0;
        let mut iterations = 0;
        let mut evaluations = 0;
        let mut converged = false;
        let mut last: Option<(PointCache<'_, F>, Vec<Basin>)> = None;

        loop {
            if self.cancellation.is_cancelled() {
                let num_basins = last.as_ref().map(|(_, basins)| basins.len()).unwrap_or(0);
                return Err(AnalyzeError::Cancelled(Box::new(Analysis {
                    local_minima: Vec::new(),
                    num_basins,
                    iterations,
                    converged,
                    evaluations,
                })));
            }

            let cache = PointCache::new(self.f, Grid::new(&dom, k));
            let candidates = self.candidates(&cache);
            let basins = cluster(&cache, &candidates, self.options.threshold_ratio());
            let count = basins.len();

            iterations += 1;
            evaluations += cache.evaluations();

            debug!(
                "iteration {} (k = {}): {} evaluations, {} candidates, {} basins",
                iterations,
                k,
                cache.evaluations(),
                candidates.len(),
                count
            );

            match prev {
                Some(prev) if prev == count && count > 0 => streak += 1,
                _ => streak = 0,
            }
            prev = Some(count);
            last = Some((cache, basins));

            if streak >= self.options.stability_count() {
                debug!("basin count {} is stable, stopping refinement", count);
                converged = true;
                break;
            }

            if k + 2 > self.options.n_div_max() {
                debug!("resolution budget exhausted at k = {}", k);
                break;
            }

            k += 2;
        }

        let (cache, basins) = last.expect("at least one iteration is always performed");

        // Polish one representative per basin. A failing basin falls back to
        // its unpolished representative, so every basin contributes a point.
        let mut minima = Vec::with_capacity(basins.len());

        for basin in &basins {
            if self.cancellation.is_cancelled() {
                let num_basins = basins.len();
                return Err(AnalyzeError::Cancelled(Box::new(Analysis {
                    local_minima: dedup(minima, self.options.min_distance_tolerance()),
                    num_basins,
                    iterations,
                    converged,
                    evaluations,
                })));
            }

            let x0 = inset_start(&dom, cache.grid().position(basin.representative()));
            let primary = (self.local)(self.f, &dom);

            minima.push(polish_with_fallback(
                self.f,
                &dom,
                primary,
                x0,
                basin.value(),
                self.options.local_maxiters(),
            ));
        }

        let local_minima = dedup(minima, self.options.min_distance_tolerance());
        let num_basins = local_minima.len();

        debug!(
            "analysis done: {} basins, converged: {}, {} evaluations",
            num_basins, converged, evaluations
        );

        Ok(Analysis {
            local_minima,
            num_basins,
            iterations,
            converged,
            evaluations,
        })
    }

    /// Produces the star-minimum candidates of one refinement iteration.
    ///
    /// Without pruning, every grid vertex is a candidate center. With
    /// pruning, only vertices incident to a simplex whose vertex-gradient
    /// hull contains zero are considered.
    fn candidates(&self, cache: &PointCache<'_, F>) -> Vec<Vec<i64>> {
        if self.options.use_gradient_pruning() {
            let mut kept = BTreeSet::new();
            let mut gradients = Vec::with_capacity(cache.grid().dim() + 1);

            for simplex in KuhnComplex::new(cache.grid()) {
                gradients.clear();
                gradients.extend(simplex.vertices().iter().map(|v| cache.vertex(v).1));

                if zero_in_hull(&gradients) {
                    for vertex in simplex.vertices() {
                        kept.insert(vertex.clone());
                    }
                }
            }

            star_minima(cache, kept, self.options.rel_tol_star())
        } else {
            cache.populate(cache.grid().vertices());
            star_minima(cache, cache.grid().vertices(), self.options.rel_tol_star())
        }
    }
}

/// Analyzes the landscape of the objective with the default settings.
///
/// This enumerates every basin of attraction of the objective within its
/// domain box and returns one polished minimum per basin. See
/// [module](self) documentation for details and non-default settings.
pub fn analyze<F>(f: &F) -> Result<Analysis, AnalyzeError>
where
    F: Objective + MaybeSync,
{
    Analyzer::new(f).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::Problem;
    use crate::testing::{
        Himmelblau, Needle, Rosenbrock, SixHumpCamel, Sphere, TestFunction, Washboard,
    };

    use nalgebra::{dvector, DVector};

    #[test]
    fn sphere_has_one_basin_at_origin() {
        let f = Sphere::new(2);
        let analysis = analyze(&f).unwrap();

        assert_eq!(analysis.num_basins(), 1);
        assert_eq!(analysis.local_minima().len(), 1);
        assert!(analysis.converged());
        assert!(analysis.evaluations() > 0);

        let minimum = analysis.best().unwrap();
        assert!(minimum.minimizer().norm() < 1e-6);
        assert!(minimum.objective().abs() < 1e-10);
    }

    #[test]
    fn tight_sphere_box_works_at_any_resolution() {
        // The basin must be found whether or not the origin lies on the
        // lattice.
        for n_div in [4, 5, 7] {
            let f = Sphere::with_bounds(2, -1.0, 1.0);

            let mut options = AnalyzerOptions::default();
            options.set_n_div_initial(n_div);

            let analysis = Analyzer::builder(&f)
                .with_options(options)
                .build()
                .run()
                .unwrap();

            assert_eq!(analysis.num_basins(), 1, "n_div = {}", n_div);

            let minimum = analysis.best().unwrap();
            assert!(minimum.minimizer().norm() < 1e-6);
            assert!(minimum.objective().abs() < 1e-10);
        }
    }

    #[test]
    fn found_minima_are_fixed_points_of_polishing() {
        use crate::algo::Bfgs;
        use crate::polish::polish_one;

        let f = Himmelblau;
        let analysis = analyze(&f).unwrap();

        let dom = f.domain();
        for minimum in analysis.local_minima() {
            let again = polish_one(
                &f,
                &dom,
                Bfgs::new(&f, &dom),
                minimum.minimizer().clone(),
                500,
            )
            .unwrap();

            assert!((again.minimizer() - minimum.minimizer()).norm() < 1e-6);
        }
    }

    #[test]
    fn rosenbrock_valley_is_one_basin() {
        let f = Rosenbrock::default();

        let mut options = AnalyzerOptions::default();
        options.set_n_div_initial(10);

        let analysis = Analyzer::builder(&f)
            .with_options(options)
            .build()
            .run()
            .unwrap();

        assert_eq!(analysis.num_basins(), 1);

        let minimum = analysis.best().unwrap();
        assert!((minimum.minimizer() - dvector![1.0, 1.0]).norm() < 1e-3);
        assert!(minimum.objective() < 1e-6);
    }

    #[test]
    fn himmelblau_minima_are_found() {
        let f = Himmelblau;

        let mut options = AnalyzerOptions::default();
        options.set_n_div_initial(20).set_stability_count(3);

        let analysis = Analyzer::builder(&f)
            .with_options(options)
            .build()
            .run()
            .unwrap();

        assert!(analysis.num_basins() >= 3);
        assert_eq!(analysis.num_basins(), analysis.local_minima().len());

        let literature: [DVector<f64>; 4] = [
            dvector![3.0, 2.0],
            dvector![-2.805118, 3.131312],
            dvector![-3.779310, -3.283186],
            dvector![3.584428, -1.848126],
        ];

        let found = literature
            .iter()
            .filter(|expected| {
                analysis.local_minima().iter().any(|m| {
                    (m.minimizer() - *expected).norm() < 0.2 && m.objective().abs() < 0.05
                })
            })
            .count();

        assert!(found >= 3, "only {} literature minima found", found);
    }

    #[test]
    fn camelback_global_pair_is_found() {
        let f = SixHumpCamel;

        let mut options = AnalyzerOptions::default();
        options.set_n_div_initial(20).set_stability_count(3);

        let analysis = Analyzer::builder(&f)
            .with_options(options)
            .build()
            .run()
            .unwrap();

        assert!(analysis.num_basins() >= 4);

        let best = analysis.best().unwrap();
        assert!(best.objective() <= -1.03);

        let globals = [dvector![-0.0898, 0.7126], dvector![0.0898, -0.7126]];
        assert!(globals
            .iter()
            .any(|g| analysis
                .local_minima()
                .iter()
                .any(|m| (m.minimizer() - g).norm() < 0.2)));
    }

    #[test]
    fn unresolvable_needle_exhausts_refinement() {
        let f = Needle::default();
        let analysis = analyze(&f).unwrap();

        let options = AnalyzerOptions::default();
        let expected_iters = 1 + (options.n_div_max() - options.n_div_initial()) / 2;

        assert!(!analysis.converged());
        assert_eq!(analysis.iterations(), expected_iters);
        assert!(!analysis.local_minima().is_empty());

        // The finest grid has a vertex on the needle, so the well itself is
        // among the reported minima.
        let best = analysis.best().unwrap();
        assert!(best.objective() < -0.6);
        assert!((best.minimizer()[0] - 1.0 / 3.0).abs() < 1e-3);
    }

    #[test]
    fn washboard_wells_are_all_enumerated() {
        let f = Washboard::default();
        let analysis = analyze(&f).unwrap();

        assert_eq!(analysis.local_minima().len(), 12);

        for well in f.optima() {
            assert!(analysis
                .local_minima()
                .iter()
                .any(|m| (m.minimizer() - &well).norm() < 0.01));
        }
    }

    #[test]
    fn analysis_is_deterministic() {
        let f = Himmelblau;

        let first = analyze(&f).unwrap();
        let second = analyze(&f).unwrap();

        assert_eq!(first.num_basins(), second.num_basins());
        assert_eq!(first.iterations(), second.iterations());
        assert_eq!(first.evaluations(), second.evaluations());

        for (a, b) in first
            .local_minima()
            .iter()
            .zip(second.local_minima().iter())
        {
            assert_eq!(a.minimizer(), b.minimizer());
            assert_eq!(a.objective(), b.objective());
        }
    }

    #[test]
    fn gradient_pruning_preserves_sphere_basin() {
        let f = Sphere::new(2);

        let mut options = AnalyzerOptions::default();
        options.set_use_gradient_pruning(true);

        let analysis = Analyzer::builder(&f)
            .with_options(options)
            .build()
            .run()
            .unwrap();

        assert_eq!(analysis.num_basins(), 1);
        assert!(analysis.best().unwrap().minimizer().norm() < 1e-6);
    }

    #[test]
    fn invalid_options_fail_fast() {
        let f = Sphere::new(2);

        let mut options = AnalyzerOptions::default();
        options.set_stability_count(0);

        let result = Analyzer::builder(&f).with_options(options).build().run();
        assert!(matches!(result, Err(AnalyzeError::InvalidOptions(_))));

        let mut options = AnalyzerOptions::default();
        options.set_n_div_initial(10).set_n_div_max(5);

        let result = Analyzer::builder(&f).with_options(options).build().run();
        assert!(matches!(result, Err(AnalyzeError::InvalidOptions(_))));
    }

    #[test]
    fn empty_domain_fails_fast() {
        struct Empty;

        impl Problem for Empty {
            fn domain(&self) -> Domain {
                Domain::rect(Vec::new(), Vec::new())
            }
        }

        impl Objective for Empty {
            fn value<Sx>(&self, _x: &nalgebra::Vector<f64, nalgebra::Dyn, Sx>) -> f64
            where
                Sx: nalgebra::storage::Storage<f64, nalgebra::Dyn> + nalgebra::IsContiguous,
            {
                unreachable!("the domain must be rejected before any evaluation")
            }
        }

        let result = analyze(&Empty);
        assert!(matches!(result, Err(AnalyzeError::InvalidDomain(_))));
    }

    #[test]
    fn unbounded_domain_fails_fast() {
        struct Unbounded;

        impl Problem for Unbounded {
            fn domain(&self) -> Domain {
                Domain::rect(vec![f64::NEG_INFINITY, -1.0], vec![1.0, 1.0])
            }
        }

        impl Objective for Unbounded {
            fn value<Sx>(&self, _x: &nalgebra::Vector<f64, nalgebra::Dyn, Sx>) -> f64
            where
                Sx: nalgebra::storage::Storage<f64, nalgebra::Dyn> + nalgebra::IsContiguous,
            {
                unreachable!("the domain must be rejected before any evaluation")
            }
        }

        let result = analyze(&Unbounded);
        assert!(matches!(result, Err(AnalyzeError::InvalidDomain(_))));
    }

    #[test]
    fn failing_objective_yields_empty_analysis() {
        struct Broken;

        impl Problem for Broken {
            fn domain(&self) -> Domain {
                Domain::rect(vec![0.0, 0.0], vec![1.0, 1.0])
            }
        }

        impl Objective for Broken {
            fn value<Sx>(&self, _x: &nalgebra::Vector<f64, nalgebra::Dyn, Sx>) -> f64
            where
                Sx: nalgebra::storage::Storage<f64, nalgebra::Dyn> + nalgebra::IsContiguous,
            {
                f64::NAN
            }
        }

        let analysis = analyze(&Broken).unwrap();

        assert_eq!(analysis.num_basins(), 0);
        assert!(analysis.local_minima().is_empty());
        assert!(!analysis.converged());
    }

    #[test]
    fn cancellation_before_start_returns_empty_partial() {
        let f = Sphere::new(2);
        let token = CancellationToken::new();
        token.cancel();

        let result = Analyzer::builder(&f)
            .with_cancellation(token)
            .build()
            .run();

        match result {
            Err(AnalyzeError::Cancelled(partial)) => {
                assert_eq!(partial.iterations(), 0);
                assert_eq!(partial.num_basins(), 0);
                assert!(partial.local_minima().is_empty());
            }
            other => panic!("expected cancellation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn minimizers_stay_inside_the_box() {
        let f = SixHumpCamel;
        let analysis = analyze(&f).unwrap();

        let dom = f.domain();
        for minimum in analysis.local_minima() {
            for i in 0..dom.dim() {
                assert!(minimum.minimizer()[i] >= dom.lower()[i]);
                assert!(minimum.minimizer()[i] <= dom.upper()[i]);
            }
        }
    }
}
