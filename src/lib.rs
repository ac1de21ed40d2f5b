#![allow(clippy::many_single_char_names)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # Relief
//!
//! A pure Rust global landscape analyzer for continuous, box-bounded scalar
//! objectives. Unlike a classical global optimizer, which stops when a single
//! lowest point is found, relief enumerates *every* basin of attraction within
//! the box and returns one polished representative minimizer per basin
//! together with its objective value. The intended consumers are benchmarking
//! harnesses, multimodality-profiling tools and diagnostic studies of
//! objective functions.
//!
//! ## Method
//!
//! The engine implements simplicial homology global optimization over a
//! uniform grid:
//!
//! * The box is discretized into a lattice and triangulated into Kuhn
//!   simplices ([complex](crate::complex)), with objective evaluations
//!   memoized in a concurrent [point cache](crate::grid).
//! * Every lattice vertex that does not exceed any of its `3^N - 1` neighbors
//!   is a candidate minimum; candidates are merged into basins by a
//!   union-find over the neighborhood graph ([basins](crate::basins)).
//! * The grid is refined until the basin count — the 0th Betti number of the
//!   sampled landscape — stays stable, a topological analog of Cauchy
//!   convergence ([driver](crate::driver)).
//! * One representative per basin is polished by a local optimizer
//!   ([algo](crate::algo)) and near-duplicate minima are merged.
//!
//! An optional first-order filter discards simplices whose vertex-gradient
//! hull does not contain zero ([hull](crate::hull)).
//!
//! ## Problem
//!
//! A problem is any type that implements the [`Problem`] and [`Objective`]
//! traits.
//!
//! ```rust
//! use relief::nalgebra as na;
//! use relief::{Domain, Objective, Problem};
//! use na::{Dyn, IsContiguous};
//!
//! struct Himmelblau;
//!
//! impl Problem for Himmelblau {
//!     fn domain(&self) -> Domain {
//!         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
//!     }
//! }
//!
//! impl Objective for Himmelblau {
//!     fn value<Sx>(&self, x: &na::Vector<f64, Dyn, Sx>) -> f64
//!     where
//!         Sx: na::storage::Storage<f64, Dyn> + IsContiguous,
//!     {
//!         (x[0].powi(2) + x[1] - 11.0).powi(2) + (x[0] + x[1].powi(2) - 7.0).powi(2)
//!     }
//! }
//! ```
//!
//! There is no need to provide the gradient; a finite-difference
//! approximation (see [derivatives](crate::derivatives)) is used unless an
//! analytic one is supplied.
//!
//! ## Analysis
//!
//! ```rust
//! # use relief::nalgebra as na;
//! # use relief::{Domain, Objective, Problem};
//! # use na::{Dyn, IsContiguous};
//! #
//! # struct Himmelblau;
//! #
//! # impl Problem for Himmelblau {
//! #     fn domain(&self) -> Domain {
//! #         Domain::rect(vec![-5.0, -5.0], vec![5.0, 5.0])
//! #     }
//! # }
//! #
//! # impl Objective for Himmelblau {
//! #     fn value<Sx>(&self, x: &na::Vector<f64, Dyn, Sx>) -> f64
//! #     where
//! #         Sx: na::storage::Storage<f64, Dyn> + IsContiguous,
//! #     {
//! #         (x[0].powi(2) + x[1] - 11.0).powi(2) + (x[0] + x[1].powi(2) - 7.0).powi(2)
//! #     }
//! # }
//! #
//! let analysis = relief::analyze(&Himmelblau).expect("analysis failed");
//!
//! // The minima of the Himmelblau function are enumerated, lowest first.
//! assert!(analysis.num_basins() >= 3);
//! assert!(analysis.best().unwrap().objective() < 1e-6);
//! ```
//!
//! See [`Analyzer`] for non-default settings, cancellation and custom local
//! polishers.
//!
//! ## License
//!
//! Licensed under MIT.

pub mod algo;
pub mod basins;
pub mod complex;
mod core;
pub mod derivatives;
pub mod driver;
pub mod grid;
pub mod hull;
pub mod polish;

pub use core::*;
pub use driver::{analyze, Analysis, AnalyzeError, Analyzer, AnalyzerBuilder, AnalyzerOptions, CancellationToken};
pub use polish::MinimumPoint;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
