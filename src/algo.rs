//! The collection of implemented local algorithms.
//!
//! These polish one basin representative each; any of them can be replaced by
//! a custom implementation of the [`Optimizer`](crate::core::Optimizer)
//! trait.

pub mod bfgs;
pub mod nelder_mead;

pub use bfgs::Bfgs;
pub use nelder_mead::NelderMead;
