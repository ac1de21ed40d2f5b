//! Core abstractions and types.
//!
//! *Users* are mainly interested in implementing the [`Objective`] and
//! [`Problem`] traits, specifying the search box through [`Domain`].
//!
//! Local-polisher *developers* are interested in implementing the
//! [`Optimizer`] trait and using the tools in
//! [derivatives](crate::derivatives).

mod domain;
mod objective;
mod optimizer;

pub use domain::*;
pub use objective::*;
pub use optimizer::*;
