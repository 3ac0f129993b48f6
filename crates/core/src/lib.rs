//! Core traits and types for the Latent workspace.
//!
//! This crate defines the shared abstractions that the storage simulators and
//! the transient solver build on:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output
//! - [`Snapshot`]: a captured input/output pair from a model call
//! - [`Observer`]: receives solver events and optionally returns control actions
//! - [`OdeProblem`]: adapts a model's input and output to a steppable state
//! - [`Fraction`]: a scalar bounded to `[0, 1]`
//! - [`constraint`]: construction-time checks for configuration parameters

pub mod constraint;
mod fraction;
mod model;
mod observer;
mod problems;
mod step;

pub use fraction::{Fraction, FractionError};
pub use model::{Model, Snapshot};
pub use observer::Observer;
pub use problems::OdeProblem;
pub use step::{DerivativeOf, StepIntegrable};
