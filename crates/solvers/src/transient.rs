//! Solvers for time-dependent problems.

pub mod euler;
