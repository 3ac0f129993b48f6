//! Numerical solvers for the Latent workspace.
//!
//! [`transient::euler`] is a fixed-step explicit Euler integrator with
//! observer-driven early termination. The charge, discharge and standby
//! simulators all run on it.

pub mod transient;
