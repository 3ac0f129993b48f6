use latent_core::constraint::Violation;
use latent_solvers::transient::euler;
use thiserror::Error;

/// Errors raised by the thermal store and its simulators.
///
/// Every variant carries the offending value and the bound it violated.
/// Nothing is retried or clamped: a run that would produce a physically
/// inconsistent result fails instead.
#[derive(Debug, Error)]
pub enum ThermalError {
    /// A static parameter is out of range.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] Violation),

    /// The time step violates the explicit Euler stability bound.
    #[error("time step of {dt_s} s is unstable: must be < {max_dt_s} s")]
    Stability { dt_s: f64, max_dt_s: f64 },

    /// The charge target was not reached within the step ceiling or duration.
    #[error(
        "charge to {target_c} °C not reached after {elapsed_s} s (limit {limit_s} s): \
         store at {temperature_c} °C, liquid fraction {liquid_fraction}"
    )]
    ChargeTimeout {
        target_c: f64,
        elapsed_s: f64,
        limit_s: f64,
        temperature_c: f64,
        liquid_fraction: f64,
    },

    /// Discharge power stopped changing while still above the cutoff.
    #[error(
        "discharge stalled at {power_w} W after {steps} steps ({elapsed_s} s): \
         power must fall below the {cutoff_w} W cutoff"
    )]
    DischargeStalled {
        power_w: f64,
        cutoff_w: f64,
        steps: usize,
        elapsed_s: f64,
    },

    /// A nucleation trigger was applied to a store that is not supercooled.
    #[error(
        "nucleation trigger requires a supercooled store: \
         store at {temperature_c} °C, liquid fraction {liquid_fraction}"
    )]
    NotSupercooled {
        temperature_c: f64,
        liquid_fraction: f64,
    },

    /// The integrator failed for a reason outside the store's own errors.
    #[error(transparent)]
    Integration(euler::Error),
}

impl From<euler::Error> for ThermalError {
    /// Unwraps store errors raised inside the integrator.
    fn from(err: euler::Error) -> Self {
        err.downcast::<ThermalError>()
            .unwrap_or_else(ThermalError::Integration)
    }
}
