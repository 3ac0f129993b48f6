//! Phase-change thermal store simulation.
//!
//! A [`ThermalSystem`] is a validated store configuration. It advances a
//! [`PhaseState`] under a heat flow and triggers nucleation in a supercooled
//! store. The simulators drive it through the forward Euler solver:
//!
//! - [`Charger`] heats the store from a [`HeatSource`] until it is fully
//!   liquid at the charge target
//! - [`Discharger`] draws heat into a circulating fluid until delivered power
//!   falls below a cutoff
//! - [`run_standby`] holds the store with only insulation loss
//!
//! Each run yields an immutable [`CycleResult`] for the economic layer.
//!
//! # Example
//!
//! ```
//! use latent_storage::{ClimateProfile, HeatSource, ThermalSystem, ThermalSystemConfig, run_charge};
//! use uom::si::{f64::{Power, ThermodynamicTemperature}, power::watt, thermodynamic_temperature::degree_celsius};
//!
//! let system = ThermalSystem::new(ThermalSystemConfig::default())?;
//! let cold = system.solid_state(ThermodynamicTemperature::new::<degree_celsius>(20.0))?;
//! let climate = ClimateProfile::constant("lab", ThermodynamicTemperature::new::<degree_celsius>(20.0));
//!
//! let charge = run_charge(&system, &cold, &HeatSource::Resistive(Power::new::<watt>(3000.0)), &climate)?;
//! assert_eq!(charge.final_state.liquid_fraction(), latent_core::Fraction::ONE);
//! # Ok::<(), latent_storage::ThermalError>(())
//! ```

mod charge;
mod climate;
mod cycle;
mod discharge;
mod error;
pub mod hx;
mod material;
mod nucleation;
mod phase;
mod source;
mod standby;
mod store;
mod system;

pub use charge::{ChargeSettings, Charger, run_charge};
pub use climate::{ClearDay, ClimateProfile, TimeSeries};
pub use cycle::{CycleKind, CycleResult, Sample};
pub use discharge::{DischargeSettings, Discharger, NucleationPolicy, run_discharge};
pub use error::ThermalError;
pub use material::PcmMaterial;
pub use nucleation::{
    NucleationAttempt, NucleationLog, NucleationStage, NucleationTracker, SpontaneousNucleation,
    StageTransition, success_rate,
};
pub use phase::{HeatBalance, PcmBody, PhaseState};
pub use source::{HeatSource, SolarCollector};
pub use standby::{StandbySettings, run_standby, run_standby_with};
pub use system::{PlateGeometry, ThermalSystem, ThermalSystemConfig};
