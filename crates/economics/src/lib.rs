//! Economics of a phase-change thermal store.
//!
//! [`evaluate`] prices the cycle results produced by `latent-storage` under a
//! set of [`EconomicAssumptions`]: annual savings by term, simple payback,
//! NPV, levelized cost and lifecycle totals. The rest of the crate works from
//! those results:
//!
//! - [`compare`] ranks options by total cost of ownership, with
//!   [`ElectrochemicalBattery`] sizing a battery alternative to the same
//!   heat service
//! - [`project`] turns customer segments into unit volumes, priced by
//!   [`PricingScenario`] and [`PriceBuildUp`]
//! - [`seasonal_savings`] prices heat-pump electricity displaced by season
//! - [`SensitivityStudy`] reruns any model under sampled assumptions
//!
//! # Example
//!
//! ```
//! use latent_economics::{CycleEnergy, EconomicAssumptions, Payback, evaluate_energy};
//! use uom::si::{energy::kilowatt_hour, f64::Energy};
//!
//! let cycle = CycleEnergy {
//!     delivered: Energy::new::<kilowatt_hour>(16.7),
//!     purchased: Energy::new::<kilowatt_hour>(0.0),
//! };
//! let result = evaluate_energy(&cycle, &EconomicAssumptions::default())?;
//! assert!(matches!(result.payback, Payback::Years(years) if years > 0.0));
//! # Ok::<(), latent_economics::EconomicsError>(())
//! ```

mod assumptions;
mod comparison;
mod error;
mod evaluate;
mod heat_pump;
mod market;
mod sensitivity;

pub use assumptions::{
    CarbonValue, EconomicAssumptions, ParasiticPump, RateBasis, RateSchedule, Replacement,
};
pub use comparison::{ElectrochemicalBattery, EquivalentBattery, TcoRow, TcoTable, compare};
pub use error::EconomicsError;
pub use evaluate::{
    CycleEnergy, EconomicResult, LifecycleCost, Payback, SavingsBreakdown, evaluate,
    evaluate_energy,
};
pub use heat_pump::{AssistSummary, CopCurve, Season, SeasonalSavings, seasonal_savings};
pub use market::{
    AdoptionCurve, Addressable, CustomerSegment, MarketProjection, PriceBuildUp, PriceStack,
    PricingScenario, ScenarioYear, SegmentVolume, YearProjection, YearTable, project,
};
pub use sensitivity::{
    Draw, RunFailure, SensitivityReport, SensitivityStudy, Spread, Summary, Uncertain,
};
