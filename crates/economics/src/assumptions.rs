//! Economic inputs for evaluating a store.
//!
//! Money is in dollars and energy prices in dollars per kWh. Every value is a
//! caller-supplied assumption, never module state, so several scenarios can be
//! evaluated side by side.

use latent_core::{
    Fraction,
    constraint::{Bound, Violation},
};
use latent_storage::NucleationLog;
use serde::{Deserialize, Serialize};

/// Time-of-use electricity prices in $/kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub peak: f64,
    pub off_peak: f64,
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self {
            peak: 0.18,
            off_peak: 0.12,
        }
    }
}

/// Price paid for the energy that charges the store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBasis {
    Peak,
    OffPeak,
    /// A flat price in $/kWh.
    Fixed(f64),
    /// Solar or waste heat.
    Free,
}

impl RateBasis {
    #[must_use]
    pub fn rate(self, schedule: &RateSchedule) -> f64 {
        match self {
            RateBasis::Peak => schedule.peak,
            RateBasis::OffPeak => schedule.off_peak,
            RateBasis::Fixed(rate) => rate,
            RateBasis::Free => 0.0,
        }
    }
}

/// Value of the emissions avoided with displaced electricity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbonValue {
    /// Grid intensity in kg CO₂ per kWh.
    pub intensity_kg_per_kwh: f64,
    /// Carbon price in $ per tonne.
    pub price_per_tonne: f64,
}

/// Circulator pump running for part of every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParasiticPump {
    pub power_w: f64,
    pub hours_per_cycle: f64,
    /// Price of the pump's electricity in $/kWh.
    pub rate: f64,
}

impl ParasiticPump {
    /// Annual pump electricity in kWh.
    #[must_use]
    pub fn annual_kwh(&self, cycles_per_year: f64) -> f64 {
        self.power_w * self.hours_per_cycle * cycles_per_year / 1000.0
    }
}

/// Equipment replaced on a fixed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub interval_years: u32,
    pub cost: f64,
}

/// Everything the economic model assumes about prices, costs and use.
///
/// The default is a solar-charged reference store displacing heat-pump
/// electricity at the peak rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicAssumptions {
    pub rates: RateSchedule,
    /// Heat delivered per kWh of electricity displaced: a COP for a heat
    /// pump, one for resistance heat.
    pub displaced_efficiency: f64,
    pub charging: RateBasis,
    pub capital_cost: f64,
    pub incentive: Fraction,
    /// Share of the capital cost the incentive applies to, or all of it.
    pub incentive_basis: Option<f64>,
    pub discount_rate: f64,
    pub horizon_years: u32,
    pub cycles_per_year: f64,
    /// Share of cycles whose nucleation trigger fires.
    pub nucleation_reliability: Fraction,
    pub carbon: Option<CarbonValue>,
    /// Deferred replacement of the displaced equipment, in $/yr.
    pub equipment_life_extension: Option<f64>,
    /// Backup heat during outages, in $/yr.
    pub resilience: Option<f64>,
    pub pump: Option<ParasiticPump>,
    /// Fixed running cost in $/yr.
    pub operating_cost: f64,
    pub replacement: Option<Replacement>,
    /// Capacity lost per year since installation or last replacement.
    pub annual_fade: Fraction,
}

impl Default for EconomicAssumptions {
    fn default() -> Self {
        Self {
            rates: RateSchedule::default(),
            displaced_efficiency: 3.0,
            charging: RateBasis::Free,
            capital_cost: 9500.0,
            incentive: Fraction::saturating(0.30),
            incentive_basis: Some(6000.0),
            discount_rate: 0.03,
            horizon_years: 10,
            cycles_per_year: 139.0,
            nucleation_reliability: Fraction::ONE,
            carbon: Some(CarbonValue {
                intensity_kg_per_kwh: 0.45,
                price_per_tonne: 50.0,
            }),
            equipment_life_extension: Some(8000.0 / 17.0 * 0.3),
            resilience: Some(50.0),
            pump: Some(ParasiticPump {
                power_w: 50.0,
                hours_per_cycle: 15.0,
                rate: 0.15,
            }),
            operating_cost: 0.0,
            replacement: None,
            annual_fade: Fraction::ZERO,
        }
    }
}

impl EconomicAssumptions {
    /// Checks every rate, cost and count.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] naming the first offending assumption.
    pub fn validate(&self) -> Result<(), Violation> {
        Bound::NonNegative.check("peak rate", self.rates.peak)?;
        Bound::NonNegative.check("off-peak rate", self.rates.off_peak)?;
        if let RateBasis::Fixed(rate) = self.charging {
            Bound::NonNegative.check("charging rate", rate)?;
        }
        Bound::StrictlyPositive.check("displaced efficiency", self.displaced_efficiency)?;
        Bound::NonNegative.check("capital cost", self.capital_cost)?;
        if let Some(basis) = self.incentive_basis {
            Bound::NonNegative.check("incentive basis", basis)?;
            Bound::AtMost(self.capital_cost).check("incentive basis", basis)?;
        }
        Bound::NonNegative.check("discount rate", self.discount_rate)?;
        Bound::StrictlyPositive.check("horizon", f64::from(self.horizon_years))?;
        Bound::NonNegative.check("cycles per year", self.cycles_per_year)?;

        if let Some(carbon) = self.carbon {
            Bound::NonNegative.check("carbon intensity", carbon.intensity_kg_per_kwh)?;
            Bound::NonNegative.check("carbon price", carbon.price_per_tonne)?;
        }
        if let Some(value) = self.equipment_life_extension {
            Bound::NonNegative.check("equipment life extension", value)?;
        }
        if let Some(value) = self.resilience {
            Bound::NonNegative.check("resilience", value)?;
        }
        if let Some(pump) = self.pump {
            Bound::NonNegative.check("pump power", pump.power_w)?;
            Bound::NonNegative.check("pump hours per cycle", pump.hours_per_cycle)?;
            Bound::NonNegative.check("pump rate", pump.rate)?;
        }
        Bound::NonNegative.check("operating cost", self.operating_cost)?;
        if let Some(replacement) = self.replacement {
            Bound::StrictlyPositive
                .check("replacement interval", f64::from(replacement.interval_years))?;
            Bound::NonNegative.check("replacement cost", replacement.cost)?;
        }
        Ok(())
    }

    /// Capital cost less the incentive.
    #[must_use]
    pub fn net_capital(&self) -> f64 {
        let basis = self.incentive_basis.unwrap_or(self.capital_cost);
        self.capital_cost - self.incentive * basis
    }

    /// Cycles per year whose trigger succeeds.
    #[must_use]
    pub fn effective_cycles(&self) -> f64 {
        self.cycles_per_year * self.nucleation_reliability
    }

    /// Takes the nucleation reliability from recorded trigger attempts.
    ///
    /// An empty log leaves the current reliability in place.
    #[must_use]
    pub fn with_reliability_from(mut self, log: &NucleationLog) -> Self {
        if let Some(rate) = log.success_rate() {
            self.nucleation_reliability = rate;
        }
        self
    }

    /// Share of the original capacity left `year` years into the horizon,
    /// counting from one.
    #[must_use]
    pub fn capacity_factor(&self, year: u32) -> f64 {
        let age = match self.replacement {
            Some(r) if r.interval_years > 0 => year.saturating_sub(1) % r.interval_years,
            _ => year.saturating_sub(1),
        };
        (1.0 - self.annual_fade * f64::from(age)).max(0.0)
    }

    /// Replacement spending in `year`; nothing is replaced in the final year.
    #[must_use]
    pub fn replacement_cost(&self, year: u32) -> f64 {
        match self.replacement {
            Some(r) if r.interval_years > 0
                && year % r.interval_years == 0
                && year < self.horizon_years =>
            {
                r.cost
            }
            _ => 0.0,
        }
    }
}
