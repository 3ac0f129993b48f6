//! Total-cost-of-ownership comparison between storage options.
//!
//! Options enter as named [`EconomicResult`]s and are compared only through
//! their lifecycle totals, so any technology priced by [`evaluate_energy`]
//! can take part. [`ElectrochemicalBattery`] sizes a battery plus heat pump
//! to the same heat service as a thermal store.

use latent_core::{Fraction, constraint::Bound};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uom::si::{energy::kilowatt_hour, f64::Energy};

use crate::{
    CycleEnergy, EconomicAssumptions, EconomicResult, EconomicsError, RateBasis, Replacement,
    evaluate_energy,
};

/// One option in a [`TcoTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcoRow {
    pub name: String,
    /// One for the cheapest lifecycle cost.
    pub rank: usize,
    pub lifecycle_cost: f64,
    /// Baseline lifecycle cost minus this option's; positive is cheaper.
    pub savings_vs_baseline: f64,
    pub result: EconomicResult,
}

/// Options ranked by lifecycle cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcoTable {
    baseline: String,
    rows: Vec<TcoRow>,
}

impl TcoTable {
    /// Rows from cheapest to dearest.
    #[must_use]
    pub fn rows(&self) -> &[TcoRow] {
        &self.rows
    }

    #[must_use]
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    #[must_use]
    pub fn cheapest(&self) -> &TcoRow {
        &self.rows[0]
    }

    #[must_use]
    pub fn row(&self, name: &str) -> Option<&TcoRow> {
        self.rows.iter().find(|row| row.name == name)
    }
}

/// Ranks options by lifecycle cost against a baseline.
///
/// Ties keep their input order.
///
/// # Errors
///
/// Returns [`EconomicsError::TooFewOptions`] for fewer than two options and
/// [`EconomicsError::UnknownBaseline`] if no option is named `baseline`.
pub fn compare<'a>(
    options: impl IntoIterator<Item = (&'a str, &'a EconomicResult)>,
    baseline: &str,
) -> Result<TcoTable, EconomicsError> {
    let mut rows: Vec<TcoRow> = options
        .into_iter()
        .map(|(name, result)| TcoRow {
            name: name.to_owned(),
            rank: 0,
            lifecycle_cost: result.lifecycle.total(),
            savings_vs_baseline: 0.0,
            result: *result,
        })
        .collect();

    if rows.len() < 2 {
        return Err(EconomicsError::TooFewOptions { count: rows.len() });
    }
    let baseline_cost = rows
        .iter()
        .find(|row| row.name == baseline)
        .map(|row| row.lifecycle_cost)
        .ok_or_else(|| EconomicsError::UnknownBaseline {
            name: baseline.to_owned(),
        })?;

    rows.sort_by(|a, b| a.lifecycle_cost.total_cmp(&b.lifecycle_cost));
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
        row.savings_vs_baseline = baseline_cost - row.lifecycle_cost;
    }

    debug!(
        baseline,
        cheapest = rows[0].name.as_str(),
        options = rows.len(),
        "ranked storage options"
    );

    Ok(TcoTable {
        baseline: baseline.to_owned(),
        rows,
    })
}

/// A battery charged off-peak that runs a heat pump at peak.
///
/// Costs are in dollars; the default is a wall-mounted lithium pack with a
/// hybrid inverter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectrochemicalBattery {
    pub cost_per_kwh: f64,
    pub inverter_cost: f64,
    pub installation_cost: f64,
    pub heat_pump_cop: f64,
    /// Oversizing over the bare electric equivalent of the heat service.
    pub sizing_margin: f64,
    pub round_trip_efficiency: Fraction,
    /// Continuous inverter draw in watts.
    pub standby_w: f64,
    pub standby_rate: f64,
    pub replacement_interval_years: u32,
    /// Replacement cost as a share of the original battery cost.
    pub replacement_share: Fraction,
    pub annual_fade: Fraction,
}

impl Default for ElectrochemicalBattery {
    fn default() -> Self {
        Self {
            cost_per_kwh: 800.0,
            inverter_cost: 1500.0,
            installation_cost: 2000.0,
            heat_pump_cop: 3.0,
            sizing_margin: 1.2,
            round_trip_efficiency: Fraction::saturating(0.9),
            standby_w: 20.0,
            standby_rate: 0.15,
            replacement_interval_years: 10,
            replacement_share: Fraction::saturating(0.7),
            annual_fade: Fraction::saturating(0.02),
        }
    }
}

/// A battery sized to a heat service, ready to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquivalentBattery {
    pub capacity: Energy,
    /// Heat delivered through the heat pump and electricity bought per cycle.
    pub energy: CycleEnergy,
    pub assumptions: EconomicAssumptions,
}

impl EquivalentBattery {
    /// Prices the battery with the same model as the thermal store.
    ///
    /// # Errors
    ///
    /// See [`evaluate_energy`].
    pub fn evaluate(&self) -> Result<EconomicResult, EconomicsError> {
        evaluate_energy(&self.energy, &self.assumptions)
    }
}

impl ElectrochemicalBattery {
    fn validate(&self) -> Result<(), EconomicsError> {
        Bound::NonNegative.check("battery cost per kWh", self.cost_per_kwh)?;
        Bound::NonNegative.check("inverter cost", self.inverter_cost)?;
        Bound::NonNegative.check("battery installation cost", self.installation_cost)?;
        Bound::StrictlyPositive.check("heat pump COP", self.heat_pump_cop)?;
        Bound::StrictlyPositive.check("sizing margin", self.sizing_margin)?;
        Bound::StrictlyPositive.check("round-trip efficiency", self.round_trip_efficiency.get())?;
        Bound::NonNegative.check("inverter standby", self.standby_w)?;
        Bound::NonNegative.check("standby rate", self.standby_rate)?;
        Ok(())
    }

    /// Usable capacity needed to cover `thermal_service` through the heat pump.
    #[must_use]
    pub fn capacity_for(&self, thermal_service: Energy) -> Energy {
        thermal_service / self.heat_pump_cop * self.sizing_margin
    }

    /// Sizes a battery to `thermal_service` per cycle.
    ///
    /// Rates, horizon, discount rate, cycle count and reliability come from
    /// `template`. Capital, replacement, fade and standby come from the
    /// battery; incentives and the store-specific value terms are dropped,
    /// resilience is kept.
    ///
    /// # Errors
    ///
    /// Returns [`EconomicsError::Configuration`] for a non-positive COP,
    /// margin or efficiency, or a negative cost.
    pub fn size(
        &self,
        thermal_service: Energy,
        template: &EconomicAssumptions,
    ) -> Result<EquivalentBattery, EconomicsError> {
        self.validate()?;
        Bound::NonNegative.check("thermal service", thermal_service.get::<kilowatt_hour>())?;

        let capacity = self.capacity_for(thermal_service);
        let battery_cost = capacity.get::<kilowatt_hour>() * self.cost_per_kwh;

        let energy = CycleEnergy {
            delivered: capacity * self.heat_pump_cop,
            purchased: capacity / self.round_trip_efficiency.get(),
        };
        let assumptions = EconomicAssumptions {
            displaced_efficiency: self.heat_pump_cop,
            charging: RateBasis::OffPeak,
            capital_cost: battery_cost + self.inverter_cost + self.installation_cost,
            incentive: Fraction::ZERO,
            incentive_basis: None,
            carbon: None,
            equipment_life_extension: None,
            pump: None,
            operating_cost: self.standby_w * 8760.0 / 1000.0 * self.standby_rate,
            replacement: Some(Replacement {
                interval_years: self.replacement_interval_years,
                cost: self.replacement_share * battery_cost,
            }),
            annual_fade: self.annual_fade,
            ..template.clone()
        };

        Ok(EquivalentBattery {
            capacity,
            energy,
            assumptions,
        })
    }
}
