use latent_core::constraint::Bound;
use latent_storage::{CycleKind, CycleResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uom::si::{energy::kilowatt_hour, f64::Energy};

use crate::{EconomicAssumptions, EconomicsError};

/// Energy per cycle that the economic model prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleEnergy {
    /// Useful heat delivered by a discharge.
    pub delivered: Energy,
    /// Energy bought to charge the store.
    pub purchased: Energy,
}

impl CycleEnergy {
    /// Averages simulated runs into one cycle.
    ///
    /// Delivered energy is the mean over discharge runs and purchased energy
    /// the mean source energy over charge runs. Standby runs only matter
    /// through the state they hand to the next discharge.
    #[must_use]
    pub fn from_results(results: &[CycleResult]) -> Self {
        let mean = |kind: CycleKind, energy: fn(&CycleResult) -> Energy| {
            let (total, count) = results
                .iter()
                .filter(|r| r.kind == kind)
                .fold((0.0, 0_u32), |(total, count), r| {
                    (total + energy(r).get::<kilowatt_hour>(), count + 1)
                });
            let kwh = if count == 0 { 0.0 } else { total / f64::from(count) };
            Energy::new::<kilowatt_hour>(kwh)
        };

        Self {
            delivered: mean(CycleKind::Discharge, |r| r.energy),
            purchased: mean(CycleKind::Charge, |r| r.source_energy),
        }
    }
}

/// Annual savings split into independent terms, all in $/yr.
///
/// Costs are stored as positive amounts and subtracted by [`Self::net`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SavingsBreakdown {
    pub avoided_energy: f64,
    pub charging_cost: f64,
    pub carbon: f64,
    pub equipment_life: f64,
    pub resilience: f64,
    pub pump_cost: f64,
    pub operating_cost: f64,
}

impl SavingsBreakdown {
    #[must_use]
    pub fn net(&self) -> f64 {
        self.avoided_energy - self.charging_cost + self.carbon + self.equipment_life
            + self.resilience
            - self.pump_cost
            - self.operating_cost
    }

    /// Terms that scale with the energy cycled: these fade with capacity.
    fn energy_terms(&self) -> f64 {
        self.avoided_energy - self.charging_cost + self.carbon
    }

    /// Recurring spending, excluding value terms.
    fn ongoing_cost(&self, capacity: f64) -> f64 {
        self.charging_cost * capacity + self.pump_cost + self.operating_cost
    }
}

/// Years until savings repay the net capital.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Payback {
    Years(f64),
    /// Savings never repay the capital.
    Never,
}

impl Payback {
    /// The payback in years, infinite for [`Payback::Never`].
    #[must_use]
    pub fn years(self) -> f64 {
        match self {
            Payback::Years(years) => years,
            Payback::Never => f64::INFINITY,
        }
    }
}

/// Undiscounted spending over the horizon, in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LifecycleCost {
    pub capital: f64,
    pub operating: f64,
    pub replacements: f64,
    /// Heat delivered over the horizon, in kWh.
    pub energy_delivered_kwh: f64,
}

impl LifecycleCost {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.capital + self.operating + self.replacements
    }
}

/// Economic outcome of one set of cycle results under one set of assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EconomicResult {
    /// First-year savings in $/yr.
    pub annual_savings: f64,
    pub breakdown: SavingsBreakdown,
    pub payback: Payback,
    pub npv: f64,
    /// Discounted cost per kWh delivered, infinite if nothing is delivered.
    pub levelized_cost: f64,
    pub lifecycle: LifecycleCost,
}

/// Prices simulated cycles under a set of assumptions.
///
/// # Errors
///
/// Returns [`EconomicsError::Configuration`] for an invalid assumption.
pub fn evaluate(
    results: &[CycleResult],
    assumptions: &EconomicAssumptions,
) -> Result<EconomicResult, EconomicsError> {
    evaluate_energy(&CycleEnergy::from_results(results), assumptions)
}

/// Prices a cycle given directly as energy.
///
/// Energy-driven terms scale with the capacity left after fade in each year;
/// value terms and fixed costs do not. NPV discounts each year's savings less
/// replacements; payback uses the first year's savings.
///
/// # Errors
///
/// Returns [`EconomicsError::Configuration`] for an invalid assumption or a
/// negative cycle energy.
pub fn evaluate_energy(
    energy: &CycleEnergy,
    assumptions: &EconomicAssumptions,
) -> Result<EconomicResult, EconomicsError> {
    assumptions.validate()?;
    let delivered =
        Bound::NonNegative.check("delivered energy", energy.delivered.get::<kilowatt_hour>())?;
    let purchased =
        Bound::NonNegative.check("purchased energy", energy.purchased.get::<kilowatt_hour>())?;

    let a = assumptions;
    let cycles = a.effective_cycles();
    let displaced_kwh = delivered * cycles / a.displaced_efficiency;

    let breakdown = SavingsBreakdown {
        avoided_energy: displaced_kwh * a.rates.peak,
        charging_cost: purchased * cycles * a.charging.rate(&a.rates),
        carbon: a.carbon.map_or(0.0, |c| {
            displaced_kwh * c.intensity_kg_per_kwh / 1000.0 * c.price_per_tonne
        }),
        equipment_life: a.equipment_life_extension.unwrap_or(0.0),
        resilience: a.resilience.unwrap_or(0.0),
        pump_cost: a.pump.map_or(0.0, |p| p.annual_kwh(a.cycles_per_year) * p.rate),
        operating_cost: a.operating_cost,
    };
    let annual_savings = breakdown.net();
    let net_capital = a.net_capital();

    let mut npv = -net_capital;
    let mut discounted_cost = net_capital;
    let mut discounted_energy = 0.0;
    let mut lifecycle = LifecycleCost {
        capital: net_capital,
        operating: 0.0,
        replacements: 0.0,
        energy_delivered_kwh: 0.0,
    };

    for year in 1..=a.horizon_years {
        let discount = (1.0 + a.discount_rate).powf(f64::from(year));
        let capacity = a.capacity_factor(year);
        let replacement = a.replacement_cost(year);
        let savings = annual_savings - (1.0 - capacity) * breakdown.energy_terms();
        let ongoing = breakdown.ongoing_cost(capacity);
        let energy_kwh = delivered * cycles * capacity;

        npv += (savings - replacement) / discount;
        discounted_cost += (ongoing + replacement) / discount;
        discounted_energy += energy_kwh / discount;

        lifecycle.operating += ongoing;
        lifecycle.replacements += replacement;
        lifecycle.energy_delivered_kwh += energy_kwh;
    }

    let payback = if annual_savings > 0.0 {
        Payback::Years(net_capital / annual_savings)
    } else {
        Payback::Never
    };
    let levelized_cost = if discounted_energy > 0.0 {
        discounted_cost / discounted_energy
    } else {
        f64::INFINITY
    };

    debug!(
        annual_savings,
        npv,
        payback_years = payback.years(),
        levelized_cost,
        "evaluated cycle economics"
    );

    Ok(EconomicResult {
        annual_savings,
        breakdown,
        payback,
        npv,
        levelized_cost,
        lifecycle,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use latent_core::Fraction;
    use proptest::prelude::*;

    use super::*;
    use crate::{RateBasis, Replacement};

    fn kwh(value: f64) -> Energy {
        Energy::new::<kilowatt_hour>(value)
    }

    fn cycle(delivered: f64, purchased: f64) -> CycleEnergy {
        CycleEnergy {
            delivered: kwh(delivered),
            purchased: kwh(purchased),
        }
    }

    /// Nothing but avoided energy at the peak rate.
    fn bare() -> EconomicAssumptions {
        EconomicAssumptions {
            displaced_efficiency: 1.0,
            capital_cost: 1000.0,
            incentive: Fraction::ZERO,
            incentive_basis: None,
            discount_rate: 0.0,
            cycles_per_year: 100.0,
            carbon: None,
            equipment_life_extension: None,
            resilience: None,
            pump: None,
            ..EconomicAssumptions::default()
        }
    }

    #[test]
    fn zero_savings_never_pays_back() {
        let result = evaluate_energy(&cycle(0.0, 0.0), &bare()).unwrap();

        assert_eq!(result.annual_savings, 0.0);
        assert_eq!(result.payback, Payback::Never);
        assert_eq!(result.payback.years(), f64::INFINITY);
        assert_eq!(result.levelized_cost, f64::INFINITY);
        assert_relative_eq!(result.npv, -1000.0);
    }

    #[test]
    fn net_loss_never_pays_back() {
        let a = EconomicAssumptions {
            charging: RateBasis::Peak,
            ..bare()
        };
        let result = evaluate_energy(&cycle(10.0, 12.0), &a).unwrap();
        assert!(result.annual_savings < 0.0);
        assert_eq!(result.payback, Payback::Never);
    }

    #[test]
    fn reference_store_savings_terms() {
        let energy = cycle(16.71, 0.0);
        let result = evaluate_energy(&energy, &EconomicAssumptions::default()).unwrap();
        let b = result.breakdown;

        let displaced = 16.71 * 139.0 / 3.0;
        assert_relative_eq!(b.avoided_energy, displaced * 0.18, max_relative = 1e-12);
        assert_relative_eq!(b.carbon, displaced * 0.45 / 1000.0 * 50.0, max_relative = 1e-12);
        assert_relative_eq!(b.equipment_life, 8000.0 / 17.0 * 0.3, max_relative = 1e-12);
        assert_relative_eq!(b.pump_cost, 0.05 * 15.0 * 139.0 * 0.15, max_relative = 1e-12);
        assert_eq!(b.charging_cost, 0.0);

        let Payback::Years(years) = result.payback else {
            panic!("reference store should pay back");
        };
        assert_relative_eq!(years, 7700.0 / result.annual_savings, max_relative = 1e-12);
    }

    #[test]
    fn terms_toggle_independently() {
        let energy = cycle(16.71, 0.0);
        let base = evaluate_energy(&energy, &bare()).unwrap();
        let with_resilience = evaluate_energy(
            &energy,
            &EconomicAssumptions {
                resilience: Some(50.0),
                ..bare()
            },
        )
        .unwrap();

        assert_relative_eq!(with_resilience.annual_savings - base.annual_savings, 50.0);
        assert_eq!(with_resilience.breakdown.avoided_energy, base.breakdown.avoided_energy);
    }

    #[test]
    fn undiscounted_npv_and_levelized_cost() {
        // 1 kWh × 100 cycles at 0.18 $/kWh for 10 years against $1000.
        let result = evaluate_energy(&cycle(1.0, 0.0), &bare()).unwrap();

        assert_relative_eq!(result.annual_savings, 18.0, max_relative = 1e-12);
        assert_relative_eq!(result.npv, 18.0 * 10.0 - 1000.0, max_relative = 1e-12);
        assert_relative_eq!(result.levelized_cost, 1000.0 / 1000.0, max_relative = 1e-12);
        assert_relative_eq!(result.lifecycle.energy_delivered_kwh, 1000.0, max_relative = 1e-12);
    }

    #[test]
    fn npv_discounts_an_annuity() {
        let a = EconomicAssumptions {
            discount_rate: 0.05,
            ..bare()
        };
        let result = evaluate_energy(&cycle(1.0, 0.0), &a).unwrap();

        let annuity = (1.0 - 1.05_f64.powi(-10)) / 0.05;
        assert_relative_eq!(result.npv, 18.0 * annuity - 1000.0, max_relative = 1e-12);
    }

    #[test]
    fn fade_and_replacement_reach_lifecycle_totals() {
        let a = EconomicAssumptions {
            charging: RateBasis::OffPeak,
            horizon_years: 20,
            annual_fade: Fraction::saturating(0.02),
            replacement: Some(Replacement {
                interval_years: 10,
                cost: 500.0,
            }),
            ..bare()
        };
        let result = evaluate_energy(&cycle(1.0, 1.0), &a).unwrap();

        // Capacity averages 0.91 over each ten-year life.
        assert_relative_eq!(
            result.lifecycle.energy_delivered_kwh,
            100.0 * 20.0 * 0.91,
            max_relative = 1e-12
        );
        assert_relative_eq!(result.lifecycle.replacements, 500.0);
        assert_relative_eq!(
            result.lifecycle.operating,
            100.0 * 0.12 * 20.0 * 0.91,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            result.lifecycle.total(),
            1000.0 + 500.0 + 100.0 * 0.12 * 20.0 * 0.91,
            max_relative = 1e-12
        );
    }

    #[test]
    fn reliability_scales_cycled_energy() {
        let full = evaluate_energy(&cycle(2.0, 0.0), &bare()).unwrap();
        let half = evaluate_energy(
            &cycle(2.0, 0.0),
            &EconomicAssumptions {
                nucleation_reliability: Fraction::saturating(0.5),
                ..bare()
            },
        )
        .unwrap();
        assert_relative_eq!(half.breakdown.avoided_energy, full.breakdown.avoided_energy / 2.0);
    }

    #[test]
    fn negative_energy_is_a_configuration_error() {
        let err = evaluate_energy(&cycle(-1.0, 0.0), &bare()).unwrap_err();
        let EconomicsError::Configuration(violation) = err else {
            panic!("expected a configuration error, got {err}");
        };
        assert_eq!(violation.parameter, "delivered energy");
        assert_eq!(violation.bound, Bound::NonNegative);
    }

    #[test]
    fn empty_results_price_nothing() {
        let energy = CycleEnergy::from_results(&[]);
        assert_eq!(energy.delivered, kwh(0.0));
        assert_eq!(energy.purchased, kwh(0.0));
    }

    proptest! {
        #[test]
        fn evaluation_is_idempotent(
            delivered in 0.0..50.0_f64,
            purchased in 0.0..50.0_f64,
            rate in 0.0..0.5_f64,
            discount in 0.0..0.1_f64,
        ) {
            let a = EconomicAssumptions {
                rates: crate::RateSchedule { peak: rate, off_peak: rate / 2.0 },
                charging: RateBasis::OffPeak,
                discount_rate: discount,
                ..EconomicAssumptions::default()
            };
            let energy = cycle(delivered, purchased);
            let first = evaluate_energy(&energy, &a).unwrap();
            let second = evaluate_energy(&energy, &a).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
