//! Market sizing, unit-volume projections and pricing.
//!
//! A [`CustomerSegment`] pairs addressable units per year with an adoption
//! curve. [`project`] turns a set of segments into penetration-weighted unit
//! volumes, and [`PricingScenario`]s turn a projection into revenue. The
//! [`PriceBuildUp`] takes a manufacturing cost to an installed retail price.

use std::ops::RangeInclusive;

use latent_core::{Fraction, constraint::Bound};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::EconomicsError;

/// Values by calendar year, held from each entry until the next.
///
/// Years before the first entry have no value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(i32, T)>", into = "Vec<(i32, T)>")]
#[serde(bound(
    serialize = "T: Clone + Serialize",
    deserialize = "T: Deserialize<'de>"
))]
pub struct YearTable<T> {
    entries: Vec<(i32, T)>,
}

impl<T> YearTable<T> {
    /// Builds a table from entries in strictly increasing year order.
    ///
    /// # Errors
    ///
    /// Returns [`EconomicsError::UnsortedTable`] naming the first year that is
    /// not after its predecessor.
    pub fn new(entries: Vec<(i32, T)>) -> Result<Self, EconomicsError> {
        if let Some(pair) = entries.windows(2).find(|pair| pair[1].0 <= pair[0].0) {
            return Err(EconomicsError::UnsortedTable {
                parameter: "year table",
                year: pair[1].0,
            });
        }
        Ok(Self { entries })
    }

    /// The value in force in `year`.
    #[must_use]
    pub fn at(&self, year: i32) -> Option<&T> {
        let index = self.entries.partition_point(|(y, _)| *y <= year);
        index.checked_sub(1).map(|i| &self.entries[i].1)
    }

    #[must_use]
    pub fn entries(&self) -> &[(i32, T)] {
        &self.entries
    }
}

impl<T> TryFrom<Vec<(i32, T)>> for YearTable<T> {
    type Error = EconomicsError;

    fn try_from(entries: Vec<(i32, T)>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl<T> From<YearTable<T>> for Vec<(i32, T)> {
    fn from(table: YearTable<T>) -> Self {
        table.entries
    }
}

/// Share of a segment that has adopted by a given year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdoptionCurve {
    /// `saturation / (1 + exp(-steepness × (year - midpoint)))`.
    Logistic {
        saturation: Fraction,
        midpoint: f64,
        steepness: f64,
    },
    /// Explicit penetration by year; zero before the first entry.
    Table(YearTable<Fraction>),
}

impl AdoptionCurve {
    #[must_use]
    pub fn penetration(&self, year: i32) -> Fraction {
        match self {
            AdoptionCurve::Logistic {
                saturation,
                midpoint,
                steepness,
            } => {
                let x = -steepness * (f64::from(year) - midpoint);
                Fraction::saturating(saturation.get() / (1.0 + x.exp()))
            }
            AdoptionCurve::Table(table) => table.at(year).copied().unwrap_or(Fraction::ZERO),
        }
    }
}

/// Addressable units per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressable {
    /// Compound growth from a base year.
    Growing {
        base_year: i32,
        units: f64,
        growth_rate: f64,
    },
    /// Explicit units by year; zero before the first entry.
    Table(YearTable<f64>),
}

impl Addressable {
    #[must_use]
    pub fn units(&self, year: i32) -> f64 {
        match self {
            Addressable::Growing {
                base_year,
                units,
                growth_rate,
            } => {
                if year < *base_year {
                    0.0
                } else {
                    units * (1.0 + growth_rate).powi(year - base_year)
                }
            }
            Addressable::Table(table) => table.at(year).copied().unwrap_or(0.0),
        }
    }

    fn validate(&self) -> Result<(), EconomicsError> {
        match self {
            Addressable::Growing {
                units, growth_rate, ..
            } => {
                Bound::NonNegative.check("addressable units", *units)?;
                Bound::Above(-1.0).check("growth rate", *growth_rate)?;
            }
            Addressable::Table(table) => {
                for (_, units) in table.entries() {
                    Bound::NonNegative.check("addressable units", *units)?;
                }
            }
        }
        Ok(())
    }
}

/// A group of customers with a shared value proposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerSegment {
    pub name: String,
    pub addressable: Addressable,
    pub adoption: AdoptionCurve,
    /// Highest installed price the segment accepts, in dollars.
    pub willingness_to_pay: f64,
}

/// One segment's share of a projected year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentVolume {
    pub segment: String,
    pub addressable: f64,
    pub penetration: Fraction,
    pub units: f64,
}

/// Projected volume in one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearProjection {
    pub year: i32,
    pub segments: Vec<SegmentVolume>,
}

impl YearProjection {
    #[must_use]
    pub fn addressable(&self) -> f64 {
        self.segments.iter().map(|s| s.addressable).sum()
    }

    #[must_use]
    pub fn units(&self) -> f64 {
        self.segments.iter().map(|s| s.units).sum()
    }

    /// Overall penetration, or zero with nothing addressable.
    #[must_use]
    pub fn penetration(&self) -> Fraction {
        let addressable = self.addressable();
        if addressable > 0.0 {
            Fraction::saturating(self.units() / addressable)
        } else {
            Fraction::ZERO
        }
    }
}

/// Penetration-weighted unit volumes, year by year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketProjection {
    pub years: Vec<YearProjection>,
}

impl MarketProjection {
    #[must_use]
    pub fn year(&self, year: i32) -> Option<&YearProjection> {
        self.years.iter().find(|y| y.year == year)
    }

    #[must_use]
    pub fn total_units(&self) -> f64 {
        self.years.iter().map(YearProjection::units).sum()
    }
}

/// Projects unit volumes over `years`.
///
/// With an `installed_price`, segments whose willingness to pay is below it
/// contribute nothing.
///
/// # Errors
///
/// Returns [`EconomicsError::Configuration`] for negative addressable units,
/// a growth rate at or below -100 % or a negative willingness to pay.
pub fn project(
    segments: &[CustomerSegment],
    years: RangeInclusive<i32>,
    installed_price: Option<f64>,
) -> Result<MarketProjection, EconomicsError> {
    for segment in segments {
        segment.addressable.validate()?;
        Bound::NonNegative.check("willingness to pay", segment.willingness_to_pay)?;
    }

    let years: Vec<YearProjection> = years
        .map(|year| YearProjection {
            year,
            segments: segments
                .iter()
                .map(|segment| {
                    let addressable = segment.addressable.units(year);
                    let priced_out =
                        installed_price.is_some_and(|price| price > segment.willingness_to_pay);
                    let penetration = if priced_out {
                        Fraction::ZERO
                    } else {
                        segment.adoption.penetration(year)
                    };
                    SegmentVolume {
                        segment: segment.name.clone(),
                        addressable,
                        penetration,
                        units: addressable * penetration,
                    }
                })
                .collect(),
        })
        .collect();

    debug!(
        segments = segments.len(),
        years = years.len(),
        "projected market volume"
    );

    Ok(MarketProjection { years })
}

/// A price point with the share of the market it is expected to win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingScenario {
    pub name: String,
    pub retail_price: f64,
    pub installation: f64,
    /// Manufacturing cost per unit.
    pub unit_cost: f64,
    pub market_share: Fraction,
}

/// Revenue from a scenario in one year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioYear {
    pub year: i32,
    pub units: f64,
    pub revenue: f64,
    pub gross_profit: f64,
}

impl PricingScenario {
    #[must_use]
    pub fn installed_price(&self) -> f64 {
        self.retail_price + self.installation
    }

    #[must_use]
    pub fn unit_margin(&self) -> f64 {
        self.retail_price - self.unit_cost
    }

    /// Applies the scenario's share to each projected year.
    #[must_use]
    pub fn apply(&self, projection: &MarketProjection) -> Vec<ScenarioYear> {
        projection
            .years
            .iter()
            .map(|year| {
                let units = year.units() * self.market_share;
                ScenarioYear {
                    year: year.year,
                    units,
                    revenue: units * self.retail_price,
                    gross_profit: units * self.unit_margin(),
                }
            })
            .collect()
    }
}

/// Overhead and channel margins between the factory and the customer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceBuildUp {
    /// Overhead as a share of manufacturing cost.
    pub overhead_rate: f64,
    /// Distributor margin on its selling price.
    pub distributor_margin: f64,
    /// Installer margin on the retail price.
    pub dealer_margin: f64,
    pub installation: f64,
}

impl Default for PriceBuildUp {
    fn default() -> Self {
        Self {
            overhead_rate: 0.40,
            distributor_margin: 0.25,
            dealer_margin: 0.30,
            installation: 1200.0,
        }
    }
}

/// Each price level of a [`PriceBuildUp`], in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceStack {
    pub manufacturing: f64,
    pub overhead: f64,
    pub wholesale: f64,
    pub distributor: f64,
    pub retail: f64,
    pub installed: f64,
}

impl PriceBuildUp {
    /// Builds the price stack for a manufacturing cost.
    ///
    /// # Errors
    ///
    /// Returns [`EconomicsError::Configuration`] for a negative cost or
    /// overhead, or a margin outside `[0, 1)`.
    pub fn price(&self, manufacturing_cost: f64) -> Result<PriceStack, EconomicsError> {
        let manufacturing = Bound::NonNegative.check("manufacturing cost", manufacturing_cost)?;
        Bound::NonNegative.check("overhead rate", self.overhead_rate)?;
        for (parameter, margin) in [
            ("distributor margin", self.distributor_margin),
            ("dealer margin", self.dealer_margin),
        ] {
            Bound::NonNegative.check(parameter, margin)?;
            Bound::Below(1.0).check(parameter, margin)?;
        }
        Bound::NonNegative.check("installation", self.installation)?;

        let overhead = manufacturing * self.overhead_rate;
        let wholesale = manufacturing + overhead;
        let distributor = wholesale / (1.0 - self.distributor_margin);
        let retail = distributor / (1.0 - self.dealer_margin);

        Ok(PriceStack {
            manufacturing,
            overhead,
            wholesale,
            distributor,
            retail,
            installed: retail + self.installation,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::*;

    fn share(value: f64) -> Fraction {
        Fraction::new(value).unwrap()
    }

    fn ramp() -> AdoptionCurve {
        AdoptionCurve::Table(
            YearTable::new(vec![
                (2025, share(0.02)),
                (2026, share(0.04)),
                (2027, share(0.07)),
                (2028, share(0.12)),
                (2029, share(0.18)),
                (2030, share(0.25)),
            ])
            .unwrap(),
        )
    }

    fn retrofits() -> CustomerSegment {
        CustomerSegment {
            name: "cold-climate retrofit".to_owned(),
            addressable: Addressable::Table(
                YearTable::new(vec![(2025, 180_000.0), (2028, 450_000.0), (2030, 760_000.0)])
                    .unwrap(),
            ),
            adoption: ramp(),
            willingness_to_pay: 5000.0,
        }
    }

    fn new_homes() -> CustomerSegment {
        CustomerSegment {
            name: "new all-electric".to_owned(),
            addressable: Addressable::Growing {
                base_year: 2025,
                units: 85_000.0,
                growth_rate: 0.5,
            },
            adoption: ramp(),
            willingness_to_pay: 6500.0,
        }
    }

    #[test]
    fn year_table_holds_values_between_entries() {
        let table = YearTable::new(vec![(2025, 1.0), (2028, 2.0)]).unwrap();
        assert_eq!(table.at(2024), None);
        assert_eq!(table.at(2025), Some(&1.0));
        assert_eq!(table.at(2027), Some(&1.0));
        assert_eq!(table.at(2031), Some(&2.0));
    }

    #[test]
    fn unsorted_years_are_rejected() {
        let err = YearTable::new(vec![(2026, 1.0), (2025, 2.0)]).unwrap_err();
        assert_eq!(
            err,
            EconomicsError::UnsortedTable {
                parameter: "year table",
                year: 2025
            }
        );
    }

    #[test]
    fn projection_weights_units_by_penetration() {
        let projection = project(&[retrofits(), new_homes()], 2025..=2030, None).unwrap();
        assert_eq!(projection.years.len(), 6);

        let first = projection.year(2025).unwrap();
        assert_relative_eq!(first.addressable(), 180_000.0 + 85_000.0);
        assert_relative_eq!(first.units(), 0.02 * (180_000.0 + 85_000.0), max_relative = 1e-12);

        let y2027 = projection.year(2027).unwrap();
        assert_relative_eq!(y2027.segments[0].addressable, 180_000.0);
        assert_relative_eq!(y2027.segments[1].addressable, 85_000.0 * 2.25, max_relative = 1e-12);
        assert_relative_eq!(y2027.penetration().get(), 0.07, max_relative = 1e-12);

        let units: Vec<f64> = projection.years.iter().map(YearProjection::units).collect();
        assert!(units.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn price_above_willingness_to_pay_excludes_a_segment() {
        let projection =
            project(&[retrofits(), new_homes()], 2030..=2030, Some(6000.0)).unwrap();
        let year = projection.year(2030).unwrap();

        assert_eq!(year.segments[0].units, 0.0);
        assert!(year.segments[1].units > 0.0);
    }

    #[test]
    fn pricing_scenario_revenue() {
        let projection = project(&[retrofits()], 2030..=2030, None).unwrap();
        let scenario = PricingScenario {
            name: "value".to_owned(),
            retail_price: 3500.0,
            installation: 1000.0,
            unit_cost: 1400.0,
            market_share: share(0.18),
        };

        let years = scenario.apply(&projection);
        let units = 760_000.0 * 0.25 * 0.18;
        assert_relative_eq!(years[0].units, units, max_relative = 1e-12);
        assert_relative_eq!(years[0].revenue, units * 3500.0, max_relative = 1e-12);
        assert_relative_eq!(years[0].gross_profit, units * 2100.0, max_relative = 1e-12);
        assert_relative_eq!(scenario.installed_price(), 4500.0);
    }

    #[test]
    fn price_build_up_through_the_channel() {
        let stack = PriceBuildUp::default().price(1000.0).unwrap();

        assert_relative_eq!(stack.wholesale, 1400.0);
        assert_relative_eq!(stack.distributor, 1400.0 / 0.75, max_relative = 1e-12);
        assert_relative_eq!(stack.retail, 1400.0 / 0.75 / 0.7, max_relative = 1e-12);
        assert_relative_eq!(stack.installed, stack.retail + 1200.0);
    }

    #[test]
    fn a_full_margin_is_rejected() {
        let build_up = PriceBuildUp {
            dealer_margin: 1.0,
            ..PriceBuildUp::default()
        };
        let err = build_up.price(1000.0).unwrap_err();
        assert!(matches!(err, EconomicsError::Configuration(v) if v.parameter == "dealer margin"));
    }

    #[test]
    fn logistic_is_half_saturated_at_midpoint() {
        let curve = AdoptionCurve::Logistic {
            saturation: share(0.3),
            midpoint: 2030.0,
            steepness: 0.8,
        };
        assert_relative_eq!(curve.penetration(2030).get(), 0.15, max_relative = 1e-12);
        assert!(curve.penetration(2020) < curve.penetration(2040));
    }

    proptest! {
        #[test]
        fn logistic_penetration_never_falls(
            saturation in 0.0..=1.0_f64,
            steepness in 0.0..3.0_f64,
            year in 2000..2060_i32,
        ) {
            let curve = AdoptionCurve::Logistic {
                saturation: share(saturation),
                midpoint: 2030.0,
                steepness,
            };
            prop_assert!(curve.penetration(year + 1) >= curve.penetration(year));
            prop_assert!(curve.penetration(year).get() <= saturation);
        }
    }
}
