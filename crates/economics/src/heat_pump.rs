//! Heat-pump assist: electricity a store saves by covering heat-pump load.

use latent_core::constraint::Bound;
use serde::{Deserialize, Serialize};
use uom::si::{
    energy::kilowatt_hour,
    f64::{Energy, ThermodynamicTemperature},
    thermodynamic_temperature::{degree_celsius, degree_fahrenheit},
};

use crate::EconomicsError;

/// Heat-pump COP as a piecewise-linear function of outdoor temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CopCurve {
    pub rated_cop: f64,
    pub rated_outdoor: ThermodynamicTemperature,
    /// COP gained per kelvin above the rating point.
    pub slope_above: f64,
    /// COP lost per kelvin below the rating point.
    pub slope_below: f64,
    pub min_cop: f64,
    pub max_cop: f64,
}

impl Default for CopCurve {
    fn default() -> Self {
        Self {
            rated_cop: 3.5,
            rated_outdoor: ThermodynamicTemperature::new::<degree_celsius>(8.0),
            slope_above: 0.05,
            slope_below: 0.125,
            min_cop: 1.3,
            max_cop: 4.5,
        }
    }
}

impl CopCurve {
    #[must_use]
    pub fn cop(&self, outdoor: ThermodynamicTemperature) -> f64 {
        let offset =
            outdoor.get::<degree_celsius>() - self.rated_outdoor.get::<degree_celsius>();
        let slope = if offset >= 0.0 {
            self.slope_above
        } else {
            self.slope_below
        };
        (self.rated_cop + slope * offset).clamp(self.min_cop, self.max_cop)
    }

    fn validate(&self) -> Result<(), EconomicsError> {
        Bound::StrictlyPositive.check("minimum COP", self.min_cop)?;
        Bound::AtMost(self.max_cop).check("minimum COP", self.min_cop)?;
        Bound::NonNegative.check("COP slope above rating", self.slope_above)?;
        Bound::NonNegative.check("COP slope below rating", self.slope_below)?;
        Ok(())
    }
}

/// A stretch of the year with a typical outdoor temperature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub name: String,
    pub average_outdoor: ThermodynamicTemperature,
    /// Store cycles completed in the season.
    pub cycles: f64,
}

impl Season {
    pub fn new(
        name: impl Into<String>,
        average_outdoor: ThermodynamicTemperature,
        cycles: f64,
    ) -> Self {
        Self {
            name: name.into(),
            average_outdoor,
            cycles,
        }
    }

    /// Shoulder seasons of a cold climate with a solar-charged store, plus
    /// sunny winter days.
    #[must_use]
    pub fn shoulder_seasons() -> Vec<Self> {
        let fahrenheit = |f: f64| ThermodynamicTemperature::new::<degree_fahrenheit>(f);
        vec![
            Self::new("spring", fahrenheit(42.0), 64.0),
            Self::new("fall", fahrenheit(48.0), 60.0),
            Self::new("winter", fahrenheit(28.0), 15.0),
        ]
    }
}

/// Savings in one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalSavings {
    pub season: String,
    pub cop: f64,
    pub cycles: f64,
    pub thermal_kwh: f64,
    pub avoided_electric_kwh: f64,
    pub savings: f64,
}

/// Seasonal breakdown and annual totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistSummary {
    pub seasons: Vec<SeasonalSavings>,
}

impl AssistSummary {
    #[must_use]
    pub fn cycles(&self) -> f64 {
        self.seasons.iter().map(|s| s.cycles).sum()
    }

    #[must_use]
    pub fn thermal_kwh(&self) -> f64 {
        self.seasons.iter().map(|s| s.thermal_kwh).sum()
    }

    #[must_use]
    pub fn avoided_electric_kwh(&self) -> f64 {
        self.seasons.iter().map(|s| s.avoided_electric_kwh).sum()
    }

    #[must_use]
    pub fn savings(&self) -> f64 {
        self.seasons.iter().map(|s| s.savings).sum()
    }

    /// Annual heat over annual displaced electricity.
    ///
    /// Returns `None` when nothing is delivered.
    #[must_use]
    pub fn seasonal_cop(&self) -> Option<f64> {
        let electric = self.avoided_electric_kwh();
        (electric > 0.0).then(|| self.thermal_kwh() / electric)
    }
}

/// Prices the heat-pump electricity a store displaces, season by season.
///
/// Each cycle delivers `delivered_per_cycle` of heat that the heat pump
/// would otherwise have produced at its seasonal COP, bought at `peak_rate`.
///
/// # Errors
///
/// Returns [`EconomicsError::Configuration`] for a negative energy, rate or
/// cycle count, or an inconsistent COP curve.
pub fn seasonal_savings(
    curve: &CopCurve,
    delivered_per_cycle: Energy,
    peak_rate: f64,
    seasons: &[Season],
) -> Result<AssistSummary, EconomicsError> {
    curve.validate()?;
    let per_cycle = Bound::NonNegative.check(
        "delivered per cycle",
        delivered_per_cycle.get::<kilowatt_hour>(),
    )?;
    Bound::NonNegative.check("peak rate", peak_rate)?;

    let seasons = seasons
        .iter()
        .map(|season| {
            let cycles = Bound::NonNegative.check("season cycles", season.cycles)?;
            let cop = curve.cop(season.average_outdoor);
            let thermal_kwh = per_cycle * cycles;
            let avoided_electric_kwh = thermal_kwh / cop;
            Ok(SeasonalSavings {
                season: season.name.clone(),
                cop,
                cycles,
                thermal_kwh,
                avoided_electric_kwh,
                savings: avoided_electric_kwh * peak_rate,
            })
        })
        .collect::<Result<Vec<_>, EconomicsError>>()?;

    Ok(AssistSummary { seasons })
}
