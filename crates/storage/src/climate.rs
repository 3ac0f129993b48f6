//! Site conditions the store runs under.

use latent_core::{Fraction, constraint::Bound};
use serde::{Deserialize, Serialize};
use uom::si::{
    f64::{HeatFluxDensity, ThermodynamicTemperature, Time},
    heat_flux_density::watt_per_square_meter,
    ratio::ratio,
    thermodynamic_temperature::degree_celsius,
    time::{hour, second},
};

use crate::ThermalError;

/// Evenly spaced samples starting at time zero.
///
/// Lookups hold each sample until the next one. Before the first sample the
/// first value applies; past the last, the last value holds.
///
/// Deserialization goes through [`TimeSeries::new`], so a loaded series is
/// never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesData<T>", into = "SeriesData<T>")]
#[serde(bound(
    serialize = "T: Clone + Serialize",
    deserialize = "T: Copy + Deserialize<'de>"
))]
pub struct TimeSeries<T> {
    interval: Time,
    values: Vec<T>,
}

/// Wire form of a [`TimeSeries`].
#[derive(Serialize, Deserialize)]
struct SeriesData<T> {
    interval: Time,
    values: Vec<T>,
}

impl<T: Copy> TryFrom<SeriesData<T>> for TimeSeries<T> {
    type Error = ThermalError;

    fn try_from(data: SeriesData<T>) -> Result<Self, Self::Error> {
        Self::new(data.interval, data.values)
    }
}

impl<T> From<TimeSeries<T>> for SeriesData<T> {
    fn from(series: TimeSeries<T>) -> Self {
        Self {
            interval: series.interval,
            values: series.values,
        }
    }
}

impl<T: Copy> TimeSeries<T> {
    /// # Errors
    ///
    /// Returns [`ThermalError::Configuration`] if the interval is not positive
    /// or there are no values.
    pub fn new(interval: Time, values: Vec<T>) -> Result<Self, ThermalError> {
        Bound::StrictlyPositive.check("interval", interval.get::<second>())?;
        Bound::StrictlyPositive.check("values.len", values.len() as f64)?;
        Ok(Self { interval, values })
    }

    /// A series that holds one value forever.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Self {
            interval: Time::new::<hour>(1.0),
            values: vec![value],
        }
    }

    /// The value in effect at `time`.
    #[must_use]
    pub fn at(&self, time: Time) -> T {
        let position = (time / self.interval).get::<ratio>().floor();
        let last = self.values.len() - 1;
        let index = if position.is_nan() || position <= 0.0 {
            0
        } else {
            (position as usize).min(last)
        };
        self.values[index]
    }

    #[must_use]
    pub fn interval(&self) -> Time {
        self.interval
    }

    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Time covered by the samples.
    #[must_use]
    pub fn span(&self) -> Time {
        self.interval * self.values.len() as f64
    }
}

/// Location-dependent external conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateProfile {
    pub location: String,
    pub ambient: TimeSeries<ThermodynamicTemperature>,
    pub irradiance: TimeSeries<HeatFluxDensity>,
    /// Annual heating degree-days, in kelvin-days.
    ///
    /// Carried for callers sizing annual use; the simulators never read it.
    pub heating_degree_days: f64,
}

impl ClimateProfile {
    /// Constant ambient and no sun.
    #[must_use]
    pub fn constant(location: impl Into<String>, ambient: ThermodynamicTemperature) -> Self {
        Self {
            location: location.into(),
            ambient: TimeSeries::constant(ambient),
            irradiance: TimeSeries::constant(HeatFluxDensity::new::<watt_per_square_meter>(0.0)),
            heating_degree_days: 0.0,
        }
    }

    /// A synthetic clear day; time zero is the start of the solar window and
    /// the sun is down once it closes.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Configuration`] for an empty or inverted
    /// window, or a non-positive sampling interval or spread.
    pub fn clear_day(location: impl Into<String>, day: &ClearDay) -> Result<Self, ThermalError> {
        let start = day.window_start.get::<hour>();
        let end = day.window_end.get::<hour>();
        Bound::Above(start).check("window_end", end)?;
        Bound::StrictlyPositive.check("spread", day.spread.get::<hour>())?;
        let interval_h = Bound::StrictlyPositive.check("interval", day.interval.get::<hour>())?;

        // Tolerate rounding in the window/interval quotient.
        let count = ((end - start) / interval_h - 1e-9).ceil() as usize;
        let noon = day.solar_noon.get::<hour>();
        let two_sigma_sq = 2.0 * day.spread.get::<hour>().powi(2);
        let peak = day.peak_irradiance.get::<watt_per_square_meter>() * day.cloud_factor;

        let irradiance = (0..count)
            .map(|i| {
                let h = start + i as f64 * interval_h;
                let w = peak * (-(h - noon).powi(2) / two_sigma_sq).exp();
                HeatFluxDensity::new::<watt_per_square_meter>(w)
            })
            .chain(std::iter::once(HeatFluxDensity::new::<watt_per_square_meter>(0.0)))
            .collect();

        Ok(Self {
            location: location.into(),
            ambient: TimeSeries::constant(day.ambient),
            irradiance: TimeSeries::new(day.interval, irradiance)?,
            heating_degree_days: day.heating_degree_days,
        })
    }

    #[must_use]
    pub fn ambient_at(&self, time: Time) -> ThermodynamicTemperature {
        self.ambient.at(time)
    }

    #[must_use]
    pub fn irradiance_at(&self, time: Time) -> HeatFluxDensity {
        self.irradiance.at(time)
    }
}

/// Parameters of a synthetic clear-sky day.
///
/// Irradiance is a Gaussian centred on solar noon, scaled by a cloud factor,
/// sampled over the solar window. The default is a good January charging day
/// in upstate New York.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearDay {
    pub window_start: Time,
    pub window_end: Time,
    pub solar_noon: Time,
    pub spread: Time,
    pub peak_irradiance: HeatFluxDensity,
    pub cloud_factor: Fraction,
    pub interval: Time,
    pub ambient: ThermodynamicTemperature,
    pub heating_degree_days: f64,
}

impl Default for ClearDay {
    fn default() -> Self {
        Self {
            window_start: Time::new::<hour>(9.0),
            window_end: Time::new::<hour>(15.0),
            solar_noon: Time::new::<hour>(12.0),
            spread: Time::new::<hour>(1.5),
            peak_irradiance: HeatFluxDensity::new::<watt_per_square_meter>(800.0),
            cloud_factor: Fraction::saturating(0.85),
            interval: Time::new::<second>(300.0),
            ambient: ThermodynamicTemperature::new::<degree_celsius>(-2.0),
            heating_degree_days: 6756.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn series_holds_values_between_samples() {
        let series = TimeSeries::new(Time::new::<second>(10.0), vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(series.at(Time::new::<second>(-5.0)), 1.0);
        assert_eq!(series.at(Time::new::<second>(9.9)), 1.0);
        assert_eq!(series.at(Time::new::<second>(10.0)), 2.0);
        assert_eq!(series.at(Time::new::<second>(500.0)), 3.0);
        assert_relative_eq!(series.span().get::<second>(), 30.0);
    }

    #[test]
    fn empty_series_is_rejected() {
        let err = TimeSeries::<f64>::new(Time::new::<second>(10.0), vec![]).unwrap_err();
        assert!(matches!(err, ThermalError::Configuration(v) if v.parameter == "values.len"));
    }

    #[test]
    fn loaded_series_is_validated() {
        let empty = r#"{ "interval": 60.0, "values": [] }"#;
        assert!(serde_json::from_str::<TimeSeries<f64>>(empty).is_err());

        let still = r#"{ "interval": 0.0, "values": [1.0] }"#;
        assert!(serde_json::from_str::<TimeSeries<f64>>(still).is_err());

        let ok = r#"{ "interval": 60.0, "values": [1.0, 2.0] }"#;
        let series: TimeSeries<f64> = serde_json::from_str(ok).unwrap();
        assert_eq!(series.at(Time::new::<second>(90.0)), 2.0);
    }

    #[test]
    fn clear_day_peaks_at_noon() {
        let climate = ClimateProfile::clear_day("Syracuse, NY", &ClearDay::default()).unwrap();

        assert_eq!(climate.irradiance.values().len(), 73);
        let noon = climate.irradiance_at(Time::new::<hour>(3.0));
        assert_relative_eq!(noon.get::<watt_per_square_meter>(), 680.0, epsilon = 1e-9);

        let morning = climate.irradiance_at(Time::new::<hour>(0.0));
        let expected = 680.0 * (-9.0_f64 / 4.5).exp();
        assert_relative_eq!(morning.get::<watt_per_square_meter>(), expected, epsilon = 1e-9);

        let night = climate.irradiance_at(Time::new::<hour>(20.0));
        assert_eq!(night.get::<watt_per_square_meter>(), 0.0);

        assert_relative_eq!(
            climate.ambient_at(Time::new::<hour>(2.0)).get::<degree_celsius>(),
            -2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn inverted_window_is_rejected() {
        let day = ClearDay {
            window_end: Time::new::<hour>(8.0),
            ..ClearDay::default()
        };
        assert!(ClimateProfile::clear_day("nowhere", &day).is_err());
    }
}
