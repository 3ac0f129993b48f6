use latent_core::Fraction;
use serde::{Deserialize, Serialize};
use uom::si::{
    area::square_meter,
    f64::{Area, Power, ThermodynamicTemperature, Time},
    heat_flux_density::watt_per_square_meter,
    power::watt,
    thermodynamic_temperature::degree_celsius,
};

use crate::{ClimateProfile, PhaseState, TimeSeries};

/// Where charging heat comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeatSource {
    /// An electric element at fixed power.
    Resistive(Power),
    /// A solar thermal collector loop driven by the climate's irradiance.
    Solar(SolarCollector),
    /// An explicit power profile.
    Profile(TimeSeries<Power>),
}

impl HeatSource {
    /// Heat delivered to the store at `time`.
    #[must_use]
    pub fn power(&self, time: Time, state: &PhaseState, climate: &ClimateProfile) -> Power {
        match self {
            HeatSource::Resistive(power) => *power,
            HeatSource::Solar(collector) => collector.output(time, state, climate),
            HeatSource::Profile(series) => series.at(time),
        }
    }
}

/// Collector array sized by aperture area and a fixed efficiency.
///
/// Output is `irradiance × efficiency × area` while the store is below the
/// collector's stagnation temperature, and nothing once it reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarCollector {
    pub area: Area,
    pub efficiency: Fraction,
    pub stagnation_temperature: ThermodynamicTemperature,
}

impl SolarCollector {
    #[must_use]
    pub fn output(&self, time: Time, state: &PhaseState, climate: &ClimateProfile) -> Power {
        if state.temperature() >= self.stagnation_temperature {
            return Power::new::<watt>(0.0);
        }
        let irradiance = climate
            .irradiance_at(time)
            .get::<watt_per_square_meter>()
            .max(0.0);
        Power::new::<watt>(irradiance * self.efficiency * self.area.get::<square_meter>())
    }
}

impl Default for SolarCollector {
    /// Evacuated-tube array matched to the reference store.
    fn default() -> Self {
        Self {
            area: Area::new::<square_meter>(12.0),
            efficiency: Fraction::saturating(0.70),
            stagnation_temperature: ThermodynamicTemperature::new::<degree_celsius>(95.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::{f64::HeatFluxDensity, time::second};

    use super::*;
    use crate::{ThermalSystem, ThermalSystemConfig};

    fn sunny() -> ClimateProfile {
        let mut climate = ClimateProfile::constant(
            "test",
            ThermodynamicTemperature::new::<degree_celsius>(0.0),
        );
        climate.irradiance =
            TimeSeries::constant(HeatFluxDensity::new::<watt_per_square_meter>(500.0));
        climate
    }

    #[test]
    fn collector_output_scales_with_irradiance() {
        let system = ThermalSystem::new(ThermalSystemConfig::default()).unwrap();
        let cold = system
            .solid_state(ThermodynamicTemperature::new::<degree_celsius>(20.0))
            .unwrap();
        let source = HeatSource::Solar(SolarCollector::default());

        let power = source.power(Time::new::<second>(0.0), &cold, &sunny());
        assert_relative_eq!(power.get::<watt>(), 500.0 * 0.7 * 12.0, epsilon = 1e-9);
    }

    #[test]
    fn collector_stops_at_stagnation() {
        let system = ThermalSystem::new(ThermalSystemConfig::default()).unwrap();
        let hot = system.liquid_state(ThermodynamicTemperature::new::<degree_celsius>(96.0));
        let collector = SolarCollector::default();
        assert_eq!(
            collector.output(Time::new::<second>(0.0), &hot, &sunny()),
            Power::new::<watt>(0.0)
        );
    }

    #[test]
    fn profile_follows_series() {
        let system = ThermalSystem::new(ThermalSystemConfig::default()).unwrap();
        let state = system.melting_state(Fraction::new(0.5).unwrap());
        let series = TimeSeries::new(
            Time::new::<second>(60.0),
            vec![Power::new::<watt>(100.0), Power::new::<watt>(300.0)],
        )
        .unwrap();
        let source = HeatSource::Profile(series);
        let climate = sunny();

        assert_eq!(
            source.power(Time::new::<second>(90.0), &state, &climate),
            Power::new::<watt>(300.0)
        );
    }
}
