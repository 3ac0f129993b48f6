//! Heat exchange between a circulating fluid and an isothermal PCM node.
//!
//! The PCM side is treated as a single temperature, so the fluid relaxes
//! exponentially toward it along the exchanger:
//!
//! ```text
//! T_out = T_pcm − (T_pcm − T_in) · exp(−UA / (ṁ · c_p))
//! Q     = ṁ · c_p · (T_out − T_in) = UA · LMTD
//! ```

use uom::si::{
    f64::{MassRate, Power, SpecificHeatCapacity, ThermalConductance, ThermodynamicTemperature},
    mass_rate::kilogram_per_second,
    power::watt,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermal_conductance::watt_per_kelvin,
    thermodynamic_temperature::kelvin,
};

/// Result of passing fluid through the exchanger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exchange {
    /// Heat picked up by the fluid, never negative.
    pub heat_flow: Power,
    pub outlet: ThermodynamicTemperature,
}

/// Extracts heat from a PCM node into a fluid stream.
///
/// A store at or below the inlet temperature delivers nothing, and the fluid
/// leaves at its inlet temperature.
#[must_use]
pub fn extract(
    ua: ThermalConductance,
    flow: MassRate,
    fluid_specific_heat: SpecificHeatCapacity,
    pcm: ThermodynamicTemperature,
    inlet: ThermodynamicTemperature,
) -> Exchange {
    let capacitance_rate =
        flow.get::<kilogram_per_second>() * fluid_specific_heat.get::<joule_per_kilogram_kelvin>();
    let t_pcm = pcm.get::<kelvin>();
    let t_in = inlet.get::<kelvin>();

    if t_pcm <= t_in || capacitance_rate <= 0.0 {
        return Exchange {
            heat_flow: Power::new::<watt>(0.0),
            outlet: inlet,
        };
    }

    let ntu = ua.get::<watt_per_kelvin>() / capacitance_rate;
    let t_out = t_pcm - (t_pcm - t_in) * (-ntu).exp();

    Exchange {
        heat_flow: Power::new::<watt>(capacitance_rate * (t_out - t_in)),
        outlet: ThermodynamicTemperature::new::<kelvin>(t_out),
    }
}

/// Log-mean temperature difference between a fluid and an isothermal node.
///
/// Falls back to the arithmetic mean when both ends have the same
/// difference. Returns zero if either end has no driving difference.
#[must_use]
pub fn lmtd(
    inlet: ThermodynamicTemperature,
    outlet: ThermodynamicTemperature,
    node: ThermodynamicTemperature,
) -> f64 {
    let dt_in = node.get::<kelvin>() - inlet.get::<kelvin>();
    let dt_out = node.get::<kelvin>() - outlet.get::<kelvin>();

    if dt_in <= 0.0 || dt_out <= 0.0 {
        return 0.0;
    }
    if (dt_in - dt_out).abs() < 1e-12 {
        return 0.5 * (dt_in + dt_out);
    }
    (dt_in - dt_out) / (dt_in / dt_out).ln()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::thermodynamic_temperature::degree_celsius;

    use super::*;

    fn celsius(c: f64) -> ThermodynamicTemperature {
        ThermodynamicTemperature::new::<degree_celsius>(c)
    }

    fn water() -> SpecificHeatCapacity {
        SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4186.0)
    }

    #[test]
    fn heat_equals_ua_times_lmtd() {
        let ua = ThermalConductance::new::<watt_per_kelvin>(111.7);
        let flow = MassRate::new::<kilogram_per_second>(0.074);
        let exchange = extract(ua, flow, water(), celsius(58.0), celsius(40.0));

        let lmtd = lmtd(celsius(40.0), exchange.outlet, celsius(58.0));
        assert_relative_eq!(
            exchange.heat_flow.get::<watt>(),
            111.7 * lmtd,
            max_relative = 1e-9
        );
        assert!(exchange.outlet < celsius(58.0));
        assert!(exchange.outlet > celsius(40.0));
    }

    #[test]
    fn small_ua_gives_small_power() {
        // Bench-scale pouch: power stays well under a 100 W cutoff.
        let ua = ThermalConductance::new::<watt_per_kelvin>(2.15);
        let flow = MassRate::new::<kilogram_per_second>(0.074);
        let exchange = extract(ua, flow, water(), celsius(58.0), celsius(40.0));

        let power = exchange.heat_flow.get::<watt>();
        assert!(power < 2.15 * 18.0);
        assert!(power > 2.15 * 17.9);
    }

    #[test]
    fn cold_store_delivers_nothing() {
        let ua = ThermalConductance::new::<watt_per_kelvin>(111.7);
        let flow = MassRate::new::<kilogram_per_second>(0.074);
        let exchange = extract(ua, flow, water(), celsius(35.0), celsius(40.0));

        assert_eq!(exchange.heat_flow, Power::new::<watt>(0.0));
        assert_eq!(exchange.outlet, celsius(40.0));
    }

    #[test]
    fn lmtd_of_equal_ends_is_the_difference() {
        assert_relative_eq!(lmtd(celsius(40.0), celsius(40.0), celsius(50.0)), 10.0, epsilon = 1e-9);
    }
}
