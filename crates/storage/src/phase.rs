//! Bulk phase state of the PCM and the energy balance that advances it.
//!
//! The store is a single lumped node. Heat entering or leaving it is split
//! across up to three regimes within one step, in order: sensible heat of the
//! solid, latent heat at the transition temperature, sensible heat of the
//! liquid. Energy left over once one regime saturates carries into the next,
//! so the balance is exact regardless of where the step boundary falls.
//!
//! Liquid without crystals never solidifies on its own. Cooling it below the
//! transition temperature leaves it supercooled until a trigger starts a
//! crystallization front, which then converts liquid to solid at a bounded
//! rate and releases latent heat into the bulk.

use latent_core::{Fraction, StepIntegrable};
use serde::Serialize;
use uom::si::{
    available_energy::joule_per_kilogram,
    energy::joule,
    f64::{Energy, Mass, Power, ThermodynamicTemperature, Time},
    mass::kilogram,
    power::watt,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermodynamic_temperature::kelvin,
    time::second,
};

use crate::PcmMaterial;

/// Snapshot of the bulk PCM.
///
/// A supercooled state is always fully liquid and below the transition
/// temperature. States are produced by [`ThermalSystem`](crate::ThermalSystem)
/// constructors and by advancing existing states, never assembled by hand.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseState {
    temperature: ThermodynamicTemperature,
    liquid_fraction: Fraction,
    energy_stored: Energy,
    supercooled: bool,
    crystallizing: bool,
}

impl PhaseState {
    pub(crate) fn from_parts(
        temperature_k: f64,
        liquid_fraction: Fraction,
        energy_j: f64,
        supercooled: bool,
        crystallizing: bool,
    ) -> Self {
        Self {
            temperature: ThermodynamicTemperature::new::<kelvin>(temperature_k),
            liquid_fraction,
            energy_stored: Energy::new::<joule>(energy_j),
            supercooled,
            crystallizing,
        }
    }

    /// Bulk temperature.
    #[must_use]
    pub fn temperature(&self) -> ThermodynamicTemperature {
        self.temperature
    }

    /// Share of the PCM that is liquid: 0 is fully solid, 1 fully liquid.
    #[must_use]
    pub fn liquid_fraction(&self) -> Fraction {
        self.liquid_fraction
    }

    /// Enthalpy above the solid reference state.
    #[must_use]
    pub fn energy_stored(&self) -> Energy {
        self.energy_stored
    }

    #[must_use]
    pub fn is_supercooled(&self) -> bool {
        self.supercooled
    }

    /// Whether a crystallization front is active.
    #[must_use]
    pub fn is_crystallizing(&self) -> bool {
        self.crystallizing
    }

    pub(crate) fn temperature_k(&self) -> f64 {
        self.temperature.get::<kelvin>()
    }

    pub(crate) fn energy_j(&self) -> f64 {
        self.energy_stored.get::<joule>()
    }

    /// Returns the state with a crystallization front started.
    pub(crate) fn nucleated(mut self) -> Self {
        self.supercooled = false;
        self.crystallizing = true;
        self
    }

    /// Returns the state at a new temperature on the liquid branch.
    pub(crate) fn with_liquid_temperature(mut self, temperature_k: f64, melt_k: f64) -> Self {
        self.temperature = ThermodynamicTemperature::new::<kelvin>(temperature_k);
        self.supercooled = temperature_k < melt_k;
        self
    }

    pub(crate) fn with_energy(mut self, energy_j: f64) -> Self {
        self.energy_stored = Energy::new::<joule>(energy_j);
        self
    }
}

/// The lumped body of PCM that absorbs a heat balance.
///
/// Holds the material constants in SI units so a step does no unit
/// conversions beyond its inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcmBody {
    mass: f64,
    cp_solid: f64,
    cp_liquid: f64,
    latent_heat: f64,
    melt: f64,
    crystallization_rate: f64,
}

impl PcmBody {
    pub(crate) fn new(mass: Mass, material: &PcmMaterial, crystallization_rate: Power) -> Self {
        Self {
            mass: mass.get::<kilogram>(),
            cp_solid: material
                .specific_heat_solid
                .get::<joule_per_kilogram_kelvin>(),
            cp_liquid: material
                .specific_heat_liquid
                .get::<joule_per_kilogram_kelvin>(),
            latent_heat: material.latent_heat.get::<joule_per_kilogram>(),
            melt: material.phase_change_temperature.get::<kelvin>(),
            crystallization_rate: crystallization_rate.get::<watt>(),
        }
    }

    /// Transition temperature in kelvin.
    pub(crate) fn melt_k(&self) -> f64 {
        self.melt
    }

    /// Heat capacity of the fully solid body in J/K.
    pub(crate) fn solid_capacity(&self) -> f64 {
        self.mass * self.cp_solid
    }

    /// Heat capacity of the fully liquid body in J/K.
    pub(crate) fn liquid_capacity(&self) -> f64 {
        self.mass * self.cp_liquid
    }

    /// Latent heat of the whole body in J.
    pub(crate) fn latent_capacity(&self) -> f64 {
        self.mass * self.latent_heat
    }

    /// Smallest heat capacity of either phase in J/K.
    pub(crate) fn min_capacity(&self) -> f64 {
        self.solid_capacity().min(self.liquid_capacity())
    }

    /// Enthalpy of an equilibrium state relative to solid at `reference_k`.
    ///
    /// Liquid below the transition temperature follows the liquid branch.
    pub(crate) fn enthalpy(&self, temperature_k: f64, liquid_fraction: f64, reference_k: f64) -> f64 {
        if liquid_fraction <= 0.0 {
            self.solid_capacity() * (temperature_k - reference_k)
        } else {
            let to_melt = self.solid_capacity() * (self.melt - reference_k);
            let latent = liquid_fraction * self.latent_capacity();
            if liquid_fraction >= 1.0 {
                to_melt + latent + self.liquid_capacity() * (temperature_k - self.melt)
            } else {
                to_melt + latent
            }
        }
    }

    /// Applies `energy` joules over a step of `dt` seconds.
    ///
    /// Positive energy heats the store, negative cools it.
    pub(crate) fn absorb(&self, state: &PhaseState, energy: f64, dt: f64) -> PhaseState {
        let stored = state.energy_j() + energy;

        if state.crystallizing {
            return self.crystallize(state, energy, dt).with_energy(stored);
        }

        if state.supercooled {
            let temperature = state.temperature_k() + energy / self.liquid_capacity();
            return state
                .with_liquid_temperature(temperature, self.melt)
                .with_energy(stored);
        }

        let (temperature, fraction) =
            self.equilibrate(state.temperature_k(), state.liquid_fraction.get(), energy);

        PhaseState::from_parts(
            temperature,
            Fraction::saturating(fraction),
            stored,
            fraction >= 1.0 && temperature < self.melt,
            false,
        )
    }

    /// Splits energy across the solid, latent and liquid regimes.
    fn equilibrate(&self, mut temperature: f64, mut fraction: f64, mut energy: f64) -> (f64, f64) {
        // Each pass either consumes the energy or saturates one regime.
        for _ in 0..3 {
            if energy == 0.0 {
                break;
            }

            if fraction >= 1.0 {
                // No crystals: heating or cooling stays on the liquid branch.
                temperature += energy / self.liquid_capacity();
                return (temperature, 1.0);
            }

            if fraction > 0.0 || (temperature >= self.melt && energy > 0.0) {
                temperature = self.melt;
                let next = fraction + energy / self.latent_capacity();
                if next > 1.0 {
                    energy = (next - 1.0) * self.latent_capacity();
                    fraction = 1.0;
                } else if next < 0.0 {
                    energy = next * self.latent_capacity();
                    fraction = 0.0;
                } else {
                    fraction = next;
                    energy = 0.0;
                }
            } else if energy > 0.0 {
                let to_melt = self.solid_capacity() * (self.melt - temperature);
                if energy < to_melt {
                    temperature += energy / self.solid_capacity();
                    energy = 0.0;
                } else {
                    temperature = self.melt;
                    energy -= to_melt;
                }
            } else {
                temperature += energy / self.solid_capacity();
                energy = 0.0;
            }
        }

        (temperature, fraction)
    }

    /// Advances an active crystallization front by one step.
    fn crystallize(&self, state: &PhaseState, energy: f64, dt: f64) -> PhaseState {
        let fraction = state.liquid_fraction.get();
        let released = (self.crystallization_rate * dt).min(fraction * self.latent_capacity());
        let mut fraction = fraction - released / self.latent_capacity();

        let capacity = self.mass * (fraction * self.cp_liquid + (1.0 - fraction) * self.cp_solid);
        let mut temperature = state.temperature_k() + (energy + released) / capacity;
        let mut crystallizing = true;

        if temperature >= self.melt {
            // Surplus sensible heat above the transition melts crystals back.
            let surplus = (temperature - self.melt) * capacity;
            temperature = self.melt;
            fraction += surplus / self.latent_capacity();
            crystallizing = false;

            if fraction > 1.0 {
                let excess = (fraction - 1.0) * self.latent_capacity();
                fraction = 1.0;
                temperature += excess / self.liquid_capacity();
            }
        } else if fraction <= 0.0 {
            fraction = 0.0;
            crystallizing = false;
        }

        PhaseState::from_parts(
            temperature,
            Fraction::saturating(fraction),
            state.energy_j(),
            false,
            crystallizing,
        )
    }
}

/// Net heat flow acting on the store over a step.
///
/// Positive power heats the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatBalance {
    pub net_power: Power,
    pub body: PcmBody,
}

impl StepIntegrable<Time> for PhaseState {
    type Derivative = HeatBalance;

    fn step(&self, balance: HeatBalance, dt: Time) -> Self {
        let dt = dt.get::<second>();
        balance
            .body
            .absorb(self, balance.net_power.get::<watt>() * dt, dt)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::{power::kilowatt, thermodynamic_temperature::degree_celsius};

    use super::*;

    const MELT_K: f64 = 58.0 + 273.15;

    fn body() -> PcmBody {
        PcmBody::new(
            Mass::new::<kilogram>(4.5),
            &PcmMaterial::default(),
            Power::new::<kilowatt>(1.0),
        )
    }

    fn celsius(state: &PhaseState) -> f64 {
        state.temperature().get::<degree_celsius>()
    }

    fn solid_at(c: f64) -> PhaseState {
        PhaseState::from_parts(c + 273.15, Fraction::ZERO, 0.0, false, false)
    }

    fn liquid_at(c: f64) -> PhaseState {
        let k = c + 273.15;
        PhaseState::from_parts(k, Fraction::ONE, 0.0, k < MELT_K, false)
    }

    #[test]
    fn solid_heating_is_sensible() {
        let body = body();
        let next = body.absorb(&solid_at(20.0), body.solid_capacity() * 10.0, 1.0);
        assert_relative_eq!(celsius(&next), 30.0, epsilon = 1e-9);
        assert_eq!(next.liquid_fraction(), Fraction::ZERO);
    }

    #[test]
    fn heating_across_the_transition_splits_energy() {
        let body = body();
        let sensible = body.solid_capacity() * 38.0;
        let half_latent = 0.5 * body.latent_capacity();

        let next = body.absorb(&solid_at(20.0), sensible + half_latent, 1.0);

        assert_relative_eq!(celsius(&next), 58.0, epsilon = 1e-9);
        assert_relative_eq!(next.liquid_fraction().get(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(next.energy_j(), sensible + half_latent);
    }

    #[test]
    fn residual_after_full_melt_heats_liquid() {
        let body = body();
        let start = PhaseState::from_parts(MELT_K, Fraction::new(0.9).unwrap(), 0.0, false, false);
        let energy = 0.1 * body.latent_capacity() + body.liquid_capacity() * 5.0;

        let next = body.absorb(&start, energy, 1.0);

        assert_eq!(next.liquid_fraction(), Fraction::ONE);
        assert_relative_eq!(celsius(&next), 63.0, epsilon = 1e-9);
        assert!(!next.is_supercooled());
    }

    #[test]
    fn residual_after_full_freeze_cools_solid() {
        let body = body();
        let start = PhaseState::from_parts(MELT_K, Fraction::new(0.2).unwrap(), 0.0, false, false);
        let energy = -(0.2 * body.latent_capacity() + body.solid_capacity() * 8.0);

        let next = body.absorb(&start, energy, 1.0);

        assert_eq!(next.liquid_fraction(), Fraction::ZERO);
        assert_relative_eq!(celsius(&next), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn liquid_cooling_below_transition_supercools() {
        let body = body();
        let next = body.absorb(&liquid_at(60.0), -body.liquid_capacity() * 10.0, 1.0);

        assert_relative_eq!(celsius(&next), 50.0, epsilon = 1e-9);
        assert_eq!(next.liquid_fraction(), Fraction::ONE);
        assert!(next.is_supercooled());
    }

    #[test]
    fn reheating_supercooled_liquid_clears_the_flag() {
        let body = body();
        let next = body.absorb(&liquid_at(50.0), body.liquid_capacity() * 9.0, 1.0);
        assert!(!next.is_supercooled());
        assert_relative_eq!(celsius(&next), 59.0, epsilon = 1e-9);
    }

    #[test]
    fn crystallization_releases_latent_heat_at_bounded_rate() {
        let body = body();
        let start = liquid_at(30.0).nucleated();

        let next = body.absorb(&start, 0.0, 10.0);

        // 1 kW for 10 s out of 4.5 kg × 264.4 kJ/kg.
        let expected_fraction = 1.0 - 10_000.0 / body.latent_capacity();
        assert_relative_eq!(next.liquid_fraction().get(), expected_fraction, epsilon = 1e-12);
        assert!(celsius(&next) > 30.0);
        assert!(next.is_crystallizing());
        assert!(!next.is_supercooled());
    }

    #[test]
    fn crystallization_reequilibrates_at_transition() {
        let body = body();
        let mut state = liquid_at(50.0).nucleated();

        for _ in 0..1_000 {
            let next = body.absorb(&state, 0.0, 1.0);
            assert!(next.liquid_fraction() <= state.liquid_fraction());
            assert!(next.temperature_k() >= state.temperature_k());
            state = next;
            if !state.is_crystallizing() {
                break;
            }
        }

        assert!(!state.is_crystallizing());
        assert_relative_eq!(celsius(&state), 58.0, epsilon = 1e-9);
        assert!(state.liquid_fraction().get() > 0.0);
        assert!(state.liquid_fraction().get() < 1.0);
    }

    #[test]
    fn enthalpy_matches_scenario_sum() {
        let body = body();
        let reference = 20.0 + 273.15;
        let h = body.enthalpy(65.0 + 273.15, 1.0, reference);
        let expected = 4.5 * 2100.0 * 38.0 + 4.5 * 264_400.0 + 4.5 * 3500.0 * 7.0;
        assert_relative_eq!(h, expected, epsilon = 1e-6);
    }

    #[test]
    fn step_applies_power_over_time() {
        let body = body();
        let balance = HeatBalance {
            net_power: Power::new::<watt>(body.solid_capacity()),
            body,
        };
        let next = solid_at(20.0).step(balance, Time::new::<second>(5.0));
        assert_relative_eq!(celsius(&next), 25.0, epsilon = 1e-9);
    }
}
