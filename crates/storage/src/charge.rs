use latent_core::Fraction;
use latent_solvers::transient::euler::{Action, Status};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uom::si::{
    energy::kilowatt_hour,
    f64::Time,
    power::watt,
    thermodynamic_temperature::{degree_celsius, kelvin},
    time::{hour, second},
};

use crate::{
    ClimateProfile, CycleKind, CycleResult, HeatSource, PhaseState, ThermalError, ThermalSystem,
    store::{self, Duty, Exchanged, Nucleation, Store, StoreEvent},
};

/// Step size and limits for a charge run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeSettings {
    pub dt: Time,
    /// Longest a charge may take before it is reported as timed out.
    pub max_duration: Time,
    /// Hard cap on integration steps, whatever the duration.
    pub step_ceiling: usize,
}

impl Default for ChargeSettings {
    fn default() -> Self {
        Self {
            dt: Time::new::<second>(60.0),
            max_duration: Time::new::<hour>(48.0),
            step_ceiling: 1_000_000,
        }
    }
}

struct Charging<'a> {
    source: &'a HeatSource,
}

impl Duty for Charging<'_> {
    fn exchange(&self, time: Time, state: &PhaseState, climate: &ClimateProfile) -> Exchanged {
        Exchanged {
            supplied: self.source.power(time, state, climate),
            ..Exchanged::none()
        }
    }
}

/// Charges with the default settings.
///
/// # Errors
///
/// See [`Charger::run`].
pub fn run_charge(
    system: &ThermalSystem,
    initial: &PhaseState,
    source: &HeatSource,
    climate: &ClimateProfile,
) -> Result<CycleResult, ThermalError> {
    Charger::new(system).run(initial, source, climate)
}

/// Drives a store with a heat source until it is fully liquid at the charge
/// target.
#[derive(Debug, Clone, Copy)]
pub struct Charger<'a> {
    system: &'a ThermalSystem,
    settings: ChargeSettings,
}

impl<'a> Charger<'a> {
    #[must_use]
    pub fn new(system: &'a ThermalSystem) -> Self {
        Self {
            system,
            settings: ChargeSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ChargeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Runs the charge.
    ///
    /// The completion instant inside the final step is recovered from the
    /// enthalpy overshoot, so the reported duration and energy end exactly at
    /// the target rather than on a step boundary.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Stability`] for an unstable step and
    /// [`ThermalError::ChargeTimeout`] if the target is not reached within the
    /// maximum duration or step ceiling.
    pub fn run(
        &self,
        initial: &PhaseState,
        source: &HeatSource,
        climate: &ClimateProfile,
    ) -> Result<CycleResult, ThermalError> {
        let system = self.system;
        let dt = self.settings.dt;
        let target = system.config().charge_target;
        let steps = store::steps_for(self.settings.max_duration, dt).min(self.settings.step_ceiling);

        debug!(
            location = %climate.location,
            start_c = initial.temperature().get::<degree_celsius>(),
            target_c = target.get::<degree_celsius>(),
            "charge started"
        );

        let store = Store {
            system,
            climate,
            duty: Charging { source },
        };
        let is_charged = |state: &PhaseState| {
            state.temperature() >= target
                && state.liquid_fraction() == Fraction::ONE
                && !state.is_supercooled()
        };
        let observer =
            |event: &StoreEvent| is_charged(&event.snapshot.input.state).then_some(Action::StopEarly);

        let solution = store::simulate(&store, Nucleation::default(), *initial, dt, steps, observer)?;
        let last = solution.last();

        if solution.status == Status::Complete && !is_charged(&last.input.state) {
            let state = last.input.state;
            return Err(ThermalError::ChargeTimeout {
                target_c: target.get::<degree_celsius>(),
                elapsed_s: last.input.time.get::<second>(),
                limit_s: dt.get::<second>() * steps as f64,
                temperature_c: state.temperature().get::<degree_celsius>(),
                liquid_fraction: state.liquid_fraction().get(),
            });
        }

        // Enthalpy past the target sits in the liquid's sensible heat.
        let dt_s = dt.get::<second>();
        let (last_interval, overshoot) = match solution.history.len() {
            1 => (1.0, 0.0),
            n => {
                let applied = solution.history[n - 2].output.net().get::<watt>() * dt_s;
                let overshoot = system.body().liquid_capacity()
                    * (last.input.state.temperature_k() - target.get::<kelvin>());
                if applied > 0.0 {
                    ((1.0 - overshoot / applied).clamp(0.0, 1.0), overshoot)
                } else {
                    (1.0, 0.0)
                }
            }
        };

        let (mut samples, totals) =
            store::tabulate(&solution, dt, last_interval, |output| output.net());

        let duration = if solution.steps == 0 {
            Time::new::<second>(0.0)
        } else {
            Time::new::<second>(((solution.steps - 1) as f64 + last_interval) * dt_s)
        };

        let final_state = if overshoot > 0.0 {
            last.input
                .state
                .with_liquid_temperature(target.get::<kelvin>(), system.body().melt_k())
                .with_energy(last.input.state.energy_j() - overshoot)
        } else {
            last.input.state
        };
        if let Some(sample) = samples.last_mut() {
            sample.time = duration;
            sample.state = final_state;
        }

        let result = CycleResult {
            kind: CycleKind::Charge,
            duration,
            energy: totals.energy(),
            source_energy: totals.source(),
            ambient_loss: totals.loss(),
            peak_power: totals.peak(),
            initial_state: samples.first().map_or(*initial, |s| s.state),
            final_state,
            samples,
        };

        debug!(
            duration_h = result.duration.get::<hour>(),
            energy_kwh = result.energy.get::<kilowatt_hour>(),
            "charge complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use uom::si::{
        available_energy::kilojoule_per_kilogram,
        energy::joule,
        f64::{AvailableEnergy, Mass, Power, ThermalConductance, ThermodynamicTemperature},
        mass::kilogram,
        thermal_conductance::watt_per_kelvin,
    };

    use super::*;
    use crate::{PcmMaterial, ThermalSystemConfig};

    fn celsius(c: f64) -> ThermodynamicTemperature {
        ThermodynamicTemperature::new::<degree_celsius>(c)
    }

    /// 4.5 kg bench pouch with no insulation loss.
    fn pouch() -> ThermalSystem {
        ThermalSystem::new(ThermalSystemConfig {
            material: PcmMaterial {
                latent_heat: AvailableEnergy::new::<kilojoule_per_kilogram>(264.0),
                ..PcmMaterial::default()
            },
            mass: Mass::new::<kilogram>(4.5),
            heat_exchanger_ua: ThermalConductance::new::<watt_per_kelvin>(2.15),
            loss_coefficient: ThermalConductance::new::<watt_per_kelvin>(0.0),
            ..ThermalSystemConfig::default()
        })
        .unwrap()
    }

    fn resistive(watts: f64) -> HeatSource {
        HeatSource::Resistive(Power::new::<watt>(watts))
    }

    fn still_air() -> ClimateProfile {
        ClimateProfile::constant("bench", celsius(20.0))
    }

    #[test]
    fn constant_power_charge_duration_is_exact() {
        let system = pouch();
        let initial = system.solid_state(celsius(20.0)).unwrap();

        let result = Charger::new(&system)
            .with_settings(ChargeSettings {
                dt: Time::new::<second>(10.0),
                ..ChargeSettings::default()
            })
            .run(&initial, &resistive(1000.0), &still_air())
            .unwrap();

        let expected_s = (4.5 * 2100.0 * 38.0 + 4.5 * 264_000.0 + 4.5 * 3500.0 * 7.0) / 1000.0;
        assert_relative_eq!(result.duration.get::<second>(), expected_s, max_relative = 1e-9);
        assert_relative_eq!(
            result.energy.get::<joule>(),
            expected_s * 1000.0,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            result.final_state.temperature().get::<degree_celsius>(),
            65.0,
            epsilon = 1e-9
        );
        assert_eq!(result.final_state.liquid_fraction(), Fraction::ONE);
        assert_relative_eq!(
            result.stored_energy_change().get::<joule>(),
            result.energy.get::<joule>(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn duration_does_not_depend_on_step_size() {
        let system = pouch();
        let initial = system.solid_state(celsius(20.0)).unwrap();

        let durations: Vec<f64> = [1.0, 7.0, 30.0]
            .into_iter()
            .map(|dt| {
                Charger::new(&system)
                    .with_settings(ChargeSettings {
                        dt: Time::new::<second>(dt),
                        ..ChargeSettings::default()
                    })
                    .run(&initial, &resistive(1000.0), &still_air())
                    .unwrap()
                    .duration
                    .get::<second>()
            })
            .collect();

        assert_relative_eq!(durations[0], durations[1], max_relative = 1e-9);
        assert_relative_eq!(durations[0], durations[2], max_relative = 1e-9);
    }

    #[test]
    fn liquid_fraction_never_decreases_while_charging() {
        let system = pouch();
        let initial = system.solid_state(celsius(20.0)).unwrap();
        let result = run_charge(&system, &initial, &resistive(800.0), &still_air()).unwrap();

        for pair in result.samples.windows(2) {
            assert!(pair[1].state.liquid_fraction() >= pair[0].state.liquid_fraction());
        }
    }

    #[test]
    fn already_charged_store_returns_immediately() {
        let system = pouch();
        let initial = system.liquid_state(celsius(70.0));
        let result = run_charge(&system, &initial, &resistive(1000.0), &still_air()).unwrap();

        assert_eq!(result.duration, Time::new::<second>(0.0));
        assert_eq!(result.energy.get::<joule>(), 0.0);
        assert_eq!(result.final_state, initial);
    }

    #[test]
    fn undersized_source_times_out() {
        let system = ThermalSystem::new(ThermalSystemConfig::default()).unwrap();
        let initial = system.solid_state(celsius(20.0)).unwrap();

        // 20 W cannot beat the insulation loss near the target.
        let err = Charger::new(&system)
            .with_settings(ChargeSettings {
                max_duration: Time::new::<hour>(6.0),
                ..ChargeSettings::default()
            })
            .run(&initial, &resistive(20.0), &still_air())
            .unwrap_err();

        match err {
            ThermalError::ChargeTimeout {
                limit_s,
                elapsed_s,
                liquid_fraction,
                ..
            } => {
                assert_relative_eq!(limit_s, 6.0 * 3600.0);
                assert_relative_eq!(elapsed_s, limit_s);
                assert!(liquid_fraction < 1.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unstable_step_is_rejected_before_running() {
        let system = ThermalSystem::new(ThermalSystemConfig::default()).unwrap();
        let initial = system.solid_state(celsius(20.0)).unwrap();
        let err = Charger::new(&system)
            .with_settings(ChargeSettings {
                dt: Time::new::<hour>(2.0),
                ..ChargeSettings::default()
            })
            .run(&initial, &resistive(3000.0), &still_air())
            .unwrap_err();
        assert!(matches!(err, ThermalError::Stability { .. }));
    }
}
