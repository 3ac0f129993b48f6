use latent_core::constraint::Bound;
use latent_solvers::transient::euler::Action;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uom::si::{
    energy::{joule, kilowatt_hour},
    f64::{MassRate, Power, SpecificHeatCapacity, ThermalConductance, ThermodynamicTemperature, Time},
    mass_rate::kilogram_per_second,
    power::watt,
    specific_heat_capacity::joule_per_kilogram_kelvin,
    thermodynamic_temperature::degree_celsius,
    time::{hour, second},
};

use crate::{
    ClimateProfile, CycleKind, CycleResult, PhaseState, SpontaneousNucleation, ThermalError,
    ThermalSystem, hx,
    store::{self, Duty, Exchanged, Nucleation, Store, StoreEvent},
};

/// Whether the trigger fires when a discharging store is found supercooled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NucleationPolicy {
    /// Fire as soon as the store is supercooled, at the start of or during
    /// the run.
    #[default]
    OnSupercool,
    /// Never fire; the caller triggers between runs.
    Manual,
}

/// Step size, termination and nucleation rules for a discharge run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DischargeSettings {
    pub dt: Time,
    /// The run ends once delivered power drops below this.
    pub cutoff: Power,
    pub fluid_specific_heat: SpecificHeatCapacity,
    pub nucleation: NucleationPolicy,
    pub spontaneous: Option<SpontaneousNucleation>,
    pub max_duration: Time,
    pub step_ceiling: usize,
    /// Consecutive steps of unchanging power and stored energy that count as
    /// a stall.
    pub stall_window: usize,
    /// Changes smaller than this, in power or in average net heat flow, are
    /// treated as no change.
    pub stall_tolerance: Power,
}

impl Default for DischargeSettings {
    fn default() -> Self {
        Self {
            dt: Time::new::<second>(60.0),
            cutoff: Power::new::<watt>(100.0),
            fluid_specific_heat: SpecificHeatCapacity::new::<joule_per_kilogram_kelvin>(4186.0),
            nucleation: NucleationPolicy::default(),
            spontaneous: None,
            max_duration: Time::new::<hour>(48.0),
            step_ceiling: 1_000_000,
            stall_window: 120,
            stall_tolerance: Power::new::<watt>(0.5),
        }
    }
}

struct Circulating {
    ua: ThermalConductance,
    flow: MassRate,
    fluid_specific_heat: SpecificHeatCapacity,
    inlet: ThermodynamicTemperature,
}

impl Duty for Circulating {
    fn exchange(&self, _time: Time, state: &PhaseState, _climate: &ClimateProfile) -> Exchanged {
        let exchange = hx::extract(
            self.ua,
            self.flow,
            self.fluid_specific_heat,
            state.temperature(),
            self.inlet,
        );
        Exchanged {
            delivered: exchange.heat_flow,
            outlet: Some(exchange.outlet),
            ..Exchanged::none()
        }
    }
}

/// Why the observer ended a run.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Ending {
    BelowCutoff,
    Stalled { power_w: f64, steps: usize, elapsed_s: f64 },
}

/// Watches for the cutoff and for power that has stopped moving.
struct Watch {
    cutoff_w: f64,
    window: usize,
    tolerance_w: f64,
    dt_s: f64,
    reference: Option<(usize, f64, f64)>,
    ending: Option<Ending>,
}

impl Watch {
    fn observe(&mut self, event: &StoreEvent) -> Option<Action> {
        let power = event.snapshot.output.exchanged.delivered.get::<watt>();
        let energy = event.snapshot.input.state.energy_j();

        if power < self.cutoff_w {
            self.ending = Some(Ending::BelowCutoff);
            return Some(Action::StopEarly);
        }

        match self.reference {
            Some((start, p, e))
                if (power - p).abs() <= self.tolerance_w
                    && (energy - e).abs()
                        <= self.tolerance_w * self.dt_s * (event.step - start) as f64 =>
            {
                if event.step - start >= self.window {
                    self.ending = Some(Ending::Stalled {
                        power_w: power,
                        steps: event.step,
                        elapsed_s: event.snapshot.input.time.get::<second>(),
                    });
                    return Some(Action::StopEarly);
                }
            }
            _ => self.reference = Some((event.step, power, energy)),
        }
        None
    }
}

/// Discharges with the default settings.
///
/// # Errors
///
/// See [`Discharger::run`].
pub fn run_discharge(
    system: &ThermalSystem,
    initial: &PhaseState,
    inlet: ThermodynamicTemperature,
    flow: MassRate,
    climate: &ClimateProfile,
) -> Result<CycleResult, ThermalError> {
    Discharger::new(system).run(initial, inlet, flow, climate)
}

/// Draws heat into a circulating fluid until delivered power falls below the
/// cutoff.
///
/// The run ends on power, not on the store becoming solid: a store that can
/// no longer heat the fluid usefully is empty as far as the load is
/// concerned.
#[derive(Debug, Clone, Copy)]
pub struct Discharger<'a> {
    system: &'a ThermalSystem,
    settings: DischargeSettings,
}

impl<'a> Discharger<'a> {
    #[must_use]
    pub fn new(system: &'a ThermalSystem) -> Self {
        Self {
            system,
            settings: DischargeSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: DischargeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Runs the discharge.
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::Configuration`] for a negative flow rate or
    /// cutoff, [`ThermalError::Stability`] for an unstable step, and
    /// [`ThermalError::DischargeStalled`] if power stops changing above the
    /// cutoff or the step ceiling is reached first.
    pub fn run(
        &self,
        initial: &PhaseState,
        inlet: ThermodynamicTemperature,
        flow: MassRate,
        climate: &ClimateProfile,
    ) -> Result<CycleResult, ThermalError> {
        let system = self.system;
        let settings = &self.settings;
        Bound::NonNegative.check("flow", flow.get::<kilogram_per_second>())?;
        let cutoff_w = Bound::NonNegative.check("cutoff", settings.cutoff.get::<watt>())?;

        let dt = settings.dt;
        let steps = store::steps_for(settings.max_duration, dt).min(settings.step_ceiling);

        debug!(
            location = %climate.location,
            start_c = initial.temperature().get::<degree_celsius>(),
            inlet_c = inlet.get::<degree_celsius>(),
            "discharge started"
        );

        let store = Store {
            system,
            climate,
            duty: Circulating {
                ua: system.config().heat_exchanger_ua,
                flow,
                fluid_specific_heat: settings.fluid_specific_heat,
                inlet,
            },
        };
        let nucleation = Nucleation {
            on_supercool: settings.nucleation == NucleationPolicy::OnSupercool,
            spontaneous: settings.spontaneous,
        };
        let mut watch = Watch {
            cutoff_w,
            window: settings.stall_window.max(1),
            tolerance_w: settings.stall_tolerance.get::<watt>(),
            dt_s: dt.get::<second>(),
            reference: None,
            ending: None,
        };

        let solution = store::simulate(&store, nucleation, *initial, dt, steps, |event: &StoreEvent| {
            watch.observe(event)
        })?;

        match watch.ending {
            Some(Ending::BelowCutoff) => {}
            Some(Ending::Stalled {
                power_w,
                steps,
                elapsed_s,
            }) => {
                warn!(power_w, steps, "discharge stalled above cutoff");
                return Err(ThermalError::DischargeStalled {
                    power_w,
                    cutoff_w,
                    steps,
                    elapsed_s,
                });
            }
            None => {
                let last = solution.last();
                return Err(ThermalError::DischargeStalled {
                    power_w: last.output.exchanged.delivered.get::<watt>(),
                    cutoff_w,
                    steps: solution.steps,
                    elapsed_s: last.input.time.get::<second>(),
                });
            }
        }

        let (samples, totals) =
            store::tabulate(&solution, dt, 1.0, |output| output.exchanged.delivered);
        let last = solution.last();

        let result = CycleResult {
            kind: CycleKind::Discharge,
            duration: last.input.time,
            energy: totals.energy(),
            source_energy: totals.source(),
            ambient_loss: totals.loss(),
            peak_power: totals.peak(),
            initial_state: solution.history[0].input.state,
            final_state: last.input.state,
            samples,
        };

        debug!(
            duration_h = result.duration.get::<hour>(),
            energy_kwh = result.energy.get::<kilowatt_hour>(),
            delivered_j = result.energy.get::<joule>(),
            "discharge complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use latent_core::Fraction;
    use uom::si::{
        f64::Mass,
        mass::kilogram,
        thermal_conductance::watt_per_kelvin,
    };

    use super::*;
    use crate::{ThermalSystemConfig, nucleation::NucleationStage};

    fn celsius(c: f64) -> ThermodynamicTemperature {
        ThermodynamicTemperature::new::<degree_celsius>(c)
    }

    fn design_flow() -> MassRate {
        MassRate::new::<kilogram_per_second>(0.074)
    }

    fn indoors() -> ClimateProfile {
        ClimateProfile::constant("basement", celsius(20.0))
    }

    fn reference_unit() -> ThermalSystem {
        ThermalSystem::new(ThermalSystemConfig::default()).unwrap()
    }

    #[test]
    fn bench_pouch_stops_immediately_below_cutoff() {
        let system = ThermalSystem::new(ThermalSystemConfig {
            mass: Mass::new::<kilogram>(4.5),
            heat_exchanger_ua: ThermalConductance::new::<watt_per_kelvin>(2.15),
            loss_coefficient: ThermalConductance::new::<watt_per_kelvin>(0.0),
            ..ThermalSystemConfig::default()
        })
        .unwrap();
        let initial = system.melting_state(Fraction::ONE);

        let result =
            run_discharge(&system, &initial, celsius(40.0), design_flow(), &indoors()).unwrap();

        let initial_power = result.samples[0].power.get::<watt>();
        assert!(initial_power > 2.15 * 17.9 && initial_power < 2.15 * 18.0);
        assert_eq!(result.duration, Time::new::<second>(0.0));
        assert_eq!(result.energy.get::<joule>(), 0.0);
        assert_eq!(result.final_state, initial);
    }

    #[test]
    fn reference_unit_discharges_latent_heat_until_cutoff() {
        let system = reference_unit();
        let initial = system.liquid_state(celsius(65.0));

        let result =
            run_discharge(&system, &initial, celsius(40.0), design_flow(), &indoors()).unwrap();

        let last = result.samples.last().unwrap();
        assert!(last.power < Power::new::<watt>(100.0));
        for sample in &result.samples[..result.samples.len() - 1] {
            assert!(sample.power >= Power::new::<watt>(100.0));
        }

        // Latent plateau delivered most of the energy.
        let latent_kwh = 227.1 * 264.4 / 3600.0;
        assert!(result.energy_kwh() > 0.9 * latent_kwh);

        // No energy is manufactured.
        let released = -result.stored_energy_change().get::<joule>();
        let accounted = result.energy.get::<joule>() + result.ambient_loss.get::<joule>();
        assert_relative_eq!(released, accounted, max_relative = 1e-9);
        assert!(result.final_state.temperature() > celsius(40.0));
    }

    #[test]
    fn supercooled_store_is_triggered_at_start() {
        let system = reference_unit();
        let supercooled = system.liquid_state(celsius(45.0));

        let result =
            run_discharge(&system, &supercooled, celsius(35.0), design_flow(), &indoors()).unwrap();

        assert!(result.initial_state.is_crystallizing());
        let history = result.nucleation_history().unwrap();
        assert!(history.visited(NucleationStage::Partial));
        assert!(result.energy_kwh() > 1.0);
    }

    #[test]
    fn manual_policy_leaves_store_supercooled() {
        let system = reference_unit();
        let supercooled = system.liquid_state(celsius(45.0));

        let result = Discharger::new(&system)
            .with_settings(DischargeSettings {
                nucleation: NucleationPolicy::Manual,
                ..DischargeSettings::default()
            })
            .run(&supercooled, celsius(35.0), design_flow(), &indoors())
            .unwrap();

        assert!(result.final_state.is_supercooled());
        assert!(result.samples.iter().all(|s| !s.state.is_crystallizing()));
        // Sensible heat of the liquid between 45 °C and the inlet, at most.
        let sensible_kwh = 227.1 * 3500.0 * 10.0 / 3.6e6;
        assert!(result.energy_kwh() < sensible_kwh);
    }

    #[test]
    fn zero_cutoff_stalls() {
        let system = reference_unit();
        let initial = system.liquid_state(celsius(65.0));

        let err = Discharger::new(&system)
            .with_settings(DischargeSettings {
                cutoff: Power::new::<watt>(0.0),
                max_duration: Time::new::<hour>(24.0),
                ..DischargeSettings::default()
            })
            .run(&initial, celsius(40.0), design_flow(), &indoors())
            .unwrap_err();

        match err {
            ThermalError::DischargeStalled { cutoff_w, .. } => assert_eq!(cutoff_w, 0.0),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_flow_is_rejected() {
        let system = reference_unit();
        let initial = system.liquid_state(celsius(65.0));
        let err = run_discharge(
            &system,
            &initial,
            celsius(40.0),
            MassRate::new::<kilogram_per_second>(-0.1),
            &indoors(),
        )
        .unwrap_err();
        assert!(matches!(err, ThermalError::Configuration(v) if v.parameter == "flow"));
    }
}
