use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uom::si::{
    energy::kilowatt_hour,
    f64::Time,
    thermodynamic_temperature::degree_celsius,
    time::{hour, second},
};

use crate::{
    ClimateProfile, CycleKind, CycleResult, PhaseState, SpontaneousNucleation, ThermalError,
    ThermalSystem,
    store::{self, Duty, Exchanged, Nucleation, Store},
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandbySettings {
    /// Upper bound on the step; the run uses the largest step at or below it
    /// that divides the duration evenly.
    pub dt: Time,
    pub spontaneous: Option<SpontaneousNucleation>,
}

impl Default for StandbySettings {
    fn default() -> Self {
        Self {
            dt: Time::new::<second>(60.0),
            spontaneous: None,
        }
    }
}

struct Idle;

impl Duty for Idle {
    fn exchange(&self, _time: Time, _state: &PhaseState, _climate: &ClimateProfile) -> Exchanged {
        Exchanged::none()
    }
}

/// Holds a store with no heat exchange but the insulation loss.
///
/// # Errors
///
/// Returns [`ThermalError::Stability`] for an unstable step.
pub fn run_standby(
    system: &ThermalSystem,
    initial: &PhaseState,
    climate: &ClimateProfile,
    duration: Time,
) -> Result<CycleResult, ThermalError> {
    run_standby_with(system, initial, climate, duration, &StandbySettings::default())
}

/// Standby with explicit settings.
///
/// # Errors
///
/// Returns [`ThermalError::Stability`] for an unstable step.
pub fn run_standby_with(
    system: &ThermalSystem,
    initial: &PhaseState,
    climate: &ClimateProfile,
    duration: Time,
    settings: &StandbySettings,
) -> Result<CycleResult, ThermalError> {
    let steps = store::steps_for(duration, settings.dt);
    let dt = if steps == 0 {
        settings.dt
    } else {
        duration / steps as f64
    };

    let store = Store {
        system,
        climate,
        duty: Idle,
    };
    let nucleation = Nucleation {
        on_supercool: false,
        spontaneous: settings.spontaneous,
    };

    let solution = store::simulate(&store, nucleation, *initial, dt, steps, ())?;
    let (samples, totals) = store::tabulate(&solution, dt, 1.0, |output| output.ambient_loss);
    let last = solution.last();

    if last.input.state.is_supercooled() && !initial.is_supercooled() {
        warn!(
            temperature_c = last.input.state.temperature().get::<degree_celsius>(),
            "store supercooled during standby"
        );
    }

    let result = CycleResult {
        kind: CycleKind::Standby,
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
        lost_kwh = result.energy.get::<kilowatt_hour>(),
        "standby complete"
    );

    Ok(result)
}
