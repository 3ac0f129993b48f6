use serde::Serialize;
use uom::si::{
    energy::{joule, kilowatt_hour},
    f64::{Energy, Power, ThermodynamicTemperature, Time},
    power::watt,
    time::second,
};

use crate::{NucleationTracker, PhaseState};

/// What a simulated run did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CycleKind {
    Charge,
    Discharge,
    Standby,
}

/// One point of a run's time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub time: Time,
    pub state: PhaseState,
    /// Useful power: absorbed net of loss when charging, delivered when
    /// discharging, lost to ambient in standby.
    pub power: Power,
    pub ambient_loss: Power,
    /// Fluid outlet temperature, for discharge runs.
    pub outlet: Option<ThermodynamicTemperature>,
}

/// Outcome of a charge, discharge or standby run.
///
/// Produced once by a simulator and never updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleResult {
    pub kind: CycleKind,
    pub duration: Time,
    /// Net energy absorbed (charge), delivered (discharge) or lost (standby).
    pub energy: Energy,
    /// Gross heat supplied by the charging source.
    pub source_energy: Energy,
    pub ambient_loss: Energy,
    pub peak_power: Power,
    pub initial_state: PhaseState,
    pub final_state: PhaseState,
    pub samples: Vec<Sample>,
}

impl CycleResult {
    /// Energy over duration, or zero for an empty run.
    #[must_use]
    pub fn average_power(&self) -> Power {
        let seconds = self.duration.get::<second>();
        if seconds > 0.0 {
            Power::new::<watt>(self.energy.get::<joule>() / seconds)
        } else {
            Power::new::<watt>(0.0)
        }
    }

    #[must_use]
    pub fn energy_kwh(&self) -> f64 {
        self.energy.get::<kilowatt_hour>()
    }

    /// Change in stored energy between the first and last state.
    #[must_use]
    pub fn stored_energy_change(&self) -> Energy {
        self.final_state.energy_stored() - self.initial_state.energy_stored()
    }

    /// Replays the samples through a nucleation tracker.
    #[must_use]
    pub fn nucleation_history(&self) -> Option<NucleationTracker> {
        NucleationTracker::replay(self.samples.iter().map(|s| (s.time, &s.state)))
    }
}

/// Running totals while a simulator walks a solution history.
#[derive(Debug, Default)]
pub(crate) struct Totals {
    pub energy: f64,
    pub source: f64,
    pub loss: f64,
    pub peak: f64,
}

impl Totals {
    pub(crate) fn energy(&self) -> Energy {
        Energy::new::<joule>(self.energy)
    }

    pub(crate) fn source(&self) -> Energy {
        Energy::new::<joule>(self.source)
    }

    pub(crate) fn loss(&self) -> Energy {
        Energy::new::<joule>(self.loss)
    }

    pub(crate) fn peak(&self) -> Power {
        Power::new::<watt>(self.peak)
    }
}
