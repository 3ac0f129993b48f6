//! The store as a [`Model`] and [`OdeProblem`] for the Euler solver.
//!
//! A simulator supplies a [`Duty`], the heat exchanged with the outside world
//! other than through the insulation. The model evaluates the duty and the
//! ambient loss for the current state; the problem turns their balance into a
//! [`HeatBalance`] and applies nucleation rules after each step.

use latent_core::{DerivativeOf, Model, Observer, OdeProblem};
use latent_solvers::transient::euler::{self, Action, Event, Solution};
use uom::si::{
    f64::{Power, ThermodynamicTemperature, Time},
    power::watt,
    time::second,
};

use crate::{
    ClimateProfile, PhaseState, SpontaneousNucleation, ThermalError, ThermalSystem,
    cycle::{Sample, Totals},
    phase::HeatBalance,
};

/// Heat exchanged by a simulator's external equipment.
pub(crate) trait Duty {
    fn exchange(&self, time: Time, state: &PhaseState, climate: &ClimateProfile) -> Exchanged;
}

/// Heat flows at one instant, all non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Exchanged {
    /// Into the store from a charging source.
    pub supplied: Power,
    /// Out of the store into a circulating fluid.
    pub delivered: Power,
    pub outlet: Option<ThermodynamicTemperature>,
}

impl Exchanged {
    pub(crate) fn none() -> Self {
        Self {
            supplied: Power::new::<watt>(0.0),
            delivered: Power::new::<watt>(0.0),
            outlet: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StoreInput {
    pub time: Time,
    pub step: usize,
    pub state: PhaseState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StoreOutput {
    pub exchanged: Exchanged,
    pub ambient_loss: Power,
}

impl StoreOutput {
    pub(crate) fn net(&self) -> Power {
        self.exchanged.supplied - self.exchanged.delivered - self.ambient_loss
    }
}

pub(crate) type StoreEvent = Event<StoreInput, StoreOutput>;
pub(crate) type StoreSolution = Solution<StoreInput, StoreOutput>;

pub(crate) struct Store<'a, D> {
    pub system: &'a ThermalSystem,
    pub climate: &'a ClimateProfile,
    pub duty: D,
}

impl<D: Duty> Model for Store<'_, D> {
    type Input = StoreInput;
    type Output = StoreOutput;
    type Error = ThermalError;

    fn call(&self, input: &StoreInput) -> Result<StoreOutput, ThermalError> {
        let ambient = self.climate.ambient_at(input.time);
        Ok(StoreOutput {
            exchanged: self.duty.exchange(input.time, &input.state, self.climate),
            ambient_loss: self.system.ambient_loss(&input.state, ambient),
        })
    }
}

/// When a supercooled store gets nucleated during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Nucleation {
    pub on_supercool: bool,
    pub spontaneous: Option<SpontaneousNucleation>,
}

impl Nucleation {
    fn fires(&self, step: usize) -> bool {
        self.on_supercool || self.spontaneous.is_some_and(|hook| hook.fires(step))
    }

    /// Applies the rules to a state about to be simulated.
    pub(crate) fn apply(
        &self,
        system: &ThermalSystem,
        state: PhaseState,
        step: usize,
    ) -> Result<PhaseState, ThermalError> {
        if state.is_supercooled() && self.fires(step) {
            system.trigger_nucleation(&state)
        } else {
            Ok(state)
        }
    }
}

pub(crate) struct StoreProblem<'a> {
    pub system: &'a ThermalSystem,
    pub nucleation: Nucleation,
}

impl OdeProblem for StoreProblem<'_> {
    type Input = StoreInput;
    type Output = StoreOutput;
    type Delta = Time;
    type State = PhaseState;
    type Error = ThermalError;

    fn state(&self, input: &StoreInput) -> Result<PhaseState, ThermalError> {
        Ok(input.state)
    }

    fn derivative(
        &self,
        _input: &StoreInput,
        output: &StoreOutput,
    ) -> Result<DerivativeOf<PhaseState, Time>, ThermalError> {
        Ok(HeatBalance {
            net_power: output.net(),
            body: self.system.body(),
        })
    }

    fn build_input(
        &self,
        base: &StoreInput,
        state: &PhaseState,
        delta: &Time,
    ) -> Result<StoreInput, ThermalError> {
        Ok(StoreInput {
            time: base.time + *delta,
            step: base.step + 1,
            state: *state,
        })
    }

    fn finalize_step(
        &self,
        next_input: StoreInput,
        _prev_input: &StoreInput,
        _prev_output: &StoreOutput,
        _step_delta: &Time,
    ) -> Result<StoreInput, ThermalError> {
        let state = self
            .nucleation
            .apply(self.system, next_input.state, next_input.step)?;
        Ok(StoreInput { state, ..next_input })
    }
}

/// Runs a store from `initial` for at most `steps` steps of `dt`.
pub(crate) fn simulate<D, Obs>(
    store: &Store<'_, D>,
    nucleation: Nucleation,
    initial: PhaseState,
    dt: Time,
    steps: usize,
    observer: Obs,
) -> Result<StoreSolution, ThermalError>
where
    D: Duty,
    Obs: Observer<StoreEvent, Action>,
{
    store.system.check_step(dt)?;

    let problem = StoreProblem {
        system: store.system,
        nucleation,
    };
    let initial = StoreInput {
        time: Time::new::<second>(0.0),
        step: 0,
        state: nucleation.apply(store.system, initial, 0)?,
    };

    Ok(euler::solve(store, &problem, initial, dt, steps, observer)?)
}

/// Number of whole steps of `dt` needed to cover `duration`.
pub(crate) fn steps_for(duration: Time, dt: Time) -> usize {
    let steps = (duration.get::<second>() / dt.get::<second>()).ceil();
    if steps.is_finite() && steps > 0.0 {
        steps as usize
    } else {
        0
    }
}

/// Walks a solution into samples and integrated totals.
///
/// Every interval but the last spans `dt`; the last spans
/// `last_interval × dt`. `useful` picks the power a run reports.
pub(crate) fn tabulate(
    solution: &StoreSolution,
    dt: Time,
    last_interval: f64,
    useful: impl Fn(&StoreOutput) -> Power,
) -> (Vec<Sample>, Totals) {
    let dt_s = dt.get::<second>();
    let intervals = solution.history.len() - 1;
    let mut totals = Totals::default();

    let samples = solution
        .history
        .iter()
        .enumerate()
        .map(|(k, snapshot)| {
            let power = useful(&snapshot.output);
            totals.peak = totals.peak.max(power.get::<watt>());

            if k < intervals {
                let weight = if k + 1 == intervals { last_interval } else { 1.0 };
                let span = weight * dt_s;
                totals.energy += power.get::<watt>() * span;
                totals.source += snapshot.output.exchanged.supplied.get::<watt>() * span;
                totals.loss += snapshot.output.ambient_loss.get::<watt>() * span;
            }

            Sample {
                time: snapshot.input.time,
                state: snapshot.input.state,
                power,
                ambient_loss: snapshot.output.ambient_loss,
                outlet: snapshot.output.exchanged.outlet,
            }
        })
        .collect();

    (samples, totals)
}
