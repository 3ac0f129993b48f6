//! Supercooling and nucleation bookkeeping.
//!
//! [`NucleationStage`] classifies a [`PhaseState`]. A [`NucleationTracker`]
//! follows a sequence of states, records stage transitions, and keeps a
//! [`NucleationLog`] of trigger attempts from which a success rate is
//! derived for the economic reliability assumption.

use latent_core::Fraction;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uom::si::{f64::Time, thermodynamic_temperature::degree_celsius};

use crate::{PhaseState, ThermalError, ThermalSystem};

/// Where a store sits in the supercool/nucleation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NucleationStage {
    /// Fully liquid at or above the transition temperature.
    LiquidStable,
    /// Fully liquid below the transition temperature, waiting on a trigger.
    Supercooled,
    /// A crystallization front is active.
    Crystallizing,
    /// Mixed phase in equilibrium at the transition temperature.
    Partial,
    /// Fully solid.
    Solid,
}

impl NucleationStage {
    #[must_use]
    pub fn of(state: &PhaseState) -> Self {
        let fraction = state.liquid_fraction();
        if state.is_crystallizing() {
            Self::Crystallizing
        } else if state.is_supercooled() {
            Self::Supercooled
        } else if fraction == Fraction::ONE {
            Self::LiquidStable
        } else if fraction == Fraction::ZERO {
            Self::Solid
        } else {
            Self::Partial
        }
    }
}

/// A recorded change of stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageTransition {
    pub from: NucleationStage,
    pub to: NucleationStage,
    pub at: Time,
}

/// Outcome of one nucleation trigger attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NucleationAttempt {
    pub succeeded: bool,
}

/// Share of attempts that succeeded, or `None` if there were none.
#[must_use]
pub fn success_rate(attempts: &[NucleationAttempt]) -> Option<Fraction> {
    if attempts.is_empty() {
        return None;
    }
    let successes = attempts.iter().filter(|a| a.succeeded).count();
    Some(Fraction::saturating(successes as f64 / attempts.len() as f64))
}

/// Accumulated trigger attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NucleationLog {
    attempts: Vec<NucleationAttempt>,
}

impl NucleationLog {
    /// Records an attempt supplied from outside the simulation, such as a
    /// bench test.
    pub fn record(&mut self, succeeded: bool) {
        self.attempts.push(NucleationAttempt { succeeded });
    }

    #[must_use]
    pub fn attempts(&self) -> &[NucleationAttempt] {
        &self.attempts
    }

    #[must_use]
    pub fn success_rate(&self) -> Option<Fraction> {
        success_rate(&self.attempts)
    }
}

/// Follows a store through its stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NucleationTracker {
    stage: NucleationStage,
    transitions: Vec<StageTransition>,
    log: NucleationLog,
}

impl NucleationTracker {
    #[must_use]
    pub fn new(initial: &PhaseState) -> Self {
        Self {
            stage: NucleationStage::of(initial),
            transitions: Vec::new(),
            log: NucleationLog::default(),
        }
    }

    /// Builds a tracker by replaying a sequence of timed states.
    ///
    /// Returns `None` for an empty sequence.
    pub fn replay<'a>(states: impl IntoIterator<Item = (Time, &'a PhaseState)>) -> Option<Self> {
        let mut states = states.into_iter();
        let (_, first) = states.next()?;
        let mut tracker = Self::new(first);
        for (time, state) in states {
            tracker.observe(time, state);
        }
        Some(tracker)
    }

    #[must_use]
    pub fn stage(&self) -> NucleationStage {
        self.stage
    }

    #[must_use]
    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    #[must_use]
    pub fn log(&self) -> &NucleationLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut NucleationLog {
        &mut self.log
    }

    /// Updates the stage from a new state, recording any transition.
    pub fn observe(&mut self, at: Time, state: &PhaseState) {
        let stage = NucleationStage::of(state);
        if stage == self.stage {
            return;
        }
        if stage == NucleationStage::Supercooled {
            warn!(
                temperature_c = state.temperature().get::<degree_celsius>(),
                "store is supercooled"
            );
        }
        self.transitions.push(StageTransition {
            from: self.stage,
            to: stage,
            at,
        });
        self.stage = stage;
    }

    /// Triggers nucleation and records the attempt.
    ///
    /// The simulated trigger always takes on a supercooled store, so attempts
    /// made here only ever count as successes. Field outcomes that can fail
    /// go through [`NucleationTracker::log_mut`].
    ///
    /// # Errors
    ///
    /// Returns [`ThermalError::NotSupercooled`] if the store is not
    /// supercooled. A misplaced trigger is not counted as an attempt.
    pub fn trigger(
        &mut self,
        system: &ThermalSystem,
        at: Time,
        state: &PhaseState,
    ) -> Result<PhaseState, ThermalError> {
        let triggered = system.trigger_nucleation(state)?;
        self.log.record(triggered.is_crystallizing());
        self.observe(at, &triggered);
        Ok(triggered)
    }

    /// Whether the tracked states ever passed through `stage`.
    #[must_use]
    pub fn visited(&self, stage: NucleationStage) -> bool {
        self.transitions.iter().any(|t| t.to == stage || t.from == stage) || self.stage == stage
    }
}

/// Optional spontaneous nucleation of a supercooled store.
///
/// Off unless a caller supplies one. Each step the store spends supercooled
/// nucleates with `probability_per_step`. Draws are seeded from the step
/// index, so a run is reproducible regardless of how it is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpontaneousNucleation {
    pub probability_per_step: Fraction,
    pub seed: u64,
}

impl SpontaneousNucleation {
    pub(crate) fn fires(&self, step: usize) -> bool {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(step as u64));
        let fires = rng.gen_bool(self.probability_per_step.get());
        if fires {
            debug!(step, "spontaneous nucleation");
        }
        fires
    }
}
