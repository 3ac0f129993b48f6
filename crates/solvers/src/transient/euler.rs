//! Forward Euler solver for ODE problems.
//!
//! Steps a model forward with explicit Euler:
//!
//! ```text
//! state_{n+1} = state_n + derivative_n * dt
//! ```
//!
//! The step size is fixed. Callers are responsible for choosing a step that
//! satisfies the stability bound of their problem, and for bounding the run
//! with a step ceiling. Observers end a run early once a termination
//! condition holds.
//!
//! # Example
//!
//! ```ignore
//! use latent_solvers::transient::euler;
//!
//! let solution = euler::solve(&store, &problem, initial, dt, max_steps, |event| {
//!     target_reached(event).then_some(euler::Action::StopEarly)
//! })?;
//! ```

mod action;
mod error;
mod event;
mod solution;

pub use action::Action;
pub use error::Error;
pub use event::Event;
pub use solution::{Solution, Status};

use latent_core::{Model, Observer, OdeProblem, Snapshot, StepIntegrable};

/// Integrates an ODE problem using forward Euler.
///
/// # Algorithm
///
/// 1. Call the model with the initial input to get the initial snapshot.
/// 2. For each step:
///    - Extract the state from the current input.
///    - Compute the derivative from the current input and output.
///    - Step the state forward: `state + derivative * dt`.
///    - Build and finalize the next input.
///    - Call the model to get the next output.
///    - Emit an [`Event`]; stop if the observer returns [`Action::StopEarly`].
/// 3. Return the solution with the full history.
///
/// # Errors
///
/// Returns an error if the model or problem returns an error at any point.
pub fn solve<M, P, Obs>(
    model: &M,
    problem: &P,
    initial: M::Input,
    dt: P::Delta,
    steps: usize,
    mut observer: Obs,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    M::Input: Clone,
    M::Output: Clone,
    P: OdeProblem<Input = M::Input, Output = M::Output>,
    P::Delta: Clone,
    Obs: Observer<Event<M::Input, M::Output>, Action>,
{
    let initial_output = model.call(&initial).map_err(Error::model)?;
    let initial_snapshot = Snapshot::new(initial, initial_output);

    let mut history = Vec::with_capacity(steps.min(1 << 16) + 1);
    history.push(initial_snapshot.clone());

    let event = Event {
        step: 0,
        snapshot: initial_snapshot.clone(),
    };
    if let Some(Action::StopEarly) = observer.observe(&event) {
        return Ok(Solution {
            status: Status::StoppedByObserver,
            history,
            steps: 0,
        });
    }

    let mut current = initial_snapshot;

    for step in 1..=steps {
        let state = problem.state(&current.input).map_err(Error::problem)?;
        let derivative = problem
            .derivative(&current.input, &current.output)
            .map_err(Error::problem)?;

        let next_state = state.step(derivative, dt.clone());

        let next_input = problem
            .build_input(&current.input, &next_state, &dt)
            .map_err(Error::problem)?;
        let next_input = problem
            .finalize_step(next_input, &current.input, &current.output, &dt)
            .map_err(Error::problem)?;

        let next_output = model.call(&next_input).map_err(Error::model)?;
        let next_snapshot = Snapshot::new(next_input, next_output);

        history.push(next_snapshot.clone());

        let event = Event {
            step,
            snapshot: next_snapshot.clone(),
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution {
                status: Status::StoppedByObserver,
                history,
                steps: step,
            });
        }

        current = next_snapshot;
    }

    Ok(Solution {
        status: Status::Complete,
        history,
        steps,
    })
}

/// Integrates an ODE problem using forward Euler without observation.
///
/// # Errors
///
/// Returns an error if the model or problem returns an error at any point.
pub fn solve_unobserved<M, P>(
    model: &M,
    problem: &P,
    initial: M::Input,
    dt: P::Delta,
    steps: usize,
) -> Result<Solution<M::Input, M::Output>, Error>
where
    M: Model,
    M::Input: Clone,
    M::Output: Clone,
    P: OdeProblem<Input = M::Input, Output = M::Output>,
    P::Delta: Clone,
{
    solve(model, problem, initial, dt, steps, ())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    use approx::assert_relative_eq;
    use latent_core::DerivativeOf;

    // --- Test fixtures: a lumped body cooling toward ambient ---

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Temperature(f64);

    #[derive(Debug, Clone, Copy)]
    struct CoolingRate(f64);

    impl StepIntegrable<f64> for Temperature {
        type Derivative = CoolingRate;

        fn step(&self, derivative: CoolingRate, dt: f64) -> Self {
            Temperature(self.0 + derivative.0 * dt)
        }
    }

    #[derive(Debug, Clone)]
    struct Input {
        temperature: Temperature,
        time: f64,
    }

    #[derive(Debug, Clone)]
    struct Output {
        heat_loss: f64,
    }

    /// Body of capacitance `c` (J/K) losing heat through conductance `ua` (W/K).
    struct Body {
        ua: f64,
        c: f64,
        ambient: f64,
    }

    impl Model for Body {
        type Input = Input;
        type Output = Output;
        type Error = Infallible;

        fn call(&self, input: &Input) -> Result<Output, Infallible> {
            Ok(Output {
                heat_loss: self.ua * (input.temperature.0 - self.ambient),
            })
        }
    }

    struct Cooling {
        c: f64,
    }

    impl OdeProblem for Cooling {
        type Input = Input;
        type Output = Output;
        type Delta = f64;
        type State = Temperature;
        type Error = Infallible;

        fn state(&self, input: &Input) -> Result<Temperature, Infallible> {
            Ok(input.temperature)
        }

        fn derivative(
            &self,
            _input: &Input,
            output: &Output,
        ) -> Result<DerivativeOf<Temperature, f64>, Infallible> {
            Ok(CoolingRate(-output.heat_loss / self.c))
        }

        fn build_input(
            &self,
            base: &Input,
            state: &Temperature,
            delta: &f64,
        ) -> Result<Input, Infallible> {
            Ok(Input {
                temperature: *state,
                time: base.time + delta,
            })
        }
    }

    fn body() -> (Body, Cooling) {
        let body = Body {
            ua: 2.0,
            c: 1000.0,
            ambient: 20.0,
        };
        let problem = Cooling { c: body.c };
        (body, problem)
    }

    fn hot_start() -> Input {
        Input {
            temperature: Temperature(80.0),
            time: 0.0,
        }
    }

    #[test]
    fn single_step_matches_hand_calculation() {
        let (body, problem) = body();
        let solution = solve_unobserved(&body, &problem, hot_start(), 10.0, 1).unwrap();

        // dT = -2 * 60 / 1000 * 10
        assert_relative_eq!(solution.last().input.temperature.0, 78.8);
        assert_relative_eq!(solution.last().input.time, 10.0);
    }

    #[test]
    fn approaches_exponential_decay() {
        let (body, problem) = body();
        let dt = 1.0;
        let steps = 500;
        let solution = solve_unobserved(&body, &problem, hot_start(), dt, steps).unwrap();

        let tau = body.c / body.ua;
        let exact = 20.0 + 60.0 * (-(steps as f64) * dt / tau).exp();

        assert_eq!(solution.status, Status::Complete);
        assert_eq!(solution.history.len(), steps + 1);
        assert_relative_eq!(
            solution.last().input.temperature.0,
            exact,
            max_relative = 1e-3
        );
    }

    #[test]
    fn observer_can_stop_early() {
        let (body, problem) = body();
        let observer = |event: &Event<Input, Output>| {
            (event.snapshot.input.temperature.0 < 50.0).then_some(Action::StopEarly)
        };

        let solution = solve(&body, &problem, hot_start(), 10.0, 10_000, observer).unwrap();

        assert_eq!(solution.status, Status::StoppedByObserver);
        assert!(solution.last().input.temperature.0 < 50.0);
        let previous = &solution.history[solution.history.len() - 2];
        assert!(previous.input.temperature.0 >= 50.0);
    }

    #[test]
    fn zero_steps_returns_initial() {
        let (body, problem) = body();
        let solution = solve_unobserved(&body, &problem, hot_start(), 10.0, 0).unwrap();

        assert_eq!(solution.status, Status::Complete);
        assert_eq!(solution.steps, 0);
        assert_eq!(solution.history.len(), 1);
    }

    #[test]
    fn step_numbers_start_at_zero() {
        let (body, problem) = body();
        let mut steps_seen = Vec::new();
        solve(
            &body,
            &problem,
            hot_start(),
            1.0,
            3,
            |event: &Event<Input, Output>| {
                steps_seen.push(event.step);
                None
            },
        )
        .unwrap();

        assert_eq!(steps_seen, vec![0, 1, 2, 3]);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("store exploded")]
    struct Exploded;

    struct Failing;

    impl Model for Failing {
        type Input = Input;
        type Output = Output;
        type Error = Exploded;

        fn call(&self, _input: &Input) -> Result<Output, Exploded> {
            Err(Exploded)
        }
    }

    #[test]
    fn model_errors_can_be_recovered_by_type() {
        let (_, problem) = body();
        let err = solve_unobserved(&Failing, &problem, hot_start(), 1.0, 3).unwrap_err();
        assert!(matches!(err, Error::Model(_)));
        assert!(err.downcast::<Exploded>().is_ok());
    }
}
