use crate::{DerivativeOf, StepIntegrable};

/// Adapts a [`Model`](crate::Model) to time integration.
///
/// An ODE problem pulls the integrable state out of a model input, turns the
/// model's output into that state's derivative, and rebuilds the next model
/// input once the solver has stepped the state forward.
///
/// For a thermal store the state is the PCM phase state, the derivative is the
/// net heat balance acting on it, and `Delta` is the time step.
pub trait OdeProblem {
    type Input;
    type Output;
    type Delta;
    type State: StepIntegrable<Self::Delta>;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Extracts the state from model input.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the state cannot be extracted from the input.
    fn state(&self, input: &Self::Input) -> Result<Self::State, Self::Error>;

    /// Computes the derivative of the state from model input and output.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the derivative cannot be computed.
    fn derivative(
        &self,
        input: &Self::Input,
        output: &Self::Output,
    ) -> Result<DerivativeOf<Self::State, Self::Delta>, Self::Error>;

    /// Builds the next model input from a stepped state and the step size.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if the input cannot be constructed from the state.
    fn build_input(
        &self,
        base: &Self::Input,
        state: &Self::State,
        delta: &Self::Delta,
    ) -> Result<Self::Input, Self::Error>;

    /// Finalizes input after an accepted step.
    ///
    /// This is where discrete events belong, such as firing a nucleation
    /// trigger once the store is found supercooled. The default returns the
    /// input unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Self::Error`] if finalization fails.
    fn finalize_step(
        &self,
        next_input: Self::Input,
        _prev_input: &Self::Input,
        _prev_output: &Self::Output,
        _step_delta: &Self::Delta,
    ) -> Result<Self::Input, Self::Error> {
        Ok(next_input)
    }
}
