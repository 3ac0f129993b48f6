/// A deterministic callable mapping a typed input to a typed output.
///
/// Models must always produce the same result for a given input. Storage
/// models evaluate instantaneous heat flows for a store state; the transient
/// solver owns the stepping.
pub trait Model {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Calls the model with the given input.
    ///
    /// # Errors
    ///
    /// Each model defines its own `Error` type, allowing it to determine what
    /// constitutes a failure within its domain.
    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// A captured input/output pair from a single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<I, O> {
    pub input: I,
    pub output: O,
}

impl<I, O> Snapshot<I, O> {
    /// Creates a snapshot from a model input and the output it produced.
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}
