/// What an observer can ask of a running integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep the history so far and return it as the solution.
    StopEarly,
}
