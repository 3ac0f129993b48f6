use latent_core::Snapshot;

/// How the solver terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Ran every requested step without being stopped.
    ///
    /// For a simulator watching for a termination condition this means the
    /// step ceiling was reached first.
    Complete,

    /// Stopped by an observer action.
    StoppedByObserver,
}

/// The result of an Euler integration.
#[derive(Debug, Clone)]
pub struct Solution<I, O> {
    /// How the solver terminated.
    pub status: Status,

    /// Snapshots from each step, starting with the initial state.
    pub history: Vec<Snapshot<I, O>>,

    /// Number of integration steps completed.
    pub steps: usize,
}

impl<I, O> Solution<I, O> {
    /// Returns the last snapshot in the history.
    ///
    /// The history always holds at least the initial snapshot.
    #[must_use]
    pub fn last(&self) -> &Snapshot<I, O> {
        self.history
            .last()
            .expect("history always contains the initial snapshot")
    }
}
