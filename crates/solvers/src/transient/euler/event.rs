use latent_core::Snapshot;

/// One point of an Euler run, handed to the observer.
///
/// Step 0 carries the initial input; a simulator that is already done can
/// stop there without integrating.
#[derive(Debug, Clone)]
pub struct Event<I, O> {
    pub step: usize,
    pub snapshot: Snapshot<I, O>,
}
