/// Receives solver events and optionally returns a control action.
///
/// Observers let callers watch a run as it progresses and steer it, for
/// example by stopping a charge once the store reaches its target.
///
/// Closures of the form `FnMut(&E) -> Option<A>` are observers, and `()` is an
/// observer that never acts.
pub trait Observer<E, A> {
    /// Observes an event, returning an action for the solver to apply.
    fn observe(&mut self, event: &E) -> Option<A>;
}

impl<E, A, F> Observer<E, A> for F
where
    F: FnMut(&E) -> Option<A>,
{
    fn observe(&mut self, event: &E) -> Option<A> {
        self(event)
    }
}

impl<E, A> Observer<E, A> for () {
    fn observe(&mut self, _event: &E) -> Option<A> {
        None
    }
}
