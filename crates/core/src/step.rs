/// A type that can be stepped forward using its derivative.
///
/// Generic solvers step a state via `derivative * delta`. The derivative is
/// free to carry whatever the state needs to interpret it; a PCM phase state,
/// for instance, is stepped by a heat balance that also names the material
/// absorbing the heat.
///
/// `Delta` can be a plain scalar like `f64` or a dimensioned `uom` quantity.
pub trait StepIntegrable<Delta> {
    /// The derivative of the type with respect to `Delta`.
    type Derivative;

    /// Returns the value after stepping with a derivative and step size.
    #[must_use]
    fn step(&self, derivative: Self::Derivative, delta: Delta) -> Self;
}

/// The derivative of a [`StepIntegrable`] type.
pub type DerivativeOf<T, Delta> = <T as StepIntegrable<Delta>>::Derivative;
