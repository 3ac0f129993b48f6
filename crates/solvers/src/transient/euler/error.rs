use std::error::Error as StdError;

/// Errors that can occur during Euler integration.
///
/// The source error is boxed so simulators can downcast it back into their
/// own domain error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("model error: {0}")]
    Model(#[source] Box<dyn StdError + Send + Sync>),

    #[error("problem error: {0}")]
    Problem(#[source] Box<dyn StdError + Send + Sync>),
}

impl Error {
    pub(crate) fn model<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Model(Box::new(err))
    }

    pub(crate) fn problem<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        Self::Problem(Box::new(err))
    }

    /// Recovers the typed source error if it is an `E`.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged when the source is some other type.
    pub fn downcast<E: StdError + 'static>(self) -> Result<E, Self> {
        match self {
            Self::Model(source) => source.downcast::<E>().map(|e| *e).map_err(Self::Model),
            Self::Problem(source) => source.downcast::<E>().map(|e| *e).map_err(Self::Problem),
        }
    }
}
