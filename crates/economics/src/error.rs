use latent_core::constraint::Violation;
use thiserror::Error;

/// Errors raised by the economic and market models.
#[derive(Debug, Error, PartialEq)]
pub enum EconomicsError {
    /// A rate, cost or count is out of range.
    #[error("invalid assumption: {0}")]
    Configuration(#[from] Violation),

    /// A comparison needs at least two options.
    #[error("a comparison needs at least 2 options, got {count}")]
    TooFewOptions { count: usize },

    /// The named baseline is not among the compared options.
    #[error("baseline `{name}` is not one of the compared options")]
    UnknownBaseline { name: String },

    /// Yearly table entries must be in strictly increasing year order.
    #[error("`{parameter}` has year {year} out of order: years must strictly increase")]
    UnsortedTable { parameter: &'static str, year: i32 },

    /// An uncertain parameter cannot be sampled.
    #[error("cannot sample `{parameter}`: {reason}")]
    Distribution { parameter: String, reason: String },
}
