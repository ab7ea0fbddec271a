use thiserror::Error;

/// Configuration errors, raised eagerly when an environment or learner is constructed
///
/// Nothing fails once construction has succeeded: stepping and training are total.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid grid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("unreachable or overlapping cells: {reason}")]
    UnreachableOrOverlappingCells { reason: String },

    #[error("invalid value {value} for `{name}`: must be in the interval {interval}")]
    InvalidHyperparameter {
        name: &'static str,
        value: f64,
        interval: &'static str,
    },

    #[error("invalid reward configuration: {reason}")]
    InvalidReward { reason: String },
}

/// Convenience alias for results carrying the crate's [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
