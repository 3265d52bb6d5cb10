use thiserror::Error;

use crate::definitions::ParamName;

/// Errors raised for malformed inputs.
///
/// Poorly-fitting but well-formed data never produces an error; that outcome
/// is carried by `FitReport::success`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaxsError {
    /// A parameter list does not have one entry per population instance.
    #[error("parameter {name} has {actual} values, population count is {expected}")]
    ShapeMismatch {
        name: ParamName,
        expected: usize,
        actual: usize,
    },

    /// A parameter required by the population record is absent.
    #[error("missing parameter {0}")]
    MissingParameter(ParamName),

    /// The spectrum arrays are inconsistent or contain invalid q values.
    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(String),

    /// A spectrum feature could not be extracted.
    #[error("profiling failed: {0}")]
    Profile(String),
}

pub type Result<T> = std::result::Result<T, SaxsError>;
