//! Error type shared by every demo in the crate.
use crate::simulation::Phase;
use thiserror::Error;

pub type LabResult<T> = Result<T, LabError>;

#[derive(Debug, Error)]
pub enum LabError {
    /// A numeric field rejected its new value; the previous value is kept.
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("input {index} is invalid: {message}")]
    Field { index: usize, message: String },

    #[error("invalid topology: {0}")]
    Topology(String),

    #[error("cannot {action} while {phase}")]
    Transition { action: &'static str, phase: Phase },

    #[error("already at the minimum (θ = {position})")]
    AtMinimum { position: f64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown {kind} `{value}`")]
    Unknown { kind: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

/// Why a text or slider value was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("`{0}` is not a number")]
    NotANumber(String),

    #[error("value must be finite")]
    NonFinite,

    #[error("{value} is outside [{min}, {max}]")]
    OutOfBounds { value: f64, min: f64, max: f64 },
}
