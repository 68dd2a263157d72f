//! Error types for model construction and simulation

use thiserror::Error;

use crate::state::HealthState;

/// Error type for all fallible operations in this crate
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A transition matrix row is not a probability distribution
    #[error("transition row for {state} sums to {sum}, expected 1")]
    RowSum { state: HealthState, sum: f64 },
    #[error("transition probability {from} -> {to} is {value}, outside [0, 1]")]
    ProbabilityOutOfRange {
        from: HealthState,
        to: HealthState,
        value: f64,
    },
    #[error("absorbing state {state} must transition to itself with probability 1")]
    AbsorbingRow { state: HealthState },
    /// Relative-risk scaling left no room for the self-transition
    #[error("relative-risk adjustment of {state} leaves self-transition probability {value}")]
    NegativeRemainder { state: HealthState, value: f64 },
    #[error("invalid {what} distribution: {reason}")]
    InvalidDistribution { what: String, reason: String },
    /// Caller asked for a non-absorbing-only quantity of the absorbing state
    #[error("{state} is absorbing and has no sampled transition row")]
    AbsorbingState { state: HealthState },
    #[error("sample of length {got} does not fit the {expected} reachable columns of {state}")]
    SampleLength {
        state: HealthState,
        expected: usize,
        got: usize,
    },
    #[error("cannot summarise empty sample: {0}")]
    EmptySample(String),
}

impl ModelError {
    pub(crate) fn distribution(what: impl Into<String>, reason: impl ToString) -> Self {
        ModelError::InvalidDistribution {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}
