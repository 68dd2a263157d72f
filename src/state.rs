//! Health states and therapy arms
//!
//! The state order is fixed here and is the only index used for matrix rows,
//! matrix columns and per-state vectors:
//! - Well
//! - Stroke
//! - PostStroke
//! - Death (absorbing)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of health states in the model
pub const STATE_COUNT: usize = 4;

/// Mutually exclusive health state of a simulated patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HealthState {
    /// No history of stroke
    Well,
    /// Acute stroke event during the current cycle
    Stroke,
    /// Survived at least one stroke
    PostStroke,
    /// Absorbing state
    Death,
}

impl HealthState {
    /// All states in index order
    pub const ALL: [HealthState; STATE_COUNT] = [
        HealthState::Well,
        HealthState::Stroke,
        HealthState::PostStroke,
        HealthState::Death,
    ];

    /// Row/column index of this state
    pub fn index(self) -> usize {
        match self {
            HealthState::Well => 0,
            HealthState::Stroke => 1,
            HealthState::PostStroke => 2,
            HealthState::Death => 3,
        }
    }

    /// State at a row/column index, if any
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// True for the single absorbing state
    pub fn is_absorbing(self) -> bool {
        self == HealthState::Death
    }

    pub fn is_alive(self) -> bool {
        !self.is_absorbing()
    }

    pub fn name(self) -> &'static str {
        match self {
            HealthState::Well => "Well",
            HealthState::Stroke => "Stroke",
            HealthState::PostStroke => "PostStroke",
            HealthState::Death => "Death",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Therapy arm being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Therapy {
    /// No treatment (baseline transition matrix)
    None,
    /// Anticoagulation (relative-risk adjusted matrix and treatment cost)
    Anticoagulation,
}

impl Therapy {
    pub const ALL: [Therapy; 2] = [Therapy::None, Therapy::Anticoagulation];

    pub fn label(self) -> &'static str {
        match self {
            Therapy::None => "No treatment",
            Therapy::Anticoagulation => "Anticoagulation",
        }
    }
}

impl fmt::Display for Therapy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
