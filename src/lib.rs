//! Anticoagulation Markov model
//!
//! A discrete-time Markov cohort model of patients moving between Well,
//! Stroke, PostStroke and Death under no treatment or anticoagulation.
//! Parameters come either as a fixed expected-value set or as a seeded
//! probabilistic set resampled once per sensitivity-analysis trial.

pub mod cea;
pub mod cohort;
pub mod config;
pub mod distributions;
pub mod error;
pub mod logging;
pub mod matrix;
pub mod params;
pub mod probabilistic;
pub mod psa;
pub mod state;
pub mod stats;

// Re-export main types
pub use cea::{compare_arms, ComparativeOutcomes, CostEffectiveness};
pub use cohort::{Cohort, CohortOutcomes, PatientOutcome};
pub use config::{load_config, ModelConfig, ModelInputs, SimulationConfig};
pub use error::ModelError;
pub use matrix::{therapy_adjusted, RelativeRisks, TransitionMatrix};
pub use params::{DeterministicParams, ParameterSet};
pub use probabilistic::{ProbabilisticParams, RelativeRiskMode};
pub use psa::{run_psa, run_psa_with_mode, PsaOutcomes};
pub use state::{HealthState, Therapy};
pub use stats::SummaryStat;
