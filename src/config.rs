//! Model inputs and simulation settings
//!
//! [`ModelInputs`] is the read-only baseline data every parameter set is
//! built from. [`SimulationConfig`] controls cohort size, horizon and PSA.
//! Both deserialize from JSON with every field optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::matrix::{RelativeRisks, TransitionMatrix, TransitionRow};
use crate::state::{HealthState, STATE_COUNT};

/// Baseline data for the stroke / anticoagulation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInputs {
    /// Simulation time step in years
    pub delta_t: f64,
    /// Annual discount rate
    pub discount_rate: f64,
    /// No-treatment transition matrix, rows and columns in state order
    pub transition_matrix: [TransitionRow; STATE_COUNT],
    /// Annual cost of each state
    pub annual_state_costs: [f64; STATE_COUNT],
    /// Annual utility of each state
    pub annual_state_utilities: [f64; STATE_COUNT],
    /// Annual cost of anticoagulation
    pub anticoagulation_cost: f64,
    /// Stroke-risk reduction under anticoagulation
    pub rr_stroke: f64,
    /// Bleeding relative risk under anticoagulation
    pub rr_bleeding: f64,
    /// 95% confidence interval of the bleeding relative risk, [lower, upper]
    pub rr_bleeding_ci: [f64; 2],
}

impl Default for ModelInputs {
    fn default() -> Self {
        Self {
            delta_t: 1.0,
            discount_rate: 0.03,
            transition_matrix: [
                [0.90, 0.06, 0.0, 0.04],
                [0.0, 0.0, 0.75, 0.25],
                [0.0, 0.10, 0.85, 0.05],
                [0.0, 0.0, 0.0, 1.0],
            ],
            annual_state_costs: [0.0, 5_000.0, 200.0, 0.0],
            annual_state_utilities: [0.9, 0.2, 0.65, 0.0],
            anticoagulation_cost: 2_000.0,
            rr_stroke: 0.65,
            rr_bleeding: 1.05,
            rr_bleeding_ci: [0.98, 1.12],
        }
    }
}

impl ModelInputs {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.delta_t.is_finite() || self.delta_t <= 0.0 {
            return Err(ModelError::InvalidConfig(
                "delta_t must be finite and greater than zero".to_string(),
            ));
        }

        if !self.discount_rate.is_finite() || self.discount_rate < 0.0 {
            return Err(ModelError::InvalidConfig(
                "discount_rate must be finite and non-negative".to_string(),
            ));
        }

        self.baseline_matrix()?;

        for state in HealthState::ALL {
            let cost = self.annual_state_costs[state.index()];
            if !cost.is_finite() || cost < 0.0 {
                return Err(ModelError::InvalidConfig(format!(
                    "annual cost of {state} must be finite and non-negative, got {cost}"
                )));
            }

            let utility = self.annual_state_utilities[state.index()];
            if !(0.0..=1.0).contains(&utility) {
                return Err(ModelError::InvalidConfig(format!(
                    "annual utility of {state} must lie in [0, 1], got {utility}"
                )));
            }
        }

        if !self.anticoagulation_cost.is_finite() || self.anticoagulation_cost < 0.0 {
            return Err(ModelError::InvalidConfig(
                "anticoagulation_cost must be finite and non-negative".to_string(),
            ));
        }

        for (name, rr) in [("rr_stroke", self.rr_stroke), ("rr_bleeding", self.rr_bleeding)] {
            if !rr.is_finite() || rr <= 0.0 {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} must be finite and greater than zero, got {rr}"
                )));
            }
        }

        let [lower, upper] = self.rr_bleeding_ci;
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(ModelError::InvalidConfig(
                "rr_bleeding_ci must be a finite interval with lower < upper".to_string(),
            ));
        }
        if !(lower..=upper).contains(&self.rr_bleeding) {
            return Err(ModelError::InvalidConfig(format!(
                "rr_bleeding {} lies outside its confidence interval [{lower}, {upper}]",
                self.rr_bleeding
            )));
        }

        Ok(())
    }

    /// Validated no-treatment transition matrix
    pub fn baseline_matrix(&self) -> Result<TransitionMatrix, ModelError> {
        TransitionMatrix::from_rows(self.transition_matrix)
    }

    /// Point estimates of the treatment relative risks
    pub fn relative_risks(&self) -> RelativeRisks {
        RelativeRisks::new(self.rr_stroke, self.rr_bleeding)
    }

    pub fn annual_cost(&self, state: HealthState) -> f64 {
        self.annual_state_costs[state.index()]
    }

    pub fn annual_utility(&self, state: HealthState) -> f64 {
        self.annual_state_utilities[state.index()]
    }
}

/// Upper bound on simulated cycles per patient
pub const MAX_CYCLES: usize = 1_000_000;

/// Cohort and sensitivity-analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Patients per simulated cohort
    pub population_size: usize,
    /// Simulation horizon in years
    pub sim_length: f64,
    /// Seed for cohorts and parameter sampling
    pub seed: u64,
    /// Number of probabilistic sensitivity analysis trials (0 disables PSA)
    pub psa_trials: usize,
    /// Willingness to pay per unit of utility
    pub willingness_to_pay: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            population_size: 2_000,
            sim_length: 50.0,
            seed: 1,
            psa_trials: 0,
            willingness_to_pay: 50_000.0,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.population_size == 0 {
            return Err(ModelError::InvalidConfig(
                "population_size must be greater than zero".to_string(),
            ));
        }

        if !self.sim_length.is_finite() || self.sim_length <= 0.0 {
            return Err(ModelError::InvalidConfig(
                "sim_length must be finite and greater than zero".to_string(),
            ));
        }

        if !self.willingness_to_pay.is_finite() || self.willingness_to_pay < 0.0 {
            return Err(ModelError::InvalidConfig(
                "willingness_to_pay must be finite and non-negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Number of cycles covering the horizon, at most [`MAX_CYCLES`]
    pub fn steps(&self, delta_t: f64) -> Result<usize, ModelError> {
        let cycles = (self.sim_length / delta_t).ceil();
        if !cycles.is_finite() || cycles < 0.0 || cycles > MAX_CYCLES as f64 {
            return Err(ModelError::InvalidConfig(format!(
                "sim_length {} with delta_t {delta_t} needs {cycles} cycles, limit is {MAX_CYCLES}",
                self.sim_length
            )));
        }
        Ok(cycles as usize)
    }
}

/// Full run configuration as read from disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub inputs: ModelInputs,
    pub simulation: SimulationConfig,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        self.inputs.validate()?;
        self.simulation.validate()?;
        self.simulation.steps(self.inputs.delta_t)?;
        Ok(())
    }
}

/// Load a configuration file, or the built-in defaults when `path` is `None`
pub fn load_config(path: Option<&Path>) -> Result<ModelConfig, ModelError> {
    let config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            serde_json::from_str(&raw)?
        }
        None => ModelConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
