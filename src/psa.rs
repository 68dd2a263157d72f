//! Probabilistic sensitivity analysis
//!
//! Each arm owns one [`ProbabilisticParams`] seeded from the run seed and
//! resampled between trials; every trial simulates one cohort per arm with a
//! trial-specific cohort seed shared by both arms.

use serde::Serialize;
use tracing::info;

use crate::cea::net_monetary_benefit;
use crate::cohort::Cohort;
use crate::config::{ModelInputs, SimulationConfig};
use crate::error::ModelError;
use crate::probabilistic::{ProbabilisticParams, RelativeRiskMode};
use crate::state::Therapy;
use crate::stats::SummaryStat;

/// Mean outcomes of both arms in one trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PsaTrial {
    pub trial: usize,
    pub base_cost: f64,
    pub base_utility: f64,
    pub treated_cost: f64,
    pub treated_utility: f64,
}

impl PsaTrial {
    pub fn incremental_cost(&self) -> f64 {
        self.treated_cost - self.base_cost
    }

    pub fn incremental_utility(&self) -> f64 {
        self.treated_utility - self.base_utility
    }
}

/// Results of all PSA trials
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsaOutcomes {
    pub trials: Vec<PsaTrial>,
}

impl PsaOutcomes {
    pub fn incremental_cost_stat(&self) -> Result<SummaryStat, ModelError> {
        let values: Vec<f64> = self.trials.iter().map(PsaTrial::incremental_cost).collect();
        SummaryStat::new("incremental cost", &values)
    }

    pub fn incremental_utility_stat(&self) -> Result<SummaryStat, ModelError> {
        let values: Vec<f64> = self.trials.iter().map(PsaTrial::incremental_utility).collect();
        SummaryStat::new("incremental utility", &values)
    }

    /// Share of trials in which the treated arm has positive net monetary benefit
    pub fn probability_cost_effective(&self, willingness_to_pay: f64) -> f64 {
        if self.trials.is_empty() {
            return 0.0;
        }
        let favourable = self
            .trials
            .iter()
            .filter(|t| {
                net_monetary_benefit(
                    willingness_to_pay,
                    t.incremental_cost(),
                    t.incremental_utility(),
                ) > 0.0
            })
            .count();
        favourable as f64 / self.trials.len() as f64
    }
}

pub fn run_psa(
    inputs: &ModelInputs,
    simulation: &SimulationConfig,
) -> Result<PsaOutcomes, ModelError> {
    run_psa_with_mode(inputs, simulation, RelativeRiskMode::default())
}

pub fn run_psa_with_mode(
    inputs: &ModelInputs,
    simulation: &SimulationConfig,
    mode: RelativeRiskMode,
) -> Result<PsaOutcomes, ModelError> {
    simulation.validate()?;

    let steps = simulation.steps(inputs.delta_t)?;
    let mut base = ProbabilisticParams::with_mode(inputs, simulation.seed, Therapy::None, mode)?;
    let mut treated =
        ProbabilisticParams::with_mode(inputs, simulation.seed, Therapy::Anticoagulation, mode)?;

    let mut trials = Vec::with_capacity(simulation.psa_trials);
    for trial in 0..simulation.psa_trials {
        if trial > 0 {
            base.resample()?;
            treated.resample()?;
        }

        let cohort_seed = simulation.seed.wrapping_add(trial as u64);
        let id = trial as u64;
        let base_outcomes = Cohort::new(id, Therapy::None, simulation.population_size)
            .simulate(&base, steps, cohort_seed)?;
        let treated_outcomes =
            Cohort::new(id, Therapy::Anticoagulation, simulation.population_size)
                .simulate(&treated, steps, cohort_seed)?;

        trials.push(PsaTrial {
            trial,
            base_cost: base_outcomes.mean_cost(),
            base_utility: base_outcomes.mean_utility(),
            treated_cost: treated_outcomes.mean_cost(),
            treated_utility: treated_outcomes.mean_utility(),
        });
    }

    info!(trials = trials.len(), "probabilistic sensitivity analysis complete");
    Ok(PsaOutcomes { trials })
}
