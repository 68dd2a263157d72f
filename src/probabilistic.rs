//! Probabilistic parameter set for sensitivity analysis
//!
//! Every draw comes from one `ChaCha8Rng` owned by the instance. A resample
//! draws, in this order: one Dirichlet row per non-absorbing state, one cost per
//! state, one utility per state, and (only when relative risks are folded into
//! the matrix) one log bleeding relative risk. The same seed therefore yields
//! the same sequence of snapshots on every platform.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;
use tracing::debug;

use crate::config::ModelInputs;
use crate::distributions::{st_dev_from_ci95, RowDistribution, ScalarDistribution};
use crate::error::ModelError;
use crate::matrix::{therapy_adjusted, RelativeRisks, TransitionMatrix, TransitionRow};
use crate::params::{ArmSettings, ParameterSet, ParameterSnapshot};
use crate::state::{HealthState, Therapy, STATE_COUNT};

/// Cost standard deviation as a fraction of its mean
const COST_CV: f64 = 0.25;
/// Utility standard deviation as a fraction of its mean
const UTILITY_CV: f64 = 0.2;

/// Whether a sampled bleeding relative risk adjusts the resampled matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelativeRiskMode {
    /// The log relative risk distribution is built but never drawn from
    #[default]
    Ignored,
    /// Anticoagulation matrices are adjusted with a freshly drawn bleeding risk
    Folded,
}

/// Parameters redrawn from their uncertainty distributions once per trial
///
/// A state whose baseline cost or utility is zero keeps a `Fixed(0.0)`
/// distribution and takes no draw from the stream. The sequence of sampled
/// values therefore differs from one that spends a draw on every state, even
/// for the same seed.
#[derive(Debug, Clone)]
pub struct ProbabilisticParams {
    settings: ArmSettings,
    rng: ChaCha8Rng,
    mode: RelativeRiskMode,
    rr_stroke: f64,
    /// Indexed by state; `None` for the absorbing state
    row_dists: [Option<RowDistribution>; STATE_COUNT],
    ln_rr_bleeding: ScalarDistribution,
    cost_dists: [ScalarDistribution; STATE_COUNT],
    utility_dists: [ScalarDistribution; STATE_COUNT],
    snapshot: ParameterSnapshot,
    sampled_rr_bleeding: Option<f64>,
    resamples: u64,
}

impl ProbabilisticParams {
    /// Build with the default [`RelativeRiskMode`] and draw the first snapshot
    pub fn new(inputs: &ModelInputs, seed: u64, therapy: Therapy) -> Result<Self, ModelError> {
        Self::with_mode(inputs, seed, therapy, RelativeRiskMode::default())
    }

    pub fn with_mode(
        inputs: &ModelInputs,
        seed: u64,
        therapy: Therapy,
        mode: RelativeRiskMode,
    ) -> Result<Self, ModelError> {
        inputs.validate()?;
        let baseline = inputs.baseline_matrix()?;

        let row_dists = build_row_distributions(&baseline)?;

        let [lower, upper] = inputs.rr_bleeding_ci;
        let ln_rr_bleeding =
            ScalarDistribution::normal(inputs.rr_bleeding.ln(), st_dev_from_ci95(lower, upper))?;

        let cost_dists = per_state(|state| cost_distribution(state, inputs.annual_cost(state)))?;
        let utility_dists =
            per_state(|state| utility_distribution(state, inputs.annual_utility(state)))?;

        let mut params = Self {
            settings: ArmSettings::new(inputs, therapy),
            rng: ChaCha8Rng::seed_from_u64(seed),
            mode,
            rr_stroke: inputs.rr_stroke,
            row_dists,
            ln_rr_bleeding,
            cost_dists,
            utility_dists,
            snapshot: ParameterSnapshot {
                matrix: baseline,
                annual_costs: inputs.annual_state_costs,
                annual_utilities: inputs.annual_state_utilities,
            },
            sampled_rr_bleeding: None,
            resamples: 0,
        };
        params.resample()?;
        Ok(params)
    }

    /// Replace the matrix, costs and utilities with a fresh draw
    pub fn resample(&mut self) -> Result<(), ModelError> {
        let mut rows = [[0.0; STATE_COUNT]; STATE_COUNT];
        for state in HealthState::ALL {
            rows[state.index()] = match &self.row_dists[state.index()] {
                None => TransitionMatrix::unit_row(state),
                Some(dist) => dist.sample_row(&mut self.rng)?,
            };
        }
        let mut matrix = TransitionMatrix::from_rows(rows)?;

        let mut annual_costs = [0.0; STATE_COUNT];
        for (cost, dist) in annual_costs.iter_mut().zip(&self.cost_dists) {
            *cost = dist.sample(&mut self.rng);
        }

        let mut annual_utilities = [0.0; STATE_COUNT];
        for (utility, dist) in annual_utilities.iter_mut().zip(&self.utility_dists) {
            *utility = dist.sample(&mut self.rng);
        }

        self.sampled_rr_bleeding = None;
        if self.mode == RelativeRiskMode::Folded && self.settings.therapy == Therapy::Anticoagulation
        {
            let rr_bleeding = self.ln_rr_bleeding.sample(&mut self.rng).exp();
            matrix = therapy_adjusted(&matrix, RelativeRisks::new(self.rr_stroke, rr_bleeding))?;
            self.sampled_rr_bleeding = Some(rr_bleeding);
        }

        self.snapshot = ParameterSnapshot {
            matrix,
            annual_costs,
            annual_utilities,
        };
        self.resamples += 1;

        debug!(
            therapy = %self.settings.therapy,
            resample = self.resamples,
            "resampled parameter set"
        );
        Ok(())
    }

    /// Dirichlet distribution of a non-absorbing state's transition row
    pub fn row_distribution(&self, state: HealthState) -> Result<&RowDistribution, ModelError> {
        self.row_dists[state.index()]
            .as_ref()
            .ok_or(ModelError::AbsorbingState { state })
    }

    /// Normal distribution of ln(bleeding relative risk)
    pub fn ln_rr_bleeding_distribution(&self) -> &ScalarDistribution {
        &self.ln_rr_bleeding
    }

    /// Annual cost distribution of `state`
    pub fn cost_distribution(&self, state: HealthState) -> &ScalarDistribution {
        &self.cost_dists[state.index()]
    }

    /// Annual utility distribution of `state`
    pub fn utility_distribution(&self, state: HealthState) -> &ScalarDistribution {
        &self.utility_dists[state.index()]
    }

    /// Bleeding relative risk used by the current snapshot, when folded in
    pub fn sampled_rr_bleeding(&self) -> Option<f64> {
        self.sampled_rr_bleeding
    }

    /// Whether resamples fold a sampled bleeding risk into the matrix
    pub fn mode(&self) -> RelativeRiskMode {
        self.mode
    }

    /// Transition matrix of the current snapshot
    pub fn matrix(&self) -> &TransitionMatrix {
        &self.snapshot.matrix
    }

    /// Matrix, costs and utilities of the most recent draw
    pub fn snapshot(&self) -> &ParameterSnapshot {
        &self.snapshot
    }

    /// Number of completed resamples, including the one at construction
    pub fn resample_count(&self) -> u64 {
        self.resamples
    }
}

impl ParameterSet for ProbabilisticParams {
    fn therapy(&self) -> Therapy {
        self.settings.therapy
    }

    fn initial_state(&self) -> HealthState {
        self.settings.initial_state
    }

    fn step_size(&self) -> f64 {
        self.settings.delta_t
    }

    fn discount_rate_per_step(&self) -> f64 {
        self.settings.discount_rate_per_step
    }

    fn transition_probabilities(&self, state: HealthState) -> &TransitionRow {
        self.snapshot.matrix.row(state)
    }

    fn annual_cost(&self, state: HealthState) -> f64 {
        self.snapshot.annual_costs[state.index()]
    }

    fn annual_utility(&self, state: HealthState) -> f64 {
        self.snapshot.annual_utilities[state.index()]
    }

    fn treatment_cost(&self) -> f64 {
        self.settings.treatment_cost
    }
}

fn build_row_distributions(
    baseline: &TransitionMatrix,
) -> Result<[Option<RowDistribution>; STATE_COUNT], ModelError> {
    let mut dists: [Option<RowDistribution>; STATE_COUNT] = Default::default();
    for state in HealthState::ALL.into_iter().filter(|s| !s.is_absorbing()) {
        dists[state.index()] = Some(RowDistribution::forward(state, baseline.row(state))?);
    }
    Ok(dists)
}

fn per_state<F>(mut build: F) -> Result<[ScalarDistribution; STATE_COUNT], ModelError>
where
    F: FnMut(HealthState) -> Result<ScalarDistribution, ModelError>,
{
    let mut dists = Vec::with_capacity(STATE_COUNT);
    for state in HealthState::ALL {
        dists.push(build(state)?);
    }
    dists.try_into().map_err(|_: Vec<ScalarDistribution>| {
        ModelError::InvalidConfig("per-state distribution count mismatch".to_string())
    })
}

// A state with zero cost or utility (Death, or an unpriced state) has no
// uncertainty to model and keeps its value.
fn cost_distribution(state: HealthState, mean: f64) -> Result<ScalarDistribution, ModelError> {
    if mean == 0.0 {
        return Ok(ScalarDistribution::Fixed(0.0));
    }
    ScalarDistribution::gamma_from_moments(mean, mean * COST_CV).map_err(|e| label(e, "cost", state))
}

fn utility_distribution(state: HealthState, mean: f64) -> Result<ScalarDistribution, ModelError> {
    if mean == 0.0 {
        return Ok(ScalarDistribution::Fixed(0.0));
    }
    ScalarDistribution::beta_from_moments(mean, mean * UTILITY_CV)
        .map_err(|e| label(e, "utility", state))
}

fn label(err: ModelError, parameter: &str, state: HealthState) -> ModelError {
    match err {
        ModelError::InvalidDistribution { what, reason } => ModelError::InvalidDistribution {
            what: format!("{what} ({parameter} of {state})"),
            reason,
        },
        other => other,
    }
}
