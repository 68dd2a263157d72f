//! Parameter sets consumed by the cohort simulation
//!
//! A [`ParameterSet`] answers everything one simulated cycle needs: the
//! transition row of the current state and the annual rewards. The
//! deterministic variant is fixed at construction; the probabilistic variant
//! lives in [`crate::probabilistic`].

use serde::Serialize;

use crate::config::ModelInputs;
use crate::error::ModelError;
use crate::matrix::{therapy_adjusted, TransitionMatrix, TransitionRow};
use crate::state::{HealthState, Therapy, STATE_COUNT};

/// Read access to one realization of the model parameters
pub trait ParameterSet {
    fn therapy(&self) -> Therapy;
    fn initial_state(&self) -> HealthState;
    /// Cycle length in years
    fn step_size(&self) -> f64;
    fn discount_rate_per_step(&self) -> f64;
    /// Probabilities of moving from `state` to each state, in state order
    fn transition_probabilities(&self, state: HealthState) -> &TransitionRow;
    fn annual_cost(&self, state: HealthState) -> f64;
    fn annual_utility(&self, state: HealthState) -> f64;
    /// Annual treatment cost paid while alive
    fn treatment_cost(&self) -> f64;
}

/// Settings shared by both parameter-set variants of one therapy arm
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArmSettings {
    pub therapy: Therapy,
    pub initial_state: HealthState,
    pub delta_t: f64,
    pub discount_rate_per_step: f64,
    pub treatment_cost: f64,
}

impl ArmSettings {
    pub fn new(inputs: &ModelInputs, therapy: Therapy) -> Self {
        let treatment_cost = match therapy {
            Therapy::None => 0.0,
            Therapy::Anticoagulation => inputs.anticoagulation_cost,
        };
        Self {
            therapy,
            initial_state: HealthState::Well,
            delta_t: inputs.delta_t,
            discount_rate_per_step: inputs.discount_rate * inputs.delta_t,
            treatment_cost,
        }
    }
}

/// One complete parameter realization: matrix plus per-state rewards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSnapshot {
    pub matrix: TransitionMatrix,
    pub annual_costs: [f64; STATE_COUNT],
    pub annual_utilities: [f64; STATE_COUNT],
}

/// Expected-value parameters of one therapy arm
#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicParams {
    settings: ArmSettings,
    snapshot: ParameterSnapshot,
}

impl DeterministicParams {
    pub fn new(inputs: &ModelInputs, therapy: Therapy) -> Result<Self, ModelError> {
        inputs.validate()?;

        let baseline = inputs.baseline_matrix()?;
        let matrix = match therapy {
            Therapy::None => baseline,
            Therapy::Anticoagulation => therapy_adjusted(&baseline, inputs.relative_risks())?,
        };

        Ok(Self {
            settings: ArmSettings::new(inputs, therapy),
            snapshot: ParameterSnapshot {
                matrix,
                annual_costs: inputs.annual_state_costs,
                annual_utilities: inputs.annual_state_utilities,
            },
        })
    }

    /// Transition matrix used for every cycle
    pub fn matrix(&self) -> &TransitionMatrix {
        &self.snapshot.matrix
    }

    /// Matrix, costs and utilities as one value
    pub fn snapshot(&self) -> &ParameterSnapshot {
        &self.snapshot
    }
}

impl ParameterSet for DeterministicParams {
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_no_treatment_uses_baseline() {
        let inputs = ModelInputs::default();
        let params = DeterministicParams::new(&inputs, Therapy::None).unwrap();
        assert_eq!(params.matrix(), &inputs.baseline_matrix().unwrap());
        assert_eq!(params.treatment_cost(), 0.0);
        assert_eq!(params.initial_state(), HealthState::Well);
    }

    #[test]
    fn test_anticoagulation_reads_every_state() {
        let inputs = ModelInputs::default();
        let params = DeterministicParams::new(&inputs, Therapy::Anticoagulation).unwrap();
        assert_eq!(params.treatment_cost(), inputs.anticoagulation_cost);

        for state in HealthState::ALL {
            let row = params.transition_probabilities(state);
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            assert_eq!(params.annual_cost(state), inputs.annual_cost(state));
            assert_eq!(params.annual_utility(state), inputs.annual_utility(state));
        }

        let post = params.transition_probabilities(HealthState::PostStroke);
        assert_relative_eq!(post[HealthState::Stroke.index()], 0.65 * 0.10, epsilon = 1e-12);
        assert_relative_eq!(
            post[HealthState::Death.index()],
            0.65 * 1.05 * 0.05,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_death_row_is_absorbing_for_both_arms() {
        let inputs = ModelInputs::default();
        for therapy in Therapy::ALL {
            let params = DeterministicParams::new(&inputs, therapy).unwrap();
            assert_eq!(
                *params.transition_probabilities(HealthState::Death),
                [0.0, 0.0, 0.0, 1.0]
            );
        }
    }

    #[test]
    fn test_discount_rate_scales_with_step() {
        let inputs = ModelInputs {
            delta_t: 0.25,
            ..ModelInputs::default()
        };
        let params = DeterministicParams::new(&inputs, Therapy::None).unwrap();
        assert_relative_eq!(params.discount_rate_per_step(), 0.03 * 0.25);
        assert_eq!(params.step_size(), 0.25);
    }

    #[test]
    fn test_inconsistent_risks_fail_construction() {
        let inputs = ModelInputs {
            rr_stroke: 5.0,
            rr_bleeding: 5.0,
            rr_bleeding_ci: [4.0, 6.0],
            ..ModelInputs::default()
        };
        assert!(DeterministicParams::new(&inputs, Therapy::Anticoagulation).is_err());
        assert!(DeterministicParams::new(&inputs, Therapy::None).is_ok());
    }
}
