//! Markov cohort simulation
//!
//! Patients are advanced one cycle at a time through the transition rows of a
//! [`ParameterSet`], accumulating discounted costs and utilities until death or
//! the end of the horizon.

use rand::distributions::WeightedIndex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;
use serde::Serialize;
use tracing::{info, trace};

use crate::error::ModelError;
use crate::params::ParameterSet;
use crate::state::{HealthState, Therapy, STATE_COUNT};
use crate::stats::SummaryStat;

/// Outcome of one simulated patient
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientOutcome {
    /// Years until death, `None` if alive at the horizon
    pub survival_time: Option<f64>,
    /// Years until the first stroke, if any
    pub time_to_stroke: Option<f64>,
    pub stroke_count: usize,
    pub discounted_cost: f64,
    pub discounted_utility: f64,
}

/// Outcomes of one cohort run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortOutcomes {
    pub cohort_id: u64,
    pub therapy: Therapy,
    pub patients: Vec<PatientOutcome>,
    /// Patients alive at the start of each cycle, plus at the horizon
    pub survival_curve: Vec<usize>,
}

impl CohortOutcomes {
    /// Death times of patients who died within the horizon
    pub fn survival_times(&self) -> Vec<f64> {
        self.patients.iter().filter_map(|p| p.survival_time).collect()
    }

    /// Times of first stroke, for patients who had one
    pub fn stroke_times(&self) -> Vec<f64> {
        self.patients.iter().filter_map(|p| p.time_to_stroke).collect()
    }

    /// Discounted cost per patient
    pub fn costs(&self) -> Vec<f64> {
        self.patients.iter().map(|p| p.discounted_cost).collect()
    }

    /// Discounted utility per patient
    pub fn utilities(&self) -> Vec<f64> {
        self.patients.iter().map(|p| p.discounted_utility).collect()
    }

    /// Mean discounted cost over all patients
    pub fn mean_cost(&self) -> f64 {
        mean(&self.costs())
    }

    /// Mean discounted utility over all patients
    pub fn mean_utility(&self) -> f64 {
        mean(&self.utilities())
    }

    /// Mean survival among patients who died within the horizon
    pub fn mean_survival_time(&self) -> Option<f64> {
        let times = self.survival_times();
        (!times.is_empty()).then(|| mean(&times))
    }

    pub fn mean_stroke_count(&self) -> f64 {
        let counts: Vec<f64> = self.patients.iter().map(|p| p.stroke_count as f64).collect();
        mean(&counts)
    }

    pub fn survival_time_stat(&self) -> Result<SummaryStat, ModelError> {
        SummaryStat::new("survival time", &self.survival_times())
    }

    pub fn stroke_time_stat(&self) -> Result<SummaryStat, ModelError> {
        SummaryStat::new("time to stroke", &self.stroke_times())
    }

    pub fn cost_stat(&self) -> Result<SummaryStat, ModelError> {
        SummaryStat::new("discounted cost", &self.costs())
    }

    pub fn utility_stat(&self) -> Result<SummaryStat, ModelError> {
        SummaryStat::new("discounted utility", &self.utilities())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// A population of patients sharing one therapy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cohort {
    pub id: u64,
    pub therapy: Therapy,
    pub population_size: usize,
}

impl Cohort {
    pub fn new(id: u64, therapy: Therapy, population_size: usize) -> Self {
        Self {
            id,
            therapy,
            population_size,
        }
    }

    /// Simulate every patient for `steps` cycles under `params`
    pub fn simulate<P: ParameterSet + ?Sized>(
        &self,
        params: &P,
        steps: usize,
        seed: u64,
    ) -> Result<CohortOutcomes, ModelError> {
        if params.therapy() != self.therapy {
            return Err(ModelError::InvalidConfig(format!(
                "cohort {} simulates {} but parameters are for {}",
                self.id,
                self.therapy,
                params.therapy()
            )));
        }

        let samplers = transition_samplers(params)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut patients = Vec::with_capacity(self.population_size);
        let mut survival_curve = vec![0usize; steps + 1];

        for _ in 0..self.population_size {
            let outcome = simulate_patient(params, &samplers, steps, &mut rng, &mut survival_curve);
            patients.push(outcome);
        }

        let outcomes = CohortOutcomes {
            cohort_id: self.id,
            therapy: self.therapy,
            patients,
            survival_curve,
        };

        info!(
            cohort = self.id,
            therapy = %self.therapy,
            patients = self.population_size,
            steps,
            mean_cost = outcomes.mean_cost(),
            mean_utility = outcomes.mean_utility(),
            "cohort simulation complete"
        );
        Ok(outcomes)
    }
}

fn transition_samplers<P: ParameterSet + ?Sized>(
    params: &P,
) -> Result<Vec<WeightedIndex<f64>>, ModelError> {
    HealthState::ALL
        .iter()
        .map(|&state| {
            WeightedIndex::new(params.transition_probabilities(state)).map_err(|e| {
                ModelError::distribution(format!("transition row of {state}"), e)
            })
        })
        .collect()
}

fn simulate_patient<P: ParameterSet + ?Sized>(
    params: &P,
    samplers: &[WeightedIndex<f64>],
    steps: usize,
    rng: &mut ChaCha8Rng,
    survival_curve: &mut [usize],
) -> PatientOutcome {
    let delta_t = params.step_size();
    let discount_rate = params.discount_rate_per_step();

    let mut state = params.initial_state();
    let mut outcome = PatientOutcome {
        survival_time: None,
        time_to_stroke: None,
        stroke_count: 0,
        discounted_cost: 0.0,
        discounted_utility: 0.0,
    };

    for k in 0..steps {
        if state.is_absorbing() {
            break;
        }
        survival_curve[k] += 1;

        let discount = (1.0 + discount_rate).powi(k as i32).recip();
        let cost = (params.annual_cost(state) + params.treatment_cost()) * delta_t;
        outcome.discounted_cost += cost * discount;
        outcome.discounted_utility += params.annual_utility(state) * delta_t * discount;

        let next_index = samplers[state.index()].sample(rng);
        let next = HealthState::ALL[next_index.min(STATE_COUNT - 1)];
        let elapsed = (k + 1) as f64 * delta_t;

        if next == HealthState::Stroke {
            outcome.stroke_count += 1;
            outcome.time_to_stroke.get_or_insert(elapsed);
        }
        if next.is_absorbing() {
            outcome.survival_time = Some(elapsed);
        }
        state = next;
    }

    if state.is_alive() {
        survival_curve[steps] += 1;
    }

    trace!(?outcome, "patient simulated");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelInputs;
    use crate::params::DeterministicParams;
    use approx::assert_relative_eq;

    fn inputs_with_matrix(matrix: [[f64; 4]; 4]) -> ModelInputs {
        ModelInputs {
            transition_matrix: matrix,
            ..ModelInputs::default()
        }
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let params = DeterministicParams::new(&ModelInputs::default(), Therapy::None).unwrap();
        let cohort = Cohort::new(0, Therapy::None, 200);
        let a = cohort.simulate(&params, 30, 17).unwrap();
        let b = cohort.simulate(&params, 30, 17).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.patients.len(), 200);
        assert_eq!(a.survival_curve.len(), 31);
        assert_eq!(a.survival_curve[0], 200);
    }

    #[test]
    fn test_survival_curve_is_non_increasing() {
        let params =
            DeterministicParams::new(&ModelInputs::default(), Therapy::Anticoagulation).unwrap();
        let outcomes = Cohort::new(1, Therapy::Anticoagulation, 300)
            .simulate(&params, 40, 5)
            .unwrap();
        assert!(outcomes.survival_curve.windows(2).all(|w| w[1] <= w[0]));
        let dead = outcomes.survival_times().len();
        assert_eq!(outcomes.survival_curve[40] + dead, 300);
    }

    #[test]
    fn test_certain_death_after_one_cycle() {
        let inputs = inputs_with_matrix([
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let params = DeterministicParams::new(&inputs, Therapy::Anticoagulation).unwrap();
        let outcomes = Cohort::new(2, Therapy::Anticoagulation, 10)
            .simulate(&params, 5, 1)
            .unwrap();
        for patient in &outcomes.patients {
            assert_eq!(patient.survival_time, Some(1.0));
            assert_eq!(patient.stroke_count, 0);
            // One cycle in Well: no state cost, treatment cost, undiscounted first cycle
            assert_relative_eq!(patient.discounted_cost, inputs.anticoagulation_cost);
            assert_relative_eq!(patient.discounted_utility, 0.9);
        }
        assert_eq!(outcomes.survival_curve, vec![10, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_rewards_are_discounted() {
        let inputs = inputs_with_matrix([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.75, 0.25],
            [0.0, 0.10, 0.85, 0.05],
            [0.0, 0.0, 0.0, 1.0],
        ]);
        let params = DeterministicParams::new(&inputs, Therapy::None).unwrap();
        let outcomes = Cohort::new(3, Therapy::None, 1).simulate(&params, 3, 1).unwrap();
        let expected: f64 = (0..3).map(|k| 0.9 / 1.03_f64.powi(k)).sum();
        assert_relative_eq!(outcomes.patients[0].discounted_utility, expected, epsilon = 1e-12);
        assert_eq!(outcomes.patients[0].survival_time, None);
        assert_eq!(outcomes.mean_survival_time(), None);
    }

    #[test]
    fn test_therapy_mismatch_is_rejected() {
        let params = DeterministicParams::new(&ModelInputs::default(), Therapy::None).unwrap();
        let err = Cohort::new(4, Therapy::Anticoagulation, 10)
            .simulate(&params, 10, 1)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }
}
