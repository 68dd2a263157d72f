//! Transition probability matrices
//!
//! A [`TransitionMatrix`] is always row-stochastic: every entry lies in [0, 1],
//! every row sums to 1 within [`ROW_SUM_TOLERANCE`], and the absorbing row is
//! exactly the unit vector on Death. Matrices are never edited in place; each
//! build produces a new value.

use serde::Serialize;

use crate::error::ModelError;
use crate::state::{HealthState, STATE_COUNT};

/// Allowed deviation of a row sum from 1
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// One row of transition probabilities, indexed by destination state
pub type TransitionRow = [f64; STATE_COUNT];

/// Square row-stochastic matrix indexed by [`HealthState::index`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionMatrix {
    rows: [TransitionRow; STATE_COUNT],
}

impl TransitionMatrix {
    /// Build a matrix, rejecting any row that is not a probability distribution
    pub fn from_rows(rows: [TransitionRow; STATE_COUNT]) -> Result<Self, ModelError> {
        for state in HealthState::ALL {
            validate_row(state, &rows[state.index()])?;
        }
        Ok(Self { rows })
    }

    /// Row of the unit vector on `state`
    pub fn unit_row(state: HealthState) -> TransitionRow {
        let mut row = [0.0; STATE_COUNT];
        row[state.index()] = 1.0;
        row
    }

    /// Transition row of `from`, indexed by destination state
    pub fn row(&self, from: HealthState) -> &TransitionRow {
        &self.rows[from.index()]
    }

    /// Probability of moving from `from` to `to` in one cycle
    pub fn probability(&self, from: HealthState, to: HealthState) -> f64 {
        self.rows[from.index()][to.index()]
    }

    /// All rows in state order
    pub fn rows(&self) -> &[TransitionRow; STATE_COUNT] {
        &self.rows
    }
}

fn validate_row(state: HealthState, row: &TransitionRow) -> Result<(), ModelError> {
    for (to, &value) in HealthState::ALL.iter().zip(row.iter()) {
        if !value.is_finite() || value < 0.0 || value > 1.0 + ROW_SUM_TOLERANCE {
            return Err(ModelError::ProbabilityOutOfRange {
                from: state,
                to: *to,
                value,
            });
        }
    }

    let sum: f64 = row.iter().sum();
    if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
        return Err(ModelError::RowSum { state, sum });
    }

    if state.is_absorbing() && *row != TransitionMatrix::unit_row(state) {
        return Err(ModelError::AbsorbingRow { state });
    }

    Ok(())
}

/// Treatment-effect multipliers applied to baseline transition probabilities
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeRisks {
    /// Stroke-risk reduction factor
    pub stroke: f64,
    /// Bleeding (adverse event) factor
    pub bleeding: f64,
}

impl RelativeRisks {
    pub fn new(stroke: f64, bleeding: f64) -> Self {
        Self { stroke, bleeding }
    }

    /// Multipliers that leave every probability unchanged
    pub fn neutral() -> Self {
        Self::new(1.0, 1.0)
    }

    /// Factor for transitions affected by both risks
    pub fn combined(&self) -> f64 {
        self.stroke * self.bleeding
    }
}

/// Apply the anticoagulation treatment effect to a baseline matrix.
///
/// Only the PostStroke row changes: the transition to Stroke is scaled by the
/// stroke factor, the transition to Death by the product of both factors, and
/// the self-transition absorbs the difference so the row keeps summing to 1.
/// Scaled probabilities above 1 or a negative remainder are reported, never
/// clamped.
pub fn therapy_adjusted(
    baseline: &TransitionMatrix,
    risks: RelativeRisks,
) -> Result<TransitionMatrix, ModelError> {
    let from = HealthState::PostStroke;
    let base = baseline.row(from);

    let to_stroke = risks.stroke * base[HealthState::Stroke.index()];
    let to_death = risks.combined() * base[HealthState::Death.index()];

    for (to, value) in [(HealthState::Stroke, to_stroke), (HealthState::Death, to_death)] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(ModelError::ProbabilityOutOfRange { from, to, value });
        }
    }

    // Equals 1 - sum(other entries) for a stochastic baseline row, and is
    // bit-identical to the baseline self-transition when both factors are 1.
    let stay = base[from.index()]
        + (base[HealthState::Stroke.index()] - to_stroke)
        + (base[HealthState::Death.index()] - to_death);
    if stay < 0.0 {
        return Err(ModelError::NegativeRemainder {
            state: from,
            value: stay,
        });
    }

    let mut rows = *baseline.rows();
    let row = &mut rows[from.index()];
    row[HealthState::Stroke.index()] = to_stroke;
    row[HealthState::Death.index()] = to_death;
    row[from.index()] = stay;

    TransitionMatrix::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn baseline_with_post_stroke(row: TransitionRow) -> TransitionMatrix {
        TransitionMatrix::from_rows([
            [0.85, 0.10, 0.0, 0.05],
            [0.0, 0.0, 0.8, 0.2],
            row,
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_rejects_row_not_summing_to_one() {
        let err = TransitionMatrix::from_rows([
            [0.85, 0.10, 0.0, 0.04],
            [0.0, 0.0, 0.8, 0.2],
            [0.0, 0.1, 0.85, 0.05],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ModelError::RowSum {
                state: HealthState::Well,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_negative_entry() {
        let err = TransitionMatrix::from_rows([
            [0.95, 0.10, -0.1, 0.05],
            [0.0, 0.0, 0.8, 0.2],
            [0.0, 0.1, 0.85, 0.05],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap_err();
        assert!(matches!(err, ModelError::ProbabilityOutOfRange { .. }));
    }

    #[test]
    fn test_rejects_leaky_absorbing_row() {
        let err = TransitionMatrix::from_rows([
            [0.85, 0.10, 0.0, 0.05],
            [0.0, 0.0, 0.8, 0.2],
            [0.0, 0.1, 0.85, 0.05],
            [0.0, 0.0, 0.01, 0.99],
        ])
        .unwrap_err();
        assert!(matches!(err, ModelError::AbsorbingRow { .. }));
    }

    #[test]
    fn test_neutral_risks_reproduce_baseline_exactly() {
        let baseline = baseline_with_post_stroke([0.0, 0.1, 0.85, 0.05]);
        let adjusted = therapy_adjusted(&baseline, RelativeRisks::neutral()).unwrap();
        assert_eq!(adjusted, baseline);
    }

    #[test]
    fn test_post_stroke_row_scaling() {
        let baseline = baseline_with_post_stroke([0.0, 0.1, 0.85, 0.05]);
        let adjusted = therapy_adjusted(&baseline, RelativeRisks::new(0.5, 1.2)).unwrap();
        let row = adjusted.row(HealthState::PostStroke);

        assert_relative_eq!(row[HealthState::Stroke.index()], 0.05, epsilon = 1e-12);
        // Death is scaled by both factors: 0.5 * 1.2 * 0.05
        assert_relative_eq!(row[HealthState::Death.index()], 0.03, epsilon = 1e-12);
        assert_relative_eq!(row[HealthState::PostStroke.index()], 0.92, epsilon = 1e-12);
        assert_eq!(
            adjusted.probability(HealthState::PostStroke, HealthState::Well),
            0.0
        );
        assert_eq!(
            adjusted.probability(HealthState::PostStroke, HealthState::Stroke),
            row[HealthState::Stroke.index()]
        );

        for state in [HealthState::Well, HealthState::Stroke, HealthState::Death] {
            assert_eq!(adjusted.row(state), baseline.row(state));
        }
    }

    #[test]
    fn test_negative_remainder_is_reported() {
        let baseline = baseline_with_post_stroke([0.0, 0.3, 0.1, 0.6]);
        let err = therapy_adjusted(&baseline, RelativeRisks::new(1.0, 1.5)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::NegativeRemainder {
                state: HealthState::PostStroke,
                ..
            }
        ));
    }

    #[test]
    fn test_scaled_probability_above_one_is_reported() {
        let baseline = baseline_with_post_stroke([0.0, 0.6, 0.4, 0.0]);
        let err = therapy_adjusted(&baseline, RelativeRisks::new(2.0, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::ProbabilityOutOfRange {
                to: HealthState::Stroke,
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn adjusted_rows_stay_stochastic(
            weights in prop::array::uniform4(0.0f64..1.0),
            rr_stroke in 0.0f64..2.0,
            rr_bleeding in 0.0f64..2.0,
        ) {
            let total: f64 = weights.iter().sum::<f64>() + 1e-3;
            let mut row = weights.map(|w| w / total);
            row[HealthState::PostStroke.index()] += 1e-3 / total;

            let baseline = baseline_with_post_stroke(row);
            match therapy_adjusted(&baseline, RelativeRisks::new(rr_stroke, rr_bleeding)) {
                Ok(adjusted) => {
                    for state in HealthState::ALL {
                        let sum: f64 = adjusted.row(state).iter().sum();
                        prop_assert!((sum - 1.0).abs() <= ROW_SUM_TOLERANCE);
                    }
                    prop_assert_eq!(
                        *adjusted.row(HealthState::Death),
                        TransitionMatrix::unit_row(HealthState::Death)
                    );
                }
                Err(err) => {
                    let expected = matches!(
                        err,
                        ModelError::NegativeRemainder { .. }
                            | ModelError::ProbabilityOutOfRange { .. }
                    );
                    prop_assert!(expected, "unexpected error {:?}", err);
                }
            }
        }
    }
}
