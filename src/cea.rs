//! Cost-effectiveness and cost-benefit comparison of two arms

use serde::Serialize;

use crate::cohort::CohortOutcomes;
use crate::state::Therapy;

/// Incremental outcomes of a treated arm relative to a base arm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparativeOutcomes {
    pub base: Therapy,
    pub treated: Therapy,
    /// Difference in mean survival time among patients who died, if both arms had deaths
    pub survival_time_gain: Option<f64>,
    pub incremental_cost: f64,
    pub incremental_utility: f64,
    pub stroke_count_change: f64,
}

impl ComparativeOutcomes {
    pub fn cost_effectiveness(&self) -> CostEffectiveness {
        CostEffectiveness::classify(self.incremental_cost, self.incremental_utility)
    }

    pub fn net_monetary_benefit(&self, willingness_to_pay: f64) -> f64 {
        net_monetary_benefit(
            willingness_to_pay,
            self.incremental_cost,
            self.incremental_utility,
        )
    }
}

/// Compare a treated cohort against a base cohort (treated minus base)
pub fn compare_arms(base: &CohortOutcomes, treated: &CohortOutcomes) -> ComparativeOutcomes {
    let survival_time_gain = match (base.mean_survival_time(), treated.mean_survival_time()) {
        (Some(b), Some(t)) => Some(t - b),
        _ => None,
    };

    ComparativeOutcomes {
        base: base.therapy,
        treated: treated.therapy,
        survival_time_gain,
        incremental_cost: treated.mean_cost() - base.mean_cost(),
        incremental_utility: treated.mean_utility() - base.mean_utility(),
        stroke_count_change: treated.mean_stroke_count() - base.mean_stroke_count(),
    }
}

/// Incremental cost per unit of utility gained; `None` when utility is unchanged
pub fn icer(incremental_cost: f64, incremental_utility: f64) -> Option<f64> {
    (incremental_utility != 0.0).then(|| incremental_cost / incremental_utility)
}

pub fn net_monetary_benefit(
    willingness_to_pay: f64,
    incremental_cost: f64,
    incremental_utility: f64,
) -> f64 {
    willingness_to_pay * incremental_utility - incremental_cost
}

/// Net monetary benefit at each willingness-to-pay value
pub fn nmb_curve(
    willingness_to_pay: &[f64],
    incremental_cost: f64,
    incremental_utility: f64,
) -> Vec<(f64, f64)> {
    willingness_to_pay
        .iter()
        .map(|&wtp| (wtp, net_monetary_benefit(wtp, incremental_cost, incremental_utility)))
        .collect()
}

/// Position of the treated arm on the cost-effectiveness plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum CostEffectiveness {
    /// Cheaper (or equal cost) and at least as effective
    Dominant,
    /// More expensive (or equal cost) and no more effective
    Dominated,
    /// Trade-off between cost and effect
    Icer(f64),
}

impl CostEffectiveness {
    pub fn classify(incremental_cost: f64, incremental_utility: f64) -> Self {
        match icer(incremental_cost, incremental_utility) {
            None if incremental_cost <= 0.0 => CostEffectiveness::Dominant,
            None => CostEffectiveness::Dominated,
            Some(_) if incremental_cost <= 0.0 && incremental_utility > 0.0 => {
                CostEffectiveness::Dominant
            }
            Some(_) if incremental_cost >= 0.0 && incremental_utility < 0.0 => {
                CostEffectiveness::Dominated
            }
            Some(ratio) => CostEffectiveness::Icer(ratio),
        }
    }
}
