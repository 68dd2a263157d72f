//! Parameter uncertainty distributions
//!
//! Scalar parameters (costs, utilities, log relative risks) use
//! [`ScalarDistribution`]; transition rows use [`RowDistribution`], a Dirichlet
//! over the columns a state can reach. Both draw from a caller-owned RNG so a
//! single seeded stream drives every sample.

use rand::Rng;
use rand_distr::{Beta, Dirichlet, Distribution, Gamma, Normal};
use tracing::warn;

use crate::error::ModelError;
use crate::matrix::TransitionRow;
use crate::state::{HealthState, STATE_COUNT};

/// 0.975 quantile of the standard normal distribution
pub const Z_975: f64 = 1.959_963_984_540_054;

/// Shape and scale of the gamma distribution with the given mean and standard deviation
pub fn gamma_parameters(mean: f64, st_dev: f64) -> Result<(f64, f64), ModelError> {
    if !mean.is_finite() || mean <= 0.0 || !st_dev.is_finite() || st_dev <= 0.0 {
        return Err(ModelError::distribution(
            "gamma",
            format!("mean ({mean}) and st_dev ({st_dev}) must be finite and positive"),
        ));
    }
    let shape = (mean / st_dev).powi(2);
    let scale = st_dev * st_dev / mean;
    Ok((shape, scale))
}

/// Alpha and beta of the beta distribution with the given mean and standard deviation
pub fn beta_parameters(mean: f64, st_dev: f64) -> Result<(f64, f64), ModelError> {
    if !(mean > 0.0 && mean < 1.0) || !st_dev.is_finite() || st_dev <= 0.0 {
        return Err(ModelError::distribution(
            "beta",
            format!("mean ({mean}) must lie in (0, 1) and st_dev ({st_dev}) must be positive"),
        ));
    }
    let variance = st_dev * st_dev;
    let max_variance = mean * (1.0 - mean);
    if variance >= max_variance {
        return Err(ModelError::distribution(
            "beta",
            format!("variance {variance} must be below mean * (1 - mean) = {max_variance}"),
        ));
    }
    let concentration = max_variance / variance - 1.0;
    Ok((mean * concentration, (1.0 - mean) * concentration))
}

/// Standard deviation of a normal distribution from its 95% confidence interval
pub fn st_dev_from_ci95(lower: f64, upper: f64) -> f64 {
    (upper - lower) / (2.0 * Z_975)
}

/// Distribution of a single scalar parameter
#[derive(Debug, Clone)]
pub enum ScalarDistribution {
    Normal(Normal<f64>),
    Gamma {
        shape: f64,
        scale: f64,
        dist: Gamma<f64>,
    },
    Beta {
        alpha: f64,
        beta: f64,
        dist: Beta<f64>,
    },
    /// Point mass; consumes no randomness
    Fixed(f64),
}

impl ScalarDistribution {
    pub fn normal(mean: f64, st_dev: f64) -> Result<Self, ModelError> {
        Normal::new(mean, st_dev)
            .map(ScalarDistribution::Normal)
            .map_err(|e| ModelError::distribution("normal", e))
    }

    /// Gamma distribution matched to a mean and standard deviation
    pub fn gamma_from_moments(mean: f64, st_dev: f64) -> Result<Self, ModelError> {
        let (shape, scale) = gamma_parameters(mean, st_dev)?;
        let dist = Gamma::new(shape, scale).map_err(|e| ModelError::distribution("gamma", e))?;
        Ok(ScalarDistribution::Gamma { shape, scale, dist })
    }

    /// Beta distribution matched to a mean and standard deviation
    pub fn beta_from_moments(mean: f64, st_dev: f64) -> Result<Self, ModelError> {
        let (alpha, beta) = beta_parameters(mean, st_dev)?;
        let dist = Beta::new(alpha, beta).map_err(|e| ModelError::distribution("beta", e))?;
        Ok(ScalarDistribution::Beta { alpha, beta, dist })
    }

    /// Expected value of the distribution
    pub fn mean(&self) -> f64 {
        match self {
            ScalarDistribution::Normal(dist) => dist.mean(),
            ScalarDistribution::Gamma { shape, scale, .. } => shape * scale,
            ScalarDistribution::Beta { alpha, beta, .. } => alpha / (alpha + beta),
            ScalarDistribution::Fixed(value) => *value,
        }
    }
}

impl Distribution<f64> for ScalarDistribution {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            ScalarDistribution::Normal(dist) => dist.sample(rng),
            ScalarDistribution::Gamma { dist, .. } => dist.sample(rng),
            ScalarDistribution::Beta { dist, .. } => dist.sample(rng),
            ScalarDistribution::Fixed(value) => *value,
        }
    }
}

/// Dirichlet uncertainty over the forward transitions of one state.
///
/// Patients only stay or move to a later state, so the support is the columns
/// from the state's own index onward that carry baseline probability. Each
/// sample is written back column by column; earlier columns stay zero.
#[derive(Debug, Clone)]
pub struct RowDistribution {
    state: HealthState,
    columns: Vec<usize>,
    /// `None` when a single column is reachable and always receives 1
    dirichlet: Option<Dirichlet<f64>>,
}

impl RowDistribution {
    pub fn forward(state: HealthState, baseline: &TransitionRow) -> Result<Self, ModelError> {
        if state.is_absorbing() {
            return Err(ModelError::AbsorbingState { state });
        }

        let from = state.index();
        let backward_mass: f64 = baseline[..from].iter().sum();
        if backward_mass > 0.0 {
            warn!(
                %state,
                backward_mass,
                "discarding backward transition mass from sampled row"
            );
        }

        let columns: Vec<usize> = (from..STATE_COUNT).filter(|&j| baseline[j] > 0.0).collect();
        let alphas: Vec<f64> = columns.iter().map(|&j| baseline[j]).collect();

        let dirichlet = match alphas.len() {
            0 => {
                return Err(ModelError::distribution(
                    "dirichlet",
                    format!("{state} has no forward transition probability"),
                ))
            }
            1 => None,
            _ => Some(
                Dirichlet::new(&alphas).map_err(|e| ModelError::distribution("dirichlet", e))?,
            ),
        };

        Ok(Self {
            state,
            columns,
            dirichlet,
        })
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    /// Matrix columns receiving the sampled probabilities, in sample order
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Draw a full matrix row
    pub fn sample_row<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TransitionRow, ModelError> {
        let sample = match &self.dirichlet {
            Some(dirichlet) => dirichlet.sample(rng),
            None => vec![1.0],
        };
        self.place(&sample)
    }

    fn place(&self, sample: &[f64]) -> Result<TransitionRow, ModelError> {
        if sample.len() != self.columns.len() {
            return Err(ModelError::SampleLength {
                state: self.state,
                expected: self.columns.len(),
                got: sample.len(),
            });
        }

        let mut row = [0.0; STATE_COUNT];
        for (&column, &p) in self.columns.iter().zip(sample) {
            let cell = row.get_mut(column).ok_or(ModelError::SampleLength {
                state: self.state,
                expected: STATE_COUNT,
                got: column + 1,
            })?;
            *cell = p;
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_gamma_moment_matching() {
        let (shape, scale) = gamma_parameters(200.0, 50.0).unwrap();
        assert_relative_eq!(shape * scale, 200.0, epsilon = 1e-9);
        assert_relative_eq!(shape * scale * scale, 2500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_gamma_rejects_non_positive_mean() {
        assert!(gamma_parameters(0.0, 1.0).is_err());
        assert!(gamma_parameters(-5.0, 1.0).is_err());
        assert!(ScalarDistribution::gamma_from_moments(10.0, 0.0).is_err());
    }

    #[test]
    fn test_beta_moment_matching() {
        let (a, b) = beta_parameters(0.65, 0.13).unwrap();
        let mean = a / (a + b);
        let variance = a * b / ((a + b).powi(2) * (a + b + 1.0));
        assert_relative_eq!(mean, 0.65, epsilon = 1e-9);
        assert_relative_eq!(variance, 0.13 * 0.13, epsilon = 1e-9);
    }

    #[test]
    fn test_beta_rejects_infeasible_variance() {
        assert!(beta_parameters(1.0, 0.2).is_err());
        assert!(beta_parameters(0.5, 0.6).is_err());
    }

    #[test]
    fn test_st_dev_from_ci95() {
        assert_relative_eq!(st_dev_from_ci95(-Z_975, Z_975), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_consumes_no_randomness() {
        let mut a = ChaCha8Rng::seed_from_u64(3);
        let mut b = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(ScalarDistribution::Fixed(0.0).sample(&mut a), 0.0);
        assert_eq!(a.gen::<u64>(), b.gen::<u64>());
    }

    #[test]
    fn test_forward_row_skips_earlier_and_zero_columns() {
        let baseline = [0.0, 0.10, 0.85, 0.05];
        let dist = RowDistribution::forward(HealthState::PostStroke, &baseline).unwrap();
        assert_eq!(dist.columns(), &[2, 3]);

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let row = dist.sample_row(&mut rng).unwrap();
            assert_eq!(row[0], 0.0);
            assert_eq!(row[1], 0.0);
            assert!(row.iter().all(|&p| p >= 0.0));
            assert_relative_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_single_reachable_column_gets_full_mass() {
        let baseline = [0.0, 0.0, 0.0, 1.0];
        let dist = RowDistribution::forward(HealthState::Stroke, &baseline).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(dist.sample_row(&mut rng).unwrap(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_absorbing_state_has_no_row_distribution() {
        let err = RowDistribution::forward(HealthState::Death, &[0.0, 0.0, 0.0, 1.0]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::AbsorbingState {
                state: HealthState::Death
            }
        ));
    }

    #[test]
    fn test_place_rejects_wrong_length() {
        let dist =
            RowDistribution::forward(HealthState::Well, &[0.90, 0.06, 0.0, 0.04]).unwrap();
        let err = dist.place(&[0.5, 0.5]).unwrap_err();
        assert!(matches!(err, ModelError::SampleLength { expected: 3, got: 2, .. }));
    }
}
