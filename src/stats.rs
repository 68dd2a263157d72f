//! Summary statistics over simulated samples

use serde::Serialize;

use crate::distributions::Z_975;
use crate::error::ModelError;

/// Descriptive statistics of one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStat {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator; 0 for a single value)
    pub st_dev: f64,
    pub min: f64,
    pub max: f64,
    sorted: Vec<f64>,
}

impl SummaryStat {
    pub fn new(name: impl Into<String>, data: &[f64]) -> Result<Self, ModelError> {
        let name = name.into();
        if data.is_empty() {
            return Err(ModelError::EmptySample(name));
        }

        let count = data.len();
        let mean = data.iter().sum::<f64>() / count as f64;
        let st_dev = if count > 1 {
            let ss: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        let mut sorted = data.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Ok(Self {
            name,
            count,
            mean,
            st_dev,
            min: sorted[0],
            max: sorted[count - 1],
            sorted,
        })
    }

    pub fn st_err(&self) -> f64 {
        self.st_dev / (self.count as f64).sqrt()
    }

    /// Normal-approximation 95% confidence interval of the mean
    pub fn mean_ci95(&self) -> (f64, f64) {
        let half = Z_975 * self.st_err();
        (self.mean - half, self.mean + half)
    }

    /// Percentile (0..=100) with linear interpolation between order statistics
    pub fn percentile(&self, q: f64) -> f64 {
        let q = q.clamp(0.0, 100.0) / 100.0;
        let pos = q * (self.count - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = pos - lo as f64;
        self.sorted[lo] + (self.sorted[hi] - self.sorted[lo]) * frac
    }

    /// Central interval holding `level` (e.g. 0.95) of the sample
    pub fn percentile_interval(&self, level: f64) -> (f64, f64) {
        let tail = (1.0 - level.clamp(0.0, 1.0)) * 50.0;
        (self.percentile(tail), self.percentile(100.0 - tail))
    }
}
