//! Cost functions for scoring network output against a target.

use serde::{Deserialize, Serialize};

/// A cost function over one target/output pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cost {
    /// Cross entropy error.
    CrossEntropy,
    /// Mean squared error.
    Mse,
    /// Number of outputs rounding to the wrong half.
    Binary,
    /// Mean absolute error.
    Mae,
    /// Mean absolute percentage error.
    Mape,
    /// Mean squared logarithmic error.
    Msle,
    /// Hinge loss, for classifiers.
    Hinge,
}

impl Cost {
    /// Evaluate the cost of `output` against `target`.
    ///
    /// Both slices must have the same length.
    pub fn evaluate(self, target: &[f64], output: &[f64]) -> f64 {
        debug_assert_eq!(target.len(), output.len());
        match self {
            Self::CrossEntropy => {
                let mut error = 0.0;
                for (t, o) in target.iter().zip(output) {
                    // Clamp away from zero to keep the logs finite.
                    let o = o.max(1e-15);
                    error -= t * o.ln() + (1.0 - t) * (1.0 - o).ln();
                }
                error / output.len() as f64
            }
            Self::Mse => {
                let sum: f64 = target
                    .iter()
                    .zip(output)
                    .map(|(t, o)| (t - o).powi(2))
                    .sum();
                sum / output.len() as f64
            }
            Self::Binary => target
                .iter()
                .zip(output)
                .filter(|(t, o)| (*t * 2.0).round() != (*o * 2.0).round())
                .count() as f64,
            Self::Mae => {
                let sum: f64 = target.iter().zip(output).map(|(t, o)| (t - o).abs()).sum();
                sum / output.len() as f64
            }
            Self::Mape => {
                let sum: f64 = target
                    .iter()
                    .zip(output)
                    .map(|(t, o)| ((o - t) / t.max(1e-15)).abs())
                    .sum();
                sum / output.len() as f64
            }
            Self::Msle => target
                .iter()
                .zip(output)
                .map(|(t, o)| t.max(1e-15).ln() - o.max(1e-15).ln())
                .sum(),
            Self::Hinge => target
                .iter()
                .zip(output)
                .map(|(t, o)| (1.0 - t * o).max(0.0))
                .sum(),
        }
    }
}

impl Default for Cost {
    fn default() -> Self {
        Self::Mse
    }
}
