//! Genetic crossover methods.

use serde::{Deserialize, Serialize};

/// How two parent gene sequences are recombined into an offspring.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Crossover {
    /// One cut at the given fraction of the sequence; first parent before it,
    /// second parent after.
    SinglePoint(f64),
    /// Two cuts; the middle segment comes from the second parent.
    TwoPoint(f64, f64),
    /// Each gene drawn from either parent with equal probability.
    Uniform,
    /// Each gene averaged between parents.
    Average,
}

impl Crossover {
    /// Single-point crossover with the conventional 40% cut.
    pub fn single_point() -> Self {
        Self::SinglePoint(0.4)
    }

    /// Two-point crossover with the conventional 40%/90% cuts.
    pub fn two_point() -> Self {
        Self::TwoPoint(0.4, 0.9)
    }

    /// All methods with default parameters.
    pub fn all() -> Vec<Crossover> {
        vec![
            Self::single_point(),
            Self::two_point(),
            Self::Uniform,
            Self::Average,
        ]
    }
}
