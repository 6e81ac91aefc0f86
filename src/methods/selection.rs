//! Parent selection methods for the evolution loop.

use serde::{Deserialize, Serialize};

/// How a parent genome is drawn from a scored, sorted population.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Selection {
    /// Probability proportional to (shifted) fitness.
    FitnessProportionate,
    /// Rank-skewed draw: `index = random^power * len`.
    Power { power: f64 },
    /// Sample a bracket and pick the best with the given probability.
    Tournament { size: usize, probability: f64 },
}

impl Selection {
    /// Tournament selection with the conventional bracket of 5.
    pub fn tournament() -> Self {
        Self::Tournament {
            size: 5,
            probability: 0.5,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::Power { power: 4.0 }
    }
}
