//! # evograph
//!
//! Neuro-evolution of graph-structured neural networks: the topology itself
//! — not just the weights — changes over time.
//!
//! ## Features
//!
//! - **Graph networks**: nodes and weighted, optionally-gated edges with
//!   self-loop recurrence
//! - **Online learning**: eligibility-trace adaptation that stays correct
//!   through gated, recurrent structure
//! - **Topology mutation**: a 14-operator catalog that never leaves the
//!   graph in an invalid state
//! - **Architect recipes**: perceptron, random growth, LSTM, GRU, Hopfield,
//!   NARX and delay-line building blocks
//! - **Evolution**: selection, crossover and a population loop scored by
//!   pluggable, parallel evaluators
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use evograph::methods::Cost;
//! use evograph::{EvolveConfig, InProcessEvaluator, Population};
//!
//! let dataset = vec![
//!     (vec![0.0, 0.0], vec![0.0]),
//!     (vec![0.0, 1.0], vec![1.0]),
//!     (vec![1.0, 0.0], vec![1.0]),
//!     (vec![1.0, 1.0], vec![0.0]),
//! ];
//!
//! let mut population = Population::new(2, 1, EvolveConfig::default());
//! let mut evaluator = InProcessEvaluator::new(dataset, Cost::Mse);
//! for _ in 0..100 {
//!     let best = population.evolve(&mut evaluator);
//!     println!("best fitness: {:.4}", best);
//! }
//! ```
//!
//! ## Building a network by hand
//!
//! ```rust
//! use evograph::architect;
//!
//! let mut network = architect::perceptron(&[2, 4, 1]).unwrap();
//! let output = network.activate(&[0.5, 0.5]).unwrap();
//! network.propagate(0.3, 0.0, true, &[1.0]).unwrap();
//! # let _ = output;
//! ```

pub mod architect;
pub mod checkpoint;
pub mod config;
pub mod evolve;
pub mod graph;
pub mod methods;
pub mod stats;
pub mod wire;

// Re-export main types
pub use config::EvolveConfig;
pub use evolve::{Evaluator, InProcessEvaluator, Population, WorkerPool};
pub use graph::{Network, NetworkError};
pub use wire::WireNetwork;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_reexports_compose() {
        let network = Network::new(2, 1);
        assert!(network.is_valid());
        let config = EvolveConfig::default();
        assert!(config.validate().is_ok());
    }
}
