//! Deterministic architecture builders.
//!
//! A [`NetworkBuilder`] assembles nodes and edges through transient [`Group`]
//! handles, then flattens and classifies them into a [`Network`](crate::Network).
//! The recipe functions build the named layouts on top of it.

mod builder;
mod layer;
mod recipes;

pub use builder::{ConnectPattern, GatePattern, Group, NetworkBuilder};
pub use layer::Layer;
pub use recipes::{gru, hopfield, lstm, narx, perceptron, random, LstmOptions, RandomOptions};

/// Errors raised while assembling a network.
#[derive(Debug)]
pub enum ArchitectError {
    /// A recipe was given fewer layers than it needs.
    MissingLayers { needed: usize, given: usize },
    /// No node could be classified as an input.
    NoInput,
    /// No node could be classified as an output.
    NoOutput,
    /// One-to-one wiring between groups of different sizes.
    SizeMismatch { expected: usize, found: usize },
}

impl std::fmt::Display for ArchitectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingLayers { needed, given } => {
                write!(f, "not enough layers: need at least {}, got {}", needed, given)
            }
            Self::NoInput => write!(f, "no clear input node in the given structure"),
            Self::NoOutput => write!(f, "no clear output node in the given structure"),
            Self::SizeMismatch { expected, found } => {
                write!(f, "group size mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for ArchitectError {}
