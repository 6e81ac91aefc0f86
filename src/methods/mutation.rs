//! The topology-mutation operator catalog.

use serde::{Deserialize, Serialize};

/// A structural or parametric mutation applicable to a network.
///
/// Operators carry their own parameters. Every operator is a no-op when the
/// current topology offers no legal candidate; it never fails.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Split a random connection with a new hidden node.
    AddNode,
    /// Remove a random hidden node and bridge its neighbors.
    SubNode {
        /// Re-home gates of the removed node's connections onto the bridges.
        keep_gates: bool,
    },
    /// Add a forward connection between two unconnected nodes.
    AddConn,
    /// Remove a forward connection, never isolating an endpoint.
    SubConn,
    /// Perturb a random connection weight by a delta in `[min, max]`.
    ModWeight { min: f64, max: f64 },
    /// Perturb a random non-input node bias by a delta in `[min, max]`.
    ModBias { min: f64, max: f64 },
    /// Reassign a random node's squash function.
    ModActivation {
        /// Allow output nodes to be mutated as well.
        mutate_output: bool,
    },
    /// Add a self-loop on a random hidden node.
    AddSelfConn,
    /// Remove a random self-loop.
    SubSelfConn,
    /// Assign a gater to a random ungated connection.
    AddGate,
    /// Remove the gater from a random gated connection.
    SubGate,
    /// Add a recurrent (backward-ordered) connection.
    AddBackConn,
    /// Remove a recurrent connection, never isolating an endpoint.
    SubBackConn,
    /// Exchange bias and squash between two random nodes.
    SwapNodes {
        /// Allow output nodes to take part in the swap.
        mutate_output: bool,
    },
}

impl Mutation {
    /// The full operator catalog with default parameters.
    pub fn all() -> Vec<Mutation> {
        vec![
            Mutation::AddNode,
            Mutation::SubNode { keep_gates: true },
            Mutation::AddConn,
            Mutation::SubConn,
            Mutation::ModWeight { min: -1.0, max: 1.0 },
            Mutation::ModBias { min: -1.0, max: 1.0 },
            Mutation::ModActivation { mutate_output: true },
            Mutation::AddGate,
            Mutation::SubGate,
            Mutation::AddSelfConn,
            Mutation::SubSelfConn,
            Mutation::AddBackConn,
            Mutation::SubBackConn,
            Mutation::SwapNodes { mutate_output: true },
        ]
    }

    /// The subset of operators that keep a network strictly feed-forward.
    pub fn feedforward() -> Vec<Mutation> {
        vec![
            Mutation::AddNode,
            Mutation::SubNode { keep_gates: true },
            Mutation::AddConn,
            Mutation::SubConn,
            Mutation::ModWeight { min: -1.0, max: 1.0 },
            Mutation::ModBias { min: -1.0, max: 1.0 },
            Mutation::ModActivation { mutate_output: true },
            Mutation::SwapNodes { mutate_output: true },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(Mutation::all().len(), 14);
        assert_eq!(Mutation::feedforward().len(), 8);
    }

    #[test]
    fn test_feedforward_excludes_recurrent_ops() {
        let ffw = Mutation::feedforward();
        assert!(!ffw.contains(&Mutation::AddSelfConn));
        assert!(!ffw.contains(&Mutation::AddBackConn));
        assert!(!ffw.contains(&Mutation::AddGate));
    }
}
