//! Genetic recombination of two parent networks.

use rand::Rng;

use super::{Network, NetworkError, NodeKind};
use crate::methods::{Activation, Crossover};

/// One position in the flattened gene sequence: the child's slot plus the
/// other parent's allele, when the other parent carries that gene at all.
enum GeneSlot {
    Node {
        index: usize,
        other: Option<(f64, Activation)>,
    },
    Forward {
        index: usize,
        other: Option<f64>,
    },
    Selfloop {
        index: usize,
        other: Option<f64>,
    },
}

impl Network {
    /// Produce an offspring genome from two parents.
    ///
    /// The offspring is built around the larger parent's topology; genes the
    /// smaller parent lacks are inherited wholesale from the larger one.
    /// Genes align by role position: input i ↔ input i, hidden i ↔ hidden i,
    /// output i ↔ output i.
    pub fn offspring(
        parent1: &Network,
        parent2: &Network,
        method: &Crossover,
    ) -> Result<Network, NetworkError> {
        if parent1.input != parent2.input || parent1.output != parent2.output {
            return Err(NetworkError::IncompatibleParents);
        }

        let parent1_larger = parent1.nodes.len() >= parent2.nodes.len();
        let (larger, smaller) = if parent1_larger {
            (parent1, parent2)
        } else {
            (parent2, parent1)
        };

        let mut child = larger.clone();
        child.clear();
        child.score = None;

        let first_output = larger.nodes.len() - larger.output;
        let smaller_hidden = smaller.nodes.len() - smaller.input - smaller.output;
        let map_node = |i: usize| -> Option<usize> {
            if i < larger.input {
                Some(i)
            } else if i >= first_output {
                Some(smaller.nodes.len() - smaller.output + (i - first_output))
            } else if i - larger.input < smaller_hidden {
                Some(smaller.input + (i - larger.input))
            } else {
                None
            }
        };

        // Flatten: node genes (bias + squash, hidden and output only), then
        // connection weight genes, then self-connection weight genes.
        // Constant nodes are plumbing, not genes; they pass through unmixed.
        let mut genes: Vec<GeneSlot> = Vec::new();
        for i in larger.input..larger.nodes.len() {
            let other = map_node(i).and_then(|j| {
                let a = &larger.nodes[i];
                let b = &smaller.nodes[j];
                if a.kind == NodeKind::Constant || b.kind == NodeKind::Constant {
                    None
                } else {
                    Some((b.bias, b.squash))
                }
            });
            genes.push(GeneSlot::Node { index: i, other });
        }
        for (k, c) in larger.connections.iter().enumerate() {
            let other = match (map_node(c.from), map_node(c.to)) {
                (Some(f), Some(t)) => smaller
                    .connections
                    .iter()
                    .find(|s| s.from == f && s.to == t)
                    .map(|s| s.weight),
                _ => None,
            };
            genes.push(GeneSlot::Forward { index: k, other });
        }
        for (k, c) in larger.self_connections.iter().enumerate() {
            let other = map_node(c.from)
                .and_then(|f| smaller.self_connections.iter().find(|s| s.from == f))
                .map(|s| s.weight);
            genes.push(GeneSlot::Selfloop { index: k, other });
        }

        let len = genes.len() as f64;
        let mut rng = rand::thread_rng();
        for (pos, gene) in genes.iter().enumerate() {
            // Whether this position draws from the second parent.
            let from_second = match *method {
                Crossover::SinglePoint(cut) => pos as f64 >= cut * len,
                Crossover::TwoPoint(a, b) => {
                    let p = pos as f64;
                    p >= a * len && p < b * len
                }
                Crossover::Uniform => rng.gen_bool(0.5),
                Crossover::Average => false,
            };
            // The child already carries the larger parent's allele.
            let wants_smaller = if parent1_larger {
                from_second
            } else {
                !from_second
            };
            let average = matches!(method, Crossover::Average);

            match gene {
                GeneSlot::Node { index, other } => {
                    if let Some((bias, squash)) = other {
                        if average {
                            child.nodes[*index].bias = (child.nodes[*index].bias + bias) / 2.0;
                        } else if wants_smaller {
                            child.nodes[*index].bias = *bias;
                            child.nodes[*index].squash = *squash;
                        }
                    }
                }
                GeneSlot::Forward { index, other } => {
                    if let Some(weight) = other {
                        if average {
                            child.connections[*index].weight =
                                (child.connections[*index].weight + weight) / 2.0;
                        } else if wants_smaller {
                            child.connections[*index].weight = *weight;
                        }
                    }
                }
                GeneSlot::Selfloop { index, other } => {
                    if let Some(weight) = other {
                        if average {
                            child.self_connections[*index].weight =
                                (child.self_connections[*index].weight + weight) / 2.0;
                        } else if wants_smaller {
                            child.self_connections[*index].weight = *weight;
                        }
                    }
                }
            }
        }

        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::Mutation;

    #[test]
    fn test_incompatible_parents() {
        let a = Network::new(2, 1);
        let b = Network::new(3, 1);
        assert!(Network::offspring(&a, &b, &Crossover::Uniform).is_err());
    }

    #[test]
    fn test_average_self_crossover_is_identity() {
        let mut parent = Network::new(2, 2);
        for _ in 0..4 {
            parent.mutate(&Mutation::AddNode);
        }
        parent.mutate(&Mutation::AddSelfConn);

        let child = Network::offspring(&parent, &parent, &Crossover::Average).unwrap();
        assert_eq!(child.nodes.len(), parent.nodes.len());
        for (c, p) in child.connections.iter().zip(&parent.connections) {
            assert_eq!(c.weight, p.weight);
        }
        for (c, p) in child.self_connections.iter().zip(&parent.self_connections) {
            assert_eq!(c.weight, p.weight);
        }
        for (c, p) in child.nodes.iter().zip(&parent.nodes) {
            assert_eq!(c.bias, p.bias);
            assert_eq!(c.squash, p.squash);
        }
    }

    #[test]
    fn test_uniform_takes_weights_from_either_parent() {
        let a = Network::new(2, 1);
        let b = Network::new(2, 1);
        let child = Network::offspring(&a, &b, &Crossover::Uniform).unwrap();
        assert!(child.is_valid());
        for (k, c) in child.connections.iter().enumerate() {
            let wa = a.connections[k].weight;
            let wb = b.connections[k].weight;
            assert!(c.weight == wa || c.weight == wb);
        }
    }

    #[test]
    fn test_offspring_keeps_larger_topology() {
        let small = Network::new(2, 1);
        let mut big = Network::new(2, 1);
        for _ in 0..3 {
            big.mutate(&Mutation::AddNode);
        }

        for method in Crossover::all() {
            let child = Network::offspring(&small, &big, &method).unwrap();
            assert_eq!(child.nodes.len(), big.nodes.len());
            assert_eq!(child.connections.len(), big.connections.len());
            assert!(child.is_valid());
            assert!(child.score.is_none());
        }
    }

    #[test]
    fn test_single_point_prefix_from_first_parent() {
        let a = Network::new(2, 1);
        let b = Network::new(2, 1);
        // Cut at 1.0: every gene comes from the first parent.
        let child = Network::offspring(&a, &b, &Crossover::SinglePoint(1.0)).unwrap();
        for (k, c) in child.connections.iter().enumerate() {
            assert_eq!(c.weight, a.connections[k].weight);
        }
        // Cut at 0.0: every gene comes from the second parent.
        let child = Network::offspring(&a, &b, &Crossover::SinglePoint(0.0)).unwrap();
        for (k, c) in child.connections.iter().enumerate() {
            assert_eq!(c.weight, b.connections[k].weight);
        }
    }
}
