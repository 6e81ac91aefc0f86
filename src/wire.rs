//! The flat numeric wire form consumed by fitness evaluators.
//!
//! Three parallel sequences describe a network: a per-node record (squash
//! index, bias, kind tag), a per-node recurrent record (self-connection
//! weight or zero, current gain) and a per-connection record (source,
//! destination, weight, gater or a sentinel). Self-connections appear in the
//! connection sequence too, so the interpreter can keep refreshing a gated
//! self-loop's gain; their weight and starting gain come from the recurrent
//! record.
//!
//! Serialization captures a *cleared* network: gated gains start at zero,
//! ungated at one. Clear a live network before serializing it.

use serde::{Deserialize, Serialize};

use crate::graph::{Network, NetworkError, NodeKind};
use crate::methods::{Activation, Cost};

/// Sentinel gater index marking an ungated connection.
pub const UNGATED: f64 = -1.0;

/// Strides of the three parallel sequences.
const NODE_STRIDE: usize = 3;
const RECURRENT_STRIDE: usize = 2;
const LINK_STRIDE: usize = 4;

/// A network serialized to three parallel numeric sequences, plus the
/// interpreter state needed to activate it in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireNetwork {
    pub input: usize,
    pub output: usize,
    /// Per node: squash index, bias, kind tag.
    pub nodes: Vec<f64>,
    /// Per node: self-connection weight (0 if none), gain.
    pub recurrent: Vec<f64>,
    /// Per connection: source, destination, weight, gater index or
    /// [`UNGATED`].
    pub links: Vec<f64>,

    #[serde(skip)]
    activations: Vec<f64>,
    #[serde(skip)]
    states: Vec<f64>,
    #[serde(skip)]
    gains: Vec<f64>,
    #[serde(skip)]
    self_gains: Vec<f64>,
}

impl WireNetwork {
    /// Serialize a network.
    ///
    /// The source should be cleared; the recurrent record stores its current
    /// self-loop gains verbatim.
    pub fn from_network(network: &Network) -> Self {
        let n = network.nodes.len();
        let mut nodes = Vec::with_capacity(n * NODE_STRIDE);
        for node in &network.nodes {
            nodes.push(node.squash.index() as f64);
            nodes.push(node.bias);
            nodes.push(node.kind.tag());
        }

        let mut recurrent = Vec::with_capacity(n * RECURRENT_STRIDE);
        for i in 0..n {
            match network.self_conn_index(i) {
                Some(k) => {
                    recurrent.push(network.self_connections[k].weight);
                    recurrent.push(network.self_connections[k].gain);
                }
                None => {
                    recurrent.push(0.0);
                    recurrent.push(1.0);
                }
            }
        }

        let mut links = Vec::new();
        for c in network.connections.iter().chain(&network.self_connections) {
            links.push(c.from as f64);
            links.push(c.to as f64);
            links.push(c.weight);
            links.push(c.gater.map_or(UNGATED, |g| g as f64));
        }

        let mut wire = Self {
            input: network.input,
            output: network.output,
            nodes,
            recurrent,
            links,
            activations: Vec::new(),
            states: Vec::new(),
            gains: Vec::new(),
            self_gains: Vec::new(),
        };
        wire.clear();
        wire
    }

    /// Number of nodes described by the wire form.
    pub fn node_count(&self) -> usize {
        self.nodes.len() / NODE_STRIDE
    }

    /// Number of connection records, self-connections included.
    pub fn link_count(&self) -> usize {
        self.links.len() / LINK_STRIDE
    }

    /// Reset the interpreter state to the cleared-network baseline.
    pub fn clear(&mut self) {
        let n = self.node_count();
        self.activations = vec![0.0; n];
        self.states = vec![0.0; n];
        self.gains = self
            .links
            .chunks_exact(LINK_STRIDE)
            .map(|l| if l[3] == UNGATED { 1.0 } else { 0.0 })
            .collect();
        self.self_gains = self
            .recurrent
            .chunks_exact(RECURRENT_STRIDE)
            .map(|r| r[1])
            .collect();
    }

    /// Activate the serialized network on one input frame.
    ///
    /// Reproduces the graph engine's activation order and gain refresh
    /// semantics, so results match the live network within floating-point
    /// identity.
    pub fn activate(&mut self, input: &[f64]) -> Result<Vec<f64>, NetworkError> {
        if input.len() != self.input {
            return Err(NetworkError::InputSize {
                expected: self.input,
                found: input.len(),
            });
        }
        let n = self.node_count();
        if self.activations.len() != n {
            self.clear();
        }

        let mut output = Vec::with_capacity(self.output);
        for i in 0..n {
            let record = &self.nodes[i * NODE_STRIDE..(i + 1) * NODE_STRIDE];
            let kind = NodeKind::from_tag(record[2]);
            if kind == Some(NodeKind::Input) {
                self.states[i] = input[i];
                self.activations[i] = input[i];
                continue;
            }

            let squash = Activation::from_index(record[0] as usize)
                .unwrap_or(Activation::Logistic);
            let bias = record[1];
            let self_weight = self.recurrent[i * RECURRENT_STRIDE];

            let mut state = self.self_gains[i] * self_weight * self.states[i] + bias;
            for (k, link) in self.links.chunks_exact(LINK_STRIDE).enumerate() {
                let (from, to) = (link[0] as usize, link[1] as usize);
                if to != i || from == to {
                    continue;
                }
                state += self.activations[from] * link[2] * self.gains[k];
            }
            self.states[i] = state;
            let activation = squash.value(state);
            self.activations[i] = activation;

            // Refresh the gains of everything this node gates.
            for (k, link) in self.links.chunks_exact(LINK_STRIDE).enumerate() {
                if link[3] == i as f64 {
                    let (from, to) = (link[0] as usize, link[1] as usize);
                    if from == to {
                        self.self_gains[from] = activation;
                    } else {
                        self.gains[k] = activation;
                    }
                }
            }

            if kind == Some(NodeKind::Output) {
                output.push(activation);
            }
        }
        Ok(output)
    }

    /// Mean cost of the serialized network over a dataset.
    ///
    /// The interpreter state is cleared first, so recurrent networks see the
    /// dataset as one fresh sequence.
    pub fn test(
        &mut self,
        dataset: &[(Vec<f64>, Vec<f64>)],
        cost: Cost,
    ) -> Result<f64, NetworkError> {
        self.clear();
        let mut error = 0.0;
        for (input, target) in dataset {
            let output = self.activate(input)?;
            error += cost.evaluate(target, &output);
        }
        Ok(error / dataset.len().max(1) as f64)
    }
}

impl Network {
    /// Serialize to the wire form handed to evaluators.
    pub fn to_wire(&self) -> WireNetwork {
        WireNetwork::from_network(self)
    }
}
