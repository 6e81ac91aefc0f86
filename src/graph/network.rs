//! The network graph: flat node/connection ownership, forward activation and
//! trace-based backward adaptation.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ConnRef, Connection, Node, NodeKind};

/// Errors raised by the numeric entry points.
#[derive(Debug)]
pub enum NetworkError {
    /// Input slice length disagrees with the network's input count.
    InputSize { expected: usize, found: usize },
    /// Target slice length disagrees with the network's output count.
    TargetSize { expected: usize, found: usize },
    /// Crossover parents differ in input or output count.
    IncompatibleParents,
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputSize { expected, found } => {
                write!(f, "input size mismatch: expected {}, found {}", expected, found)
            }
            Self::TargetSize { expected, found } => {
                write!(f, "target size mismatch: expected {}, found {}", expected, found)
            }
            Self::IncompatibleParents => {
                write!(f, "parents differ in input/output size")
            }
        }
    }
}

impl std::error::Error for NetworkError {}

/// A graph-structured neural network.
///
/// The network is the sole owner of its nodes and edges; everything else
/// addresses them by index. Node order is the activation order and keeps the
/// invariant *inputs first, outputs last, hidden in between* through every
/// mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Network {
    pub input: usize,
    pub output: usize,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub self_connections: Vec<Connection>,
    /// References to every gated connection, regular or self.
    pub gates: Vec<ConnRef>,
    /// Fitness assigned by an evaluator; `None` until scored.
    pub score: Option<f64>,
}

impl Network {
    /// Create a minimal network: all inputs connected to all outputs.
    pub fn new(input: usize, output: usize) -> Self {
        let mut nodes = Vec::with_capacity(input + output);
        for _ in 0..input {
            nodes.push(Node::new(NodeKind::Input));
        }
        for _ in 0..output {
            nodes.push(Node::new(NodeKind::Output));
        }

        let mut network = Self {
            input,
            output,
            nodes,
            connections: Vec::new(),
            self_connections: Vec::new(),
            gates: Vec::new(),
            score: None,
        };

        let mut rng = rand::thread_rng();
        for i in 0..input {
            for j in input..input + output {
                // Fan-in scaled initialization keeps early activations sane.
                let weight = rng.gen::<f64>() * input as f64 * (2.0 / input as f64).sqrt();
                network.connect(i, j, Some(weight));
            }
        }
        network
    }

    /// Assemble a network from already-ordered parts.
    pub(crate) fn from_parts(
        input: usize,
        output: usize,
        nodes: Vec<Node>,
        connections: Vec<Connection>,
        self_connections: Vec<Connection>,
        gates: Vec<ConnRef>,
    ) -> Self {
        Self {
            input,
            output,
            nodes,
            connections,
            self_connections,
            gates,
            score: None,
        }
    }

    /// Number of hidden (and constant) nodes.
    pub fn hidden_count(&self) -> usize {
        self.nodes.len() - self.input - self.output
    }

    /// Resolve a connection reference.
    pub fn connection(&self, conn: ConnRef) -> &Connection {
        match conn {
            ConnRef::Forward(k) => &self.connections[k],
            ConnRef::Selfloop(k) => &self.self_connections[k],
        }
    }

    /// Resolve a connection reference mutably.
    pub fn connection_mut(&mut self, conn: ConnRef) -> &mut Connection {
        match conn {
            ConnRef::Forward(k) => &mut self.connections[k],
            ConnRef::Selfloop(k) => &mut self.self_connections[k],
        }
    }

    /// Index of `node`'s self-connection, if it has one.
    pub fn self_conn_index(&self, node: usize) -> Option<usize> {
        self.self_connections.iter().position(|c| c.from == node)
    }

    /// Whether a regular or self connection from `from` to `to` exists.
    pub fn has_connection(&self, from: usize, to: usize) -> bool {
        if from == to {
            self.self_conn_index(from).is_some()
        } else {
            self.connections.iter().any(|c| c.from == from && c.to == to)
        }
    }

    /// Number of regular connections arriving at `node`.
    pub fn in_degree(&self, node: usize) -> usize {
        self.connections.iter().filter(|c| c.to == node).count()
    }

    /// Number of regular connections leaving `node`.
    pub fn out_degree(&self, node: usize) -> usize {
        self.connections.iter().filter(|c| c.from == node).count()
    }

    /// Add a connection; `from == to` creates a self-connection.
    ///
    /// Passing `None` draws a small random weight.
    pub fn connect(&mut self, from: usize, to: usize, weight: Option<f64>) -> ConnRef {
        debug_assert!(!self.has_connection(from, to));
        let conn = match weight {
            Some(w) => Connection::new(from, to, w),
            None => Connection::random_weight(from, to),
        };
        if from == to {
            self.self_connections.push(conn);
            ConnRef::Selfloop(self.self_connections.len() - 1)
        } else {
            self.connections.push(conn);
            ConnRef::Forward(self.connections.len() - 1)
        }
    }

    /// Remove the connection between two nodes, ungating it first if needed.
    pub fn disconnect(&mut self, from: usize, to: usize) {
        if from == to {
            if let Some(k) = self.self_conn_index(from) {
                self.remove_selfloop(k);
            }
        } else if let Some(k) = self
            .connections
            .iter()
            .position(|c| c.from == from && c.to == to)
        {
            self.remove_forward(k);
        }
    }

    /// Let `gater`'s activation drive the gain of `conn`.
    ///
    /// Ignored (with a warning) if the connection is already gated or if a
    /// node tries to gate its own self-loop.
    pub fn gate(&mut self, gater: usize, conn: ConnRef) {
        if self.connection(conn).gater.is_some() {
            log::warn!("connection is already gated, ignoring");
            return;
        }
        if let ConnRef::Selfloop(k) = conn {
            if self.self_connections[k].from == gater {
                log::warn!("a node cannot gate its own self-connection, ignoring");
                return;
            }
        }
        self.connection_mut(conn).gater = Some(gater);
        self.gates.push(conn);
    }

    /// Remove the gater from `conn` and restore a neutral gain.
    pub fn ungate(&mut self, conn: ConnRef) {
        {
            let c = self.connection_mut(conn);
            c.gater = None;
            c.gain = 1.0;
        }
        if let Some(pos) = self.gates.iter().position(|r| *r == conn) {
            self.gates.remove(pos);
        }
    }

    /// Forget all activation context (traces, states) without touching
    /// weights or biases.
    pub fn clear(&mut self) {
        for node in &mut self.nodes {
            node.clear();
        }
        for conn in self
            .connections
            .iter_mut()
            .chain(self.self_connections.iter_mut())
        {
            conn.clear();
        }
    }

    /// Remove `connections[index]`, keeping the gate list consistent.
    pub(crate) fn remove_forward(&mut self, index: usize) {
        if self.connections[index].gater.is_some() {
            self.ungate(ConnRef::Forward(index));
        }
        self.connections.remove(index);
        for r in &mut self.gates {
            if let ConnRef::Forward(k) = r {
                if *k > index {
                    *r = ConnRef::Forward(*k - 1);
                }
            }
        }
    }

    /// Remove `self_connections[index]`, keeping the gate list consistent.
    pub(crate) fn remove_selfloop(&mut self, index: usize) {
        if self.self_connections[index].gater.is_some() {
            self.ungate(ConnRef::Selfloop(index));
        }
        self.self_connections.remove(index);
        for r in &mut self.gates {
            if let ConnRef::Selfloop(k) = r {
                if *k > index {
                    *r = ConnRef::Selfloop(*k - 1);
                }
            }
        }
    }

    /// Renumber node references after inserting a node at `at`.
    pub(crate) fn shift_indices_for_insert(&mut self, at: usize) {
        for c in self
            .connections
            .iter_mut()
            .chain(self.self_connections.iter_mut())
        {
            if c.from >= at {
                c.from += 1;
            }
            if c.to >= at {
                c.to += 1;
            }
            if let Some(g) = c.gater {
                if g >= at {
                    c.gater = Some(g + 1);
                }
            }
            for (node, _) in c.xtrace.iter_mut() {
                if *node >= at {
                    *node += 1;
                }
            }
        }
    }

    /// Renumber node references after removing the node at `removed`.
    ///
    /// The caller must already have detached every edge and gate of the
    /// removed node.
    pub(crate) fn shift_indices_for_removal(&mut self, removed: usize) {
        for c in self
            .connections
            .iter_mut()
            .chain(self.self_connections.iter_mut())
        {
            debug_assert!(c.from != removed && c.to != removed && c.gater != Some(removed));
            if c.from > removed {
                c.from -= 1;
            }
            if c.to > removed {
                c.to -= 1;
            }
            if let Some(g) = c.gater {
                if g > removed {
                    c.gater = Some(g - 1);
                }
            }
            c.xtrace.retain(|(node, _)| *node != removed);
            for (node, _) in c.xtrace.iter_mut() {
                if *node > removed {
                    *node -= 1;
                }
            }
        }
    }

    /// Activate the network on one input frame, returning output activations.
    pub fn activate(&mut self, input: &[f64]) -> Result<Vec<f64>, NetworkError> {
        if input.len() != self.input {
            return Err(NetworkError::InputSize {
                expected: self.input,
                found: input.len(),
            });
        }

        let (incoming, _outgoing, gated_by, self_of) = self.adjacency();
        let mut output = Vec::with_capacity(self.output);
        for i in 0..self.nodes.len() {
            if self.nodes[i].kind == NodeKind::Input {
                let node = &mut self.nodes[i];
                node.state = input[i];
                node.activation = input[i];
                node.derivative = 1.0;
            } else {
                let activation = self.activate_node(i, &incoming, &gated_by, &self_of);
                if self.nodes[i].kind == NodeKind::Output {
                    output.push(activation);
                }
            }
        }
        Ok(output)
    }

    /// Back-propagate a target through the network, updating eligibility
    /// traces and (when `update` is set) applying the accumulated weight and
    /// bias deltas with momentum.
    pub fn propagate(
        &mut self,
        rate: f64,
        momentum: f64,
        update: bool,
        target: &[f64],
    ) -> Result<(), NetworkError> {
        if target.len() != self.output {
            return Err(NetworkError::TargetSize {
                expected: self.output,
                found: target.len(),
            });
        }

        let (incoming, outgoing, gated_by, self_of) = self.adjacency();
        let first_output = self.nodes.len() - self.output;
        for i in (first_output..self.nodes.len()).rev() {
            self.propagate_node(
                i,
                rate,
                momentum,
                update,
                Some(target[i - first_output]),
                &incoming,
                &outgoing,
                &gated_by,
                &self_of,
            );
        }
        for i in (self.input..first_output).rev() {
            self.propagate_node(
                i, rate, momentum, update, None, &incoming, &outgoing, &gated_by, &self_of,
            );
        }
        Ok(())
    }

    /// Snapshot adjacency: incoming/outgoing regular connections per node,
    /// gated connections per gater, self-connection index per node.
    #[allow(clippy::type_complexity)]
    fn adjacency(&self) -> (Vec<Vec<usize>>, Vec<Vec<usize>>, Vec<Vec<ConnRef>>, Vec<Option<usize>>) {
        let n = self.nodes.len();
        let mut incoming = vec![Vec::new(); n];
        let mut outgoing = vec![Vec::new(); n];
        let mut gated_by = vec![Vec::new(); n];
        let mut self_of = vec![None; n];
        for (k, c) in self.connections.iter().enumerate() {
            incoming[c.to].push(k);
            outgoing[c.from].push(k);
            if let Some(g) = c.gater {
                gated_by[g].push(ConnRef::Forward(k));
            }
        }
        for (k, c) in self.self_connections.iter().enumerate() {
            self_of[c.from] = Some(k);
            if let Some(g) = c.gater {
                gated_by[g].push(ConnRef::Selfloop(k));
            }
        }
        (incoming, outgoing, gated_by, self_of)
    }

    fn self_params(&self, node: usize, self_of: &[Option<usize>]) -> (f64, f64) {
        match self_of[node] {
            Some(k) => (self.self_connections[k].weight, self.self_connections[k].gain),
            None => (0.0, 1.0),
        }
    }

    fn activate_node(
        &mut self,
        i: usize,
        incoming: &[Vec<usize>],
        gated_by: &[Vec<ConnRef>],
        self_of: &[Option<usize>],
    ) -> f64 {
        let old = self.nodes[i].state;
        self.nodes[i].old_state = old;

        let (self_weight, self_gain) = self.self_params(i, self_of);
        let mut state = self_gain * self_weight * old + self.nodes[i].bias;
        for &k in &incoming[i] {
            let c = &self.connections[k];
            state += self.nodes[c.from].activation * c.weight * c.gain;
        }

        let node = &mut self.nodes[i];
        node.state = state;
        node.activation = node.squash.value(state);
        node.derivative = node.squash.derivative(state);
        let activation = node.activation;
        let derivative = node.derivative;

        // Refresh the gains of every connection this node gates, collecting
        // per influenced node how much this node's activation shapes its
        // state. A node's self-loop contribution enters once, via old state.
        let mut influenced: Vec<usize> = Vec::new();
        let mut influences: Vec<f64> = Vec::new();
        for &r in &gated_by[i] {
            let (to, term) = {
                let c = self.connection(r);
                (c.to, c.weight * self.nodes[c.from].activation)
            };
            match influenced.iter().position(|&t| t == to) {
                Some(pos) => influences[pos] += term,
                None => {
                    let mut influence = term;
                    if let Some(k) = self_of[to] {
                        if self.self_connections[k].gater == Some(i) {
                            influence += self.nodes[to].old_state;
                        }
                    }
                    influenced.push(to);
                    influences.push(influence);
                }
            }
            self.connection_mut(r).gain = activation;
        }

        // Eligibility and extended traces for the incoming connections.
        for &k in &incoming[i] {
            let from_activation = self.nodes[self.connections[k].from].activation;
            let gain = self.connections[k].gain;
            let eligibility =
                self_gain * self_weight * self.connections[k].eligibility + from_activation * gain;
            self.connections[k].eligibility = eligibility;

            for (pos, &to) in influenced.iter().enumerate() {
                let influence = influences[pos];
                let (to_self_weight, to_self_gain) = self.self_params(to, self_of);
                let conn = &mut self.connections[k];
                match conn.xtrace.iter_mut().find(|(node, _)| *node == to) {
                    Some((_, value)) => {
                        *value = to_self_gain * to_self_weight * *value
                            + derivative * eligibility * influence;
                    }
                    None => conn.xtrace.push((to, derivative * eligibility * influence)),
                }
            }
        }

        activation
    }

    #[allow(clippy::too_many_arguments)]
    fn propagate_node(
        &mut self,
        i: usize,
        rate: f64,
        momentum: f64,
        update: bool,
        target: Option<f64>,
        incoming: &[Vec<usize>],
        outgoing: &[Vec<usize>],
        gated_by: &[Vec<ConnRef>],
        self_of: &[Option<usize>],
    ) {
        let derivative = self.nodes[i].derivative;

        if let Some(t) = target {
            let err = t - self.nodes[i].activation;
            let node = &mut self.nodes[i];
            node.error_responsibility = err;
            node.error_projected = err;
            node.error_gated = 0.0;
        } else {
            // Error projected through outgoing connections.
            let mut error = 0.0;
            for &k in &outgoing[i] {
                let c = &self.connections[k];
                error += self.nodes[c.to].error_responsibility * c.weight * c.gain;
            }
            let projected = derivative * error;

            // Error flowing back through this node's influence as a gater.
            error = 0.0;
            for &r in &gated_by[i] {
                let c = self.connection(r);
                let to = c.to;
                let mut influence = match self_of[to] {
                    Some(k) if self.self_connections[k].gater == Some(i) => {
                        self.nodes[to].old_state
                    }
                    _ => 0.0,
                };
                influence += c.weight * self.nodes[c.from].activation;
                error += self.nodes[to].error_responsibility * influence;
            }
            let gated = derivative * error;

            let node = &mut self.nodes[i];
            node.error_projected = projected;
            node.error_gated = gated;
            node.error_responsibility = projected + gated;
        }

        if self.nodes[i].kind == NodeKind::Constant {
            return;
        }

        let error_projected = self.nodes[i].error_projected;
        for &k in &incoming[i] {
            let mut gradient = error_projected * self.connections[k].eligibility;
            for &(node, value) in &self.connections[k].xtrace {
                gradient += self.nodes[node].error_responsibility * value;
            }
            let conn = &mut self.connections[k];
            conn.total_delta_weight += rate * gradient;
            if update {
                conn.total_delta_weight += momentum * conn.previous_delta_weight;
                conn.weight += conn.total_delta_weight;
                conn.previous_delta_weight = conn.total_delta_weight;
                conn.total_delta_weight = 0.0;
            }
        }

        let node = &mut self.nodes[i];
        node.total_delta_bias += rate * node.error_responsibility;
        if update {
            node.total_delta_bias += momentum * node.previous_delta_bias;
            node.bias += node.total_delta_bias;
            node.previous_delta_bias = node.total_delta_bias;
            node.total_delta_bias = 0.0;
        }
    }

    /// Check the structural invariants.
    ///
    /// Holds after construction and after every mutation: node ordering,
    /// non-empty input/output, gate-set agreement, self-connection
    /// separation and uniqueness, no duplicate regular edges, and no edges
    /// arriving at input nodes.
    pub fn is_valid(&self) -> bool {
        let n = self.nodes.len();
        if self.input == 0 || self.output == 0 || n < self.input + self.output {
            return false;
        }

        for (i, node) in self.nodes.iter().enumerate() {
            let in_prefix = i < self.input;
            let in_suffix = i >= n - self.output;
            if in_prefix != (node.kind == NodeKind::Input) {
                return false;
            }
            if in_suffix != (node.kind == NodeKind::Output) {
                return false;
            }
        }

        let mut seen = HashSet::new();
        for c in &self.connections {
            if c.from >= n || c.to >= n || c.from == c.to {
                return false;
            }
            if self.nodes[c.to].kind == NodeKind::Input {
                return false;
            }
            if !seen.insert((c.from, c.to)) {
                return false;
            }
            if let Some(g) = c.gater {
                if g >= n {
                    return false;
                }
            }
        }

        let mut self_seen = HashSet::new();
        for c in &self.self_connections {
            if c.from >= n || c.from != c.to {
                return false;
            }
            if self.nodes[c.from].kind == NodeKind::Input {
                return false;
            }
            if !self_seen.insert(c.from) {
                return false;
            }
            if let Some(g) = c.gater {
                if g >= n {
                    return false;
                }
            }
        }

        // Gate set agrees with the gater fields.
        let gated_count = self
            .connections
            .iter()
            .chain(self.self_connections.iter())
            .filter(|c| c.gater.is_some())
            .count();
        if gated_count != self.gates.len() {
            return false;
        }
        let mut gate_seen = HashSet::new();
        for &r in &self.gates {
            let resolved = match r {
                ConnRef::Forward(k) => self.connections.get(k),
                ConnRef::Selfloop(k) => self.self_connections.get(k),
            };
            match resolved {
                Some(c) if c.gater.is_some() => {}
                _ => return false,
            }
            if !gate_seen.insert(r) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::Activation;

    #[test]
    fn test_minimal_network_valid() {
        let net = Network::new(2, 3);
        assert!(net.is_valid());
        assert_eq!(net.connections.len(), 6);
        assert_eq!(net.hidden_count(), 0);
    }

    #[test]
    fn test_activate_size_check() {
        let mut net = Network::new(2, 1);
        assert!(net.activate(&[1.0]).is_err());
        assert!(net.activate(&[1.0, 0.0]).is_ok());
    }

    #[test]
    fn test_propagate_size_check() {
        let mut net = Network::new(2, 1);
        net.activate(&[1.0, 0.0]).unwrap();
        assert!(net.propagate(0.3, 0.0, true, &[]).is_err());
        assert!(net.propagate(0.3, 0.0, true, &[1.0]).is_ok());
    }

    #[test]
    fn test_manual_forward_value() {
        // 2 inputs -> 1 hidden (logistic) -> 1 output (identity), fixed
        // weights, hand-computed expectation.
        let mut net = Network::new(2, 1);
        net.connections.clear();
        net.nodes.insert(2, Node::new(NodeKind::Hidden));
        net.nodes[2].bias = 0.0;
        net.nodes[2].squash = Activation::Logistic;
        net.nodes[3].bias = 0.0;
        net.nodes[3].squash = Activation::Identity;
        net.connect(0, 2, Some(0.5));
        net.connect(1, 2, Some(-0.5));
        net.connect(2, 3, Some(2.0));
        assert!(net.is_valid());

        let out = net.activate(&[1.0, 0.0]).unwrap();
        let hidden = 1.0 / (1.0 + (-0.5f64).exp());
        assert!((out[0] - 2.0 * hidden).abs() < 1e-9);
    }

    #[test]
    fn test_self_loop_carries_state() {
        // input -> hidden(identity, self loop w=1) -> output(identity)
        let mut net = Network::new(1, 1);
        net.connections.clear();
        net.nodes.insert(1, Node::new(NodeKind::Hidden));
        net.nodes[1].bias = 0.0;
        net.nodes[1].squash = Activation::Identity;
        net.nodes[2].bias = 0.0;
        net.nodes[2].squash = Activation::Identity;
        net.connect(0, 1, Some(1.0));
        net.connect(1, 2, Some(1.0));
        net.connect(1, 1, Some(1.0));

        // With a unit self loop the hidden state accumulates the inputs.
        assert_eq!(net.activate(&[1.0]).unwrap()[0], 1.0);
        assert_eq!(net.activate(&[2.0]).unwrap()[0], 3.0);
        assert_eq!(net.activate(&[0.0]).unwrap()[0], 3.0);

        net.clear();
        assert_eq!(net.activate(&[1.0]).unwrap()[0], 1.0);
    }

    #[test]
    fn test_gate_and_ungate() {
        let mut net = Network::new(2, 1);
        let conn = ConnRef::Forward(0);
        net.gate(2, conn);
        assert_eq!(net.gates.len(), 1);
        assert_eq!(net.connection(conn).gater, Some(2));
        assert!(net.is_valid());

        // Gating an already gated connection is ignored.
        net.gate(2, conn);
        assert_eq!(net.gates.len(), 1);

        net.ungate(conn);
        assert!(net.gates.is_empty());
        assert_eq!(net.connection(conn).gater, None);
        assert_eq!(net.connection(conn).gain, 1.0);
        assert!(net.is_valid());
    }

    #[test]
    fn test_own_selfloop_gate_refused() {
        let mut net = Network::new(1, 1);
        net.nodes.insert(1, Node::new(NodeKind::Hidden));
        net.shift_indices_for_insert(1);
        net.connect(0, 1, None);
        net.connect(1, 2, None);
        let selfloop = net.connect(1, 1, None);
        net.gate(1, selfloop);
        assert!(net.gates.is_empty());
        net.gate(2, selfloop);
        assert_eq!(net.gates.len(), 1);
        assert!(net.is_valid());
    }

    #[test]
    fn test_disconnect_fixes_gate_indices() {
        let mut net = Network::new(3, 2);
        // Gate a late connection, then remove an earlier one; the reference
        // must follow the shifted index.
        let gated = ConnRef::Forward(4);
        let (from, to) = (net.connections[4].from, net.connections[4].to);
        net.gate(3, gated);
        net.disconnect(net.connections[0].from, net.connections[0].to);
        assert!(net.is_valid());
        let r = net.gates[0];
        let c = net.connection(r);
        assert_eq!((c.from, c.to), (from, to));
        assert_eq!(c.gater, Some(3));
    }

    #[test]
    fn test_training_reduces_error() {
        let mut net = Network::new(1, 1);
        net.nodes[1].squash = Activation::Logistic;

        let mut first_error = 0.0;
        let mut last_error = 0.0;
        for epoch in 0..40 {
            let out = net.activate(&[1.0]).unwrap()[0];
            let error = (1.0 - out).abs();
            if epoch == 0 {
                first_error = error;
            }
            last_error = error;
            net.propagate(0.3, 0.0, true, &[1.0]).unwrap();
        }
        assert!(last_error < first_error);
    }
}
