//! The topology-mutation engine.
//!
//! Every operator is a no-op when the current topology offers no legal
//! candidate; the evolutionary loop keeps running regardless of which
//! operators happen to be applicable this generation.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{ConnRef, Network, Node, NodeKind};
use crate::methods::{Activation, Mutation};

impl Network {
    /// Apply one mutation operator in place.
    ///
    /// All structural invariants hold again when this returns.
    pub fn mutate(&mut self, method: &Mutation) {
        self.mutate_with(method, &mut rand::thread_rng());
    }

    /// Apply one mutation operator, drawing randomness from `rng`.
    pub fn mutate_with<R: Rng>(&mut self, method: &Mutation, rng: &mut R) {
        match *method {
            Mutation::AddNode => self.add_node(rng),
            Mutation::SubNode { keep_gates } => self.sub_node(keep_gates, rng),
            Mutation::AddConn => self.add_conn(rng),
            Mutation::SubConn => self.sub_conn(rng),
            Mutation::ModWeight { min, max } => self.mod_weight(min, max, rng),
            Mutation::ModBias { min, max } => self.mod_bias(min, max, rng),
            Mutation::ModActivation { mutate_output } => self.mod_activation(mutate_output, rng),
            Mutation::AddSelfConn => self.add_self_conn(rng),
            Mutation::SubSelfConn => self.sub_self_conn(rng),
            Mutation::AddGate => self.add_gate(rng),
            Mutation::SubGate => self.sub_gate(rng),
            Mutation::AddBackConn => self.add_back_conn(rng),
            Mutation::SubBackConn => self.sub_back_conn(rng),
            Mutation::SwapNodes { mutate_output } => self.swap_nodes(mutate_output, rng),
        }
        debug_assert!(self.is_valid());
    }

    /// Split a random connection with a new hidden node, keeping any gate on
    /// one of the two replacement connections.
    fn add_node<R: Rng>(&mut self, rng: &mut R) {
        if self.connections.is_empty() {
            log::debug!("add_node: no connection to split");
            return;
        }
        let picked = rng.gen_range(0..self.connections.len());
        let (mut from, mut to) = (self.connections[picked].from, self.connections[picked].to);
        let gater = self.connections[picked].gater;
        self.remove_forward(picked);

        // Keep the node order intact: never insert past the output block.
        let position = to.min(self.nodes.len() - self.output);
        let mut node = Node::new(NodeKind::Hidden);
        node.squash = Activation::random(rng);
        self.nodes.insert(position, node);
        self.shift_indices_for_insert(position);
        if from >= position {
            from += 1;
        }
        if to >= position {
            to += 1;
        }
        let gater = gater.map(|g| if g >= position { g + 1 } else { g });

        let first = self.connect(from, position, None);
        let second = self.connect(position, to, None);
        if let Some(g) = gater {
            let target = if rng.gen_bool(0.5) { first } else { second };
            self.gate(g, target);
        }
    }

    /// Remove a random hidden node, bridging its former neighbors.
    fn sub_node<R: Rng>(&mut self, keep_gates: bool, rng: &mut R) {
        let hidden: Vec<usize> = (self.input..self.nodes.len() - self.output)
            .filter(|&i| self.nodes[i].kind == NodeKind::Hidden)
            .collect();
        let Some(&index) = hidden.choose(rng) else {
            log::debug!("sub_node: no removable hidden node");
            return;
        };
        self.remove_node(index, keep_gates, rng);
    }

    /// Remove the node at `index` along with all its edges.
    ///
    /// With `keep_gates`, gating duties of the removed node's edges are
    /// re-homed onto the bridge connections between its former neighbors.
    pub(crate) fn remove_node<R: Rng>(&mut self, index: usize, keep_gates: bool, rng: &mut R) {
        self.disconnect(index, index);

        let mut gaters: Vec<usize> = Vec::new();
        let inbound: Vec<(usize, Option<usize>)> = self
            .connections
            .iter()
            .filter(|c| c.to == index)
            .map(|c| (c.from, c.gater))
            .collect();
        for &(from, gater) in &inbound {
            if keep_gates {
                if let Some(g) = gater {
                    if g != index {
                        gaters.push(g);
                    }
                }
            }
            self.disconnect(from, index);
        }

        let outbound: Vec<(usize, Option<usize>)> = self
            .connections
            .iter()
            .filter(|c| c.from == index)
            .map(|c| (c.to, c.gater))
            .collect();
        for &(to, gater) in &outbound {
            if keep_gates {
                if let Some(g) = gater {
                    if g != index {
                        gaters.push(g);
                    }
                }
            }
            self.disconnect(index, to);
        }

        // Bridge every former source to every former sink.
        let mut bridges: Vec<ConnRef> = Vec::new();
        for &(from, _) in &inbound {
            for &(to, _) in &outbound {
                if !self.has_connection(from, to) {
                    bridges.push(self.connect(from, to, None));
                }
            }
        }

        // Re-home collected gating duties onto random bridges.
        for gater in gaters {
            if bridges.is_empty() {
                break;
            }
            let eligible: Vec<usize> = bridges
                .iter()
                .enumerate()
                .filter(|(_, r)| match **r {
                    ConnRef::Selfloop(k) => self.self_connections[k].from != gater,
                    ConnRef::Forward(_) => true,
                })
                .map(|(pos, _)| pos)
                .collect();
            let Some(&pos) = eligible.choose(rng) else {
                continue;
            };
            let bridge = bridges.remove(pos);
            self.gate(gater, bridge);
        }

        // Drop gating duties held by the removed node itself.
        let orphaned: Vec<ConnRef> = self
            .gates
            .iter()
            .copied()
            .filter(|&r| self.connection(r).gater == Some(index))
            .collect();
        for r in orphaned {
            self.ungate(r);
        }

        self.nodes.remove(index);
        self.shift_indices_for_removal(index);
    }

    /// Connect two forward-ordered, not yet connected nodes.
    fn add_conn<R: Rng>(&mut self, rng: &mut R) {
        let n = self.nodes.len();
        let mut available = Vec::new();
        for i in 0..n - self.output {
            for j in (i + 1).max(self.input)..n {
                if !self.has_connection(i, j) {
                    available.push((i, j));
                }
            }
        }
        let Some(&(from, to)) = available.choose(rng) else {
            log::debug!("add_conn: graph is fully connected");
            return;
        };
        self.connect(from, to, None);
    }

    /// Remove a forward connection that leaves both endpoints connected.
    fn sub_conn<R: Rng>(&mut self, rng: &mut R) {
        let candidates: Vec<usize> = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                self.out_degree(c.from) > 1 && self.in_degree(c.to) > 1 && c.to > c.from
            })
            .map(|(k, _)| k)
            .collect();
        let Some(&k) = candidates.choose(rng) else {
            log::debug!("sub_conn: no removable connection");
            return;
        };
        self.remove_forward(k);
    }

    /// Perturb one random connection weight.
    fn mod_weight<R: Rng>(&mut self, min: f64, max: f64, rng: &mut R) {
        let total = self.connections.len() + self.self_connections.len();
        if total == 0 {
            log::debug!("mod_weight: no connections");
            return;
        }
        let delta = rng.gen_range(min..max);
        let index = rng.gen_range(0..total);
        if index < self.connections.len() {
            self.connections[index].weight += delta;
        } else {
            self.self_connections[index - self.connections.len()].weight += delta;
        }
    }

    /// Perturb one random non-input, non-constant node bias.
    fn mod_bias<R: Rng>(&mut self, min: f64, max: f64, rng: &mut R) {
        let candidates: Vec<usize> = (self.input..self.nodes.len())
            .filter(|&i| self.nodes[i].kind != NodeKind::Constant)
            .collect();
        let Some(&i) = candidates.choose(rng) else {
            return;
        };
        self.nodes[i].bias += rng.gen_range(min..max);
    }

    /// Reassign a random node's squash function.
    fn mod_activation<R: Rng>(&mut self, mutate_output: bool, rng: &mut R) {
        let end = if mutate_output {
            self.nodes.len()
        } else {
            self.nodes.len() - self.output
        };
        let candidates: Vec<usize> = (self.input..end)
            .filter(|&i| self.nodes[i].kind != NodeKind::Constant)
            .collect();
        let Some(&i) = candidates.choose(rng) else {
            log::debug!("mod_activation: no mutable node");
            return;
        };
        self.nodes[i].squash = self.nodes[i].squash.random_other(rng);
    }

    /// Add a self-loop on a random hidden node without one.
    fn add_self_conn<R: Rng>(&mut self, rng: &mut R) {
        let candidates: Vec<usize> = (self.input..self.nodes.len() - self.output)
            .filter(|&i| {
                self.nodes[i].kind == NodeKind::Hidden && self.self_conn_index(i).is_none()
            })
            .collect();
        let Some(&i) = candidates.choose(rng) else {
            log::debug!("add_self_conn: no eligible node");
            return;
        };
        self.connect(i, i, None);
    }

    /// Remove a random self-loop.
    fn sub_self_conn<R: Rng>(&mut self, rng: &mut R) {
        if self.self_connections.is_empty() {
            log::debug!("sub_self_conn: no self connection");
            return;
        }
        let k = rng.gen_range(0..self.self_connections.len());
        self.remove_selfloop(k);
    }

    /// Assign a gater to a random ungated connection.
    fn add_gate<R: Rng>(&mut self, rng: &mut R) {
        let mut ungated: Vec<ConnRef> = Vec::new();
        for (k, c) in self.connections.iter().enumerate() {
            if c.gater.is_none() {
                ungated.push(ConnRef::Forward(k));
            }
        }
        for (k, c) in self.self_connections.iter().enumerate() {
            if c.gater.is_none() {
                ungated.push(ConnRef::Selfloop(k));
            }
        }
        let Some(&conn) = ungated.choose(rng) else {
            log::debug!("add_gate: every connection is gated");
            return;
        };
        let excluded = match conn {
            ConnRef::Selfloop(k) => Some(self.self_connections[k].from),
            ConnRef::Forward(_) => None,
        };
        let gaters: Vec<usize> = (self.input..self.nodes.len())
            .filter(|&i| Some(i) != excluded)
            .collect();
        let Some(&gater) = gaters.choose(rng) else {
            return;
        };
        self.gate(gater, conn);
    }

    /// Remove the gater from a random gated connection.
    fn sub_gate<R: Rng>(&mut self, rng: &mut R) {
        if self.gates.is_empty() {
            log::debug!("sub_gate: nothing is gated");
            return;
        }
        let k = rng.gen_range(0..self.gates.len());
        self.ungate(self.gates[k]);
    }

    /// Connect two nodes against the forward order.
    fn add_back_conn<R: Rng>(&mut self, rng: &mut R) {
        let n = self.nodes.len();
        let mut available = Vec::new();
        for i in self.input..n {
            for j in self.input..i {
                if !self.has_connection(i, j) {
                    available.push((i, j));
                }
            }
        }
        let Some(&(from, to)) = available.choose(rng) else {
            log::debug!("add_back_conn: no available pair");
            return;
        };
        self.connect(from, to, None);
    }

    /// Remove a recurrent connection that leaves both endpoints connected.
    fn sub_back_conn<R: Rng>(&mut self, rng: &mut R) {
        let candidates: Vec<usize> = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                self.out_degree(c.from) > 1 && self.in_degree(c.to) > 1 && c.from > c.to
            })
            .map(|(k, _)| k)
            .collect();
        let Some(&k) = candidates.choose(rng) else {
            log::debug!("sub_back_conn: no removable back connection");
            return;
        };
        self.remove_forward(k);
    }

    /// Exchange bias and squash between two random nodes, leaving the
    /// connection topology untouched.
    fn swap_nodes<R: Rng>(&mut self, mutate_output: bool, rng: &mut R) {
        let end = if mutate_output {
            self.nodes.len()
        } else {
            self.nodes.len() - self.output
        };
        let candidates: Vec<usize> = (self.input..end)
            .filter(|&i| self.nodes[i].kind != NodeKind::Constant)
            .collect();
        if candidates.len() < 2 {
            log::debug!("swap_nodes: fewer than two eligible nodes");
            return;
        }
        let picked: Vec<&usize> = candidates.choose_multiple(rng, 2).collect();
        let (a, b) = (*picked[0], *picked[1]);
        let bias = self.nodes[a].bias;
        let squash = self.nodes[a].squash;
        self.nodes[a].bias = self.nodes[b].bias;
        self.nodes[a].squash = self.nodes[b].squash;
        self.nodes[b].bias = bias;
        self.nodes[b].squash = squash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_net() -> Network {
        let mut net = Network::new(2, 1);
        net.mutate(&Mutation::AddNode);
        net
    }

    #[test]
    fn test_add_node_splits_connection() {
        let mut net = Network::new(2, 1);
        assert_eq!(net.connections.len(), 2);
        net.mutate(&Mutation::AddNode);
        assert_eq!(net.hidden_count(), 1);
        // One connection removed, two added.
        assert_eq!(net.connections.len(), 3);
        assert!(net.is_valid());
    }

    #[test]
    fn test_add_then_sub_node_restores_link() {
        let mut net = Network::new(2, 1);
        let mut before: Vec<(usize, usize)> =
            net.connections.iter().map(|c| (c.from, c.to)).collect();
        net.mutate(&Mutation::AddNode);
        net.mutate(&Mutation::SubNode { keep_gates: true });
        assert_eq!(net.hidden_count(), 0);
        let mut after: Vec<(usize, usize)> =
            net.connections.iter().map(|c| (c.from, c.to)).collect();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn test_sub_node_noop_without_hidden() {
        let mut net = Network::new(2, 2);
        net.mutate(&Mutation::SubNode { keep_gates: true });
        assert_eq!(net.nodes.len(), 4);
        assert!(net.is_valid());
    }

    #[test]
    fn test_add_conn_noop_when_saturated() {
        // 1x1 minimal network is fully forward-connected already.
        let mut net = Network::new(1, 1);
        net.mutate(&Mutation::AddConn);
        assert_eq!(net.connections.len(), 1);
    }

    #[test]
    fn test_sub_conn_never_isolates() {
        let mut net = Network::new(2, 1);
        // Both connections are the sole outbound edge of their source.
        net.mutate(&Mutation::SubConn);
        net.mutate(&Mutation::SubConn);
        assert_eq!(net.connections.len(), 2);
        assert!(net.is_valid());
    }

    #[test]
    fn test_mod_weight_changes_one_weight() {
        let mut net = Network::new(2, 1);
        let before: Vec<f64> = net.connections.iter().map(|c| c.weight).collect();
        net.mutate(&Mutation::ModWeight { min: 1.0, max: 2.0 });
        let changed = net
            .connections
            .iter()
            .zip(&before)
            .filter(|(c, w)| (c.weight - **w).abs() > 1e-12)
            .count();
        assert_eq!(changed, 1);
    }

    #[test]
    fn test_self_conn_cycle() {
        let mut net = hidden_net();
        net.mutate(&Mutation::AddSelfConn);
        assert_eq!(net.self_connections.len(), 1);
        // Second application has no eligible node left.
        net.mutate(&Mutation::AddSelfConn);
        assert_eq!(net.self_connections.len(), 1);
        net.mutate(&Mutation::SubSelfConn);
        assert!(net.self_connections.is_empty());
        net.mutate(&Mutation::SubSelfConn);
        assert!(net.is_valid());
    }

    #[test]
    fn test_gate_cycle() {
        let mut net = hidden_net();
        net.mutate(&Mutation::AddGate);
        assert_eq!(net.gates.len(), 1);
        let gated = net.connection(net.gates[0]);
        assert!(gated.gater.is_some());
        net.mutate(&Mutation::SubGate);
        assert!(net.gates.is_empty());
        assert!(net.connections.iter().all(|c| c.gater.is_none()));
    }

    #[test]
    fn test_back_conn_direction() {
        let mut net = hidden_net();
        let before = net.connections.len();
        net.mutate(&Mutation::AddBackConn);
        if net.connections.len() > before {
            let back = net.connections.last().unwrap();
            assert!(back.from > back.to);
        }
        assert!(net.is_valid());
    }

    #[test]
    fn test_swap_nodes_keeps_topology() {
        let mut net = Network::new(2, 2);
        net.mutate(&Mutation::AddNode);
        net.mutate(&Mutation::AddNode);
        let edges: Vec<(usize, usize)> =
            net.connections.iter().map(|c| (c.from, c.to)).collect();
        net.mutate(&Mutation::SwapNodes { mutate_output: false });
        let after: Vec<(usize, usize)> =
            net.connections.iter().map(|c| (c.from, c.to)).collect();
        assert_eq!(edges, after);
        assert!(net.is_valid());
    }

    #[test]
    fn test_seeded_mutation_reproducible() {
        use rand::SeedableRng;
        use rand_chacha::ChaCha8Rng;

        let build = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut net = Network::new(2, 1);
            net.connections.iter_mut().for_each(|c| c.weight = 1.0);
            for _ in 0..10 {
                net.mutate_with(&Mutation::AddNode, &mut rng);
            }
            net
        };
        let a = build(7);
        let b = build(7);
        assert_eq!(a.nodes.len(), b.nodes.len());
        let edges = |n: &Network| -> Vec<(usize, usize)> {
            n.connections.iter().map(|c| (c.from, c.to)).collect()
        };
        assert_eq!(edges(&a), edges(&b));
    }

    #[test]
    fn test_random_mutation_sequence_stays_valid() {
        let mut rng = rand::thread_rng();
        let catalog = Mutation::all();
        let mut net = Network::new(3, 2);
        for _ in 0..300 {
            let method = catalog.choose(&mut rng).unwrap();
            net.mutate(method);
            assert!(net.is_valid());
        }
        // The network still activates after heavy rewiring.
        let out = net.activate(&[0.5, -0.5, 1.0]).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
