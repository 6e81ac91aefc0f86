//! Construction-time node arena and the flatten-and-classify pass.

use super::ArchitectError;
use crate::graph::{ConnRef, Connection, Network, Node, NodeKind};
use crate::methods::Activation;

/// How two groups are wired together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectPattern {
    /// Every source node to every target node.
    AllToAll,
    /// Every source node to every target node except itself.
    AllToElse,
    /// Source node i to target node i; groups must have equal size.
    /// On a group and itself this creates self-connections.
    OneToOne,
}

/// Which end of a connection bundle a gater group attaches to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatePattern {
    /// Gater i gates all bundle connections arriving at target node i.
    Input,
    /// Gater i gates all bundle connections leaving source node i.
    Output,
    /// Gater i gates the self-connection of source node i.
    Selfloop,
}

/// An ordered handle over a contiguous range of builder nodes.
///
/// Groups have no independent lifetime: they are flattened into the network
/// at build time and never referenced again by the runtime graph.
#[derive(Clone, Copy, Debug)]
pub struct Group {
    pub(crate) start: usize,
    pub(crate) len: usize,
}

impl Group {
    /// Number of nodes in the group.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the group holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Builder index of the group's i-th node.
    pub fn node(&self, i: usize) -> usize {
        debug_assert!(i < self.len);
        self.start + i
    }

    pub(crate) fn indices(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Assembles nodes and connections, then builds the owning network.
#[derive(Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a group of hidden nodes.
    pub fn group(&mut self, size: usize) -> Group {
        let start = self.nodes.len();
        for _ in 0..size {
            self.nodes.push(Node::new(NodeKind::Hidden));
        }
        Group { start, len: size }
    }

    /// Annotate every node in the group with an explicit kind.
    pub fn set_kind(&mut self, group: &Group, kind: NodeKind) {
        for i in group.indices() {
            self.nodes[i].kind = kind;
        }
    }

    /// Set the bias of every node in the group.
    pub fn set_bias(&mut self, group: &Group, bias: f64) {
        for i in group.indices() {
            self.nodes[i].bias = bias;
        }
    }

    /// Set the squash function of every node in the group.
    pub fn set_squash(&mut self, group: &Group, squash: Activation) {
        for i in group.indices() {
            self.nodes[i].squash = squash;
        }
    }

    /// Wire two groups together, returning the created connection ids.
    ///
    /// `None` weights are drawn small and random per connection.
    pub fn connect(
        &mut self,
        from: &Group,
        to: &Group,
        pattern: ConnectPattern,
        weight: Option<f64>,
    ) -> Result<Vec<usize>, ArchitectError> {
        let mut made = Vec::new();
        match pattern {
            ConnectPattern::AllToAll => {
                for i in from.indices() {
                    for j in to.indices() {
                        made.push(self.push_connection(i, j, weight));
                    }
                }
            }
            ConnectPattern::AllToElse => {
                for i in from.indices() {
                    for j in to.indices() {
                        if i != j {
                            made.push(self.push_connection(i, j, weight));
                        }
                    }
                }
            }
            ConnectPattern::OneToOne => {
                if from.len() != to.len() {
                    return Err(ArchitectError::SizeMismatch {
                        expected: from.len(),
                        found: to.len(),
                    });
                }
                for k in 0..from.len() {
                    made.push(self.push_connection(from.node(k), to.node(k), weight));
                }
            }
        }
        Ok(made)
    }

    fn push_connection(&mut self, from: usize, to: usize, weight: Option<f64>) -> usize {
        let conn = match weight {
            Some(w) => Connection::new(from, to, w),
            None => Connection::random_weight(from, to),
        };
        self.connections.push(conn);
        self.connections.len() - 1
    }

    /// Let the gater group gate a bundle of previously created connections.
    pub fn gate(&mut self, gater: &Group, connections: &[usize], pattern: GatePattern) {
        if gater.is_empty() {
            return;
        }
        match pattern {
            GatePattern::Input => {
                let mut targets: Vec<usize> = Vec::new();
                for &c in connections {
                    let to = self.connections[c].to;
                    if !targets.contains(&to) {
                        targets.push(to);
                    }
                }
                for (i, &target) in targets.iter().enumerate() {
                    let g = gater.node(i % gater.len());
                    for &c in connections {
                        let conn = &mut self.connections[c];
                        if conn.to == target && conn.gater.is_none() {
                            conn.gater = Some(g);
                        }
                    }
                }
            }
            GatePattern::Output => {
                let mut sources: Vec<usize> = Vec::new();
                for &c in connections {
                    let from = self.connections[c].from;
                    if !sources.contains(&from) {
                        sources.push(from);
                    }
                }
                for (i, &source) in sources.iter().enumerate() {
                    let g = gater.node(i % gater.len());
                    for &c in connections {
                        let conn = &mut self.connections[c];
                        if conn.from == source && conn.gater.is_none() {
                            conn.gater = Some(g);
                        }
                    }
                }
            }
            GatePattern::Selfloop => {
                let mut sources: Vec<usize> = Vec::new();
                for &c in connections {
                    let conn = &self.connections[c];
                    if conn.from == conn.to && !sources.contains(&conn.from) {
                        sources.push(conn.from);
                    }
                }
                for (i, &source) in sources.iter().enumerate() {
                    let g = gater.node(i % gater.len());
                    if g == source {
                        continue;
                    }
                    for &c in connections {
                        let conn = &mut self.connections[c];
                        if conn.from == source && conn.to == source && conn.gater.is_none() {
                            conn.gater = Some(g);
                        }
                    }
                }
            }
        }
    }

    /// Flatten the ordered groups into a network.
    ///
    /// Classification resolves each node into input/hidden/output, explicit
    /// kind annotations first, structure second: a node gating or feeding
    /// nothing is an output, a node receiving nothing is an input. The final
    /// node order is inputs, then the middle, then outputs, each in the order
    /// given; connection, gate and self-connection lists are populated by
    /// walking that final order, so list layout is reproducible from the
    /// group order alone.
    pub fn build(self, order: &[Group]) -> Result<Network, ArchitectError> {
        let n = self.nodes.len();
        let mut sequence: Vec<usize> = Vec::with_capacity(n);
        for g in order {
            sequence.extend(g.indices());
        }
        debug_assert_eq!(sequence.len(), n, "build order must cover every node once");

        // Structural degrees; self-loops count for neither direction.
        let mut outgoing = vec![0usize; n];
        let mut incoming = vec![0usize; n];
        let mut gating = vec![0usize; n];
        for c in &self.connections {
            if c.from != c.to {
                outgoing[c.from] += 1;
                incoming[c.to] += 1;
            }
            if let Some(g) = c.gater {
                gating[g] += 1;
            }
        }

        let mut inputs = Vec::new();
        let mut middle = Vec::new();
        let mut outputs = Vec::new();
        for &i in &sequence {
            match self.nodes[i].kind {
                NodeKind::Input => inputs.push(i),
                NodeKind::Output => outputs.push(i),
                _ => {
                    if outgoing[i] + gating[i] == 0 {
                        outputs.push(i);
                    } else if incoming[i] == 0 {
                        inputs.push(i);
                    } else {
                        middle.push(i);
                    }
                }
            }
        }
        if inputs.is_empty() {
            return Err(ArchitectError::NoInput);
        }
        if outputs.is_empty() {
            return Err(ArchitectError::NoOutput);
        }

        let final_order: Vec<usize> = inputs
            .iter()
            .chain(middle.iter())
            .chain(outputs.iter())
            .copied()
            .collect();
        let mut remap = vec![0usize; n];
        for (position, &i) in final_order.iter().enumerate() {
            remap[i] = position;
        }

        let mut nodes = Vec::with_capacity(n);
        for (position, &i) in final_order.iter().enumerate() {
            let mut node = self.nodes[i].clone();
            if position < inputs.len() {
                node.kind = NodeKind::Input;
            } else if position >= n - outputs.len() {
                node.kind = NodeKind::Output;
            } else if node.kind != NodeKind::Constant {
                node.kind = NodeKind::Hidden;
            }
            nodes.push(node);
        }

        let mut connections = Vec::new();
        let mut self_connections = Vec::new();
        let mut placed: Vec<Option<ConnRef>> = vec![None; self.connections.len()];
        for &i in &final_order {
            for (k, c) in self.connections.iter().enumerate() {
                if c.from != i {
                    continue;
                }
                let mut mapped = c.clone();
                mapped.from = remap[c.from];
                mapped.to = remap[c.to];
                mapped.gater = c.gater.map(|g| remap[g]);
                if c.from == c.to {
                    self_connections.push(mapped);
                    placed[k] = Some(ConnRef::Selfloop(self_connections.len() - 1));
                } else {
                    connections.push(mapped);
                    placed[k] = Some(ConnRef::Forward(connections.len() - 1));
                }
            }
        }
        let mut gates = Vec::new();
        for &i in &final_order {
            for (k, c) in self.connections.iter().enumerate() {
                if c.gater == Some(i) {
                    if let Some(r) = placed[k] {
                        gates.push(r);
                    }
                }
            }
        }

        let network = Network::from_parts(
            inputs.len(),
            outputs.len(),
            nodes,
            connections,
            self_connections,
            gates,
        );
        debug_assert!(network.is_valid());
        Ok(network)
    }
}
