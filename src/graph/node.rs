//! The computational unit of a network.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::methods::Activation;

/// The role a node plays in the graph.
///
/// Constant nodes apply a fixed squash with a fixed bias and are skipped by
/// weight/bias adaptation; the gated-recurrent recipes use them for
/// one-minus-update and delay-line plumbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Input,
    Hidden,
    Output,
    Constant,
}

impl NodeKind {
    /// Numeric tag used in the wire form.
    pub fn tag(self) -> f64 {
        match self {
            Self::Input => 0.0,
            Self::Hidden => 1.0,
            Self::Output => 2.0,
            Self::Constant => 3.0,
        }
    }

    /// Look up a kind by wire tag.
    pub fn from_tag(tag: f64) -> Option<Self> {
        match tag as i64 {
            0 => Some(Self::Input),
            1 => Some(Self::Hidden),
            2 => Some(Self::Output),
            3 => Some(Self::Constant),
            _ => None,
        }
    }
}

/// A single node: bias, squash function and activation-time state.
///
/// Nodes hold no connection lists; the owning [`Network`](super::Network)
/// keeps the flat edge lists and addresses nodes by index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub bias: f64,
    pub squash: Activation,
    /// Output of the squash at the current state.
    pub activation: f64,
    /// Pre-activation state.
    pub state: f64,
    /// State from the previous activation step, for self-loop recurrence.
    pub old_state: f64,
    /// Derivative of the squash at the current state.
    pub derivative: f64,
    pub(crate) error_responsibility: f64,
    pub(crate) error_projected: f64,
    pub(crate) error_gated: f64,
    pub(crate) total_delta_bias: f64,
    pub(crate) previous_delta_bias: f64,
}

impl Node {
    /// Create a node of the given kind.
    ///
    /// Input and constant nodes start with a zero bias; hidden and output
    /// nodes get a small random one.
    pub fn new(kind: NodeKind) -> Self {
        let bias = match kind {
            NodeKind::Input | NodeKind::Constant => 0.0,
            _ => rand::thread_rng().gen_range(-0.1..0.1),
        };
        Self {
            kind,
            bias,
            squash: Activation::default(),
            activation: 0.0,
            state: 0.0,
            old_state: 0.0,
            derivative: 1.0,
            error_responsibility: 0.0,
            error_projected: 0.0,
            error_gated: 0.0,
            total_delta_bias: 0.0,
            previous_delta_bias: 0.0,
        }
    }

    /// Reset activation-dependent state, keeping bias and squash.
    pub fn clear(&mut self) {
        self.activation = 0.0;
        self.state = 0.0;
        self.old_state = 0.0;
        self.derivative = 1.0;
        self.error_responsibility = 0.0;
        self.error_projected = 0.0;
        self.error_gated = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_bias_zero() {
        assert_eq!(Node::new(NodeKind::Input).bias, 0.0);
        assert_eq!(Node::new(NodeKind::Constant).bias, 0.0);
    }

    #[test]
    fn test_kind_tag_roundtrip() {
        for kind in [
            NodeKind::Input,
            NodeKind::Hidden,
            NodeKind::Output,
            NodeKind::Constant,
        ] {
            assert_eq!(NodeKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(NodeKind::from_tag(9.0), None);
    }

    #[test]
    fn test_clear_keeps_parameters() {
        let mut node = Node::new(NodeKind::Hidden);
        node.squash = Activation::Tanh;
        node.activation = 0.7;
        node.state = 1.2;
        node.clear();
        assert_eq!(node.activation, 0.0);
        assert_eq!(node.squash, Activation::Tanh);
    }
}
