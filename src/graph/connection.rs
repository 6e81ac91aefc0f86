//! Weighted, optionally-gated edges.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A directed edge between two nodes, addressed by node index.
///
/// A connection with `from == to` is a self-connection and lives in the
/// network's separate self-connection list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Connection {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
    /// Multiplier applied by the gater; 1 when ungated.
    pub gain: f64,
    /// Node whose activation drives the gain, if any.
    pub gater: Option<usize>,
    /// Eligibility trace: decayed accumulation of the source's influence.
    pub(crate) eligibility: f64,
    /// Extended traces, keyed by the index of the node whose state the
    /// trace's gater influences through this connection.
    pub(crate) xtrace: Vec<(usize, f64)>,
    pub(crate) total_delta_weight: f64,
    pub(crate) previous_delta_weight: f64,
}

impl Connection {
    /// Create a connection with the given weight.
    pub fn new(from: usize, to: usize, weight: f64) -> Self {
        Self {
            from,
            to,
            weight,
            gain: 1.0,
            gater: None,
            eligibility: 0.0,
            xtrace: Vec::new(),
            total_delta_weight: 0.0,
            previous_delta_weight: 0.0,
        }
    }

    /// Create a connection with a small random weight.
    pub fn random_weight(from: usize, to: usize) -> Self {
        Self::new(from, to, rand::thread_rng().gen_range(-0.1..0.1))
    }

    /// Whether this edge loops back onto its own source.
    pub fn is_self(&self) -> bool {
        self.from == self.to
    }

    /// Reset traces and gain-dependent context, keeping the weight.
    pub(crate) fn clear(&mut self) {
        self.eligibility = 0.0;
        self.xtrace.clear();
        self.gain = if self.gater.is_some() { 0.0 } else { 1.0 };
    }
}

/// Address of a connection in the owning network's flat lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnRef {
    /// Index into the regular connection list.
    Forward(usize),
    /// Index into the self-connection list.
    Selfloop(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let conn = Connection::new(0, 3, 0.5);
        assert_eq!(conn.gain, 1.0);
        assert_eq!(conn.gater, None);
        assert!(!conn.is_self());
    }

    #[test]
    fn test_self_detection() {
        assert!(Connection::new(2, 2, 1.0).is_self());
    }

    #[test]
    fn test_clear_gain_tracks_gater() {
        let mut conn = Connection::new(0, 1, 0.5);
        conn.gain = 0.8;
        conn.clear();
        assert_eq!(conn.gain, 1.0);

        conn.gater = Some(4);
        conn.clear();
        assert_eq!(conn.gain, 0.0);
    }
}
