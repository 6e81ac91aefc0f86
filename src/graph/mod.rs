//! The graph engine: nodes, gated connections, forward activation,
//! trace-based backward adaptation, topology mutation and crossover.

mod connection;
mod crossover;
mod mutate;
mod network;
mod node;

pub use connection::{ConnRef, Connection};
pub use network::{Network, NetworkError};
pub use node::{Node, NodeKind};
