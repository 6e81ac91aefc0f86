//! Named network layout recipes.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::builder::{ConnectPattern, GatePattern, Group, NetworkBuilder};
use super::layer::Layer;
use super::ArchitectError;
use crate::graph::{Network, NodeKind};
use crate::methods::{Activation, Mutation};

/// A feed-forward stack: consecutive layers fully connected.
///
/// Needs at least three layer sizes (input, hidden..., output).
pub fn perceptron(layers: &[usize]) -> Result<Network, ArchitectError> {
    if layers.len() < 3 {
        return Err(ArchitectError::MissingLayers {
            needed: 3,
            given: layers.len(),
        });
    }
    let mut builder = NetworkBuilder::new();
    let groups: Vec<Group> = layers.iter().map(|&size| builder.group(size)).collect();
    for pair in groups.windows(2) {
        builder.connect(&pair[0], &pair[1], ConnectPattern::AllToAll, None)?;
    }
    builder.build(&groups)
}

/// Options for the incremental random-growth recipe.
#[derive(Clone, Debug)]
pub struct RandomOptions {
    /// Total forward connections to grow towards; defaults to `hidden * 2`.
    pub connections: Option<usize>,
    /// Recurrent connections to add.
    pub back_connections: usize,
    /// Self-loops to add.
    pub self_connections: usize,
    /// Gates to assign.
    pub gates: usize,
    /// Seed for reproducible growth; random otherwise.
    pub seed: Option<u64>,
}

impl Default for RandomOptions {
    fn default() -> Self {
        Self {
            connections: None,
            back_connections: 0,
            self_connections: 0,
            gates: 0,
            seed: None,
        }
    }
}

/// Grow a network from a minimal input/output skeleton by repeatedly applying
/// structural mutation operators.
pub fn random(input: usize, hidden: usize, output: usize, options: &RandomOptions) -> Network {
    let mut network = Network::new(input, output);
    match options.seed {
        Some(seed) => grow(&mut network, hidden, options, &mut ChaCha8Rng::seed_from_u64(seed)),
        None => grow(&mut network, hidden, options, &mut rand::thread_rng()),
    }
    network
}

fn grow<R: Rng>(network: &mut Network, hidden: usize, options: &RandomOptions, rng: &mut R) {
    for _ in 0..hidden {
        network.mutate_with(&Mutation::AddNode, rng);
    }
    let connections = options.connections.unwrap_or(hidden * 2);
    for _ in 0..connections.saturating_sub(hidden) {
        network.mutate_with(&Mutation::AddConn, rng);
    }
    for _ in 0..options.back_connections {
        network.mutate_with(&Mutation::AddBackConn, rng);
    }
    for _ in 0..options.self_connections {
        network.mutate_with(&Mutation::AddSelfConn, rng);
    }
    for _ in 0..options.gates {
        network.mutate_with(&Mutation::AddGate, rng);
    }
}

/// Optional wiring of the LSTM recipe.
#[derive(Clone, Debug)]
pub struct LstmOptions {
    /// All-to-else recurrence between the memory cells of a block.
    pub memory_to_memory: bool,
    /// Feed the output layer back into every memory cell.
    pub output_to_memory: bool,
    /// Feed the output layer into every gate.
    pub output_to_gates: bool,
    /// Direct input-to-output connections.
    pub input_to_output: bool,
    /// Feed the raw input into the deeper blocks' memory cells.
    pub input_to_deep: bool,
}

impl Default for LstmOptions {
    fn default() -> Self {
        Self {
            memory_to_memory: false,
            output_to_memory: false,
            output_to_gates: false,
            input_to_output: true,
            input_to_deep: true,
        }
    }
}

/// A stack of LSTM-style memory blocks.
///
/// `layers` is input size, one or more block sizes, output size. The input,
/// forget and output gates gate the cell input, the cell self-loop and the
/// cell output respectively; gate biases start at 1 so every gate begins
/// open.
pub fn lstm(layers: &[usize], options: &LstmOptions) -> Result<Network, ArchitectError> {
    if layers.len() < 3 {
        return Err(ArchitectError::MissingLayers {
            needed: 3,
            given: layers.len(),
        });
    }

    let mut builder = NetworkBuilder::new();
    let input_layer = builder.group(layers[0]);
    builder.set_kind(&input_layer, NodeKind::Input);
    let output_layer = builder.group(layers[layers.len() - 1]);
    builder.set_kind(&output_layer, NodeKind::Output);

    let blocks = &layers[1..layers.len() - 1];
    let mut order: Vec<Group> = vec![input_layer];
    let mut previous = input_layer;

    for (i, &size) in blocks.iter().enumerate() {
        let last = i == blocks.len() - 1;

        let input_gate = builder.group(size);
        let forget_gate = builder.group(size);
        let memory_cell = builder.group(size);
        let output_gate = builder.group(size);
        let output_block = if last { output_layer } else { builder.group(size) };

        builder.set_bias(&input_gate, 1.0);
        builder.set_bias(&forget_gate, 1.0);
        builder.set_bias(&output_gate, 1.0);

        let input_conns =
            builder.connect(&previous, &memory_cell, ConnectPattern::AllToAll, None)?;
        builder.connect(&previous, &input_gate, ConnectPattern::AllToAll, None)?;
        builder.connect(&previous, &output_gate, ConnectPattern::AllToAll, None)?;
        builder.connect(&previous, &forget_gate, ConnectPattern::AllToAll, None)?;

        builder.connect(&memory_cell, &input_gate, ConnectPattern::AllToAll, None)?;
        builder.connect(&memory_cell, &forget_gate, ConnectPattern::AllToAll, None)?;
        builder.connect(&memory_cell, &output_gate, ConnectPattern::AllToAll, None)?;
        let forget_loop =
            builder.connect(&memory_cell, &memory_cell, ConnectPattern::OneToOne, None)?;
        let output_conns =
            builder.connect(&memory_cell, &output_block, ConnectPattern::AllToAll, None)?;

        builder.gate(&input_gate, &input_conns, GatePattern::Input);
        builder.gate(&forget_gate, &forget_loop, GatePattern::Selfloop);
        builder.gate(&output_gate, &output_conns, GatePattern::Output);

        if options.input_to_deep && i > 0 {
            let conns =
                builder.connect(&input_layer, &memory_cell, ConnectPattern::AllToAll, None)?;
            builder.gate(&input_gate, &conns, GatePattern::Input);
        }
        if options.memory_to_memory {
            let conns =
                builder.connect(&memory_cell, &memory_cell, ConnectPattern::AllToElse, None)?;
            builder.gate(&input_gate, &conns, GatePattern::Input);
        }
        if options.output_to_memory {
            let conns =
                builder.connect(&output_layer, &memory_cell, ConnectPattern::AllToAll, None)?;
            builder.gate(&input_gate, &conns, GatePattern::Input);
        }
        if options.output_to_gates {
            builder.connect(&output_layer, &input_gate, ConnectPattern::AllToAll, None)?;
            builder.connect(&output_layer, &forget_gate, ConnectPattern::AllToAll, None)?;
            builder.connect(&output_layer, &output_gate, ConnectPattern::AllToAll, None)?;
        }

        order.push(input_gate);
        order.push(forget_gate);
        order.push(memory_cell);
        order.push(output_gate);
        if !last {
            order.push(output_block);
        }
        previous = output_block;
    }

    if options.input_to_output {
        builder.connect(&input_layer, &output_layer, ConnectPattern::AllToAll, None)?;
    }
    order.push(output_layer);
    builder.build(&order)
}

/// A stack of GRU-style gated blocks.
pub fn gru(layers: &[usize]) -> Result<Network, ArchitectError> {
    if layers.len() < 3 {
        return Err(ArchitectError::MissingLayers {
            needed: 3,
            given: layers.len(),
        });
    }

    let mut builder = NetworkBuilder::new();
    let input_layer = builder.group(layers[0]);
    builder.set_kind(&input_layer, NodeKind::Input);
    let output_layer = builder.group(layers[layers.len() - 1]);
    builder.set_kind(&output_layer, NodeKind::Output);

    let mut order: Vec<Group> = vec![input_layer];
    let mut previous = input_layer;
    for &size in &layers[1..layers.len() - 1] {
        let layer = Layer::gru(&mut builder, size)?;
        layer.input(&mut builder, &previous)?;
        order.extend(layer.groups());
        previous = layer.output();
    }
    builder.connect(&previous, &output_layer, ConnectPattern::AllToAll, None)?;
    order.push(output_layer);
    builder.build(&order)
}

/// An auto-associative all-to-all pair of equal-size groups with a binary
/// step output.
pub fn hopfield(size: usize) -> Result<Network, ArchitectError> {
    let mut builder = NetworkBuilder::new();
    let input = builder.group(size);
    let output = builder.group(size);
    builder.connect(&input, &output, ConnectPattern::AllToAll, None)?;
    builder.set_kind(&input, NodeKind::Input);
    builder.set_kind(&output, NodeKind::Output);
    builder.set_squash(&output, Activation::Step);
    builder.build(&[input, output])
}

/// A NARX network: dense hidden layers fed by the current input plus delay
/// lines over the previous inputs and outputs.
pub fn narx(
    input_size: usize,
    hidden_layers: &[usize],
    output_size: usize,
    input_memory: usize,
    output_memory: usize,
) -> Result<Network, ArchitectError> {
    if hidden_layers.is_empty() {
        return Err(ArchitectError::MissingLayers { needed: 1, given: 0 });
    }

    let mut builder = NetworkBuilder::new();
    let input = Layer::dense(&mut builder, input_size);
    let output_mem = Layer::memory(&mut builder, output_size, output_memory)?;
    let hidden: Vec<Layer> = hidden_layers
        .iter()
        .map(|&size| Layer::dense(&mut builder, size))
        .collect();
    let input_mem = Layer::memory(&mut builder, input_size, input_memory)?;
    let output = Layer::dense(&mut builder, output_size);

    builder.set_kind(&input.output(), NodeKind::Input);
    builder.set_kind(&output.output(), NodeKind::Output);

    hidden[0].input(&mut builder, &input.output())?;
    input_mem.input(&mut builder, &input.output())?;
    builder.connect(
        &input_mem.output(),
        &hidden[0].output(),
        ConnectPattern::AllToAll,
        None,
    )?;
    for pair in hidden.windows(2) {
        pair[1].input(&mut builder, &pair[0].output())?;
    }
    output.input(&mut builder, &hidden[hidden.len() - 1].output())?;
    output_mem.input(&mut builder, &output.output())?;
    builder.connect(
        &output_mem.output(),
        &hidden[0].output(),
        ConnectPattern::AllToAll,
        None,
    )?;

    let mut order: Vec<Group> = Vec::new();
    order.extend(input.groups());
    order.extend(output_mem.groups());
    for layer in &hidden {
        order.extend(layer.groups());
    }
    order.extend(input_mem.groups());
    order.extend(output.groups());
    builder.build(&order)
}
