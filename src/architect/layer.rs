//! Composable layer blocks built on the group builder.

use super::builder::{ConnectPattern, GatePattern, Group, NetworkBuilder};
use super::ArchitectError;
use crate::graph::NodeKind;
use crate::methods::Activation;

/// A multi-group building block with a defined output group and input wiring.
pub enum Layer {
    /// A plain fully-connectable group.
    Dense { block: Group },
    /// A memory block: input/forget/output gates gating cell input, cell
    /// self-loop and cell output respectively. Gate biases start at 1 so the
    /// gates begin open.
    Lstm {
        input_gate: Group,
        forget_gate: Group,
        memory_cell: Group,
        output_gate: Group,
        output_block: Group,
    },
    /// A gated-recurrent block with update/reset gates and a constant
    /// inverse-update gate computing one-minus-update.
    Gru {
        update: Group,
        inverse_update: Group,
        reset: Group,
        memory_cell: Group,
        output_block: Group,
        previous_output: Group,
    },
    /// A delay line: `steps` constant identity groups chained one-to-one
    /// with unit weights, deepest first. The full window is the output.
    Memory { blocks: Vec<Group> },
}

impl Layer {
    /// A plain group of `size` nodes.
    pub fn dense(builder: &mut NetworkBuilder, size: usize) -> Layer {
        Layer::Dense {
            block: builder.group(size),
        }
    }

    /// An LSTM-style memory block of `size` cells.
    pub fn lstm(builder: &mut NetworkBuilder, size: usize) -> Result<Layer, ArchitectError> {
        let input_gate = builder.group(size);
        let forget_gate = builder.group(size);
        let memory_cell = builder.group(size);
        let output_gate = builder.group(size);
        let output_block = builder.group(size);

        builder.set_bias(&input_gate, 1.0);
        builder.set_bias(&forget_gate, 1.0);
        builder.set_bias(&output_gate, 1.0);

        builder.connect(&memory_cell, &input_gate, ConnectPattern::AllToAll, None)?;
        builder.connect(&memory_cell, &forget_gate, ConnectPattern::AllToAll, None)?;
        builder.connect(&memory_cell, &output_gate, ConnectPattern::AllToAll, None)?;
        let forget_loop =
            builder.connect(&memory_cell, &memory_cell, ConnectPattern::OneToOne, None)?;
        let output_conns =
            builder.connect(&memory_cell, &output_block, ConnectPattern::AllToAll, None)?;

        builder.gate(&forget_gate, &forget_loop, GatePattern::Selfloop);
        builder.gate(&output_gate, &output_conns, GatePattern::Output);

        Ok(Layer::Lstm {
            input_gate,
            forget_gate,
            memory_cell,
            output_gate,
            output_block,
        })
    }

    /// A GRU-style gated block of `size` cells.
    pub fn gru(builder: &mut NetworkBuilder, size: usize) -> Result<Layer, ArchitectError> {
        let update = builder.group(size);
        let inverse_update = builder.group(size);
        let reset = builder.group(size);
        let memory_cell = builder.group(size);
        let output_block = builder.group(size);
        let previous_output = builder.group(size);

        builder.set_bias(&update, 1.0);
        builder.set_bias(&inverse_update, 0.0);
        builder.set_squash(&inverse_update, Activation::Inverse);
        builder.set_kind(&inverse_update, NodeKind::Constant);
        builder.set_bias(&reset, 0.0);
        builder.set_squash(&memory_cell, Activation::Tanh);
        builder.set_bias(&previous_output, 0.0);
        builder.set_squash(&previous_output, Activation::Identity);
        builder.set_kind(&previous_output, NodeKind::Constant);

        builder.connect(&previous_output, &update, ConnectPattern::AllToAll, None)?;
        builder.connect(&update, &inverse_update, ConnectPattern::OneToOne, Some(1.0))?;
        builder.connect(&previous_output, &reset, ConnectPattern::AllToAll, None)?;

        let reset_conns =
            builder.connect(&previous_output, &memory_cell, ConnectPattern::AllToAll, None)?;
        builder.gate(&reset, &reset_conns, GatePattern::Output);

        let update_conns =
            builder.connect(&previous_output, &output_block, ConnectPattern::AllToAll, None)?;
        let cell_conns =
            builder.connect(&memory_cell, &output_block, ConnectPattern::AllToAll, None)?;
        builder.gate(&update, &update_conns, GatePattern::Output);
        builder.gate(&inverse_update, &cell_conns, GatePattern::Output);

        builder.connect(&output_block, &previous_output, ConnectPattern::OneToOne, Some(1.0))?;

        Ok(Layer::Gru {
            update,
            inverse_update,
            reset,
            memory_cell,
            output_block,
            previous_output,
        })
    }

    /// A delay line remembering `steps` frames of a `size`-wide signal.
    pub fn memory(
        builder: &mut NetworkBuilder,
        size: usize,
        steps: usize,
    ) -> Result<Layer, ArchitectError> {
        if steps == 0 {
            return Err(ArchitectError::MissingLayers { needed: 1, given: 0 });
        }
        // blocks[0] is the deepest; activation order runs deepest first, so
        // each link adds exactly one step of delay.
        let mut blocks = Vec::with_capacity(steps);
        for _ in 0..steps {
            let block = builder.group(size);
            builder.set_kind(&block, NodeKind::Constant);
            builder.set_squash(&block, Activation::Identity);
            builder.set_bias(&block, 0.0);
            blocks.push(block);
        }
        for k in 0..steps - 1 {
            builder.connect(&blocks[k + 1], &blocks[k], ConnectPattern::OneToOne, Some(1.0))?;
        }
        Ok(Layer::Memory { blocks })
    }

    /// The groups of this layer in activation order, for the build order.
    pub fn groups(&self) -> Vec<Group> {
        match self {
            Layer::Dense { block } => vec![*block],
            Layer::Lstm {
                input_gate,
                forget_gate,
                memory_cell,
                output_gate,
                output_block,
            } => vec![*input_gate, *forget_gate, *memory_cell, *output_gate, *output_block],
            Layer::Gru {
                update,
                inverse_update,
                reset,
                memory_cell,
                output_block,
                previous_output,
            } => vec![
                *update,
                *inverse_update,
                *reset,
                *memory_cell,
                *output_block,
                *previous_output,
            ],
            Layer::Memory { blocks } => blocks.clone(),
        }
    }

    /// The group downstream layers should connect from.
    pub fn output(&self) -> Group {
        match self {
            Layer::Dense { block } => *block,
            Layer::Lstm { output_block, .. } => *output_block,
            Layer::Gru { output_block, .. } => *output_block,
            Layer::Memory { blocks } => {
                // Blocks are allocated contiguously; the whole window is the
                // output, deepest frame first.
                let start = blocks[0].start;
                let len = blocks.iter().map(Group::len).sum();
                Group { start, len }
            }
        }
    }

    /// Wire a source group into this layer, returning the connections made.
    pub fn input(
        &self,
        builder: &mut NetworkBuilder,
        from: &Group,
    ) -> Result<Vec<usize>, ArchitectError> {
        match self {
            Layer::Dense { block } => {
                builder.connect(from, block, ConnectPattern::AllToAll, None)
            }
            Layer::Lstm {
                input_gate,
                forget_gate,
                memory_cell,
                output_gate,
                ..
            } => {
                let mut made =
                    builder.connect(from, memory_cell, ConnectPattern::AllToAll, None)?;
                builder.gate(input_gate, &made, GatePattern::Input);
                made.extend(builder.connect(from, input_gate, ConnectPattern::AllToAll, None)?);
                made.extend(builder.connect(from, output_gate, ConnectPattern::AllToAll, None)?);
                made.extend(builder.connect(from, forget_gate, ConnectPattern::AllToAll, None)?);
                Ok(made)
            }
            Layer::Gru {
                update,
                reset,
                memory_cell,
                ..
            } => {
                let mut made = builder.connect(from, update, ConnectPattern::AllToAll, None)?;
                made.extend(builder.connect(from, reset, ConnectPattern::AllToAll, None)?);
                made.extend(builder.connect(from, memory_cell, ConnectPattern::AllToAll, None)?);
                Ok(made)
            }
            Layer::Memory { blocks } => {
                let shallowest = blocks[blocks.len() - 1];
                if from.len() != shallowest.len() {
                    return Err(ArchitectError::SizeMismatch {
                        expected: shallowest.len(),
                        found: from.len(),
                    });
                }
                builder.connect(from, &shallowest, ConnectPattern::OneToOne, Some(1.0))
            }
        }
    }
}
