//! The evolution engine: selection, crossover and the population loop.

mod evaluator;
mod population;

pub use evaluator::{EvalError, EvalHandle, Evaluator, InProcessEvaluator, WorkerPool};
pub use population::Population;
