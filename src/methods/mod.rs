//! Catalogs of pure method objects used across the library.
//!
//! Each catalog is a closed enum with an associated evaluation function or
//! parameter set, so the full set of behaviors is statically checkable and
//! serializes with the structures that reference it.

mod activation;
mod cost;
mod crossover;
mod mutation;
mod rate;
mod selection;

pub use activation::Activation;
pub use cost::Cost;
pub use crossover::Crossover;
pub use mutation::Mutation;
pub use rate::RateSchedule;
pub use selection::Selection;
