//! Parameter construction and validation
//!
//! `SimulationParams` can be decoded from JSON/YAML or assembled with the
//! builder DSL; both paths end in `SimulationParams::validate`.

pub mod builder;
mod validation;

pub use builder::{PersonBuilder, SimulationBuilder};
