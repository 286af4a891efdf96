//! Domain layer types and invariants.

pub mod collections;
pub mod types;
