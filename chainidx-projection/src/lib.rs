//! The Projection Engine: consumes `ConsensusChange` events and drives the
//! Balance Tracker and Lock Index in the order the specification requires,
//! persisting `stats` and `state` once a change is fully processed.

pub mod driver;
pub mod engine;
pub mod source;
mod ucos;

#[cfg(test)]
mod tests;

pub use driver::run_to_completion;
pub use engine::ProjectionEngine;
pub use source::{ConsensusSource, FileReplaySource, MemoryConsensusSource};
pub use ucos::UcosRecord;
