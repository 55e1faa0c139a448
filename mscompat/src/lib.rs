//! mscompat -- drives simulation replicates and writes them in the ms text format.
//!
//! The crate does not sample anything itself: genealogies come from an
//! [Engine](definitions::Engine). What lives here is the seeding layer
//! ([seeds]), the exact serialization of a replicate ([format]), the run loop
//! ([runner]) and a reader for the stream it writes ([reader]).
pub mod error;
pub mod format;
pub mod reader;
pub mod runner;
pub mod seeds;
#[macro_use]
extern crate log;

pub use error::RunError;
pub use format::{Newick, ReplicateFormatter};
pub use runner::{RunSummary, SimulationRunner};
