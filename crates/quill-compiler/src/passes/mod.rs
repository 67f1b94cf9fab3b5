//! Compiler passes.
//!
//! - [`preanalysis`]: Phase 1, build the node skeleton and every scope
//!   from syntax, synchronously
//! - [`entry`]: validate and flag the entry point once analysis finished
//!
//! Analysis proper (phase 2) is the task scheduler in [`crate::analysis`].

pub mod entry;
pub mod preanalysis;

pub use entry::validate_entry_point;
pub use preanalysis::{Preanalysis, PreanalysisOutput};
