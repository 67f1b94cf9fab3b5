//! Quill Core
//!
//! Shared foundation types for the Quill compiler crates:
//!
//! - [`Span`]: source location tracking
//! - [`CompilationError`]: the fatal error taxonomy of the semantic core
//! - [`Diagnostics`]: the collector every fatal condition and warning is pushed to
//! - [`ModuleId`]: identifier of a compilation module
//! - [`Fingerprint`]: deterministic structural hash of a syntax tree

mod diagnostics;
mod error;
mod fingerprint;
mod ids;
mod span;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::CompilationError;
pub use fingerprint::{Fingerprint, FingerprintBuilder};
pub use ids::ModuleId;
pub use span::Span;
