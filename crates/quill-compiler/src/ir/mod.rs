//! Instruction-level IR handed to the code generation backend.
//!
//! - [`Instruction`] - kind tag, input values, optional output variable
//! - [`Value`] - variable reference, constant or label
//! - [`IrFunction`], [`IrVariable`], [`IrNominalType`] - module symbols
//! - [`IrModule`] - a module's name path and ordered symbol list
//!
//! Every IR type implements `Display`; the rendering is a readable dump
//! used by tests and for debugging, not a stable format.

mod instruction;
mod module;

pub use instruction::{InstrKind, Instruction, Value, VarRef};
pub use module::{IrFunction, IrModule, IrNominalType, IrSymbol, IrType, IrVariable};
