//! Quill Syntax crate.
//!
//! The immutable syntax tree the semantic core consumes. Tokenizing and
//! parsing live outside this workspace; whatever front end is used produces a
//! [`SyntaxModule`] whose nodes are allocated in a [`bumpalo::Bump`] arena and
//! remain valid for the lifetime of the arena.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use quill_syntax::SyntaxBuilder;
//!
//! let arena = Bump::new();
//! let b = SyntaxBuilder::new(&arena);
//!
//! // let entry = λ(arg: int32) -> int32 { return arg + 1; };
//! let entry = b.closure(
//!     vec![b.param("arg", b.ident("int32"))],
//!     Some(b.ident("int32")),
//!     vec![b.ret(b.add(b.ident("arg"), b.int(1)))],
//! );
//! let module = b.module("main", vec![b.let_("entry", entry)]);
//!
//! assert_eq!(module.items.len(), 1);
//! assert_eq!(module.dotted_path(), "main");
//! ```

pub mod ast;
mod builder;
mod fingerprint;

pub use ast::*;
pub use builder::SyntaxBuilder;

pub use quill_core::Span;
