//! Error taxonomy of the semantic core.
//!
//! Every condition in this module is fatal to the compilation unit it was
//! raised in: analysis stops dispatching work, no IR is emitted for the unit,
//! and the error is recorded in [`Diagnostics`](crate::Diagnostics).
//!
//! ## Error Families
//!
//! ```text
//! CompilationError
//! ├── name resolution   UnresolvedName, DuplicateDefinition, UnknownModule,
//! │                     CircularImport, UseBeforeDeclaration
//! ├── overloads         DuplicateOverload, NoMatchingOverload, AmbiguousOverload
//! ├── typing            TypeMismatch, ArityMismatch, NotCallable, NoMembers,
//! │                     MissingReturn, UnsupportedCapture, IntegerOutOfRange
//! ├── program shape     InvalidEntryPoint, CyclicDependency
//! └── Internal
//! ```

use thiserror::Error;

use crate::Span;

/// Errors that occur during preanalysis, analysis, simplification and lowering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// A lookup exhausted the scope chain.
    #[error("at {span}: unresolved name '{name}'")]
    UnresolvedName {
        /// The name that wasn't found.
        name: String,
        /// Where the name was referenced.
        span: Span,
    },

    /// A name was declared twice in the same scope.
    #[error("at {span}: duplicate definition '{name}'")]
    DuplicateDefinition {
        /// The duplicated name.
        name: String,
        /// Where the second declaration occurred.
        span: Span,
    },

    /// Two functions with identical parameter-type vectors were added to one overload set.
    #[error("at {span}: duplicate overload '{name}({signature})'")]
    DuplicateOverload {
        /// The overload set name.
        name: String,
        /// The repeated parameter types, comma separated.
        signature: String,
        /// Where the second function was declared.
        span: Span,
    },

    /// No overload matches the argument types exactly.
    #[error("at {span}: no matching overload for '{name}({args})'")]
    NoMatchingOverload {
        /// The overload set name.
        name: String,
        /// The argument types, comma separated.
        args: String,
        /// Where the call occurred.
        span: Span,
    },

    /// More than one overload matches the argument types.
    #[error("at {span}: ambiguous call to '{name}': {candidates}")]
    AmbiguousOverload {
        /// The overload set name.
        name: String,
        /// Description of the matching candidates.
        candidates: String,
        /// Where the call occurred.
        span: Span,
    },

    /// A declared type disagrees with the actual type.
    #[error("at {span}: {message}")]
    TypeMismatch {
        /// Description of the mismatch.
        message: String,
        /// Where the mismatch was detected.
        span: Span,
    },

    /// A call passed the wrong number of arguments.
    #[error("at {span}: '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// The callee name.
        name: String,
        /// Number of declared parameters.
        expected: usize,
        /// Number of arguments passed.
        got: usize,
        /// Where the call occurred.
        span: Span,
    },

    /// A call was applied to a value that cannot be called.
    #[error("at {span}: value of type '{ty}' is not callable")]
    NotCallable {
        /// Diagnostic name of the callee type.
        ty: String,
        /// Where the call occurred.
        span: Span,
    },

    /// A member access was applied to a type without a member scope.
    #[error("at {span}: type '{ty}' has no members")]
    NoMembers {
        /// Diagnostic name of the base type.
        ty: String,
        /// Where the access occurred.
        span: Span,
    },

    /// A non-void function can fall off the end of its body.
    #[error("at {span}: not all paths of '{function}' return a value")]
    MissingReturn {
        /// The function name.
        function: String,
        /// Where the function was declared.
        span: Span,
    },

    /// A closure referenced a parameter or local of an enclosing function.
    #[error("at {span}: closure captures '{name}' from an enclosing function")]
    UnsupportedCapture {
        /// The captured name.
        name: String,
        /// Where the capture occurred.
        span: Span,
    },

    /// An integer literal does not fit in 32 bits.
    #[error("at {span}: integer literal {value} does not fit in int32")]
    IntegerOutOfRange {
        /// The literal value.
        value: i64,
        /// Where the literal occurred.
        span: Span,
    },

    /// The designated entry symbol is missing or has the wrong shape.
    #[error("at {span}: invalid entry point '{name}': {reason}")]
    InvalidEntryPoint {
        /// The configured entry symbol name.
        name: String,
        /// Why it was rejected.
        reason: String,
        /// Where the entry symbol was declared (default span when missing).
        span: Span,
    },

    /// Analysis stalled on a dependency cycle.
    #[error("at {span}: dependency cycle: {chain}")]
    CyclicDependency {
        /// The participants of the cycle, in dependency order.
        chain: String,
        /// Where the first participant occurs.
        span: Span,
    },

    /// An import named a module the resolver does not know.
    #[error("at {span}: unknown module '{path}'")]
    UnknownModule {
        /// The dotted module path.
        path: String,
        /// Where the import occurred.
        span: Span,
    },

    /// Modules import each other.
    #[error("at {span}: circular import of '{path}'")]
    CircularImport {
        /// The dotted module path.
        path: String,
        /// Where the import occurred.
        span: Span,
    },

    /// A local variable was used by code lowered before its declaration.
    #[error("at {span}: '{name}' used before its declaration")]
    UseBeforeDeclaration {
        /// The variable name.
        name: String,
        /// Where the use occurred.
        span: Span,
    },

    /// Internal compiler error.
    #[error("internal error: {message}")]
    Internal {
        /// The error message.
        message: String,
    },
}

impl CompilationError {
    /// Get the span where this error occurred.
    ///
    /// Internal errors have no location and report the default span.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnresolvedName { span, .. }
            | CompilationError::DuplicateDefinition { span, .. }
            | CompilationError::DuplicateOverload { span, .. }
            | CompilationError::NoMatchingOverload { span, .. }
            | CompilationError::AmbiguousOverload { span, .. }
            | CompilationError::TypeMismatch { span, .. }
            | CompilationError::ArityMismatch { span, .. }
            | CompilationError::NotCallable { span, .. }
            | CompilationError::NoMembers { span, .. }
            | CompilationError::MissingReturn { span, .. }
            | CompilationError::UnsupportedCapture { span, .. }
            | CompilationError::IntegerOutOfRange { span, .. }
            | CompilationError::InvalidEntryPoint { span, .. }
            | CompilationError::CyclicDependency { span, .. }
            | CompilationError::UnknownModule { span, .. }
            | CompilationError::CircularImport { span, .. }
            | CompilationError::UseBeforeDeclaration { span, .. } => *span,
            CompilationError::Internal { .. } => Span::default(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn mismatch(message: impl Into<String>, span: Span) -> Self {
        CompilationError::TypeMismatch {
            message: message.into(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location() {
        let err = CompilationError::UnresolvedName {
            name: "foo".to_string(),
            span: Span::new(3, 7, 3),
        };
        assert_eq!(err.to_string(), "at 3:7: unresolved name 'foo'");
    }

    #[test]
    fn span_accessor() {
        let span = Span::new(2, 4, 1);
        let err = CompilationError::NoMatchingOverload {
            name: "add".to_string(),
            args: "int32, bool".to_string(),
            span,
        };
        assert_eq!(err.span(), span);
        assert_eq!(CompilationError::internal("boom").span(), Span::default());
    }

    #[test]
    fn overload_messages() {
        let err = CompilationError::DuplicateOverload {
            name: "f".to_string(),
            signature: "int32, bool".to_string(),
            span: Span::new(1, 1, 0),
        };
        assert_eq!(err.to_string(), "at 1:1: duplicate overload 'f(int32, bool)'");
    }
}
