//! Scopes and symbols.
//!
//! A [`Scope`] is a lexical namespace with a parent link and a one-way
//! open/closed lifecycle:
//!
//! ```text
//!   Open ──close()──► Closed
//!    │
//!    ├─ declare(name)   wakes tasks waiting for `name`
//!    └─ wait(name, t)   parks `t` until `name` is declared or the scope closes
//! ```
//!
//! Lookups walk the parent chain. A miss in an open scope is not yet an
//! answer: the asking task parks on the scope and re-resolves when woken. A
//! miss in a closed scope moves on to the parent, and a miss past the root is
//! fatal.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;
use parking_lot::Mutex;
use quill_core::{CompilationError, Span};
use rustc_hash::FxHashMap;

use crate::analysis::Task;
use crate::arena::{ExprId, ScopeId, SymbolId};

// ============================================================================
// Symbols
// ============================================================================

bitflags! {
    /// Visibility flags of a symbol.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u8 {
        /// Visible to importers of the declaring module.
        const EXPORTED = 0b0001;
        /// Excluded from chain lookup (module imported as an expression).
        const HIDDEN = 0b0010;
        /// Declared by the compiler itself.
        const BUILTIN = 0b0100;
    }
}

/// A named slot resolving to exactly one expression.
#[derive(Debug)]
pub struct Symbol {
    /// Declared name.
    pub name: String,
    /// Where the name was declared.
    pub span: Span,
    expr: OnceLock<ExprId>,
    flags: AtomicU8,
}

impl Symbol {
    /// Create a symbol whose expression is bound later.
    pub fn new(name: impl Into<String>, span: Span, flags: SymbolFlags) -> Self {
        Self {
            name: name.into(),
            span,
            expr: OnceLock::new(),
            flags: AtomicU8::new(flags.bits()),
        }
    }

    /// The referenced expression, once bound.
    pub fn expr(&self) -> Option<ExprId> {
        self.expr.get().copied()
    }

    /// Bind the referenced expression. A symbol is bound exactly once.
    pub fn bind(&self, expr: ExprId) -> Result<(), CompilationError> {
        self.expr.set(expr).map_err(|_| {
            CompilationError::internal(format!("symbol '{}' bound twice", self.name))
        })
    }

    pub fn flags(&self) -> SymbolFlags {
        SymbolFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    pub fn is_hidden(&self) -> bool {
        self.flags().contains(SymbolFlags::HIDDEN)
    }

    pub fn is_exported(&self) -> bool {
        self.flags().contains(SymbolFlags::EXPORTED)
    }

    /// Set or clear `HIDDEN`.
    pub fn set_hidden(&self, hidden: bool) {
        if hidden {
            self.flags.fetch_or(SymbolFlags::HIDDEN.bits(), Ordering::AcqRel);
        } else {
            self.flags
                .fetch_and(!SymbolFlags::HIDDEN.bits(), Ordering::AcqRel);
        }
    }

    /// Mark as exported.
    pub fn export(&self) {
        self.flags
            .fetch_or(SymbolFlags::EXPORTED.bits(), Ordering::AcqRel);
    }
}

// ============================================================================
// Scopes
// ============================================================================

/// What introduced a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// The compiler's builtin names.
    Builtin,
    /// A module's top level.
    Module,
    /// Parameters of a function or closure.
    Function,
    /// A braced block.
    Block,
    /// Members of a struct.
    Struct,
    /// Parameters and members of a typeclass definition.
    Typeclass,
    /// Members of a typeclass instance.
    Instance,
}

impl ScopeKind {
    /// Whether lookups for the enclosing function stop at this scope.
    ///
    /// Code inside a struct or typeclass body belongs to no function even
    /// when the body is written inside one.
    pub fn is_function_boundary(self) -> bool {
        matches!(
            self,
            ScopeKind::Function
                | ScopeKind::Struct
                | ScopeKind::Typeclass
                | ScopeKind::Instance
                | ScopeKind::Module
                | ScopeKind::Builtin
        )
    }
}

#[derive(Debug, Default)]
struct ScopeState {
    order: Vec<SymbolId>,
    names: FxHashMap<String, SymbolId>,
    closed: bool,
    waiters: FxHashMap<String, Vec<Task>>,
}

/// Outcome of a local lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalLookup {
    /// The scope declares the name.
    Found(SymbolId),
    /// Not declared here, and the scope is still open.
    Open,
    /// Not declared here, and never will be.
    Closed,
}

/// A lexical namespace.
#[derive(Debug)]
pub struct Scope {
    /// Enclosing scope.
    pub parent: Option<ScopeId>,
    /// What introduced this scope.
    pub kind: ScopeKind,
    state: Mutex<ScopeState>,
}

impl Scope {
    /// Create an open scope.
    pub fn new(parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            parent,
            kind,
            state: Mutex::new(ScopeState::default()),
        }
    }

    /// Declare a name.
    ///
    /// Returns the tasks that were waiting for it.
    ///
    /// # Errors
    ///
    /// `DuplicateDefinition` when the name is already declared here, and an
    /// internal error when the scope is closed.
    pub fn declare(
        &self,
        name: &str,
        symbol: SymbolId,
        span: Span,
    ) -> Result<Vec<Task>, CompilationError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CompilationError::internal(format!(
                "declaration of '{}' in a closed scope",
                name
            )));
        }
        if state.names.contains_key(name) {
            return Err(CompilationError::DuplicateDefinition {
                name: name.to_string(),
                span,
            });
        }
        state.names.insert(name.to_string(), symbol);
        state.order.push(symbol);
        Ok(state.waiters.remove(name).unwrap_or_default())
    }

    /// Look up a name in this scope only.
    pub fn lookup_local(&self, name: &str) -> LocalLookup {
        let state = self.state.lock();
        match state.names.get(name) {
            Some(&symbol) => LocalLookup::Found(symbol),
            None if state.closed => LocalLookup::Closed,
            None => LocalLookup::Open,
        }
    }

    /// Park `task` until `name` is declared or the scope closes.
    ///
    /// Returns `false` without parking when the question is already answered
    /// (declared or closed in the meantime); the caller retries immediately.
    pub fn wait(&self, name: &str, task: Task) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.names.contains_key(name) {
            return false;
        }
        state.waiters.entry(name.to_string()).or_default().push(task);
        true
    }

    /// Close the scope, returning every parked task.
    pub fn close(&self) -> Vec<Task> {
        let mut state = self.state.lock();
        state.closed = true;
        state.waiters.drain().flat_map(|(_, tasks)| tasks).collect()
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Declared symbols in declaration order.
    pub fn symbols(&self) -> Vec<SymbolId> {
        self.state.lock().order.clone()
    }

    /// Names with parked tasks.
    #[cfg(test)]
    pub fn awaited_names(&self) -> Vec<String> {
        self.state.lock().waiters.keys().cloned().collect()
    }
}
