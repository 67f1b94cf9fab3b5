//! Functions and overload sets.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use quill_core::{ModuleId, Span};

use crate::arena::{ExprId, FunctionId, OverloadSetId, ScopeId, StmtId, TypeId, VarId};

/// Resolved parameter and return types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<TypeId>,
    pub ret: TypeId,
}

/// A function, closure or typeclass member.
#[derive(Debug)]
pub struct Function {
    /// Display name; `closure` for closures.
    pub name: String,
    pub span: Span,
    pub module: ModuleId,
    /// Scope declaring the parameters.
    pub scope: ScopeId,
    pub params: Vec<VarId>,
    /// Return type expression; `void` when absent.
    pub ret: Option<ExprId>,
    /// Overload set this function belongs to, if declared with `fn`.
    pub set: Option<OverloadSetId>,
    /// Member index inside a typeclass.
    pub virtual_slot: Option<u32>,
    /// Member of an uninstantiated typeclass; never analyzed or lowered.
    pub generic: bool,
    body: RwLock<Option<StmtId>>,
    is_entry: AtomicBool,
    signature: OnceLock<Signature>,
    body_done: OnceLock<()>,
}

/// Construction parameters of a [`Function`].
#[derive(Debug)]
pub struct FunctionParts {
    pub name: String,
    pub span: Span,
    pub module: ModuleId,
    pub scope: ScopeId,
    pub params: Vec<VarId>,
    pub ret: Option<ExprId>,
    pub body: Option<StmtId>,
    pub set: Option<OverloadSetId>,
    pub virtual_slot: Option<u32>,
    pub generic: bool,
}

impl Function {
    pub fn new(parts: FunctionParts) -> Self {
        Self {
            name: parts.name,
            span: parts.span,
            module: parts.module,
            scope: parts.scope,
            params: parts.params,
            ret: parts.ret,
            set: parts.set,
            virtual_slot: parts.virtual_slot,
            generic: parts.generic,
            body: RwLock::new(parts.body),
            is_entry: AtomicBool::new(false),
            signature: OnceLock::new(),
            body_done: OnceLock::new(),
        }
    }

    pub fn body(&self) -> Option<StmtId> {
        *self.body.read()
    }

    pub fn set_body(&self, body: StmtId) {
        *self.body.write() = Some(body);
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.get()
    }

    pub fn set_signature(&self, signature: Signature) {
        let _ = self.signature.set(signature);
    }

    pub fn is_body_analyzed(&self) -> bool {
        self.body_done.get().is_some()
    }

    pub fn mark_body_analyzed(&self) {
        let _ = self.body_done.set(());
    }

    pub fn is_entry(&self) -> bool {
        self.is_entry.load(Ordering::Acquire)
    }

    pub fn mark_entry(&self) {
        self.is_entry.store(true, Ordering::Release);
    }
}

/// Same-named functions declared in one scope.
#[derive(Debug)]
pub struct OverloadSet {
    pub name: String,
    pub span: Span,
    pub module: ModuleId,
    functions: Mutex<Vec<FunctionId>>,
    /// Parameter-type vectors accepted so far.
    pub(crate) registered: Mutex<Vec<(FunctionId, Vec<TypeId>)>>,
    ready: OnceLock<()>,
    owner: OnceLock<TypeId>,
}

impl OverloadSet {
    pub fn new(name: impl Into<String>, span: Span, module: ModuleId) -> Self {
        Self {
            name: name.into(),
            span,
            module,
            functions: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
            ready: OnceLock::new(),
            owner: OnceLock::new(),
        }
    }

    /// Declared member functions in declaration order.
    pub fn functions(&self) -> Vec<FunctionId> {
        self.functions.lock().clone()
    }

    pub fn push_function(&self, function: FunctionId) {
        self.functions.lock().push(function);
    }

    /// Whether every member signature has been registered.
    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    pub fn mark_ready(&self) {
        let _ = self.ready.set(());
    }

    /// The typeclass instance owning this set.
    pub fn owner(&self) -> Option<TypeId> {
        self.owner.get().copied()
    }

    pub fn set_owner(&self, owner: TypeId) {
        let _ = self.owner.set(owner);
    }
}
