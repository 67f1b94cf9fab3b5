//! The analyzed node model.
//!
//! A [`Program`] owns every node of one compilation unit in append-only
//! arenas. Nodes refer to each other through handles, so parents, children,
//! scopes and symbols can be shared between worker threads without
//! reference cycles.
//!
//! ```text
//! Program
//! ├── modules    path, module scope, root statements
//! ├── scopes     parent link, symbol map, open/closed
//! ├── symbols    name → expression
//! ├── exprs      kind (RwLock) + analysis result (set once)
//! ├── stmts      kind (RwLock) + analyzed flag (set once)
//! ├── vars       parameters, lets, struct members
//! ├── functions  signature (set once), body handle
//! ├── sets       overload sets
//! └── types      builtins first, then one per introducing construct
//! ```

pub mod expr;
pub mod function;
pub mod stmt;
pub mod var;

pub use expr::{Binding, CallTarget, ExprInfo, ExprKind, ExprNode, Literal};
pub use function::{Function, FunctionParts, OverloadSet, Signature};
pub use stmt::{StmtKind, StmtNode};
pub use var::{VarKind, VarNode};

use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use quill_core::{CompilationError, ModuleId, Span};
use rustc_hash::FxHashMap;

use crate::analysis::Task;
use crate::arena::{
    Arena, ArenaId, ExprId, FunctionId, OverloadSetId, ScopeId, StmtId, SymbolId, TypeId, VarId,
};
use crate::scope::{LocalLookup, Scope, ScopeKind, Symbol, SymbolFlags};
use crate::typeclass::InstanceCache;
use crate::types::TypeDef;

/// A module of the program.
#[derive(Debug)]
pub struct Module {
    /// Dotted module path.
    pub path: String,
    pub span: Span,
    pub scope: ScopeId,
    /// The type of the module used as a value.
    pub ty: TypeId,
    /// Passed to the compiler directly rather than reached by import.
    pub root: bool,
    stmts: RwLock<Vec<StmtId>>,
}

impl Module {
    pub fn stmts(&self) -> Vec<StmtId> {
        self.stmts.read().clone()
    }

    pub fn push_stmt(&self, stmt: StmtId) {
        self.stmts.write().push(stmt);
    }

    /// Replace the root statement at `index`.
    pub fn replace_stmt(&self, index: usize, stmt: StmtId) {
        if let Some(slot) = self.stmts.write().get_mut(index) {
            *slot = stmt;
        }
    }
}

/// Result of resolving a name through a scope chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(SymbolId),
    /// The chain stopped at a scope that is still open.
    Pending(ScopeId),
    Missing,
}

/// One compilation unit.
#[derive(Debug)]
pub struct Program {
    pub exprs: Arena<ExprId, ExprNode>,
    pub stmts: Arena<StmtId, StmtNode>,
    pub vars: Arena<VarId, VarNode>,
    pub functions: Arena<FunctionId, Function>,
    pub sets: Arena<OverloadSetId, OverloadSet>,
    pub scopes: Arena<ScopeId, Scope>,
    pub symbols: Arena<SymbolId, Symbol>,
    pub types: Arena<TypeId, TypeDef>,
    pub modules: Arena<ModuleId, Module>,
    builtin_scope: ScopeId,
    scope_functions: RwLock<FxHashMap<ScopeId, FunctionId>>,
    entry: OnceLock<FunctionId>,
    pub(crate) instances: InstanceCache,
}

impl Program {
    /// Create a program holding only the builtins.
    pub fn new() -> Self {
        let program = Self {
            exprs: Arena::new(),
            stmts: Arena::new(),
            vars: Arena::new(),
            functions: Arena::new(),
            sets: Arena::new(),
            scopes: Arena::new(),
            symbols: Arena::new(),
            types: Arena::new(),
            modules: Arena::new(),
            builtin_scope: ScopeId::from_index(0),
            scope_functions: RwLock::new(FxHashMap::default()),
            entry: OnceLock::new(),
            instances: InstanceCache::new(),
        };

        // Order fixes the TypeId constants.
        program.types.push(TypeDef::Int32);
        program.types.push(TypeDef::Bool);
        program.types.push(TypeDef::Void);
        program.types.push(TypeDef::Type);

        let builtin = program.scopes.push(Scope::new(None, ScopeKind::Builtin));
        debug_assert_eq!(builtin, program.builtin_scope);
        for (name, ty) in [
            ("int32", TypeId::INT32),
            ("bool", TypeId::BOOL),
            ("void", TypeId::VOID),
            ("type", TypeId::TYPE),
        ] {
            let expr = program.exprs.push(ExprNode::analyzed(
                Span::default(),
                builtin,
                ExprKind::TypeLit(ty),
                ExprInfo {
                    ty: TypeId::TYPE,
                    value: Some(ty),
                    binding: Binding::None,
                },
            ));
            let symbol = Symbol::new(name, Span::default(), SymbolFlags::BUILTIN);
            let _ = symbol.bind(expr);
            let symbol = program.symbols.push(symbol);
            let _ = program.scope(builtin).declare(name, symbol, Span::default());
        }
        program.scope(builtin).close();
        program
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn expr(&self, id: ExprId) -> Arc<ExprNode> {
        self.exprs.get(id)
    }

    pub fn stmt(&self, id: StmtId) -> Arc<StmtNode> {
        self.stmts.get(id)
    }

    pub fn var(&self, id: VarId) -> Arc<VarNode> {
        self.vars.get(id)
    }

    pub fn function(&self, id: FunctionId) -> Arc<Function> {
        self.functions.get(id)
    }

    pub fn set(&self, id: OverloadSetId) -> Arc<OverloadSet> {
        self.sets.get(id)
    }

    pub fn scope(&self, id: ScopeId) -> Arc<Scope> {
        self.scopes.get(id)
    }

    pub fn symbol(&self, id: SymbolId) -> Arc<Symbol> {
        self.symbols.get(id)
    }

    pub fn ty(&self, id: TypeId) -> Arc<TypeDef> {
        self.types.get(id)
    }

    pub fn module(&self, id: ModuleId) -> Arc<Module> {
        self.modules.get(id)
    }

    pub fn builtin_scope(&self) -> ScopeId {
        self.builtin_scope
    }

    /// Diagnostic name of a type.
    pub fn explain(&self, ty: TypeId) -> String {
        self.ty(ty).explain(self)
    }

    /// Diagnostic names of several types, comma separated.
    pub fn explain_all(&self, tys: &[TypeId]) -> String {
        tys.iter()
            .map(|&t| self.explain(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The constant an expression currently denotes.
    pub fn literal(&self, expr: ExprId) -> Option<Literal> {
        self.expr(expr).literal()
    }

    // ========================================================================
    // Construction
    // ========================================================================

    pub fn new_expr(&self, span: Span, scope: ScopeId, kind: ExprKind) -> ExprId {
        self.exprs.push(ExprNode::new(span, scope, kind))
    }

    pub fn new_stmt(&self, span: Span, scope: ScopeId, kind: StmtKind) -> StmtId {
        self.stmts.push(StmtNode::new(span, scope, kind))
    }

    pub fn new_scope(&self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        self.scopes.push(Scope::new(Some(parent), kind))
    }

    /// Create a variable together with its `Var` expression.
    pub fn new_var(&self, node: VarNode, scope: ScopeId) -> (VarId, ExprId) {
        let span = node.span;
        let var = self.vars.push(node);
        let expr = self.new_expr(span, scope, ExprKind::Var(var));
        self.var(var).set_expr(expr);
        (var, expr)
    }

    pub fn new_module(&self, path: String, span: Span, root: bool) -> ModuleId {
        let scope = self.new_scope(self.builtin_scope, ScopeKind::Module);
        let ty = self.types.push(TypeDef::Module {
            path: path.clone(),
            scope,
        });
        self.modules.push(Module {
            path,
            span,
            scope,
            ty,
            root,
            stmts: RwLock::new(Vec::new()),
        })
    }

    /// Declare a symbol whose expression is bound by the caller.
    ///
    /// Returns the symbol and the tasks woken by the declaration.
    pub fn declare(
        &self,
        scope: ScopeId,
        name: &str,
        span: Span,
        flags: SymbolFlags,
    ) -> Result<(SymbolId, Vec<Task>), CompilationError> {
        let symbol = self.symbols.push(Symbol::new(name, span, flags));
        let woken = self.scope(scope).declare(name, symbol, span)?;
        Ok((symbol, woken))
    }

    /// Declare a symbol bound to `expr` right away.
    pub fn declare_bound(
        &self,
        scope: ScopeId,
        name: &str,
        expr: ExprId,
        span: Span,
        flags: SymbolFlags,
    ) -> Result<(SymbolId, Vec<Task>), CompilationError> {
        let (symbol, woken) = self.declare(scope, name, span, flags)?;
        self.symbol(symbol).bind(expr)?;
        Ok((symbol, woken))
    }

    pub fn register_function_scope(&self, scope: ScopeId, function: FunctionId) {
        self.scope_functions.write().insert(scope, function);
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Resolve a name by walking the scope chain from `scope` to the root.
    ///
    /// Hidden symbols are skipped. A miss in an open scope stops the walk
    /// with [`Resolution::Pending`].
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Resolution {
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = self.scope(id);
            match node.lookup_local(name) {
                LocalLookup::Found(symbol) if !self.symbol(symbol).is_hidden() => {
                    return Resolution::Found(symbol);
                }
                LocalLookup::Found(_) | LocalLookup::Closed => {}
                LocalLookup::Open => return Resolution::Pending(id),
            }
            current = node.parent;
        }
        Resolution::Missing
    }

    /// Look up a member of a type's member scope.
    pub fn resolve_member(&self, ty: TypeId, name: &str) -> Option<Resolution> {
        let (scope, exported_only) = self.ty(ty).member_scope()?;
        Some(match self.scope(scope).lookup_local(name) {
            LocalLookup::Found(symbol) => {
                let sym = self.symbol(symbol);
                if exported_only && !sym.is_exported() {
                    Resolution::Missing
                } else {
                    Resolution::Found(symbol)
                }
            }
            LocalLookup::Open => Resolution::Pending(scope),
            LocalLookup::Closed => Resolution::Missing,
        })
    }

    /// The parameter scope of the function whose body contains `scope`.
    pub fn function_scope_of(&self, scope: ScopeId) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let node = self.scope(id);
            match node.kind {
                ScopeKind::Function => return Some(id),
                kind if kind.is_function_boundary() => return None,
                _ => current = node.parent,
            }
        }
        None
    }

    /// The function whose body contains `scope`.
    pub fn enclosing_function(&self, scope: ScopeId) -> Option<FunctionId> {
        let function_scope = self.function_scope_of(scope)?;
        self.scope_functions.read().get(&function_scope).copied()
    }

    /// Find a loaded module by dotted path.
    pub fn module_by_path(&self, path: &str) -> Option<ModuleId> {
        self.modules
            .ids()
            .into_iter()
            .find(|&id| self.module(id).path == path)
    }

    // ========================================================================
    // Entry point
    // ========================================================================

    pub fn entry(&self) -> Option<FunctionId> {
        self.entry.get().copied()
    }

    pub(crate) fn set_entry(&self, function: FunctionId) {
        if self.entry.set(function).is_ok() {
            self.function(function).mark_entry();
        }
    }

    /// Number of typeclass instances created so far.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_from_modules() {
        let program = Program::new();
        let module = program.new_module("main".into(), Span::default(), true);
        let scope = program.module(module).scope;
        program.scope(scope).close();

        match program.resolve(scope, "int32") {
            Resolution::Found(symbol) => {
                let expr = program.symbol(symbol).expr().unwrap();
                assert_eq!(program.expr(expr).kind(), ExprKind::TypeLit(TypeId::INT32));
            }
            other => panic!("expected builtin, got {:?}", other),
        }
        assert_eq!(program.resolve(scope, "nope"), Resolution::Missing);
    }

    #[test]
    fn open_scope_defers_resolution() {
        let program = Program::new();
        let module = program.new_module("main".into(), Span::default(), true);
        let scope = program.module(module).scope;
        assert_eq!(program.resolve(scope, "x"), Resolution::Pending(scope));
    }

    #[test]
    fn hidden_symbols_are_skipped() {
        let program = Program::new();
        let module = program.new_module("main".into(), Span::default(), true);
        let scope = program.module(module).scope;
        let (symbol, _) = program
            .declare(scope, "int32", Span::default(), SymbolFlags::HIDDEN)
            .unwrap();
        program.scope(scope).close();

        // Falls through to the builtin of the same name.
        assert_ne!(program.resolve(scope, "int32"), Resolution::Found(symbol));
        program.symbol(symbol).set_hidden(false);
        assert_eq!(program.resolve(scope, "int32"), Resolution::Found(symbol));
    }

    #[test]
    fn function_scope_stops_at_struct() {
        let program = Program::new();
        let module = program.new_module("main".into(), Span::default(), true);
        let module_scope = program.module(module).scope;
        let params = program.new_scope(module_scope, ScopeKind::Function);
        let block = program.new_scope(params, ScopeKind::Block);
        let body = program.new_scope(block, ScopeKind::Struct);

        assert_eq!(program.function_scope_of(block), Some(params));
        assert_eq!(program.function_scope_of(body), None);
        assert_eq!(program.function_scope_of(module_scope), None);
    }
}
