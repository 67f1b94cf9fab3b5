//! Structural cloning with replacement.
//!
//! A [`Cloner`] copies a statement, expression or function, substituting any
//! node found in its [`Replacement`] map. Two modes:
//!
//! ```text
//! Inline      same scopes, analysis results copied
//!             references to mapped nodes are redirected (or replaced by a
//!             copy of the mapped literal); used to fold calls
//! Specialize  fresh scopes and symbols, analysis results dropped
//!             every clone is re-analyzed; used for typeclass instances
//! ```
//!
//! Leaves that cannot observe the substitution are shared rather than
//! copied.

use quill_core::{CompilationError, ModuleId};
use rustc_hash::FxHashMap;

use crate::analysis::Task;
use crate::arena::{ExprId, FunctionId, OverloadSetId, ScopeId, StmtId, TypeId, VarId};
use crate::node::{
    Binding, ExprInfo, ExprKind, ExprNode, Function, FunctionParts, OverloadSet, Program,
    StmtKind, StmtNode, VarKind, VarNode,
};
use crate::scope::{LocalLookup, ScopeKind, SymbolFlags};
use crate::types::TypeDef;

/// How a clone treats scopes and analysis results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneMode {
    Inline,
    Specialize,
}

/// Substitutions applied while cloning.
#[derive(Debug, Default, Clone)]
pub struct Replacement {
    /// Referenced expression → replacement expression.
    pub exprs: FxHashMap<ExprId, ExprId>,
    /// Original scope → its copy.
    pub scopes: FxHashMap<ScopeId, ScopeId>,
    /// Original overload set → its copy and the copy's type.
    pub sets: FxHashMap<OverloadSetId, (OverloadSetId, TypeId)>,
    /// Original type → its copy (struct bodies).
    pub types: FxHashMap<TypeId, TypeId>,
}

/// Clone `stmt` under `map` and return the copy together with the analysis
/// tasks the copy needs.
///
/// # Errors
///
/// Declaration failures while recreating symbols (specialize mode only).
pub fn clone_with_replacement(
    program: &Program,
    mode: CloneMode,
    map: Replacement,
    stmt: StmtId,
) -> Result<(StmtId, Vec<Task>), CompilationError> {
    let mut cloner = Cloner::new(program, mode, map);
    let copy = cloner.clone_stmt(stmt)?;
    Ok((copy, cloner.take_roots()))
}

/// Clones nodes of one program.
pub struct Cloner<'p> {
    program: &'p Program,
    mode: CloneMode,
    map: Replacement,
    roots: Vec<Task>,
}

impl<'p> Cloner<'p> {
    pub fn new(program: &'p Program, mode: CloneMode, map: Replacement) -> Self {
        Self {
            program,
            mode,
            map,
            roots: Vec::new(),
        }
    }

    /// Redirect references to `old` to the already-created `new` set.
    pub fn map_set(&mut self, old: OverloadSetId, new: OverloadSetId, ty: TypeId) {
        self.map.sets.insert(old, (new, ty));
    }

    /// Analysis tasks of everything cloned so far (specialize mode).
    pub fn take_roots(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.roots)
    }

    // ========================================================================
    // Scopes and symbols
    // ========================================================================

    /// The copy of `scope`, or `scope` itself when it lies outside the clone.
    fn scope(&self, scope: ScopeId) -> ScopeId {
        match self.mode {
            CloneMode::Inline => scope,
            CloneMode::Specialize => self.map.scopes.get(&scope).copied().unwrap_or(scope),
        }
    }

    /// Create the copy of `old`, parented under the copy of its parent.
    fn enter_scope(&mut self, old: ScopeId, kind: ScopeKind) -> ScopeId {
        let program = self.program;
        let parent = program
            .scope(old)
            .parent
            .map(|p| self.scope(p))
            .unwrap_or(program.builtin_scope());
        let scope = program.new_scope(parent, kind);
        self.map.scopes.insert(old, scope);
        scope
    }

    /// Flags of the symbol `name` in `scope`, if it is bound to `target`.
    fn flags_of(&self, scope: ScopeId, name: &str, target: Option<ExprId>) -> Option<SymbolFlags> {
        match self.program.scope(scope).lookup_local(name) {
            LocalLookup::Found(symbol) => {
                let symbol = self.program.symbol(symbol);
                (target.is_none() || symbol.expr() == target).then(|| symbol.flags())
            }
            LocalLookup::Open | LocalLookup::Closed => None,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn clone_expr(&mut self, id: ExprId) -> Result<ExprId, CompilationError> {
        if self.mode == CloneMode::Specialize {
            if let Some(&mapped) = self.map.exprs.get(&id) {
                return Ok(mapped);
            }
        }
        let node = self.program.expr(id);
        match self.mode {
            CloneMode::Inline => self.inline_expr(id, &node),
            CloneMode::Specialize => self.specialize_expr(id, &node),
        }
    }

    fn clone_exprs(&mut self, ids: &[ExprId]) -> Result<Vec<ExprId>, CompilationError> {
        ids.iter().map(|&e| self.clone_expr(e)).collect()
    }

    fn push_expr(
        &self,
        node: &ExprNode,
        scope: ScopeId,
        kind: ExprKind,
        info: Option<ExprInfo>,
    ) -> ExprId {
        let copy = match info {
            Some(info) => ExprNode::analyzed(node.span, scope, kind, info),
            None => ExprNode::new(node.span, scope, kind),
        };
        self.program.exprs.push(copy)
    }

    fn inline_expr(&mut self, id: ExprId, node: &ExprNode) -> Result<ExprId, CompilationError> {
        let program = self.program;
        let info = node.info().cloned();
        let kind = node.kind();

        if let Some(ExprInfo {
            binding: Binding::Ref(target),
            ..
        }) = &info
        {
            if let Some(&replacement) = self.map.exprs.get(target) {
                let replacement_node = program.expr(replacement);
                let replacement_kind = replacement_node.kind();
                if let ExprKind::Var(_) = replacement_kind {
                    let info = info.clone().map(|i| ExprInfo {
                        binding: Binding::Ref(replacement),
                        ..i
                    });
                    return Ok(self.push_expr(node, node.scope, kind, info));
                }
                return Ok(match replacement_kind.literal() {
                    Some(literal) => self.push_expr(
                        node,
                        node.scope,
                        literal.into_kind(),
                        Some(ExprInfo::of(literal.ty())),
                    ),
                    None => replacement,
                });
            }
        }

        let kind = match kind {
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: self.clone_expr(lhs)?,
                rhs: self.clone_expr(rhs)?,
            },
            ExprKind::Call {
                callee,
                bracket,
                args,
            } => ExprKind::Call {
                callee: self.clone_expr(callee)?,
                bracket,
                args: self.clone_exprs(&args)?,
            },
            ExprKind::Member { base, name } => ExprKind::Member {
                base: self.clone_expr(base)?,
                name,
            },
            ExprKind::Ident { .. }
            | ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::TypeLit(_)
            | ExprKind::Closure { .. }
            | ExprKind::Import { .. }
            | ExprKind::Struct { .. }
            | ExprKind::Typeclass { .. }
            | ExprKind::Instance { .. }
            | ExprKind::Var(_)
            | ExprKind::OverloadSet { .. } => return Ok(id),
        };
        Ok(self.push_expr(node, node.scope, kind, info))
    }

    fn specialize_expr(&mut self, id: ExprId, node: &ExprNode) -> Result<ExprId, CompilationError> {
        let program = self.program;
        let scope = self.scope(node.scope);
        let kind = match node.kind() {
            kind @ (ExprKind::Ident { .. }
            | ExprKind::Int(_)
            | ExprKind::Bool(_)
            | ExprKind::TypeLit(_)
            | ExprKind::Typeclass { .. }
            | ExprKind::Instance { .. }
            | ExprKind::Var(_)) => kind,
            ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op,
                lhs: self.clone_expr(lhs)?,
                rhs: self.clone_expr(rhs)?,
            },
            ExprKind::Call {
                callee,
                bracket,
                args,
            } => ExprKind::Call {
                callee: self.clone_expr(callee)?,
                bracket,
                args: self.clone_exprs(&args)?,
            },
            ExprKind::Member { base, name } => ExprKind::Member {
                base: self.clone_expr(base)?,
                name,
            },
            ExprKind::Closure { function, .. } => {
                let function = self.clone_function(function, None)?;
                let ty = program.types.push(TypeDef::Closure { function });
                ExprKind::Closure { function, ty }
            }
            ExprKind::Import { module } => {
                let copy = program.new_expr(node.span, scope, ExprKind::Import { module });
                let name = import_name(program, module);
                if let Some(flags) = self.flags_of(node.scope, &name, Some(id)) {
                    program.declare_bound(scope, &name, copy, node.span, flags)?;
                }
                return Ok(copy);
            }
            ExprKind::Struct { ty, members } => {
                let TypeDef::Struct { scope: body } = *program.ty(ty) else {
                    return Err(CompilationError::internal("struct without body scope"));
                };
                let inner = self.enter_scope(body, ScopeKind::Struct);
                let struct_ty = program.types.push(TypeDef::Struct { scope: inner });
                self.map.types.insert(ty, struct_ty);
                let members = members
                    .iter()
                    .map(|&m| self.clone_stmt(m))
                    .collect::<Result<Vec<_>, _>>()?;
                program.scope(inner).close();
                self.roots.extend(members.iter().map(|&m| Task::Stmt(m)));
                ExprKind::Struct {
                    ty: struct_ty,
                    members,
                }
            }
            ExprKind::OverloadSet { set, ty } => match self.map.sets.get(&set) {
                Some(&(set, ty)) => ExprKind::OverloadSet { set, ty },
                None => ExprKind::OverloadSet { set, ty },
            },
        };
        Ok(self.push_expr(node, scope, kind, None))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn clone_stmt(&mut self, id: StmtId) -> Result<StmtId, CompilationError> {
        let program = self.program;
        let node = program.stmt(id);
        let scope = self.scope(node.scope);

        let kind = match node.kind() {
            StmtKind::Decl { var } => StmtKind::Decl {
                var: self.clone_var(var, node.scope)?,
            },
            StmtKind::Return { value } => StmtKind::Return {
                value: value.map(|v| self.clone_expr(v)).transpose()?,
            },
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => StmtKind::If {
                cond: self.clone_expr(cond)?,
                then_branch: self.clone_stmt(then_branch)?,
                else_branch: else_branch.map(|e| self.clone_stmt(e)).transpose()?,
            },
            StmtKind::Block {
                scope: inner,
                stmts,
            } => {
                let inner = match self.mode {
                    CloneMode::Inline => inner,
                    CloneMode::Specialize => self.enter_scope(inner, ScopeKind::Block),
                };
                let stmts = stmts
                    .iter()
                    .map(|&s| self.clone_stmt(s))
                    .collect::<Result<Vec<_>, _>>()?;
                if self.mode == CloneMode::Specialize {
                    program.scope(inner).close();
                }
                StmtKind::Block {
                    scope: inner,
                    stmts,
                }
            }
            StmtKind::Expr(expr) => StmtKind::Expr(self.clone_expr(expr)?),
            StmtKind::Fn { function, set } => match self.mode {
                CloneMode::Inline => return Ok(id),
                CloneMode::Specialize => {
                    let set = self.nested_set(set, node.scope, scope)?;
                    StmtKind::Fn {
                        function: self.clone_function(function, Some(set))?,
                        set,
                    }
                }
            },
            StmtKind::Import { module } => match self.mode {
                CloneMode::Inline => return Ok(id),
                CloneMode::Specialize => {
                    self.redeclare_import(module, scope, &node)?;
                    StmtKind::Import { module }
                }
            },
        };

        let copy = StmtNode::new(node.span, scope, kind);
        if self.mode == CloneMode::Inline && node.is_analyzed() {
            copy.mark_analyzed();
        }
        Ok(program.stmts.push(copy))
    }

    fn clone_var(&mut self, var: VarId, old_scope: ScopeId) -> Result<VarId, CompilationError> {
        let program = self.program;
        let old = program.var(var);
        let old_expr = old.expr();
        let scope = self.scope(old_scope);

        // Declared before the initializer is cloned so it can refer to itself.
        let symbol = match self.mode {
            CloneMode::Inline => None,
            CloneMode::Specialize => {
                let flags = self
                    .flags_of(old_scope, &old.name, old_expr)
                    .unwrap_or_else(SymbolFlags::empty);
                Some(program.declare(scope, &old.name, old.span, flags)?.0)
            }
        };

        let kind = match old.kind() {
            VarKind::Plain { ty_expr, index } => VarKind::Plain {
                ty_expr: self.clone_expr(ty_expr)?,
                index,
            },
            VarKind::Expr { init, annotation } => VarKind::Expr {
                init: self.clone_expr(init)?,
                annotation: annotation.map(|a| self.clone_expr(a)).transpose()?,
            },
            VarKind::Member {
                owner,
                init,
                annotation,
            } => VarKind::Member {
                owner: self.map.types.get(&owner).copied().unwrap_or(owner),
                init: self.clone_expr(init)?,
                annotation: annotation.map(|a| self.clone_expr(a)).transpose()?,
            },
        };

        let owner = old.owner.map(|o| self.scope(o));
        let copy = program
            .vars
            .push(VarNode::new(old.name.clone(), old.span, owner, kind));
        let info = match self.mode {
            CloneMode::Inline => old_expr.and_then(|e| program.expr(e).info().cloned()),
            CloneMode::Specialize => None,
        };
        let expr_scope = old_expr.map_or(scope, |e| self.scope(program.expr(e).scope));
        let expr_node = match info {
            Some(info) => ExprNode::analyzed(old.span, expr_scope, ExprKind::Var(copy), info),
            None => ExprNode::new(old.span, expr_scope, ExprKind::Var(copy)),
        };
        let copy_expr = program.exprs.push(expr_node);
        program.var(copy).set_expr(copy_expr);

        if let Some(symbol) = symbol {
            program.symbol(symbol).bind(copy_expr)?;
        }
        if let Some(old_expr) = old_expr {
            self.map.exprs.insert(old_expr, copy_expr);
        }
        Ok(copy)
    }

    /// The copy of a nested `fn` statement's overload set, created on first
    /// use.
    fn nested_set(
        &mut self,
        set: OverloadSetId,
        old_scope: ScopeId,
        scope: ScopeId,
    ) -> Result<OverloadSetId, CompilationError> {
        if let Some(&(copy, _)) = self.map.sets.get(&set) {
            return Ok(copy);
        }
        let program = self.program;
        let original = program.set(set);
        let copy = program
            .sets
            .push(OverloadSet::new(original.name.clone(), original.span, original.module));
        let ty = program.types.push(TypeDef::OverloadSet { set: copy });
        let expr = program.new_expr(original.span, scope, ExprKind::OverloadSet { set: copy, ty });
        let flags = self
            .flags_of(old_scope, &original.name, None)
            .unwrap_or_else(SymbolFlags::empty);
        program.declare_bound(scope, &original.name, expr, original.span, flags)?;
        self.map.sets.insert(set, (copy, ty));
        self.roots.push(Task::OverloadSet(copy));
        Ok(copy)
    }

    fn redeclare_import(
        &mut self,
        module: ModuleId,
        scope: ScopeId,
        node: &StmtNode,
    ) -> Result<(), CompilationError> {
        let program = self.program;
        let name = import_name(program, module);
        match program.scope(scope).lookup_local(&name) {
            LocalLookup::Found(symbol) => program.symbol(symbol).set_hidden(false),
            LocalLookup::Open | LocalLookup::Closed => {
                let expr = program.new_expr(node.span, scope, ExprKind::Import { module });
                program.declare_bound(scope, &name, expr, node.span, SymbolFlags::empty())?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Clone a function with a fresh parameter scope (specialize mode).
    ///
    /// # Arguments
    ///
    /// * `function` - The function to copy
    /// * `set` - Overload set receiving the copy; `None` for closures
    pub fn clone_function(
        &mut self,
        function: FunctionId,
        set: Option<OverloadSetId>,
    ) -> Result<FunctionId, CompilationError> {
        let program = self.program;
        let old = program.function(function);
        let scope = self.enter_scope(old.scope, ScopeKind::Function);

        let mut params = Vec::with_capacity(old.params.len());
        for &param in &old.params {
            let original = program.var(param);
            let VarKind::Plain { ty_expr, index } = original.kind() else {
                return Err(CompilationError::internal("parameter is not a plain variable"));
            };
            let kind = VarKind::Plain {
                ty_expr: self.clone_expr(ty_expr)?,
                index,
            };
            let (var, expr) = program.new_var(
                VarNode::new(original.name.clone(), original.span, Some(scope), kind),
                scope,
            );
            program.declare_bound(
                scope,
                &original.name,
                expr,
                original.span,
                SymbolFlags::empty(),
            )?;
            if let Some(old_expr) = original.expr() {
                self.map.exprs.insert(old_expr, expr);
            }
            params.push(var);
        }
        let ret = old.ret.map(|r| self.clone_expr(r)).transpose()?;
        let body = old.body().map(|b| self.clone_stmt(b)).transpose()?;
        program.scope(scope).close();

        let copy = program.functions.push(Function::new(FunctionParts {
            name: old.name.clone(),
            span: old.span,
            module: old.module,
            scope,
            params,
            ret,
            body,
            set,
            virtual_slot: old.virtual_slot,
            generic: false,
        }));
        program.register_function_scope(scope, copy);
        if let Some(set) = set {
            program.set(set).push_function(copy);
        }
        if body.is_some() {
            self.roots.push(Task::Body(copy));
        }
        Ok(copy)
    }
}

/// The name an import of `module` binds: the last path segment.
fn import_name(program: &Program, module: ModuleId) -> String {
    let path = program.module(module).path.clone();
    path.rsplit('.').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Literal;
    use quill_core::Span;
    use quill_syntax::BinaryOp;

    fn analyzed(program: &Program, kind: ExprKind, info: ExprInfo) -> ExprId {
        program.exprs.push(ExprNode::analyzed(
            Span::default(),
            program.builtin_scope(),
            kind,
            info,
        ))
    }

    #[test]
    fn inline_replaces_mapped_references_with_literals() {
        let program = Program::new();
        let module = program.new_module("m".into(), Span::default(), true);
        let scope = program.module(module).scope;
        let ty_expr = analyzed(
            &program,
            ExprKind::TypeLit(TypeId::INT32),
            ExprInfo {
                ty: TypeId::TYPE,
                value: Some(TypeId::INT32),
                binding: Binding::None,
            },
        );
        let (_, param_expr) = program.new_var(
            VarNode::new(
                "n",
                Span::default(),
                Some(scope),
                VarKind::Plain { ty_expr, index: 0 },
            ),
            scope,
        );
        let reference = analyzed(
            &program,
            ExprKind::Ident { name: "n".into() },
            ExprInfo {
                ty: TypeId::INT32,
                value: None,
                binding: Binding::Ref(param_expr),
            },
        );
        let one = analyzed(&program, ExprKind::Int(1), ExprInfo::of(TypeId::INT32));
        let sum = analyzed(
            &program,
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: reference,
                rhs: one,
            },
            ExprInfo::of(TypeId::INT32),
        );
        let arg = analyzed(&program, ExprKind::Int(41), ExprInfo::of(TypeId::INT32));

        let mut map = Replacement::default();
        map.exprs.insert(param_expr, arg);
        let mut cloner = Cloner::new(&program, CloneMode::Inline, map);
        let copy = cloner.clone_expr(sum).unwrap();

        assert_ne!(copy, sum);
        let ExprKind::Binary { lhs, rhs, .. } = program.expr(copy).kind() else {
            panic!("expected binary");
        };
        assert_eq!(program.literal(lhs), Some(Literal::Int(41)));
        assert_eq!(rhs, one, "unaffected leaves are shared");
        assert_eq!(program.expr(copy).info().map(|i| i.ty), Some(TypeId::INT32));
        // The original is untouched.
        let ExprKind::Binary { lhs, .. } = program.expr(sum).kind() else {
            panic!("expected binary");
        };
        assert_eq!(lhs, reference);
    }

    #[test]
    fn specialize_drops_analysis_and_recreates_scopes() {
        let program = Program::new();
        let module = program.new_module("m".into(), Span::default(), true);
        let scope = program.module(module).scope;
        let block_scope = program.new_scope(scope, ScopeKind::Block);
        let value = analyzed(&program, ExprKind::Int(3), ExprInfo::of(TypeId::INT32));
        let (symbol, _) = program
            .declare(block_scope, "x", Span::default(), SymbolFlags::empty())
            .unwrap();
        let (var, var_expr) = program.new_var(
            VarNode::new(
                "x",
                Span::default(),
                None,
                VarKind::Expr {
                    init: value,
                    annotation: None,
                },
            ),
            block_scope,
        );
        program.symbol(symbol).bind(var_expr).unwrap();
        let decl = program.new_stmt(Span::default(), block_scope, StmtKind::Decl { var });
        program.scope(block_scope).close();
        let block = program.new_stmt(
            Span::default(),
            scope,
            StmtKind::Block {
                scope: block_scope,
                stmts: vec![decl],
            },
        );

        let (copy, _) =
            clone_with_replacement(&program, CloneMode::Specialize, Replacement::default(), block)
                .unwrap();
        let StmtKind::Block {
            scope: copy_scope,
            stmts,
        } = program.stmt(copy).kind()
        else {
            panic!("expected block");
        };
        assert_ne!(copy_scope, block_scope);
        assert!(program.scope(copy_scope).is_closed());
        let LocalLookup::Found(copied_symbol) = program.scope(copy_scope).lookup_local("x") else {
            panic!("x not redeclared");
        };
        let StmtKind::Decl { var: copy_var } = program.stmt(stmts[0]).kind() else {
            panic!("expected decl");
        };
        let copied_expr = program.symbol(copied_symbol).expr().unwrap();
        assert_eq!(program.var(copy_var).expr(), Some(copied_expr));
        let init = program.var(copy_var).kind().init().unwrap();
        assert!(program.expr(init).info().is_none());
    }
}
