//! Preanalysis (phase 1) - build the node skeleton from syntax.
//!
//! Walks every module in declaration order and builds exactly one node per
//! syntax node. Declarations allocate their symbol in the current scope
//! *before* the initializer is built, which is what lets a body refer to
//! names declared after it (or to itself).
//!
//! ## Responsibilities
//!
//! - Create module, function, block, struct and typeclass scopes, and close
//!   each one once its syntax has been walked
//! - Group same-named `fn` declarations of a scope into one overload set
//! - Resolve imports through the [`ModuleResolver`], recursively
//! - Reject integer literals outside the `int32` range
//! - Record the root task list for phase 2
//!
//! ## Import modes
//!
//! ```text
//! import a.b;            statement: binds `b` visibly
//! let m = import a.b;    expression: binds `b` HIDDEN (unhidden by a later
//!                        statement import of the same module)
//! ```

use quill_core::{CompilationError, ModuleId, Span};
use quill_syntax::{Block, Expr, FnDecl, ModulePath, Param, Stmt, SyntaxModule};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::analysis::Task;
use crate::arena::{ExprId, FunctionId, OverloadSetId, ScopeId, StmtId, TypeId, VarId};
use crate::modules::ModuleResolver;
use crate::node::{
    ExprKind, Function, FunctionParts, OverloadSet, Program, StmtKind, VarKind, VarNode,
};
use crate::scope::{LocalLookup, ScopeKind, SymbolFlags};
use crate::types::TypeDef;

/// Output of preanalysis.
#[derive(Debug, Default)]
pub struct PreanalysisOutput {
    /// Tasks phase 2 starts from.
    pub roots: Vec<Task>,
    /// The modules passed in directly, in order.
    pub modules: Vec<ModuleId>,
}

/// Where the walker currently is.
#[derive(Debug, Clone, Copy)]
struct Cx {
    scope: ScopeId,
    module: ModuleId,
    /// Parameter scope of the enclosing function.
    owner: Option<ScopeId>,
    /// Struct type whose body is being walked.
    member_of: Option<TypeId>,
}

/// Phase 1 driver.
pub struct Preanalysis<'a, 'ast> {
    program: &'a Program,
    resolver: Option<&'a dyn ModuleResolver<'ast>>,
    /// Root modules not yet walked, by path.
    pending: FxHashMap<String, SyntaxModule<'ast>>,
    root_paths: FxHashSet<String>,
    /// Modules currently being walked, outermost first.
    importing: Vec<String>,
    roots: Vec<Task>,
}

impl<'a, 'ast> Preanalysis<'a, 'ast> {
    /// Create a preanalysis over `program`.
    ///
    /// # Arguments
    ///
    /// * `program` - The compilation unit receiving the nodes
    /// * `resolver` - Source of imported modules, if imports are allowed
    pub fn new(program: &'a Program, resolver: Option<&'a dyn ModuleResolver<'ast>>) -> Self {
        Self {
            program,
            resolver,
            pending: FxHashMap::default(),
            root_paths: FxHashSet::default(),
            importing: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Walk the root modules and everything they import.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(
        mut self,
        modules: &[SyntaxModule<'ast>],
    ) -> Result<PreanalysisOutput, CompilationError> {
        for module in modules {
            let path = module.dotted_path();
            self.root_paths.insert(path.clone());
            self.pending.insert(path, *module);
        }

        let mut ids = Vec::with_capacity(modules.len());
        for module in modules {
            let id = match self.program.module_by_path(&module.dotted_path()) {
                // Already reached through an import of an earlier root.
                Some(id) => id,
                None => self.load_module(module)?,
            };
            ids.push(id);
        }

        tracing::debug!(
            modules = self.program.modules.len(),
            roots = self.roots.len(),
            "preanalysis complete"
        );
        Ok(PreanalysisOutput {
            roots: self.roots,
            modules: ids,
        })
    }

    // ========================================================================
    // Modules
    // ========================================================================

    fn load_module(&mut self, syntax: &SyntaxModule<'ast>) -> Result<ModuleId, CompilationError> {
        let path = syntax.dotted_path();
        self.pending.remove(&path);
        let root = self.root_paths.contains(&path);
        let module = self.program.new_module(path.clone(), syntax.span, root);
        let scope = self.program.module(module).scope;
        tracing::trace!(%path, root, "preanalyzing module");

        self.importing.push(path);
        let cx = Cx {
            scope,
            module,
            owner: None,
            member_of: None,
        };
        for item in syntax.items {
            let stmt = self.stmt(item, cx)?;
            self.program.module(module).push_stmt(stmt);
            self.roots.push(Task::Stmt(stmt));
        }
        self.program.scope(scope).close();
        self.importing.pop();
        Ok(module)
    }

    fn import(&mut self, path: &ModulePath<'_>, span: Span) -> Result<ModuleId, CompilationError> {
        let dotted = path.dotted();
        if self.importing.contains(&dotted) {
            return Err(CompilationError::CircularImport { path: dotted, span });
        }
        if let Some(id) = self.program.module_by_path(&dotted) {
            return Ok(id);
        }
        let syntax = match self.pending.get(&dotted) {
            Some(module) => *module,
            None => self
                .resolver
                .and_then(|r| r.resolve(&dotted))
                .ok_or_else(|| CompilationError::UnknownModule {
                    path: dotted.clone(),
                    span,
                })?,
        };
        self.load_module(&syntax)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmts(&mut self, items: &[Stmt<'_>], cx: Cx) -> Result<Vec<StmtId>, CompilationError> {
        items.iter().map(|s| self.stmt(s, cx)).collect()
    }

    fn stmt(&mut self, stmt: &Stmt<'_>, cx: Cx) -> Result<StmtId, CompilationError> {
        let program = self.program;
        let kind = match stmt {
            Stmt::Let(l) => {
                let flags = if l.exported {
                    SymbolFlags::EXPORTED
                } else {
                    SymbolFlags::empty()
                };
                let (symbol, _) = program.declare(cx.scope, l.name.name, l.name.span, flags)?;
                let init = self.expr(&l.init, cx)?;
                let annotation = l.ty.as_ref().map(|t| self.expr(t, cx)).transpose()?;
                let kind = match cx.member_of {
                    Some(owner) => VarKind::Member {
                        owner,
                        init,
                        annotation,
                    },
                    None => VarKind::Expr { init, annotation },
                };
                let (var, var_expr) =
                    program.new_var(VarNode::new(l.name.name, l.span, cx.owner, kind), cx.scope);
                program.symbol(symbol).bind(var_expr)?;
                StmtKind::Decl { var }
            }
            Stmt::Fn(decl) => {
                let set = self.overload_set(decl.name.name, decl.span, decl.exported, cx, false)?;
                let function = self.fn_decl(decl, cx, set, false, None)?;
                StmtKind::Fn { function, set }
            }
            Stmt::Return(r) => {
                if cx.owner.is_none() {
                    return Err(CompilationError::mismatch(
                        "'return' outside of a function",
                        r.span,
                    ));
                }
                let value = r.value.as_ref().map(|v| self.expr(v, cx)).transpose()?;
                StmtKind::Return { value }
            }
            Stmt::If(i) => {
                let cond = self.expr(&i.cond, cx)?;
                let then_branch = self.block(&i.then_branch, cx)?;
                let else_branch = i
                    .else_branch
                    .as_ref()
                    .map(|b| self.block(b, cx))
                    .transpose()?;
                StmtKind::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            Stmt::Block(b) => return self.block(b, cx),
            Stmt::Expr(e) => StmtKind::Expr(self.expr(&e.expr, cx)?),
            Stmt::Import(i) => {
                let module = self.import(&i.path, i.span)?;
                let name = i.path.last().unwrap_or_default();
                match program.scope(cx.scope).lookup_local(name) {
                    LocalLookup::Found(symbol) => {
                        let symbol = program.symbol(symbol);
                        let same_module = symbol.expr().is_some_and(|e| {
                            program.expr(e).kind() == ExprKind::Import { module }
                        });
                        if symbol.is_hidden() && same_module {
                            symbol.set_hidden(false);
                        } else {
                            return Err(CompilationError::DuplicateDefinition {
                                name: name.to_string(),
                                span: i.span,
                            });
                        }
                    }
                    LocalLookup::Open | LocalLookup::Closed => {
                        let expr = program.new_expr(i.span, cx.scope, ExprKind::Import { module });
                        program.declare_bound(
                            cx.scope,
                            name,
                            expr,
                            i.span,
                            SymbolFlags::empty(),
                        )?;
                    }
                }
                StmtKind::Import { module }
            }
        };
        Ok(program.new_stmt(stmt.span(), cx.scope, kind))
    }

    fn block(&mut self, block: &Block<'_>, cx: Cx) -> Result<StmtId, CompilationError> {
        let scope = self.program.new_scope(cx.scope, ScopeKind::Block);
        let inner = Cx { scope, ..cx };
        let stmts = self.stmts(block.stmts, inner)?;
        self.program.scope(scope).close();
        Ok(self
            .program
            .new_stmt(block.span, cx.scope, StmtKind::Block { scope, stmts }))
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// The overload set `name` denotes in the current scope, created on first
    /// use.
    fn overload_set(
        &mut self,
        name: &str,
        span: Span,
        exported: bool,
        cx: Cx,
        generic: bool,
    ) -> Result<OverloadSetId, CompilationError> {
        let program = self.program;
        if let LocalLookup::Found(symbol) = program.scope(cx.scope).lookup_local(name) {
            let symbol = program.symbol(symbol);
            let existing = symbol.expr().and_then(|e| match program.expr(e).kind() {
                ExprKind::OverloadSet { set, .. } => Some(set),
                _ => None,
            });
            return match existing {
                Some(set) => {
                    if exported {
                        symbol.export();
                    }
                    Ok(set)
                }
                None => Err(CompilationError::DuplicateDefinition {
                    name: name.to_string(),
                    span,
                }),
            };
        }

        let set = program.sets.push(OverloadSet::new(name, span, cx.module));
        let ty = program.types.push(TypeDef::OverloadSet { set });
        let expr = program.new_expr(span, cx.scope, ExprKind::OverloadSet { set, ty });
        let flags = if exported {
            SymbolFlags::EXPORTED
        } else {
            SymbolFlags::empty()
        };
        program.declare_bound(cx.scope, name, expr, span, flags)?;
        if !generic {
            self.roots.push(Task::OverloadSet(set));
        }
        Ok(set)
    }

    fn fn_decl(
        &mut self,
        decl: &FnDecl<'_>,
        cx: Cx,
        set: OverloadSetId,
        generic: bool,
        slot: Option<u32>,
    ) -> Result<FunctionId, CompilationError> {
        self.function(
            decl.name.name,
            decl.span,
            decl.params,
            decl.ret.as_ref(),
            decl.body.as_ref(),
            cx,
            Some(set),
            generic,
            slot,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn function(
        &mut self,
        name: &str,
        span: Span,
        params: &[Param<'_>],
        ret: Option<&Expr<'_>>,
        body: Option<&Block<'_>>,
        cx: Cx,
        set: Option<OverloadSetId>,
        generic: bool,
        virtual_slot: Option<u32>,
    ) -> Result<FunctionId, CompilationError> {
        let program = self.program;
        let scope = program.new_scope(cx.scope, ScopeKind::Function);
        let inner = Cx {
            scope,
            module: cx.module,
            owner: Some(scope),
            member_of: None,
        };

        let mut vars = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let ty_expr = self.expr(&param.ty, inner)?;
            let (var, var_expr) = program.new_var(
                VarNode::new(
                    param.name.name,
                    param.span,
                    Some(scope),
                    VarKind::Plain { ty_expr, index },
                ),
                scope,
            );
            program.declare_bound(
                scope,
                param.name.name,
                var_expr,
                param.name.span,
                SymbolFlags::empty(),
            )?;
            vars.push(var);
        }
        let ret = ret.map(|r| self.expr(r, inner)).transpose()?;
        let body = body.map(|b| self.block(b, inner)).transpose()?;
        program.scope(scope).close();

        let has_body = body.is_some();
        let function = program.functions.push(Function::new(FunctionParts {
            name: name.to_string(),
            span,
            module: cx.module,
            scope,
            params: vars,
            ret,
            body,
            set,
            virtual_slot,
            generic,
        }));
        program.register_function_scope(scope, function);
        if let Some(set) = set {
            program.set(set).push_function(function);
        }
        if has_body && !generic {
            self.roots.push(Task::Body(function));
        }
        Ok(function)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expr(&mut self, expr: &Expr<'_>, cx: Cx) -> Result<ExprId, CompilationError> {
        let program = self.program;
        let kind = match expr {
            Expr::Ident(id) => ExprKind::Ident {
                name: id.name.to_string(),
            },
            Expr::Int(lit) => {
                let value = i32::try_from(lit.value).map_err(|_| {
                    CompilationError::IntegerOutOfRange {
                        value: lit.value,
                        span: lit.span,
                    }
                })?;
                ExprKind::Int(value)
            }
            Expr::Bool(lit) => ExprKind::Bool(lit.value),
            Expr::Binary(b) => ExprKind::Binary {
                op: b.op,
                lhs: self.expr(&b.lhs, cx)?,
                rhs: self.expr(&b.rhs, cx)?,
            },
            Expr::Call(c) => {
                let callee = self.expr(&c.callee, cx)?;
                let args = c
                    .args
                    .iter()
                    .map(|a| self.expr(a, cx))
                    .collect::<Result<Vec<_>, _>>()?;
                ExprKind::Call {
                    callee,
                    bracket: c.bracket,
                    args,
                }
            }
            Expr::Member(m) => ExprKind::Member {
                base: self.expr(&m.base, cx)?,
                name: m.member.name.to_string(),
            },
            Expr::Closure(c) => {
                let function = self.function(
                    "closure",
                    c.span,
                    c.params,
                    c.ret.as_ref(),
                    Some(&c.body),
                    cx,
                    None,
                    false,
                    None,
                )?;
                let ty = program.types.push(TypeDef::Closure { function });
                ExprKind::Closure { function, ty }
            }
            Expr::Import(i) => {
                let module = self.import(&i.path, i.span)?;
                let id = program.new_expr(i.span, cx.scope, ExprKind::Import { module });
                let name = i.path.last().unwrap_or_default();
                if !matches!(
                    program.scope(cx.scope).lookup_local(name),
                    LocalLookup::Found(_)
                ) {
                    program.declare_bound(cx.scope, name, id, i.span, SymbolFlags::HIDDEN)?;
                }
                return Ok(id);
            }
            Expr::Struct(s) => {
                let scope = program.new_scope(cx.scope, ScopeKind::Struct);
                let ty = program.types.push(TypeDef::Struct { scope });
                let inner = Cx {
                    scope,
                    module: cx.module,
                    owner: None,
                    member_of: Some(ty),
                };
                let members = self.stmts(s.body, inner)?;
                program.scope(scope).close();
                self.roots.extend(members.iter().map(|&m| Task::Stmt(m)));
                ExprKind::Struct { ty, members }
            }
            Expr::Typeclass(t) => {
                let scope = program.new_scope(cx.scope, ScopeKind::Typeclass);
                let inner = Cx {
                    scope,
                    module: cx.module,
                    owner: None,
                    member_of: None,
                };
                let params = self.typeclass_params(t.params, inner)?;
                let mut sets: Vec<OverloadSetId> = Vec::new();
                for (slot, member) in t.members.iter().enumerate() {
                    let set = self.overload_set(member.name.name, member.span, true, inner, true)?;
                    self.fn_decl(member, inner, set, true, Some(slot as u32))?;
                    if !sets.contains(&set) {
                        sets.push(set);
                    }
                }
                program.scope(scope).close();
                let ty = program.types.push(TypeDef::Typeclass {
                    scope,
                    params,
                    sets,
                });
                ExprKind::Typeclass { ty }
            }
        };
        Ok(program.new_expr(expr.span(), cx.scope, kind))
    }

    fn typeclass_params(
        &mut self,
        params: &[Param<'_>],
        cx: Cx,
    ) -> Result<Vec<VarId>, CompilationError> {
        let program = self.program;
        let mut vars = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let ty_expr = self.expr(&param.ty, cx)?;
            let (var, var_expr) = program.new_var(
                VarNode::new(
                    param.name.name,
                    param.span,
                    None,
                    VarKind::Plain { ty_expr, index },
                ),
                cx.scope,
            );
            program.declare_bound(
                cx.scope,
                param.name.name,
                var_expr,
                param.name.span,
                SymbolFlags::EXPORTED,
            )?;
            vars.push(var);
        }
        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ModuleRegistry;
    use crate::node::Resolution;
    use bumpalo::Bump;
    use quill_syntax::SyntaxBuilder;

    fn run<'ast>(
        program: &Program,
        modules: &[SyntaxModule<'ast>],
        registry: Option<&ModuleRegistry<'ast>>,
    ) -> Result<PreanalysisOutput, CompilationError> {
        let resolver = registry.map(|r| r as &dyn ModuleResolver<'ast>);
        Preanalysis::new(program, resolver).run(modules)
    }

    #[test]
    fn declarations_precede_initializers() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module(
            "main",
            vec![b.let_("a", b.ident("b")), b.let_("b", b.int(1))],
        );
        let program = Program::new();
        let out = run(&program, &[module], None).unwrap();

        assert_eq!(out.modules.len(), 1);
        assert_eq!(out.roots.len(), 2);
        let scope = program.module(out.modules[0]).scope;
        assert!(program.scope(scope).is_closed());
        assert!(matches!(program.resolve(scope, "b"), Resolution::Found(_)));
    }

    #[test]
    fn same_named_functions_share_a_set() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module(
            "main",
            vec![
                b.fn_decl(
                    "f",
                    vec![b.param("x", b.ident("int32"))],
                    Some(b.ident("int32")),
                    vec![b.ret(b.ident("x"))],
                ),
                b.fn_decl(
                    "f",
                    vec![b.param("x", b.ident("bool"))],
                    Some(b.ident("bool")),
                    vec![b.ret(b.ident("x"))],
                ),
            ],
        );
        let program = Program::new();
        let out = run(&program, &[module], None).unwrap();

        assert_eq!(program.sets.len(), 1);
        let set = program.set(crate::arena::ArenaId::from_index(0));
        assert_eq!(set.functions().len(), 2);
        let set_tasks = out
            .roots
            .iter()
            .filter(|t| matches!(t, Task::OverloadSet(_)))
            .count();
        assert_eq!(set_tasks, 1);
    }

    #[test]
    fn duplicate_let_is_rejected() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module("main", vec![b.let_("x", b.int(1)), b.let_("x", b.int(2))]);
        let err = run(&Program::new(), &[module], None).unwrap_err();
        assert!(
            matches!(err, CompilationError::DuplicateDefinition { ref name, .. } if name == "x")
        );
    }

    #[test]
    fn let_then_fn_of_same_name_is_rejected() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module(
            "main",
            vec![
                b.let_("f", b.int(1)),
                b.fn_decl("f", vec![], None, vec![]),
            ],
        );
        let err = run(&Program::new(), &[module], None).unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateDefinition { .. }));
    }

    #[test]
    fn out_of_range_literal() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module("main", vec![b.let_("x", b.int(1 << 40))]);
        let err = run(&Program::new(), &[module], None).unwrap_err();
        assert!(
            matches!(err, CompilationError::IntegerOutOfRange { value, .. } if value == 1 << 40)
        );
    }

    #[test]
    fn unknown_module() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module("main", vec![b.import("nowhere")]);
        let err = run(&Program::new(), &[module], None).unwrap_err();
        assert!(
            matches!(err, CompilationError::UnknownModule { ref path, .. } if path == "nowhere")
        );
    }

    #[test]
    fn circular_import() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let mut registry = ModuleRegistry::new();
        registry.register(b.module("a", vec![b.import("b")])).unwrap();
        registry.register(b.module("b", vec![b.import("a")])).unwrap();
        let root = b.module("main", vec![b.import("a")]);
        let err = run(&Program::new(), &[root], Some(&registry)).unwrap_err();
        assert!(matches!(err, CompilationError::CircularImport { .. }));
    }

    #[test]
    fn expression_import_is_hidden_until_statement_import() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let mut registry = ModuleRegistry::new();
        registry
            .register(b.module("std.math", vec![b.export_let("pi", b.int(3))]))
            .unwrap();

        let hidden = b.module("main", vec![b.let_("m", b.import_expr("std.math"))]);
        let program = Program::new();
        let out = run(&program, &[hidden], Some(&registry)).unwrap();
        let scope = program.module(out.modules[0]).scope;
        assert_eq!(program.resolve(scope, "math"), Resolution::Missing);

        let visible = b.module(
            "main",
            vec![
                b.let_("m", b.import_expr("std.math")),
                b.import("std.math"),
            ],
        );
        let program = Program::new();
        let out = run(&program, &[visible], Some(&registry)).unwrap();
        let scope = program.module(out.modules[0]).scope;
        assert!(matches!(program.resolve(scope, "math"), Resolution::Found(_)));
        // Imported modules are loaded once.
        assert_eq!(program.modules.len(), 2);
    }

    #[test]
    fn typeclass_members_are_generic() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let tc = b.typeclass(
            vec![b.param("T", b.ident("type"))],
            vec![b.fn_item(
                "id",
                vec![b.param("x", b.ident("T"))],
                Some(b.ident("T")),
                vec![b.ret(b.ident("x"))],
            )],
        );
        let module = b.module("main", vec![b.let_("Id", tc)]);
        let program = Program::new();
        let out = run(&program, &[module], None).unwrap();

        assert!(
            !out.roots
                .iter()
                .any(|t| matches!(t, Task::Body(_) | Task::OverloadSet(_)))
        );
        let function = program.function(crate::arena::ArenaId::from_index(0));
        assert!(function.generic);
        assert_eq!(function.virtual_slot, Some(0));
    }

    #[test]
    fn return_outside_function() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module("main", vec![b.ret(b.int(1))]);
        let err = run(&Program::new(), &[module], None).unwrap_err();
        assert!(matches!(err, CompilationError::TypeMismatch { .. }));
    }
}
