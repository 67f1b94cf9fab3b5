//! IR lowering (phase 4) - translate analyzed nodes into [`IrModule`]s.
//!
//! Functions are generated lazily from a worklist. The driver seeds it with
//! the entry point (or, without one, every function of the root modules);
//! every call site enqueues its callee the first time it is referenced, so
//! only reachable functions are generated.
//!
//! ```text
//! globals ──► enqueue(entry) ──► pop ──► lower body ──► call sites enqueue
//!                                 ▲                          │
//!                                 └──────────────────────────┘
//! ```
//!
//! Compile-time values (closures, types, modules, overload sets, typeclass
//! instances) have no storage. Closures and instances become synthetic
//! nominal types listing their member functions.

mod builder;
mod expr;
mod stmt;

pub use builder::FunctionBuilder;

use std::collections::VecDeque;

use quill_core::{CompilationError, ModuleId};
use rustc_hash::FxHashMap;

use crate::arena::{FunctionId, ScopeId, TypeId, VarId};
use crate::ir::{InstrKind, IrFunction, IrModule, IrSymbol, IrType, IrVariable};
use crate::node::{ExprKind, Program, StmtKind, VarKind};
use crate::types::TypeDef;

/// Per-compilation lowering state.
pub struct LowerContext<'p> {
    program: &'p Program,
    /// Source of every synthetic name.
    counter: u32,
    type_names: FxHashMap<TypeId, String>,
    function_names: FxHashMap<FunctionId, String>,
    closure_types: FxHashMap<FunctionId, TypeId>,
    module_scopes: FxHashMap<ScopeId, ModuleId>,
    globals: FxHashMap<VarId, String>,
    worklist: VecDeque<FunctionId>,
    modules: Vec<IrModule>,
    entry_name: String,
}

impl<'p> LowerContext<'p> {
    pub fn new(program: &'p Program, entry_name: &str) -> Self {
        let closure_types = program
            .types
            .ids()
            .into_iter()
            .filter_map(|ty| match *program.ty(ty) {
                TypeDef::Closure { function } => Some((function, ty)),
                _ => None,
            })
            .collect();
        let module_ids = program.modules.ids();
        let module_scopes = module_ids
            .iter()
            .map(|&m| (program.module(m).scope, m))
            .collect();
        let modules = module_ids
            .iter()
            .map(|&m| IrModule::new(program.module(m).path.clone()))
            .collect();

        Self {
            program,
            counter: 0,
            type_names: FxHashMap::default(),
            function_names: FxHashMap::default(),
            closure_types,
            module_scopes,
            globals: FxHashMap::default(),
            worklist: VecDeque::new(),
            modules,
            entry_name: entry_name.to_string(),
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.counter;
        self.counter += 1;
        id
    }

    fn module_mut(&mut self, module: ModuleId) -> Result<&mut IrModule, CompilationError> {
        self.modules
            .get_mut(module.index() as usize)
            .ok_or_else(|| CompilationError::internal(format!("unknown module {:?}", module)))
    }

    /// The module whose scope encloses `scope`.
    fn module_of_scope(&self, scope: ScopeId) -> Result<ModuleId, CompilationError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(&module) = self.module_scopes.get(&id) {
                return Ok(module);
            }
            current = self.program.scope(id).parent;
        }
        Err(CompilationError::internal("scope outside of any module"))
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// The synthetic (or builtin) name of a type, assigned on first use.
    pub fn type_name(&mut self, ty: TypeId) -> String {
        if let Some(name) = self.type_names.get(&ty) {
            return name.clone();
        }
        let name = match &*self.program.ty(ty) {
            TypeDef::Closure { .. } => format!("Closure_{}", self.next_id()),
            TypeDef::Instance { .. } => format!("Instance_{}", self.next_id()),
            TypeDef::Struct { .. } => format!("struct_{}", self.next_id()),
            TypeDef::OverloadSet { set } => {
                format!("{}_overloads_{}", self.program.set(*set).name, self.next_id())
            }
            TypeDef::Typeclass { .. } => format!("Typeclass_{}", self.next_id()),
            TypeDef::Module { path, .. } => path.clone(),
            TypeDef::Int32 | TypeDef::Bool | TypeDef::Void | TypeDef::Type => {
                self.program.explain(ty)
            }
        };
        self.type_names.insert(ty, name.clone());
        name
    }

    pub fn ir_type(&mut self, ty: TypeId) -> IrType {
        let def = self.program.ty(ty);
        def.lower_to_ir_type(ty, self)
    }

    fn is_runtime(&self, ty: TypeId) -> bool {
        self.program.ty(ty).is_runtime()
    }

    /// The generated name of `function`, queueing it for generation the
    /// first time it is referenced.
    pub fn enqueue(&mut self, function: FunctionId) -> Result<String, CompilationError> {
        if let Some(name) = self.function_names.get(&function) {
            return Ok(name.clone());
        }
        let program = self.program;
        let f = program.function(function);
        let closure_ty = self.closure_types.get(&function).copied();
        let name = if f.is_entry() {
            self.entry_name.clone()
        } else if closure_ty.is_some() {
            format!("closure_{}", self.next_id())
        } else {
            format!("{}_{}", f.name, self.next_id())
        };
        self.function_names.insert(function, name.clone());
        self.worklist.push_back(function);
        tracing::trace!(%name, "function enqueued");

        let owner = match closure_ty {
            Some(ty) => Some((ty, "call".to_string())),
            None => f
                .set
                .and_then(|set| program.set(set).owner())
                .map(|ty| (ty, f.name.clone())),
        };
        if let Some((ty, member)) = owner {
            let ty_name = self.type_name(ty);
            self.module_mut(f.module)?
                .add_type_member(&ty_name, member, name.clone());
        }
        Ok(name)
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Declare the runtime globals of a module's root declarations.
    fn lower_globals(&mut self, module: ModuleId) -> Result<(), CompilationError> {
        let program = self.program;
        for stmt in program.module(module).stmts() {
            let StmtKind::Decl { var } = program.stmt(stmt).kind() else {
                continue;
            };
            self.global(var)?;
            // Struct bodies bound at module level declare their members.
            let init = program.var(var).kind().init();
            if let Some(ExprKind::Struct { members, .. }) = init.map(|i| program.expr(i).kind()) {
                for member in members {
                    if let StmtKind::Decl { var } = program.stmt(member).kind() {
                        self.global(var)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// The qualified name of a global variable, declaring it on first use.
    ///
    /// Returns `None` for variables without runtime storage.
    pub(crate) fn global(&mut self, var: VarId) -> Result<Option<String>, CompilationError> {
        if let Some(name) = self.globals.get(&var) {
            return Ok(Some(name.clone()));
        }
        let program = self.program;
        let node = program.var(var);
        let expr = node
            .expr()
            .ok_or_else(|| CompilationError::internal("variable without expression"))?;
        let expr_node = program.expr(expr);
        let ty = expr_node
            .info()
            .map(|i| i.ty)
            .ok_or_else(|| CompilationError::internal("global was not analyzed"))?;
        if !self.is_runtime(ty) {
            return Ok(None);
        }

        let module = self.module_of_scope(expr_node.scope)?;
        let (name, qualified) = match node.kind() {
            VarKind::Member { owner, .. } => {
                let name = format!("{}.{}", self.type_name(owner), node.name);
                (name.clone(), name)
            }
            VarKind::Expr { .. } | VarKind::Plain { .. } => (
                node.name.clone(),
                format!("{}.{}", program.module(module).path, node.name),
            ),
        };
        self.globals.insert(var, qualified.clone());

        let init = node
            .kind()
            .init()
            .ok_or_else(|| CompilationError::internal("global without initializer"))?;
        let mut builder = FunctionBuilder::new();
        let value = self.value(&mut builder, init)?;
        let (instructions, _) = builder.finish();
        let ir_ty = self.ir_type(ty);
        self.module_mut(module)?
            .symbols
            .push(IrSymbol::Variable(IrVariable {
                name,
                ty: ir_ty,
                init: instructions,
                value: Some(value),
            }));
        Ok(Some(qualified))
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn lower_function(&mut self, function: FunctionId) -> Result<IrFunction, CompilationError> {
        let program = self.program;
        let f = program.function(function);
        let name = self.enqueue(function)?;
        let signature = f
            .signature()
            .cloned()
            .ok_or_else(|| CompilationError::internal(format!("'{}' was not analyzed", f.name)))?;
        tracing::trace!(%name, "lowering function");

        let mut builder = FunctionBuilder::new();
        let mut params = Vec::with_capacity(f.params.len());
        for (&param, &ty) in f.params.iter().zip(&signature.params) {
            let var = program.var(param);
            builder.add_param(param, &var.name);
            params.push((var.name.clone(), self.ir_type(ty)));
        }
        if let Some(body) = f.body() {
            self.lower_stmt(&mut builder, body)?;
        }
        let ret = self.ir_type(signature.ret);
        if signature.ret == TypeId::VOID && !builder.ends_with_return() {
            builder.emit(InstrKind::Return, Vec::new(), None);
        }

        let (body, locals) = builder.finish();
        Ok(IrFunction {
            name,
            params,
            ret,
            locals,
            body,
            is_entry: f.is_entry(),
        })
    }

    /// Seed the worklist when the program has no entry point.
    fn enqueue_root_functions(&mut self, roots: &[ModuleId]) -> Result<(), CompilationError> {
        let program = self.program;
        for &module in roots {
            for stmt in program.module(module).stmts() {
                let function = match program.stmt(stmt).kind() {
                    StmtKind::Fn { function, .. } => Some(function),
                    StmtKind::Decl { var } => program
                        .var(var)
                        .kind()
                        .init()
                        .and_then(|init| match program.expr(init).kind() {
                            ExprKind::Closure { function, .. } => Some(function),
                            _ => None,
                        }),
                    _ => None,
                };
                if let Some(function) = function {
                    let f = program.function(function);
                    if !f.generic && f.body().is_some() {
                        self.enqueue(function)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Vec<IrModule> {
        self.modules
    }
}

/// Lower every module of an analyzed (and optionally simplified) program.
///
/// # Arguments
///
/// * `roots` - Modules passed to the compiler directly
/// * `entry_name` - Name given to the entry function
///
/// # Errors
///
/// `UseBeforeDeclaration` for a local read before its declaration, or
/// `Internal` when a node reached lowering without analysis.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_program(
    program: &Program,
    roots: &[ModuleId],
    entry_name: &str,
) -> Result<Vec<IrModule>, CompilationError> {
    let mut ctx = LowerContext::new(program, entry_name);
    for module in program.modules.ids() {
        ctx.lower_globals(module)?;
    }
    match program.entry() {
        Some(entry) => {
            ctx.enqueue(entry)?;
        }
        None => ctx.enqueue_root_functions(roots)?,
    }

    let mut generated = 0usize;
    while let Some(function) = ctx.worklist.pop_front() {
        let module = program.function(function).module;
        let ir = ctx.lower_function(function)?;
        ctx.module_mut(module)?.symbols.push(IrSymbol::Function(ir));
        generated += 1;
    }
    tracing::debug!(functions = generated, "lowering complete");
    Ok(ctx.finish())
}
