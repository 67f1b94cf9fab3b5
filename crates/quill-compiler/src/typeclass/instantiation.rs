//! Building typeclass instances.

use quill_core::{CompilationError, Span};

use super::cache::CachedInstance;
use crate::analysis::Task;
use crate::arena::{ExprId, ScopeId, TypeId};
use crate::clone::{CloneMode, Cloner, Replacement};
use crate::node::{ExprInfo, ExprKind, ExprNode, OverloadSet, Program};
use crate::scope::{ScopeKind, SymbolFlags};
use crate::types::TypeDef;

/// Result of applying a typeclass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instantiation {
    /// The instance value node (already analyzed).
    pub expr: ExprId,
    /// The instance type.
    pub ty: TypeId,
    /// Analysis tasks for the cloned members; empty on a cache hit.
    pub roots: Vec<Task>,
}

/// Instantiate `typeclass` with the argument expressions `args`.
///
/// # Arguments
///
/// * `typeclass` - Type of the typeclass definition
/// * `args` - Argument expressions, bound to the typeclass parameters
/// * `keys` - Cache key for the arguments (the types they denote)
/// * `span` - Application site
/// * `scope` - Scope of the application site
///
/// # Errors
///
/// Declaration failures in the instance scope, or `Internal` when
/// `typeclass` is not a typeclass type.
pub fn instantiate(
    program: &Program,
    typeclass: TypeId,
    args: &[ExprId],
    keys: Vec<TypeId>,
    span: Span,
    scope: ScopeId,
) -> Result<Instantiation, CompilationError> {
    let mut roots = Vec::new();
    let (instance, built) = program
        .instances
        .get_or_insert_with((typeclass, keys), || {
            let (instance, tasks) = specialize(program, typeclass, args, span, scope)?;
            roots = tasks;
            Ok(instance)
        })?;
    if built {
        tracing::debug!(
            typeclass = %program.explain(typeclass),
            members = roots.len(),
            "typeclass instantiated"
        );
    }
    Ok(Instantiation {
        expr: instance.expr,
        ty: instance.ty,
        roots,
    })
}

fn specialize(
    program: &Program,
    typeclass: TypeId,
    args: &[ExprId],
    span: Span,
    scope: ScopeId,
) -> Result<(CachedInstance, Vec<Task>), CompilationError> {
    let definition = program.ty(typeclass);
    let TypeDef::Typeclass {
        scope: class_scope,
        params,
        sets,
    } = &*definition
    else {
        return Err(CompilationError::internal(format!(
            "'{}' is not a typeclass",
            program.explain(typeclass)
        )));
    };

    let parent = program
        .scope(*class_scope)
        .parent
        .unwrap_or(program.builtin_scope());
    let instance_scope = program.new_scope(parent, ScopeKind::Instance);

    let mut map = Replacement::default();
    map.scopes.insert(*class_scope, instance_scope);
    for (&param, &arg) in params.iter().zip(args) {
        let var = program.var(param);
        program.declare_bound(instance_scope, &var.name, arg, var.span, SymbolFlags::EXPORTED)?;
        if let Some(expr) = var.expr() {
            map.exprs.insert(expr, arg);
        }
    }

    let mut cloner = Cloner::new(program, CloneMode::Specialize, map);
    let mut instance_sets = Vec::with_capacity(sets.len());
    let mut functions = Vec::new();
    for &set in sets {
        let generic = program.set(set);
        let specialized = program
            .sets
            .push(OverloadSet::new(generic.name.clone(), generic.span, generic.module));
        let set_ty = program.types.push(TypeDef::OverloadSet { set: specialized });
        let set_expr = program.new_expr(
            generic.span,
            instance_scope,
            ExprKind::OverloadSet {
                set: specialized,
                ty: set_ty,
            },
        );
        program.declare_bound(
            instance_scope,
            &generic.name,
            set_expr,
            generic.span,
            SymbolFlags::EXPORTED,
        )?;
        cloner.map_set(set, specialized, set_ty);
        for member in generic.functions() {
            functions.push(cloner.clone_function(member, Some(specialized))?);
        }
        instance_sets.push(specialized);
    }
    program.scope(instance_scope).close();

    let ty = program.types.push(TypeDef::Instance {
        scope: instance_scope,
        typeclass,
        functions,
    });
    for &set in &instance_sets {
        program.set(set).set_owner(ty);
    }
    let expr = program.exprs.push(ExprNode::analyzed(
        span,
        scope,
        ExprKind::Instance { ty },
        ExprInfo::of(ty),
    ));

    let mut roots = cloner.take_roots();
    roots.extend(instance_sets.into_iter().map(Task::OverloadSet));
    Ok((CachedInstance { expr, ty }, roots))
}
