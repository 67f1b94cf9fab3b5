//! Semantic types.
//!
//! Types are identified by [`TypeId`]; two types are the same type exactly
//! when their handles are equal. The four builtins occupy the first slots of
//! every program's type table (see [`TypeId::INT32`] and friends). Every
//! other type is minted once for the construct that introduces it: each
//! closure, overload set, struct body, module, typeclass definition and
//! typeclass instance has a type of its own.

use crate::arena::{FunctionId, OverloadSetId, ScopeId, TypeId, VarId};
use crate::ir::IrType;
use crate::lower::LowerContext;
use crate::node::Program;

/// A type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Int32,
    Bool,
    Void,
    /// The type of type values.
    Type,
    /// The type of one closure.
    Closure { function: FunctionId },
    /// The type of a reference to an overload set.
    OverloadSet { set: OverloadSetId },
    /// A structural type with member variables.
    Struct { scope: ScopeId },
    /// A module used as a value.
    Module { path: String, scope: ScopeId },
    /// An uninstantiated typeclass.
    Typeclass {
        scope: ScopeId,
        params: Vec<VarId>,
        sets: Vec<OverloadSetId>,
    },
    /// A typeclass specialized for concrete arguments.
    Instance {
        scope: ScopeId,
        typeclass: TypeId,
        functions: Vec<FunctionId>,
    },
}

impl TypeDef {
    /// Human readable name used in diagnostics.
    pub fn explain(&self, program: &Program) -> String {
        match self {
            TypeDef::Int32 => "int32".to_string(),
            TypeDef::Bool => "bool".to_string(),
            TypeDef::Void => "void".to_string(),
            TypeDef::Type => "type".to_string(),
            TypeDef::Closure { function } => {
                let function = program.function(*function);
                match function.signature() {
                    Some(sig) => format!(
                        "closure({}) -> {}",
                        program.explain_all(&sig.params),
                        program.explain(sig.ret)
                    ),
                    None => "closure".to_string(),
                }
            }
            TypeDef::OverloadSet { set } => {
                format!("overload set '{}'", program.set(*set).name)
            }
            TypeDef::Struct { .. } => "struct".to_string(),
            TypeDef::Module { path, .. } => format!("module '{}'", path),
            TypeDef::Typeclass { .. } => "typeclass".to_string(),
            TypeDef::Instance { typeclass, .. } => {
                format!("instance of {}", program.explain(*typeclass))
            }
        }
    }

    /// The scope holding this type's members, with whether only exported
    /// symbols are visible through it.
    pub fn member_scope(&self) -> Option<(ScopeId, bool)> {
        match self {
            TypeDef::Struct { scope } | TypeDef::Instance { scope, .. } => Some((*scope, false)),
            TypeDef::Module { scope, .. } => Some((*scope, true)),
            _ => None,
        }
    }

    /// Whether values of this type need runtime storage.
    pub fn is_runtime(&self) -> bool {
        matches!(self, TypeDef::Int32 | TypeDef::Bool)
    }

    /// The IR type values of this type lower to.
    ///
    /// Compile-time-only types lower to their synthetic nominal name.
    pub fn lower_to_ir_type(&self, id: TypeId, ctx: &mut LowerContext<'_>) -> IrType {
        match self {
            TypeDef::Int32 => IrType::Int32,
            TypeDef::Bool => IrType::Bool,
            TypeDef::Void => IrType::Void,
            _ => IrType::Nominal(ctx.type_name(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_occupy_fixed_slots() {
        let program = Program::new();
        assert_eq!(*program.ty(TypeId::INT32), TypeDef::Int32);
        assert_eq!(*program.ty(TypeId::BOOL), TypeDef::Bool);
        assert_eq!(*program.ty(TypeId::VOID), TypeDef::Void);
        assert_eq!(*program.ty(TypeId::TYPE), TypeDef::Type);
        assert_eq!(program.explain(TypeId::INT32), "int32");
    }

    #[test]
    fn only_scalars_are_runtime() {
        assert!(TypeDef::Int32.is_runtime());
        assert!(TypeDef::Bool.is_runtime());
        assert!(!TypeDef::Void.is_runtime());
        assert!(!TypeDef::Type.is_runtime());
    }
}
