//! Modules and their symbols.

use std::fmt;

use super::instruction::{InstrKind, Instruction, Value};

/// Types with an IR representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrType {
    Int32,
    Bool,
    Void,
    /// Synthetic named type (closures, instances, structs).
    Nominal(String),
}

/// A generated function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrFunction {
    pub name: String,
    pub params: Vec<(String, IrType)>,
    pub ret: IrType,
    pub locals: Vec<(String, IrType)>,
    pub body: Vec<Instruction>,
    pub is_entry: bool,
}

impl IrFunction {
    /// Number of instructions of `kind` (ignoring `Call` targets).
    pub fn count(&self, kind: &InstrKind) -> usize {
        self.body
            .iter()
            .filter(|i| std::mem::discriminant(&i.kind) == std::mem::discriminant(kind))
            .count()
    }
}

/// A module global with runtime storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrVariable {
    pub name: String,
    pub ty: IrType,
    /// Instructions computing the initial value, when not constant.
    pub init: Vec<Instruction>,
    /// The initial value.
    pub value: Option<Value>,
}

/// A synthetic nominal type and its members (`member → function`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrNominalType {
    pub name: String,
    pub members: Vec<(String, String)>,
}

/// A module-level symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrSymbol {
    Variable(IrVariable),
    Function(IrFunction),
    Type(IrNominalType),
}

/// One lowered module.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IrModule {
    /// Dotted module path.
    pub path: String,
    pub symbols: Vec<IrSymbol>,
}

impl IrModule {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            symbols: Vec::new(),
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &IrFunction> {
        self.symbols.iter().filter_map(|s| match s {
            IrSymbol::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn variables(&self) -> impl Iterator<Item = &IrVariable> {
        self.symbols.iter().filter_map(|s| match s {
            IrSymbol::Variable(v) => Some(v),
            _ => None,
        })
    }

    pub fn types(&self) -> impl Iterator<Item = &IrNominalType> {
        self.symbols.iter().filter_map(|s| match s {
            IrSymbol::Type(t) => Some(t),
            _ => None,
        })
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions().find(|f| f.name == name)
    }

    /// Add a type member, creating the type on first use.
    pub fn add_type_member(&mut self, ty: &str, member: String, function: String) {
        let existing = self.symbols.iter_mut().find_map(|s| match s {
            IrSymbol::Type(t) if t.name == ty => Some(t),
            _ => None,
        });
        match existing {
            Some(t) => t.members.push((member, function)),
            None => self.symbols.push(IrSymbol::Type(IrNominalType {
                name: ty.to_string(),
                members: vec![(member, function)],
            })),
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Int32 => f.write_str("int32"),
            IrType::Bool => f.write_str("bool"),
            IrType::Void => f.write_str("void"),
            IrType::Nominal(name) => f.write_str(name),
        }
    }
}

impl fmt::Display for IrFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_entry {
            f.write_str("entry ")?;
        }
        write!(f, "fn {}(", self.name)?;
        for (i, (name, ty)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, ty)?;
        }
        writeln!(f, ") -> {} {{", self.ret)?;
        for (name, ty) in &self.locals {
            writeln!(f, "    local {}: {}", name, ty)?;
        }
        for instruction in &self.body {
            writeln!(f, "    {}", instruction)?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for IrSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrSymbol::Variable(v) => {
                write!(f, "global {}: {}", v.name, v.ty)?;
                if let Some(value) = &v.value {
                    write!(f, " = {}", value)?;
                }
                for instruction in &v.init {
                    write!(f, "\n    {}", instruction)?;
                }
                Ok(())
            }
            IrSymbol::Function(func) => write!(f, "{}", func),
            IrSymbol::Type(t) => {
                write!(f, "type {} {{", t.name)?;
                for (i, (member, function)) in t.members.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{}{} = {}", sep, member, function)?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.path)?;
        for symbol in &self.symbols {
            writeln!(f, "{}", symbol)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::VarRef;

    #[test]
    fn module_dump() {
        let mut module = IrModule::new("main");
        module.symbols.push(IrSymbol::Function(IrFunction {
            name: "entry".into(),
            params: vec![("arg".into(), IrType::Int32)],
            ret: IrType::Int32,
            locals: vec![],
            body: vec![Instruction::new(
                InstrKind::Return,
                vec![Value::Var(VarRef::Param("arg".into()))],
                None,
            )],
            is_entry: true,
        }));
        module.add_type_member("Closure_0", "call".into(), "entry".into());

        let dump = module.to_string();
        assert!(dump.starts_with("module main\n"));
        assert!(dump.contains("entry fn entry(arg: int32) -> int32 {\n    ret %arg\n}"));
        assert!(dump.contains("type Closure_0 { call = entry }"));
    }

    #[test]
    fn type_members_accumulate() {
        let mut module = IrModule::new("m");
        module.add_type_member("Instance_1", "show".into(), "show_2".into());
        module.add_type_member("Instance_1", "size".into(), "size_3".into());
        let types: Vec<_> = module.types().collect();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0].members.len(), 2);
    }

    #[test]
    fn count_by_kind() {
        let function = IrFunction {
            name: "f".into(),
            params: vec![],
            ret: IrType::Void,
            locals: vec![],
            body: vec![
                Instruction::new(InstrKind::Call("g".into()), vec![], None),
                Instruction::new(InstrKind::Return, vec![], None),
            ],
            is_entry: false,
        };
        assert_eq!(function.count(&InstrKind::Call(String::new())), 1);
        assert_eq!(function.count(&InstrKind::Add), 0);
    }
}
