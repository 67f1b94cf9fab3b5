//! Instructions and values.

use std::fmt;

use quill_syntax::BinaryOp;

/// A variable with storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarRef {
    Param(String),
    /// Function local, including compiler temporaries.
    Local(String),
    /// Module global, by qualified name.
    Global(String),
}

impl VarRef {
    pub fn name(&self) -> &str {
        match self {
            VarRef::Param(name) | VarRef::Local(name) | VarRef::Global(name) => name,
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Var(VarRef),
    Int(i32),
    Bool(bool),
    Label(u32),
}

/// Instruction kinds.
///
/// `Branch` takes `[cond, then_label, else_label]`; `Jump` and `Label` take
/// one label. `Call` takes the arguments and names its callee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Copy the single input into the output.
    Copy,
    Call(String),
    /// Return the input, or nothing.
    Return,
    Jump,
    Branch,
    Label,
}

impl InstrKind {
    /// The instruction computing a binary operator.
    pub fn from_binary(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => InstrKind::Add,
            BinaryOp::Sub => InstrKind::Sub,
            BinaryOp::Mul => InstrKind::Mul,
            BinaryOp::Div => InstrKind::Div,
            BinaryOp::Rem => InstrKind::Rem,
            BinaryOp::Equal => InstrKind::Eq,
            BinaryOp::NotEqual => InstrKind::Ne,
            BinaryOp::Less => InstrKind::Lt,
            BinaryOp::LessEqual => InstrKind::Le,
            BinaryOp::Greater => InstrKind::Gt,
            BinaryOp::GreaterEqual => InstrKind::Ge,
        }
    }

    pub fn mnemonic(&self) -> &str {
        match self {
            InstrKind::Add => "add",
            InstrKind::Sub => "sub",
            InstrKind::Mul => "mul",
            InstrKind::Div => "div",
            InstrKind::Rem => "rem",
            InstrKind::Eq => "eq",
            InstrKind::Ne => "ne",
            InstrKind::Lt => "lt",
            InstrKind::Le => "le",
            InstrKind::Gt => "gt",
            InstrKind::Ge => "ge",
            InstrKind::Copy => "copy",
            InstrKind::Call(_) => "call",
            InstrKind::Return => "ret",
            InstrKind::Jump => "jump",
            InstrKind::Branch => "branch",
            InstrKind::Label => "label",
        }
    }
}

/// One IR instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub kind: InstrKind,
    pub inputs: Vec<Value>,
    pub output: Option<VarRef>,
}

impl Instruction {
    pub fn new(kind: InstrKind, inputs: Vec<Value>, output: Option<VarRef>) -> Self {
        Self {
            kind,
            inputs,
            output,
        }
    }
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarRef::Param(name) => write!(f, "%{}", name),
            VarRef::Local(name) => write!(f, "${}", name),
            VarRef::Global(name) => write!(f, "@{}", name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Var(var) => write!(f, "{}", var),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Label(l) => write!(f, "L{}", l),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let InstrKind::Label = self.kind {
            if let Some(label) = self.inputs.first() {
                return write!(f, "{}:", label);
            }
        }
        if let Some(output) = &self.output {
            write!(f, "{} = ", output)?;
        }
        f.write_str(self.kind.mnemonic())?;
        if let InstrKind::Call(callee) = &self.kind {
            write!(f, " {}", callee)?;
        }
        for (i, input) in self.inputs.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, input)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_rendering() {
        let add = Instruction::new(
            InstrKind::Add,
            vec![Value::Var(VarRef::Param("arg".into())), Value::Int(1)],
            Some(VarRef::Local("t0".into())),
        );
        assert_eq!(add.to_string(), "$t0 = add %arg, 1");

        let call = Instruction::new(
            InstrKind::Call("ack_1".into()),
            vec![Value::Int(2)],
            Some(VarRef::Local("t1".into())),
        );
        assert_eq!(call.to_string(), "$t1 = call ack_1 2");

        let label = Instruction::new(InstrKind::Label, vec![Value::Label(3)], None);
        assert_eq!(label.to_string(), "L3:");
    }
}
