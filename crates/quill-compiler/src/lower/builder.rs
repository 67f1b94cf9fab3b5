//! Per-function instruction builder.

use rustc_hash::FxHashMap;

use crate::arena::VarId;
use crate::ir::{InstrKind, Instruction, IrType, Value, VarRef};

/// Builds the instruction list of one function.
///
/// Owns the function's locals (declared variables and temporaries) and its
/// label counter; names are unique within the function.
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    body: Vec<Instruction>,
    locals: Vec<(String, IrType)>,
    params: FxHashMap<VarId, String>,
    local_names: FxHashMap<VarId, String>,
    temps: u32,
    labels: u32,
}

impl FunctionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Emission
    // ==========================================================================

    pub fn emit(&mut self, kind: InstrKind, inputs: Vec<Value>, output: Option<VarRef>) {
        self.body.push(Instruction::new(kind, inputs, output));
    }

    /// Allocate a fresh label id.
    pub fn new_label(&mut self) -> u32 {
        let label = self.labels;
        self.labels += 1;
        label
    }

    pub fn emit_label(&mut self, label: u32) {
        self.emit(InstrKind::Label, vec![Value::Label(label)], None);
    }

    pub fn emit_jump(&mut self, label: u32) {
        self.emit(InstrKind::Jump, vec![Value::Label(label)], None);
    }

    pub fn ends_with_return(&self) -> bool {
        matches!(self.body.last(), Some(i) if i.kind == InstrKind::Return)
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    pub fn add_param(&mut self, var: VarId, name: &str) {
        self.params.insert(var, name.to_string());
    }

    pub fn param(&self, var: VarId) -> Option<VarRef> {
        self.params.get(&var).cloned().map(VarRef::Param)
    }

    /// A new temporary of type `ty`.
    pub fn temp(&mut self, ty: IrType) -> VarRef {
        let mut name = format!("t{}", self.temps);
        while self.locals.iter().any(|(l, _)| *l == name) {
            self.temps += 1;
            name = format!("t{}", self.temps);
        }
        self.temps += 1;
        self.locals.push((name.clone(), ty));
        VarRef::Local(name)
    }

    /// Give `var` a local slot, renaming it if the name is already taken.
    pub fn declare_local(&mut self, var: VarId, name: &str, ty: IrType) -> VarRef {
        let mut unique = name.to_string();
        let mut n = 1;
        while self.locals.iter().any(|(l, _)| *l == unique) {
            unique = format!("{}_{}", name, n);
            n += 1;
        }
        self.locals.push((unique.clone(), ty));
        self.local_names.insert(var, unique.clone());
        VarRef::Local(unique)
    }

    pub fn local(&self, var: VarId) -> Option<VarRef> {
        self.local_names.get(&var).cloned().map(VarRef::Local)
    }

    /// The instructions and locals built so far.
    pub fn finish(self) -> (Vec<Instruction>, Vec<(String, IrType)>) {
        (self.body, self.locals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaId;

    #[test]
    fn temporaries_and_labels_are_numbered() {
        let mut b = FunctionBuilder::new();
        assert_eq!(b.temp(IrType::Int32), VarRef::Local("t0".into()));
        assert_eq!(b.temp(IrType::Bool), VarRef::Local("t1".into()));
        assert_eq!(b.new_label(), 0);
        assert_eq!(b.new_label(), 1);
    }

    #[test]
    fn shadowed_locals_get_distinct_names() {
        let mut b = FunctionBuilder::new();
        let first = b.declare_local(VarId::from_index(0), "x", IrType::Int32);
        let second = b.declare_local(VarId::from_index(1), "x", IrType::Int32);
        assert_eq!(first, VarRef::Local("x".into()));
        assert_eq!(second, VarRef::Local("x_1".into()));
        assert_eq!(b.local(VarId::from_index(1)), Some(second));
    }

    #[test]
    fn trailing_return_detection() {
        let mut b = FunctionBuilder::new();
        assert!(!b.ends_with_return());
        b.emit(InstrKind::Return, vec![], None);
        assert!(b.ends_with_return());
        let (body, locals) = b.finish();
        assert_eq!(body.len(), 1);
        assert!(locals.is_empty());
    }
}
