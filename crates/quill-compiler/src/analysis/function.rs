//! Function signature, body and overload set analysis.

use quill_core::CompilationError;

use super::{Analyzer, Interrupt};
use crate::arena::{FunctionId, OverloadSetId, TypeId};
use crate::node::Signature;
use crate::overload;
use crate::return_checker::ReturnChecker;

impl Analyzer<'_> {
    pub(super) fn analyze_signature(&self, id: FunctionId) -> Result<(), Interrupt> {
        let program = self.program;
        let function = program.function(id);
        if function.signature().is_some() {
            return Ok(());
        }

        let mut params = Vec::with_capacity(function.params.len());
        for &param in &function.params {
            let expr = program.var(param).expr().ok_or_else(|| {
                Interrupt::from(CompilationError::internal("parameter without expression"))
            })?;
            params.push(self.info(expr)?.ty);
        }
        let ret = match function.ret {
            Some(ret) => self.type_value(ret)?,
            None => TypeId::VOID,
        };

        function.set_signature(Signature { params, ret });
        Ok(())
    }

    pub(super) fn analyze_body(&self, id: FunctionId) -> Result<(), Interrupt> {
        let program = self.program;
        let function = program.function(id);
        if function.is_body_analyzed() {
            return Ok(());
        }

        let signature = self.signature(id)?;
        if let Some(body) = function.body() {
            self.stmt_done(body)?;
            let returns = ReturnChecker::new(program).all_paths_return(body);
            if signature.ret != TypeId::VOID && !returns {
                return Err(CompilationError::MissingReturn {
                    function: function.name.clone(),
                    span: function.span,
                }
                .into());
            }
        }

        function.mark_body_analyzed();
        Ok(())
    }

    pub(super) fn analyze_set(&self, id: OverloadSetId) -> Result<(), Interrupt> {
        let program = self.program;
        let set = program.set(id);
        if set.is_ready() {
            return Ok(());
        }

        let functions = set.functions();
        let mut signatures = Vec::with_capacity(functions.len());
        for &function in &functions {
            signatures.push(self.signature(function)?);
        }
        for (&function, signature) in functions.iter().zip(signatures) {
            overload::register(program, id, function, signature.params)?;
        }

        set.mark_ready();
        Ok(())
    }
}
