//! Entry point validation.
//!
//! The entry symbol must name a function callable with exactly one `int32`
//! argument: a closure of that signature, or an overload set with a single
//! such member. Validation runs after analysis, when every signature is
//! known, and flags the function so lowering emits it under the configured
//! entry name.

use quill_core::{CompilationError, ModuleId, Span};

use crate::arena::{FunctionId, TypeId};
use crate::node::{Program, Resolution};
use crate::types::TypeDef;

/// Find, check and flag the entry function.
///
/// # Arguments
///
/// * `program` - An analyzed program
/// * `roots` - Root modules searched for the entry symbol, in order
/// * `name` - The entry symbol name
///
/// # Errors
///
/// `InvalidEntryPoint` when the symbol is missing, is not a function, or has
/// no single `(int32)` overload.
pub fn validate_entry_point(
    program: &Program,
    roots: &[ModuleId],
    name: &str,
) -> Result<FunctionId, CompilationError> {
    let invalid = |reason: &str, span: Span| CompilationError::InvalidEntryPoint {
        name: name.to_string(),
        reason: reason.to_string(),
        span,
    };

    let symbol = roots
        .iter()
        .find_map(|&module| match program.resolve(program.module(module).scope, name) {
            Resolution::Found(symbol) => Some(symbol),
            Resolution::Pending(_) | Resolution::Missing => None,
        })
        .ok_or_else(|| invalid("not declared in a root module", Span::default()))?;

    let symbol = program.symbol(symbol);
    let span = symbol.span;
    let target = symbol
        .expr()
        .ok_or_else(|| invalid("not declared in a root module", span))?;
    let ty = program
        .expr(target)
        .info()
        .map(|info| info.ty)
        .ok_or_else(|| CompilationError::internal("entry symbol was not analyzed"))?;

    let takes_int = |function: FunctionId| {
        program
            .function(function)
            .signature()
            .is_some_and(|sig| sig.params.as_slice() == [TypeId::INT32])
    };

    let function = match &*program.ty(ty) {
        TypeDef::Closure { function } if takes_int(*function) => *function,
        TypeDef::OverloadSet { set } => {
            let candidates: Vec<FunctionId> = program
                .set(*set)
                .functions()
                .into_iter()
                .filter(|&f| takes_int(f))
                .collect();
            match candidates.as_slice() {
                [single] => *single,
                _ => return Err(invalid("expected exactly one (int32) overload", span)),
            }
        }
        TypeDef::Closure { .. } => return Err(invalid("expected a single int32 parameter", span)),
        _ => return Err(invalid("not a function", span)),
    };

    program.set_entry(function);
    tracing::debug!(entry = name, "entry point validated");
    Ok(function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::options::CompilerOptions;
    use crate::passes::Preanalysis;
    use bumpalo::Bump;
    use quill_syntax::{SyntaxBuilder, SyntaxModule};

    fn analyze(module: SyntaxModule<'_>) -> (Program, Vec<ModuleId>) {
        let program = Program::new();
        let output = Preanalysis::new(&program, None).run(&[module]).unwrap();
        Analyzer::new(&program, &CompilerOptions::default().with_worker_threads(1))
            .run(output.roots)
            .unwrap();
        (program, output.modules)
    }

    #[test]
    fn closure_entry_is_flagged() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let entry = b.closure(
            vec![b.param("arg", b.ident("int32"))],
            Some(b.ident("int32")),
            vec![b.ret(b.ident("arg"))],
        );
        let (program, roots) = analyze(b.module("main", vec![b.let_("entry", entry)]));

        let function = validate_entry_point(&program, &roots, "entry").unwrap();
        assert_eq!(program.entry(), Some(function));
        assert!(program.function(function).is_entry());
    }

    #[test]
    fn single_int_overload_is_accepted() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let module = b.module(
            "main",
            vec![
                b.fn_decl(
                    "entry",
                    vec![b.param("x", b.ident("int32"))],
                    Some(b.ident("int32")),
                    vec![b.ret(b.ident("x"))],
                ),
                b.fn_decl(
                    "entry",
                    vec![b.param("x", b.ident("bool"))],
                    Some(b.ident("int32")),
                    vec![b.ret(b.int(0))],
                ),
            ],
        );
        let (program, roots) = analyze(module);
        assert!(validate_entry_point(&program, &roots, "entry").is_ok());
    }

    #[test]
    fn missing_entry_is_rejected() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let (program, roots) = analyze(b.module("main", vec![b.let_("x", b.int(1))]));

        let err = validate_entry_point(&program, &roots, "entry").unwrap_err();
        assert!(matches!(err, CompilationError::InvalidEntryPoint { .. }));
        assert!(program.entry().is_none());
    }

    #[test]
    fn non_function_entry_is_rejected() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let (program, roots) = analyze(b.module("main", vec![b.let_("entry", b.int(1))]));

        match validate_entry_point(&program, &roots, "entry") {
            Err(CompilationError::InvalidEntryPoint { reason, .. }) => {
                assert_eq!(reason, "not a function");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wrong_closure_arity_is_rejected() {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let entry = b.closure(vec![], Some(b.ident("int32")), vec![b.ret(b.int(0))]);
        let (program, roots) = analyze(b.module("main", vec![b.let_("entry", entry)]));
        assert!(validate_entry_point(&program, &roots, "entry").is_err());
    }
}
