//! Overload resolution for function calls.
//!
//! An overload set collects the same-named `fn` declarations of one scope.
//! Each member is registered with its ordered parameter-type vector once its
//! signature is known; two members may not share a vector.
//!
//! ## Algorithm
//!
//! 1. Reject any bracket kind other than a parenthesized call
//! 2. Keep the members whose parameter types equal the argument types,
//!    element by element (no conversions)
//! 3. Exactly one survivor is the match; none is `NoMatchingOverload`,
//!    several is `AmbiguousOverload`

use quill_core::{CompilationError, Span};
use quill_syntax::Bracket;

use crate::arena::{FunctionId, OverloadSetId, TypeId};
use crate::node::Program;

/// Register `function` in `set` under its parameter types.
///
/// # Errors
///
/// `DuplicateOverload` when another member already has the same vector.
pub fn register(
    program: &Program,
    set: OverloadSetId,
    function: FunctionId,
    params: Vec<TypeId>,
) -> Result<(), CompilationError> {
    let overloads = program.set(set);
    let mut registered = overloads.registered.lock();
    if registered.iter().any(|(f, _)| *f == function) {
        return Ok(());
    }
    if registered.iter().any(|(_, p)| *p == params) {
        return Err(CompilationError::DuplicateOverload {
            name: overloads.name.clone(),
            signature: program.explain_all(&params),
            span: program.function(function).span,
        });
    }
    registered.push((function, params));
    Ok(())
}

/// Select the member of `set` whose parameters match `args` exactly.
///
/// # Arguments
///
/// * `bracket` - Bracket kind of the application
/// * `args` - Argument types at the call site
/// * `span` - Call site, for errors
pub fn resolve(
    program: &Program,
    set: OverloadSetId,
    bracket: Bracket,
    args: &[TypeId],
    span: Span,
) -> Result<FunctionId, CompilationError> {
    let overloads = program.set(set);
    let no_match = || CompilationError::NoMatchingOverload {
        name: overloads.name.clone(),
        args: program.explain_all(args),
        span,
    };
    if bracket != Bracket::Paren {
        return Err(no_match());
    }

    let candidates: Vec<FunctionId> = overloads
        .registered
        .lock()
        .iter()
        .filter(|(_, params)| params.as_slice() == args)
        .map(|(f, _)| *f)
        .collect();

    match candidates.as_slice() {
        [] => Err(no_match()),
        [function] => Ok(*function),
        _ => Err(CompilationError::AmbiguousOverload {
            name: overloads.name.clone(),
            candidates: candidates
                .iter()
                .map(|&f| program.function(f).span.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Function, FunctionParts, OverloadSet};
    use quill_core::ModuleId;

    fn setup() -> (Program, OverloadSetId, Vec<FunctionId>) {
        let program = Program::new();
        let module = ModuleId::new(0);
        let set = program
            .sets
            .push(OverloadSet::new("f", Span::default(), module));
        let functions = (0..3)
            .map(|_| {
                program.functions.push(Function::new(FunctionParts {
                    name: "f".into(),
                    span: Span::default(),
                    module,
                    scope: program.builtin_scope(),
                    params: vec![],
                    ret: None,
                    body: None,
                    set: Some(set),
                    virtual_slot: None,
                    generic: false,
                }))
            })
            .collect();
        (program, set, functions)
    }

    #[test]
    fn identical_vectors_are_rejected() {
        let (program, set, f) = setup();
        let params = vec![TypeId::INT32, TypeId::BOOL];
        register(&program, set, f[0], params.clone()).unwrap();
        let err = register(&program, set, f[1], params).unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateOverload { .. }));
    }

    #[test]
    fn order_distinguishes_overloads() {
        let (program, set, f) = setup();
        register(&program, set, f[0], vec![TypeId::INT32, TypeId::BOOL]).unwrap();
        register(&program, set, f[1], vec![TypeId::BOOL, TypeId::INT32]).unwrap();

        let call = |args: &[TypeId]| resolve(&program, set, Bracket::Paren, args, Span::default());
        assert_eq!(call(&[TypeId::INT32, TypeId::BOOL]).unwrap(), f[0]);
        assert_eq!(call(&[TypeId::BOOL, TypeId::INT32]).unwrap(), f[1]);
    }

    #[test]
    fn re_registration_is_idempotent() {
        let (program, set, f) = setup();
        register(&program, set, f[0], vec![TypeId::INT32]).unwrap();
        register(&program, set, f[0], vec![TypeId::INT32]).unwrap();
        assert_eq!(program.set(set).registered.lock().len(), 1);
    }

    #[test]
    fn no_match_lists_argument_types() {
        let (program, set, f) = setup();
        register(&program, set, f[0], vec![TypeId::INT32]).unwrap();
        let err = resolve(&program, set, Bracket::Paren, &[TypeId::BOOL], Span::default());
        match err.unwrap_err() {
            CompilationError::NoMatchingOverload { name, args, .. } => {
                assert_eq!(name, "f");
                assert_eq!(args, "bool");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn only_parenthesized_calls_resolve() {
        let (program, set, f) = setup();
        register(&program, set, f[0], vec![]).unwrap();
        let err = resolve(&program, set, Bracket::Square, &[], Span::default()).unwrap_err();
        assert!(matches!(err, CompilationError::NoMatchingOverload { .. }));
    }
}
