//! End-to-end tests: syntax trees in, IR modules and diagnostics out.

use quill::compiler::{CompilationResult, InstrKind, IrFunction, IrModule, IrSymbol, Value};
use quill::syntax::Bracket;
use quill::{Bump, CompilerOptions, SyntaxBuilder, SyntaxModule};

fn compile(modules: &[SyntaxModule<'_>]) -> CompilationResult {
    quill::compile(modules, CompilerOptions::default())
}

fn library(modules: &[SyntaxModule<'_>]) -> CompilationResult {
    quill::compile(modules, CompilerOptions::default().with_entry_point(None))
}

fn assert_error(result: &CompilationResult, needle: &str) {
    assert!(!result.is_success(), "expected failure containing '{needle}'");
    assert!(
        result.diagnostics.errors().any(|d| d.message.contains(needle)),
        "no error containing '{needle}' in:\n{}",
        result.diagnostics
    );
}

fn entry(module: &IrModule) -> &IrFunction {
    module
        .functions()
        .find(|f| f.is_entry)
        .expect("entry function was not generated")
}

// ============================================================================
// Lowering
// ============================================================================

#[test]
fn entry_closure_lowers_to_one_function() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.add(b.ident("arg"), b.int(1)))],
    );
    let result = compile(&[b.module("main", vec![b.let_("entry", closure)])]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let module = result.module("main").unwrap();
    assert_eq!(module.functions().count(), 1);
    let f = entry(module);
    assert_eq!(f.name, "entry");
    assert_eq!(f.params.len(), 1);
    assert_eq!(f.count(&InstrKind::Add), 1);
    assert_eq!(f.count(&InstrKind::Return), 1);
}

#[test]
fn branches_and_locals_lower_to_labels_and_copies() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![
            b.let_("y", b.mul(b.ident("arg"), b.int(2))),
            b.if_(
                b.gt(b.ident("y"), b.int(10)),
                vec![b.ret(b.ident("y"))],
                Some(vec![b.ret(b.int(0))]),
            ),
        ],
    );
    let result = compile(&[b.module("main", vec![b.let_("entry", closure)])]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let f = entry(result.module("main").unwrap());
    assert_eq!(f.count(&InstrKind::Copy), 1);
    assert_eq!(f.count(&InstrKind::Branch), 1);
    assert_eq!(f.count(&InstrKind::Label), 3);
    assert_eq!(f.count(&InstrKind::Return), 2);
    assert_eq!(f.locals.len(), 1);
}

#[test]
fn unreachable_functions_are_not_generated() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let helper = b.fn_decl(
        "helper",
        vec![b.param("x", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.ident("x"))],
    );
    let unused = b.fn_decl("unused", vec![], Some(b.ident("int32")), vec![b.ret(b.int(0))]);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.call(b.ident("helper"), vec![b.ident("arg")]))],
    );
    let result = compile(&[b.module("main", vec![helper, unused, b.let_("entry", closure)])]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let module = result.module("main").unwrap();
    let names: Vec<&str> = module.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names.len(), 2, "{names:?}");
    assert!(names.iter().any(|n| n.starts_with("helper")));
    assert!(!names.iter().any(|n| n.starts_with("unused")));
    assert_eq!(entry(module).count(&InstrKind::Call(String::new())), 1);
}

#[test]
fn runtime_globals_are_declared() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let result = library(&[b.module(
        "config",
        vec![
            b.export_let("limit", b.int(10)),
            b.let_("enabled", b.bool(true)),
        ],
    )]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let module = result.module("config").unwrap();
    let names: Vec<&str> = module.variables().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["limit", "enabled"]);
}

// ============================================================================
// Simplification
// ============================================================================

#[test]
fn constant_arithmetic_folds() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.add(b.int(3), b.int(4)))],
    );
    let result = compile(&[b.module("main", vec![b.let_("entry", closure)])]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let f = entry(result.module("main").unwrap());
    assert_eq!(f.count(&InstrKind::Add), 0);
    assert_eq!(f.body.last().unwrap().to_string(), "ret 7");
}

fn ackermann<'a>(b: &SyntaxBuilder<'a>) -> quill::syntax::Stmt<'a> {
    let int = || b.ident("int32");
    b.fn_decl(
        "ack",
        vec![b.param("m", int()), b.param("n", int())],
        Some(int()),
        vec![
            b.if_(
                b.eq(b.ident("m"), b.int(0)),
                vec![b.ret(b.add(b.ident("n"), b.int(1)))],
                None,
            ),
            b.if_(
                b.eq(b.ident("n"), b.int(0)),
                vec![b.ret(b.call(
                    b.ident("ack"),
                    vec![b.sub(b.ident("m"), b.int(1)), b.int(1)],
                ))],
                None,
            ),
            b.ret(b.call(
                b.ident("ack"),
                vec![
                    b.sub(b.ident("m"), b.int(1)),
                    b.call(
                        b.ident("ack"),
                        vec![b.ident("m"), b.sub(b.ident("n"), b.int(1))],
                    ),
                ],
            )),
        ],
    )
}

#[test]
fn recursive_calls_with_constant_arguments_fold() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.call(b.ident("ack"), vec![b.int(2), b.int(3)]))],
    );
    let result = compile(&[b.module("main", vec![ackermann(&b), b.let_("entry", closure)])]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let module = result.module("main").unwrap();
    assert_eq!(module.functions().count(), 1, "ack should be folded away");
    let f = entry(module);
    assert_eq!(f.count(&InstrKind::Call(String::new())), 0);
    assert_eq!(f.body.last().unwrap().to_string(), "ret 9");
}

#[test]
fn calls_with_runtime_arguments_are_kept() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.call(b.ident("ack"), vec![b.int(1), b.ident("arg")]))],
    );
    let result = compile(&[b.module("main", vec![ackermann(&b), b.let_("entry", closure)])]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let module = result.module("main").unwrap();
    assert_eq!(module.functions().count(), 2);
    assert_eq!(entry(module).count(&InstrKind::Call(String::new())), 1);
    assert!(result.stats.simplify_passes >= 1);
}

#[test]
fn disabled_simplification_keeps_arithmetic() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.add(b.int(3), b.int(4)))],
    );
    let module = b.module("main", vec![b.let_("entry", closure)]);
    let result = quill::compile(&[module], CompilerOptions::default().with_simplify(false));
    assert!(result.is_success(), "{}", result.diagnostics);
    assert_eq!(result.stats.simplify_passes, 0);
    assert_eq!(entry(result.module("main").unwrap()).count(&InstrKind::Add), 1);
}

#[test]
fn pass_cap_reports_a_warning() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.add(b.int(3), b.int(4)))],
    );
    let module = b.module("main", vec![b.let_("entry", closure)]);
    let options = CompilerOptions::default().with_max_simplify_passes(1);
    let result = quill::compile(&[module], options);

    assert!(result.is_success(), "{}", result.diagnostics);
    assert_eq!(result.stats.simplify_passes, 1);
    assert!(
        result
            .diagnostics
            .warnings()
            .any(|d| d.message.contains("simplification stopped after 1 passes")),
        "{}",
        result.diagnostics
    );
}

/// `fn sum(n: int32) -> int32`: the sum of `0..=n`, recursively.
fn sum<'a>(b: &SyntaxBuilder<'a>) -> quill::syntax::Stmt<'a> {
    let int = || b.ident("int32");
    b.fn_decl(
        "sum",
        vec![b.param("n", int())],
        Some(int()),
        vec![
            b.if_(b.eq(b.ident("n"), b.int(0)), vec![b.ret(b.int(0))], None),
            b.ret(b.add(
                b.ident("n"),
                b.call(b.ident("sum"), vec![b.sub(b.ident("n"), b.int(1))]),
            )),
        ],
    )
}

fn sum_entry<'a>(b: &SyntaxBuilder<'a>, n: i64) -> quill::syntax::Stmt<'a> {
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.call(b.ident("sum"), vec![b.int(n)]))],
    );
    b.let_("entry", closure)
}

#[test]
fn deep_fold_before_shallow_fold_is_schedule_independent() {
    let dumps: Vec<String> = [1, 4]
        .into_iter()
        .map(|workers| {
            let arena = Bump::new();
            let b = SyntaxBuilder::new(&arena);
            let big = b.let_("big", b.call(b.ident("sum"), vec![b.int(40)]));
            let module = b.module("main", vec![sum(&b), big, sum_entry(&b, 20)]);
            let options = CompilerOptions::default().with_worker_threads(workers);
            let result = quill::compile(&[module], options);
            assert!(result.is_success(), "{}", result.diagnostics);

            let module = result.module("main").unwrap();
            let f = entry(module);
            assert_eq!(f.count(&InstrKind::Call(String::new())), 0);
            assert_eq!(f.body.last().unwrap().to_string(), "ret 210");
            let big = module.variables().find(|v| v.name == "big").unwrap();
            assert_eq!(big.value, Some(Value::Int(820)));
            module.to_string()
        })
        .collect();
    assert_eq!(dumps[0], dumps[1]);
}

#[test]
fn recursion_deeper_than_inline_depth_still_folds() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let module = b.module("main", vec![sum(&b), sum_entry(&b, 20)]);
    let options = CompilerOptions::default().with_max_inline_depth(4);
    let result = quill::compile(&[module], options);
    assert!(result.is_success(), "{}", result.diagnostics);
    assert_eq!(result.diagnostics.warning_count(), 0, "{}", result.diagnostics);
    assert!(result.stats.simplify_passes > 2);

    let f = entry(result.module("main").unwrap());
    assert_eq!(f.body.last().unwrap().to_string(), "ret 210");
}

#[test]
fn recursion_past_default_inline_depth_folds() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let result = compile(&[b.module("main", vec![sum(&b), sum_entry(&b, 100)])]);
    assert!(result.is_success(), "{}", result.diagnostics);

    let module = result.module("main").unwrap();
    assert_eq!(module.functions().count(), 1, "sum should be folded away");
    assert_eq!(entry(module).body.last().unwrap().to_string(), "ret 5050");
}

// ============================================================================
// Overloads
// ============================================================================

fn overloads<'a>(b: &SyntaxBuilder<'a>, int_first: bool) -> Vec<quill::syntax::Stmt<'a>> {
    let int_version = b.fn_decl(
        "pick",
        vec![b.param("x", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.int(1))],
    );
    let bool_version = b.fn_decl(
        "pick",
        vec![b.param("x", b.ident("bool"))],
        Some(b.ident("int32")),
        vec![b.ret(b.int(2))],
    );
    if int_first {
        vec![int_version, bool_version]
    } else {
        vec![bool_version, int_version]
    }
}

#[test]
fn overload_resolution_ignores_declaration_order() {
    for int_first in [true, false] {
        let arena = Bump::new();
        let b = SyntaxBuilder::new(&arena);
        let closure = b.closure(
            vec![b.param("arg", b.ident("int32"))],
            Some(b.ident("int32")),
            vec![b.ret(b.call(b.ident("pick"), vec![b.bool(true)]))],
        );
        let mut items = vec![b.let_("entry", closure)];
        items.extend(overloads(&b, int_first));
        let result = compile(&[b.module("main", items)]);
        assert!(result.is_success(), "{}", result.diagnostics);

        let f = entry(result.module("main").unwrap());
        assert_eq!(f.body.last().unwrap().to_string(), "ret 2", "int_first={int_first}");
    }
}

#[test]
fn duplicate_overload_is_rejected() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let f = || {
        b.fn_decl(
            "f",
            vec![b.param("x", b.ident("int32"))],
            Some(b.ident("int32")),
            vec![b.ret(b.ident("x"))],
        )
    };
    let result = library(&[b.module("main", vec![f(), f()])]);
    assert_error(&result, "duplicate overload 'f(int32)'");
}

#[test]
fn call_without_matching_overload_is_rejected() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let mut items = overloads(&b, true);
    items.push(b.let_("r", b.call(b.ident("pick"), vec![b.int(1), b.int(2)])));
    let result = library(&[b.module("main", items)]);
    assert_error(&result, "no matching overload for 'pick(int32, int32)'");
}

#[test]
fn non_paren_application_is_rejected() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let mut items = overloads(&b, true);
    items.push(b.let_(
        "r",
        b.call_bracket(b.ident("pick"), Bracket::Square, vec![b.int(1)]),
    ));
    let result = library(&[b.module("main", items)]);
    assert_error(&result, "no matching overload");
}

// ============================================================================
// Typeclasses and modules
// ============================================================================

fn measure<'a>(b: &SyntaxBuilder<'a>) -> quill::syntax::Stmt<'a> {
    let typeclass = b.typeclass(
        vec![b.param("T", b.ident("type"))],
        vec![b.fn_item(
            "size",
            vec![b.param("x", b.ident("T"))],
            Some(b.ident("int32")),
            vec![b.ret(b.int(4))],
        )],
    );
    b.let_("Measure", typeclass)
}

#[test]
fn typeclass_instances_are_cached() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![
            b.let_("first", b.call(b.ident("Measure"), vec![b.ident("int32")])),
            b.let_("second", b.call(b.ident("Measure"), vec![b.ident("int32")])),
            b.ret(b.add(
                b.call(b.member(b.ident("first"), "size"), vec![b.int(1)]),
                b.call(b.member(b.ident("second"), "size"), vec![b.int(2)]),
            )),
        ],
    );
    let result = compile(&[b.module("main", vec![measure(&b), b.let_("entry", closure)])]);
    assert!(result.is_success(), "{}", result.diagnostics);
    assert_eq!(result.stats.instances, 1);

    let f = entry(result.module("main").unwrap());
    assert_eq!(f.body.last().unwrap().to_string(), "ret 8");
}

#[test]
fn typeclass_instances_differ_by_argument() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let result = library(&[b.module(
        "main",
        vec![
            measure(&b),
            b.let_("ints", b.call(b.ident("Measure"), vec![b.ident("int32")])),
            b.let_("bools", b.call(b.ident("Measure"), vec![b.ident("bool")])),
            b.let_(
                "n",
                b.call(b.member(b.ident("bools"), "size"), vec![b.bool(false)]),
            ),
        ],
    )]);
    assert!(result.is_success(), "{}", result.diagnostics);
    assert_eq!(result.stats.instances, 2);
}

#[test]
fn typeclass_member_rejects_wrong_argument_type() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let result = library(&[b.module(
        "main",
        vec![
            measure(&b),
            b.let_("ints", b.call(b.ident("Measure"), vec![b.ident("int32")])),
            b.let_(
                "n",
                b.call(b.member(b.ident("ints"), "size"), vec![b.bool(false)]),
            ),
        ],
    )]);
    assert_error(&result, "no matching overload for 'size(bool)'");
}

#[test]
fn imported_exports_are_visible() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let math = b.module(
        "lib.math",
        vec![b.export_fn(
            "double",
            vec![b.param("x", b.ident("int32"))],
            Some(b.ident("int32")),
            vec![b.ret(b.mul(b.ident("x"), b.int(2)))],
        )],
    );
    let closure = b.closure(
        vec![b.param("arg", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.ret(b.call(b.member(b.ident("math"), "double"), vec![b.int(21)]))],
    );
    let main = b.module("main", vec![b.import("lib.math"), b.let_("entry", closure)]);

    let modules = quill::build(&[main], [math], CompilerOptions::default()).unwrap();
    let main = modules.iter().find(|m| m.path == "main").unwrap();
    assert_eq!(entry(main).body.last().unwrap().to_string(), "ret 42");
    assert!(
        modules
            .iter()
            .flat_map(|m| m.symbols.iter())
            .all(|s| !matches!(s, IrSymbol::Function(f) if f.name.starts_with("double")))
    );
}

#[test]
fn unknown_module_fails_the_build() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let main = b.module("main", vec![b.import("missing")]);
    let err = quill::build(&[main], [], CompilerOptions::default().with_entry_point(None))
        .unwrap_err();
    assert!(err.to_string().contains("unknown module 'missing'"), "{err}");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn unresolved_name_is_reported() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let result = library(&[b.module("main", vec![b.let_("x", b.ident("nowhere"))])]);
    assert_error(&result, "unresolved name 'nowhere'");
    assert!(result.modules.is_empty());
}

#[test]
fn cyclic_initializers_are_reported() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let module = b.module(
        "main",
        vec![b.let_("a", b.ident("b")), b.let_("b", b.ident("a"))],
    );
    let options = CompilerOptions::default()
        .with_entry_point(None)
        .with_worker_threads(4);
    let result = quill::compile(&[module], options);
    assert_error(&result, "dependency cycle");
}

#[test]
fn closure_capture_is_rejected() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let outer = b.fn_decl(
        "outer",
        vec![b.param("x", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![
            b.let_(
                "inner",
                b.closure(vec![], Some(b.ident("int32")), vec![b.ret(b.ident("x"))]),
            ),
            b.ret(b.int(0)),
        ],
    );
    let result = library(&[b.module("main", vec![outer])]);
    assert_error(&result, "captures 'x'");
}

#[test]
fn missing_return_is_reported() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let f = b.fn_decl(
        "f",
        vec![b.param("x", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![b.if_(
            b.eq(b.ident("x"), b.int(0)),
            vec![b.ret(b.int(1))],
            None,
        )],
    );
    let result = library(&[b.module("main", vec![f])]);
    assert_error(&result, "not all paths of 'f' return a value");
}

#[test]
fn type_mismatch_in_condition_is_reported() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let f = b.fn_decl(
        "f",
        vec![b.param("x", b.ident("int32"))],
        Some(b.ident("int32")),
        vec![
            b.if_(b.ident("x"), vec![b.ret(b.int(1))], None),
            b.ret(b.int(0)),
        ],
    );
    let result = library(&[b.module("main", vec![f])]);
    assert!(!result.is_success());
}

#[test]
fn invalid_entry_point_is_reported() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let result = compile(&[b.module("main", vec![b.let_("entry", b.int(3))])]);
    assert_error(&result, "invalid entry point 'entry'");
}

#[test]
fn integer_literal_out_of_range_is_reported() {
    let arena = Bump::new();
    let b = SyntaxBuilder::new(&arena);
    let result = library(&[b.module("main", vec![b.let_("x", b.int(1 << 40))])]);
    assert_error(&result, "does not fit in int32");
}
