use ironstone_core::ast::{build, AstNode, AstNodeKind, Parameters, RescueClause, SourceUnitTree};
use ironstone_core::config::{CompilerOptions, GeneratorSettings, SourceEncoding};
use ironstone_core::ir::expr::{Expr, GotoKind, LambdaExpr, LambdaKind, SymbolDocument};
use ironstone_core::ir::transform_source_unit;
use ironstone_core::ir::value::Value;
use ironstone_core::location::Span;

fn lower(statements: Vec<AstNode>) -> LambdaExpr {
    lower_with(SourceUnitTree::new(statements), CompilerOptions::default(), GeneratorSettings::default(), false)
}

fn lower_with(tree: SourceUnitTree, options: CompilerOptions, settings: GeneratorSettings, interactive: bool) -> LambdaExpr {
    transform_source_unit(&tree, None, SourceEncoding::Utf8, options, settings, interactive)
}

fn collect<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
    out.push(expr);
    match expr {
        Expr::Assign { value, .. } => collect(value, out),
        Expr::Block { body, .. } | Expr::NewArray(body) | Expr::Call { args: body, .. } => {
            for item in body {
                collect(item, out);
            }
        }
        Expr::Label { default: Some(inner), .. } | Expr::Goto { value: Some(inner), .. } => collect(inner, out),
        Expr::Loop { body, .. } | Expr::Convert { operand: body, .. } | Expr::Not(body) => collect(body, out),
        Expr::Field { instance: Some(instance), .. } => collect(instance, out),
        Expr::Condition { test, if_true, if_false, .. } => {
            collect(test, out);
            collect(if_true, out);
            collect(if_false, out);
        }
        Expr::Invoke { receiver, args, block, .. } => {
            collect(receiver, out);
            for arg in args {
                collect(arg, out);
            }
            if let Some(block) = block {
                collect(block, out);
            }
        }
        Expr::TryCatch { body: left, handler: right }
        | Expr::TryFinally { body: left, finally: right }
        | Expr::ReferenceEqual { left, right } => {
            collect(left, out);
            collect(right, out);
        }
        Expr::Lambda(lambda) => collect(&lambda.body, out),
        _ => {}
    }
}

fn nodes(expr: &Expr) -> Vec<&Expr> {
    let mut out = Vec::new();
    collect(expr, &mut out);
    out
}

fn call_names(expr: &Expr) -> Vec<&'static str> {
    nodes(expr)
        .into_iter()
        .filter_map(|node| match node {
            Expr::Call { op, .. } => Some(op.name),
            _ => None,
        })
        .collect()
}

fn lambdas(expr: &Expr) -> Vec<&LambdaExpr> {
    nodes(expr)
        .into_iter()
        .filter_map(|node| match node {
            Expr::Lambda(lambda) => Some(&**lambda),
            _ => None,
        })
        .collect()
}

fn find_lambda(expr: &Expr, kind: LambdaKind) -> &LambdaExpr {
    match lambdas(expr).into_iter().find(|lambda| lambda.kind == kind) {
        Some(lambda) => lambda,
        None => panic!("no {:?} lambda in {}", kind, expr),
    }
}

fn invokes(expr: &Expr, method: &str) -> bool {
    nodes(expr).iter().any(|node| matches!(node, Expr::Invoke { site, .. } if site.method == method))
}

fn finally_parts(expr: &Expr) -> Vec<&Expr> {
    nodes(expr)
        .into_iter()
        .filter_map(|node| match node {
            Expr::TryFinally { finally, .. } => Some(&**finally),
            _ => None,
        })
        .collect()
}

fn parameter_names(lambda: &LambdaExpr) -> Vec<&str> {
    lambda.parameters.iter().map(|parameter| parameter.name()).collect()
}

fn variable_names(lambda: &LambdaExpr) -> Vec<&str> {
    lambda.variables.iter().map(|variable| variable.name()).collect()
}

#[test]
fn top_level_lambda_has_self_and_scope() {
    let lambda = lower(vec![build::int(1)]);
    assert_eq!(lambda.kind, LambdaKind::TopLevel);
    assert_eq!(lambda.name, "<main>");
    assert_eq!(parameter_names(&lambda), vec!["#self", "#scope"]);
    assert!(matches!(lambda.body, Expr::Label { .. }));
}

#[test]
fn empty_unit_returns_nil() {
    let lambda = lower(Vec::new());
    let all = nodes(&lambda.body);
    assert!(all.iter().any(|node| matches!(node, Expr::Goto { kind: GotoKind::Return, value: Some(value), .. } if **value == Expr::nil())));
}

#[test]
fn while_loop_with_break_value() {
    let lambda = lower(vec![build::while_(build::true_(), vec![build::break_(Some(build::int(5)))])]);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"EnterLoop"));
    assert!(names.contains(&"LeaveLoop"));

    let all = nodes(&lambda.body);
    assert!(all.iter().any(|node| matches!(node, Expr::Loop { .. })));
    assert!(all.iter().any(|node| matches!(node, Expr::Goto { kind: GotoKind::Break, .. })));
    assert!(all.iter().any(|node| matches!(node, Expr::Assign { target, .. } if target.name() == "#loop-result")));
    assert!(variable_names(&lambda).contains(&"#skip-condition"));
}

#[test]
fn nested_loops_enter_the_runtime_loop_once() {
    let inner = build::until(build::false_(), vec![build::next(None)]);
    let lambda = lower(vec![build::while_(build::true_(), vec![inner])]);
    let names = call_names(&lambda.body);
    assert_eq!(names.iter().filter(|name| **name == "EnterLoop").count(), 1);
    let all = nodes(&lambda.body);
    assert!(all.iter().any(|node| matches!(node, Expr::Goto { kind: GotoKind::Continue, .. })));
}

#[test]
fn break_outside_loop_goes_through_runtime() {
    let lambda = lower(vec![build::break_(None), build::redo()]);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"MethodBreak"));
    assert!(names.contains(&"MethodRedo"));
}

#[test]
fn method_definition_returns_through_its_own_label() {
    let lambda = lower(vec![build::def("twice", &["n"], vec![build::return_(Some(build::local("n")))])]);
    assert!(call_names(&lambda.body).contains(&"DefineMethod"));

    let method = find_lambda(&lambda.body, LambdaKind::Method);
    assert_eq!(method.name, "twice");
    assert_eq!(parameter_names(method), vec!["#self", "#block", "n"]);
    assert_ne!(method.unique_id, lambda.unique_id);
    assert!(matches!(method.body, Expr::Label { .. }));
    assert!(call_names(&method.body).contains(&"CreateMethodScope"));

    let returns_n = nodes(&method.body).into_iter().any(|node| match node {
        Expr::Goto { kind: GotoKind::Return, value: Some(value), .. } => {
            matches!(value.as_ref(), Expr::Variable(variable) if variable.name() == "n")
        }
        _ => false,
    });
    assert!(returns_n);
}

#[test]
fn call_sites_are_keyed_by_their_frame() {
    let lambda = lower(vec![build::def("greet", &[], vec![build::call("puts", vec![build::str("hi")])])]);
    let method = find_lambda(&lambda.body, LambdaKind::Method);
    let site = nodes(&method.body).into_iter().find_map(|node| match node {
        Expr::Invoke { site, .. } if site.method == "puts" => Some(site.clone()),
        _ => None,
    });
    assert_eq!(site.map(|site| site.frame_id), Some(method.unique_id));
}

#[test]
fn optional_parameters_check_the_default_marker() {
    let parameters = Parameters {
        mandatory: vec!["greeting".to_string()],
        optional: vec![("name".to_string(), build::str("you"))],
        ..Parameters::default()
    };
    let lambda = lower(vec![build::def_with("greet", parameters, vec![build::local("name")])]);
    let method = find_lambda(&lambda.body, LambdaKind::Method);
    assert_eq!(parameter_names(method), vec!["#self", "#block", "greeting", "name"]);
    let all = nodes(&method.body);
    assert!(all.iter().any(|node| matches!(node, Expr::Field { field, .. } if field.name == "DefaultArgument")));
    assert!(all.iter().any(|node| matches!(node, Expr::ReferenceEqual { .. })));
}

#[test]
fn yield_in_method_reads_block_directly() {
    let lambda = lower(vec![build::def("pair", &[], vec![build::yield_(vec![build::int(1), build::int(2)])])]);
    let method = find_lambda(&lambda.body, LambdaKind::Method);
    let names = call_names(&method.body);
    assert!(names.contains(&"CreateBfcForYield"));
    assert!(names.contains(&"Yield2"));
    assert!(names.contains(&"MethodYield"));
    assert!(names.contains(&"GetProcSelf"));
    assert!(!names.contains(&"GetMethodBlockParameter"));
}

#[test]
fn yield_in_block_goes_through_runtime_scope() {
    let block_call = build::call_with_block(
        Some(build::array(vec![build::int(1)])),
        "each",
        Vec::new(),
        &["x"],
        vec![build::yield_(vec![build::local("x")])],
    );
    let lambda = lower(vec![build::def("relay", &[], vec![block_call])]);

    let block = find_lambda(&lambda.body, LambdaKind::Block);
    assert_eq!(block.name, "block in relay");
    assert_eq!(parameter_names(block), vec!["#self", "#bfc", "x"]);

    let names = call_names(&block.body);
    assert!(names.contains(&"CreateBlockScope"));
    assert!(names.contains(&"BlockYield"));
    assert!(names.contains(&"GetMethodBlockParameter"));
    assert!(names.contains(&"GetMethodBlockParameterSelf"));
    assert!(names.contains(&"Yield1"));

    let method = find_lambda(&lambda.body, LambdaKind::Method);
    assert!(call_names(&method.body).contains(&"DefineBlock"));
}

#[test]
fn yield_with_splat_and_rhs_appends_rhs_to_splat() {
    let yielding = build::yield_splat(vec![build::int(1)], build::local("rest"), Some(build::int(2)));
    let lambda = lower(vec![build::def("store", &[], vec![yielding])]);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"YieldSplat1"));
    assert!(names.contains(&"SplatAppend"));
    assert!(names.contains(&"MakeArray1"));
}

#[test]
fn block_jumps_use_block_frame_control() {
    let block_call = build::call_with_block(None, "loop", Vec::new(), &[], vec![build::redo(), build::break_(None)]);
    let lambda = lower(vec![block_call]);
    let block = find_lambda(&lambda.body, LambdaKind::Block);
    assert_eq!(block.name, "block in <main>");
    assert!(call_names(&block.body).contains(&"BlockBreak"));
    let all = nodes(&block.body);
    assert!(all.iter().any(|node| matches!(node, Expr::Goto { kind: GotoKind::Goto, target, .. } if target.name() == "#redo")));
    assert!(all.iter().any(|node| matches!(node, Expr::Label { target, default: None } if target.name() == "#redo")));
}

#[test]
fn interpolated_strings_pick_suffixed_constructors() {
    let two_parts = build::interpolated(vec![build::lit("value: "), build::interp(build::int(1))]);
    let three_parts = build::interpolated(vec![build::lit("<"), build::interp(build::local("x")), build::lit(">")]);
    let lambda = lower(vec![build::str("plain"), two_parts, three_parts]);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"CreateMutableStringL"));
    assert!(names.contains(&"CreateMutableStringLM"));
    assert!(names.contains(&"CreateMutableStringN"));
    assert!(names.contains(&"ObjectToMutableString"));
}

#[test]
fn rescue_with_retry_restarts_the_protected_region() {
    let lambda = lower(vec![build::begin_rescue(vec![build::call("risky", Vec::new())], vec![build::retry()])]);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"EnterRescue"));
    assert!(names.contains(&"LeaveRescue"));
    assert!(names.contains(&"CompareDefaultException"));

    let all = nodes(&lambda.body);
    assert!(all.iter().any(|node| matches!(node, Expr::TryCatch { .. })));
    assert!(all.iter().any(|node| matches!(node, Expr::Goto { kind: GotoKind::Continue, target, .. } if target.name() == "#retry")));
    assert!(all.iter().any(|node| matches!(node, Expr::Assign { target, value } if target.name() == "#retrying" && **value == Expr::bool(true))));
}

#[test]
fn rescue_clauses_always_leave_the_rescue() {
    let lambda = lower(vec![build::begin_rescue(vec![build::call("risky", Vec::new())], vec![build::retry()])]);
    let finally = finally_parts(&lambda.body);
    assert!(finally.iter().any(|node| call_names(node).contains(&"LeaveRescue")));

    let clause_chain = nodes(&lambda.body)
        .into_iter()
        .find_map(|node| match node {
            Expr::TryFinally { body, .. } => Some(&**body),
            _ => None,
        })
        .expect("rescue clauses run inside a finally region");
    assert!(nodes(clause_chain).iter().any(|node| matches!(node, Expr::Goto { kind: GotoKind::Continue, .. })));
    assert!(!call_names(clause_chain).contains(&"LeaveRescue"));
}

#[test]
fn rescue_else_runs_outside_the_protected_region() {
    let begin = AstNode::new(AstNodeKind::Begin {
        body: vec![build::call("risky", Vec::new())],
        rescue_clauses: vec![RescueClause {
            exception_classes: Vec::new(),
            target: None,
            body: vec![build::call("recover", Vec::new())],
        }],
        else_body: Some(vec![build::call("else_part", Vec::new())]),
    });
    let lambda = lower(vec![begin]);
    assert!(invokes(&lambda.body, "else_part"));

    let protected = nodes(&lambda.body)
        .into_iter()
        .find(|node| matches!(node, Expr::TryCatch { .. }))
        .expect("protected region");
    assert!(invokes(protected, "risky"));
    assert!(!invokes(protected, "else_part"));
    assert!(variable_names(&lambda).contains(&"#completed"));
}

#[test]
fn compiler_markers_tag_loops_and_rescues() {
    let settings = GeneratorSettings { debug_compiler: true, ..GeneratorSettings::default() };
    let tree = SourceUnitTree::new(vec![
        build::while_(build::true_(), vec![build::break_(None)]),
        build::begin_rescue(vec![build::call("risky", Vec::new())], vec![build::nil()]),
    ]);
    let lambda = lower_with(tree, CompilerOptions::default(), settings, false);
    let markers: Vec<&Expr> = nodes(&lambda.body)
        .into_iter()
        .filter_map(|node| match node {
            Expr::Call { op, args } if op.name == "X" => args.first(),
            _ => None,
        })
        .collect();
    assert!(markers.contains(&&Expr::str("loop")));
    assert!(markers.contains(&&Expr::str("rescue")));

    let quiet = lower(vec![build::while_(build::true_(), vec![build::break_(None)])]);
    assert!(!call_names(&quiet.body).contains(&"X"));
}

#[test]
fn interactive_units_print_their_result() {
    let lambda = lower_with(
        SourceUnitTree::new(vec![build::int(42)]),
        CompilerOptions::default(),
        GeneratorSettings::default(),
        true,
    );
    assert!(call_names(&lambda.body).contains(&"PrintInteractiveResult"));
    assert!(variable_names(&lambda).contains(&"#result"));
    let all = nodes(&lambda.body);
    assert!(all.iter().any(|node| matches!(node, Expr::Invoke { site, .. } if site.method == "inspect")));
}

#[test]
fn debug_mode_emits_sequence_points() {
    let tree = SourceUnitTree::new(vec![
        build::int(1).with_span(Span::on_line(1, 0, 1)),
        build::int(2).with_span(Span::on_line(2, 0, 1)),
    ]);
    let settings = GeneratorSettings { debug_mode: true, ..GeneratorSettings::default() };
    let document = SymbolDocument::new("app.rb");
    let lambda = transform_source_unit(&tree, Some(document), SourceEncoding::Utf8, CompilerOptions::default(), settings, false);

    let points = nodes(&lambda.body)
        .into_iter()
        .filter(|node| matches!(node, Expr::DebugInfo { .. }))
        .count();
    assert_eq!(points, 2);
}

#[test]
fn eval_units_reach_binding_locals_through_the_scope() {
    let options = CompilerOptions { is_eval: true, local_names: vec!["x".to_string()], ..CompilerOptions::default() };
    let tree = SourceUnitTree::new(vec![
        build::local("x"),
        build::assign("x", build::int(2)),
        build::assign("y", build::int(3)),
        build::break_(None),
    ]);
    let lambda = lower_with(tree, options, GeneratorSettings::default(), false);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"GetLocalVariable"));
    assert!(names.contains(&"SetLocalVariable"));
    assert!(names.contains(&"EvalBreak"));
    assert!(!variable_names(&lambda).contains(&"x"));
    assert!(variable_names(&lambda).contains(&"y"));
}

#[test]
fn hosted_units_compile_known_locals() {
    let options = CompilerOptions {
        top_level_method_name: Some("define_method_body".to_string()),
        top_level_parameter_names: vec!["a".to_string(), "rest".to_string()],
        top_level_has_unsplat_parameter: true,
        local_names: vec!["x".to_string()],
        ..CompilerOptions::default()
    };
    let lambda = lower_with(SourceUnitTree::new(vec![build::local("x")]), options, GeneratorSettings::default(), false);
    assert_eq!(lambda.name, "define_method_body");
    assert_eq!(parameter_names(&lambda), vec!["#self", "#scope", "#block", "a", "rest"]);
    assert!(variable_names(&lambda).contains(&"x"));
    assert!(!call_names(&lambda.body).contains(&"GetLocalVariable"));
}

#[test]
fn tracing_hooks_frames() {
    let settings = GeneratorSettings { enable_tracing: true, ..GeneratorSettings::default() };
    let tree = SourceUnitTree::new(vec![build::def("traced", &[], vec![build::int(1)])]);
    let lambda = lower_with(tree, CompilerOptions::default(), settings, false);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"TraceTopLevelCodeFrame"));
    assert!(names.contains(&"TraceMethodCall"));
    assert!(names.contains(&"TraceMethodReturn"));

    let method = find_lambda(&lambda.body, LambdaKind::Method);
    let finally = finally_parts(&method.body);
    assert_eq!(finally.len(), 1);
    assert!(matches!(finally[0], Expr::Call { op, .. } if op.name == "TraceMethodReturn"));
}

#[test]
fn traced_method_reports_its_last_line_on_return() {
    let settings = GeneratorSettings { enable_tracing: true, ..GeneratorSettings::default() };
    let span = Span { start: Span::on_line(3, 0, 3).start, end: Span::on_line(5, 0, 3).end };
    let definition = build::def("early", &[], vec![build::return_(Some(build::int(1))), build::int(2)]).with_span(span);
    let lambda = lower_with(SourceUnitTree::new(vec![definition]), CompilerOptions::default(), settings, false);
    let method = find_lambda(&lambda.body, LambdaKind::Method);

    let returned = finally_parts(&method.body)
        .into_iter()
        .find_map(|node| match node {
            Expr::Call { op, args } if op.name == "TraceMethodReturn" => args.last(),
            _ => None,
        })
        .expect("return hook");
    assert!(matches!(returned, Expr::Constant { value: Value::Int(5), .. }));
}

#[test]
fn tracing_hooks_block_frames() {
    let settings = GeneratorSettings { enable_tracing: true, ..GeneratorSettings::default() };
    let block_call = build::call_with_block(None, "each", Vec::new(), &["x"], vec![build::break_(None), build::local("x")]);
    let lambda = lower_with(SourceUnitTree::new(vec![block_call]), CompilerOptions::default(), settings, false);
    let block = find_lambda(&lambda.body, LambdaKind::Block);
    assert!(call_names(&block.body).contains(&"TraceBlockCall"));

    let finally = finally_parts(&block.body);
    assert_eq!(finally.len(), 1);
    assert!(matches!(finally[0], Expr::Call { op, .. } if op.name == "TraceBlockReturn"));
}

#[test]
fn untraced_frames_have_no_finally() {
    let block_call = build::call_with_block(None, "each", Vec::new(), &["x"], vec![build::local("x")]);
    let lambda = lower(vec![build::def("plain", &[], vec![build::int(1)]), block_call]);
    assert!(finally_parts(&lambda.body).is_empty());
    let names = call_names(&lambda.body);
    assert!(!names.contains(&"TraceMethodReturn"));
    assert!(!names.contains(&"TraceBlockReturn"));
}

#[test]
fn file_initializers_run_before_the_body() {
    let tree = SourceUnitTree {
        initializers: vec![vec![build::assign("x", build::int(1))]],
        statements: vec![build::int(2)],
    };
    let lambda = lower_with(tree, CompilerOptions::default(), GeneratorSettings::default(), false);
    assert!(call_names(&lambda.body).contains(&"CreateFileInitializerScope"));

    let initializer_locals = nodes(&lambda.body).into_iter().any(|node| match node {
        Expr::Block { variables, .. } => variables.iter().any(|variable| variable.name() == "x"),
        _ => false,
    });
    assert!(initializer_locals);
    assert!(!variable_names(&lambda).contains(&"x"));
}

#[test]
fn module_bodies_run_inline() {
    let lambda = lower(vec![
        build::module("Tools", vec![build::int(1)]),
        build::class("Widget", Some(build::constant("Base")), Vec::new()),
        build::singleton_class(build::self_(), Vec::new()),
    ]);
    let names = call_names(&lambda.body);
    assert!(names.contains(&"DefineModule"));
    assert!(names.contains(&"DefineClass"));
    assert!(names.contains(&"DefineSingletonClass"));
    assert_eq!(names.iter().filter(|name| **name == "CreateModuleScope").count(), 3);
    assert!(lambdas(&lambda.body).is_empty());
}

#[test]
fn implicit_super_forwards_parameters_and_block() {
    let lambda = lower(vec![build::def("initialize", &["a", "b"], vec![build::zsuper()])]);
    let method = find_lambda(&lambda.body, LambdaKind::Method);
    let forwarded = nodes(&method.body).into_iter().find_map(|node| match node {
        Expr::Invoke { site, args, block, .. } if site.method == "super" => Some((args.len(), block.clone())),
        _ => None,
    });
    let (count, block) = forwarded.expect("super call");
    assert_eq!(count, 2);
    assert!(matches!(block.as_deref(), Some(Expr::Variable(variable)) if variable.name() == "#block"));
}

#[test]
fn block_given_compares_against_null() {
    let given = AstNode::new(AstNodeKind::BlockGiven);
    let lambda = lower(vec![build::def("maybe", &[], vec![build::if_(given, vec![build::int(1)], None)])]);
    let method = find_lambda(&lambda.body, LambdaKind::Method);
    let all = nodes(&method.body);
    assert!(all.iter().any(|node| matches!(node, Expr::ReferenceEqual { .. })));
    assert!(all.iter().any(|node| matches!(node, Expr::Not(_))));
}

#[test]
fn hashes_and_ranges_use_the_runtime_scope() {
    let hash = AstNode::new(AstNodeKind::Hash { maplets: vec![(build::sym("a"), build::int(1))] });
    let empty = AstNode::new(AstNodeKind::Hash { maplets: Vec::new() });
    let range = AstNode::new(AstNodeKind::Range {
        begin: build::int(1).boxed(),
        end: build::int(9).boxed(),
        exclusive: true,
    });
    let names = call_names(&lower(vec![hash, empty, range]).body);
    assert!(names.contains(&"MakeHash"));
    assert!(names.contains(&"MakeHash0"));
    assert!(names.contains(&"CreateExclusiveRange"));
}

#[test]
fn logical_operators_keep_the_deciding_operand() {
    let and = AstNode::new(AstNodeKind::And { left: build::local("a").boxed(), right: build::local("b").boxed() });
    let lambda = lower(vec![and]);
    assert!(variable_names(&lambda).contains(&"#tmp"));
    assert!(call_names(&lambda.body).contains(&"IsTrue"));
}
