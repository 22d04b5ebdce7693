use std::sync::Arc;

use ironstone_core::config::{CompilerOptions, GeneratorSettings, SourceEncoding};
use ironstone_core::ir::expr::{Expr, ExprType, GotoKind, SymbolDocument};
use ironstone_core::ir::lower::{AstGenerator, ScopeBuilder, EVAL_SOURCE_PATH};
use ironstone_core::location::Span;

fn generator_with(document: Option<Arc<SymbolDocument>>, settings: GeneratorSettings) -> AstGenerator {
    let mut generator =
        AstGenerator::begin_unit(document, SourceEncoding::Utf8, CompilerOptions::default(), settings, false);
    let mut builder = ScopeBuilder::new();
    let self_variable = builder.define_hidden_parameter("#self", ExprType::Object);
    let scope_variable = builder.define_hidden_parameter("#scope", ExprType::Scope);
    generator.enter_source_unit(builder, self_variable, scope_variable, None, None, None);
    generator
}

fn generator() -> AstGenerator {
    generator_with(None, GeneratorSettings::default())
}

#[test]
fn return_target_wraps_only_once_per_frame() {
    let generator = generator();
    let label = generator.return_label();

    let first = generator.add_return_target(Expr::nil());
    assert_eq!(first, Expr::Label { target: label, default: Some(Box::new(Expr::nil())) });

    let second = generator.add_return_target(Expr::nil());
    assert_eq!(second, Expr::nil());
}

#[test]
fn return_target_without_label_is_passthrough() {
    let generator = generator();
    assert_eq!(generator.add_return_target(Expr::nil()), Expr::nil());
}

#[test]
fn return_target_coerces_body_to_object() {
    let generator = generator();
    let label = generator.return_label();
    let wrapped = generator.add_return_target(Expr::Empty);
    let expected = Expr::Label {
        target: label,
        default: Some(Box::new(Expr::block(vec![Expr::Empty, Expr::nil()]))),
    };
    assert_eq!(wrapped, expected);
}

#[test]
fn return_label_is_stable_until_consumed() {
    let generator = generator();
    let first = generator.return_label();
    assert_eq!(generator.return_label(), first);
    generator.add_return_target(Expr::nil());
    assert_ne!(generator.return_label(), first);
}

#[test]
fn make_return_adds_nil_for_void_values() {
    let generator = generator();
    let label = generator.return_label();
    let jump = generator.make_return(Expr::Empty);
    let expected = Expr::goto(
        GotoKind::Return,
        &label,
        Some(Expr::block(vec![Expr::Empty, Expr::null(ExprType::Object)])),
    );
    assert_eq!(jump, expected);
}

#[test]
fn try_catch_any_stores_either_outcome() {
    let generator = generator();
    let caught = generator.try_catch_any(Expr::str("risky"), Expr::nil());
    match caught {
        Expr::Block { body, .. } => {
            assert_eq!(body.len(), 2);
            match (&body[0], &body[1]) {
                (Expr::TryCatch { body: attempt, handler }, Expr::Variable(result)) => {
                    assert_eq!(result.ty(), ExprType::Object);
                    assert!(matches!(attempt.as_ref(), Expr::Assign { target, .. } if target == result));
                    assert!(matches!(handler.as_ref(), Expr::Assign { target, .. } if target == result));
                }
                other => panic!("unexpected shape: {:?}", other),
            }
        }
        other => panic!("expected a block, got {:?}", other),
    }
}

#[test]
fn debug_info_requires_document_and_debug_mode() {
    let span = Span::on_line(3, 1, 10);
    let document = SymbolDocument::new("app.rb");

    let silent = generator_with(Some(document.clone()), GeneratorSettings::default());
    assert!(silent.document().is_none());
    assert_eq!(silent.add_debug_info(Expr::nil(), Some(&span)), Expr::nil());
    assert_eq!(silent.clear_debug_info(), Expr::Empty);
    assert_eq!(silent.source_path(), EVAL_SOURCE_PATH);

    let settings = GeneratorSettings { debug_mode: true, ..GeneratorSettings::default() };
    let debugging = generator_with(Some(document.clone()), settings);
    assert_eq!(debugging.source_path(), "app.rb");
    assert_eq!(
        debugging.add_debug_info(Expr::nil(), Some(&span)),
        Expr::block(vec![Expr::DebugInfo { document: document.clone(), span }, Expr::nil()])
    );
    assert_eq!(debugging.add_debug_info(Expr::nil(), None), Expr::nil());
    assert_eq!(debugging.clear_debug_info(), Expr::ClearDebugInfo { document });
}

#[test]
fn debug_markers_follow_debug_compiler() {
    let quiet = generator();
    assert_eq!(quiet.debug_marker("here"), Expr::Empty);
    assert_eq!(quiet.debug_mark(Expr::nil(), "here"), Expr::nil());

    let settings = GeneratorSettings { debug_compiler: true, ..GeneratorSettings::default() };
    let loud = generator_with(None, settings);
    assert!(matches!(loud.debug_marker("here"), Expr::Call { op, .. } if op.name == "X"));
    assert!(matches!(loud.debug_mark(Expr::nil(), "here"), Expr::Block { .. }));
}

#[test]
fn source_path_constant_is_built_once() {
    let mut generator = generator();
    let first = generator.source_path_constant();
    assert_eq!(first, Expr::str(EVAL_SOURCE_PATH));
    assert_eq!(generator.source_path_constant(), first);
}

#[test]
fn file_initializers_start_empty() {
    let mut generator = generator();
    assert!(generator.file_initializers().is_empty());
    generator.add_file_initializer(Expr::nil());
    assert_eq!(generator.file_initializers(), &[Expr::nil()]);
}
