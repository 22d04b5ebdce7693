pub mod expr;
pub mod lower;
pub mod reflection;
pub mod value;

use std::sync::Arc;

use log::debug;

use self::expr::{Expr, ExprType, LambdaExpr, LambdaKind, SymbolDocument};
use self::lower::{to_object, AstGenerator, ResultOperation, ScopeBuilder};
use self::reflection::methods;
use crate::ast::{Parameters, SourceUnitTree};
use crate::config::{CompilerOptions, GeneratorSettings, SourceEncoding};

/// Name of the top-level lambda when the unit is not compiled as a method.
pub const TOP_LEVEL_NAME: &str = "<main>";

/// Lowers one parsed source unit into its top-level lambda.
///
/// `BEGIN { }` initializers run first, then the body. With
/// `print_interactive_result` the value of the last statement is printed
/// through the runtime before the lambda returns it.
pub fn transform_source_unit(
    tree: &SourceUnitTree,
    document: Option<Arc<SymbolDocument>>,
    encoding: SourceEncoding,
    options: CompilerOptions,
    settings: GeneratorSettings,
    print_interactive_result: bool,
) -> LambdaExpr {
    let mut generator = AstGenerator::begin_unit(document, encoding, options, settings, print_interactive_result);

    let (builder, self_parameter, scope_variable, block_parameter, parameters) =
        top_level_builder(generator.compiler_options());
    let method_name = generator.compiler_options().top_level_method_name.clone();
    let top = generator.enter_source_unit(
        builder,
        self_parameter,
        scope_variable.clone(),
        block_parameter,
        method_name.clone(),
        parameters,
    );

    for initializer in &tree.initializers {
        generator.transform_file_initializer(initializer);
    }

    let prologue = if generator.trace_enabled() {
        Some(methods().method("TraceTopLevelCodeFrame").invoke(vec![
            scope_variable.read(),
            Expr::null(ExprType::Exception),
        ]))
    } else {
        None
    };

    let body = if generator.print_interactive_result() {
        let result = generator.define_hidden_variable("#result", ExprType::Object);
        let inspect = Expr::Invoke {
            site: generator.call_site("inspect", false),
            receiver: Box::new(result.read()),
            args: Vec::new(),
            block: None,
        };
        let epilogue = methods()
            .method("PrintInteractiveResult")
            .invoke(vec![scope_variable.read(), inspect]);
        let statements = generator.transform_statements(
            prologue,
            &tree.statements,
            Some(epilogue),
            &ResultOperation::store(&result),
        );
        Expr::block(vec![statements, result.read()])
    } else {
        generator.transform_statements(prologue, &tree.statements, None, &ResultOperation::Return)
    };

    let mut sequence = generator.take_file_initializers();
    let has_initializers = !sequence.is_empty();
    sequence.push(to_object(body));
    let body = if has_initializers { Expr::block(sequence) } else { sequence.remove(0) };
    let body = generator.add_return_target(body);

    let (lambda_parameters, variables) = {
        let builder = top.variable.builder();
        (builder.parameters().to_vec(), builder.variables().to_vec())
    };
    let unique_id = top.frame.unique_id;
    generator.leave_source_unit();
    debug!("source unit lowered into frame #{} ({} locals)", unique_id, variables.len());

    LambdaExpr {
        kind: LambdaKind::TopLevel,
        name: method_name.unwrap_or_else(|| TOP_LEVEL_NAME.to_string()),
        unique_id,
        parameters: lambda_parameters,
        variables,
        body,
    }
}

type TopLevelFrame = (
    ScopeBuilder,
    expr::VarRef,
    expr::VarRef,
    Option<expr::VarRef>,
    Option<Parameters>,
);

/// Parameters and locals of the top-level frame. Eval units reach the
/// enclosing binding's locals through the runtime scope, so those are only
/// compiled as locals for hosted and main code.
fn top_level_builder(options: &CompilerOptions) -> TopLevelFrame {
    let mut builder = ScopeBuilder::new();
    let self_parameter = builder.define_hidden_parameter("#self", ExprType::Object);
    let scope_variable = builder.define_hidden_parameter("#scope", ExprType::Scope);
    let block_parameter = options
        .top_level_method_name
        .as_ref()
        .map(|_| builder.define_hidden_parameter("#block", ExprType::Proc));

    let mut parameters = None;
    if !options.top_level_parameter_names.is_empty() {
        let names = &options.top_level_parameter_names;
        let mut declared = Parameters::default();
        for (index, name) in names.iter().enumerate() {
            builder.define_parameter(name);
            if options.top_level_has_unsplat_parameter && index + 1 == names.len() {
                declared.unsplat = Some(name.clone());
            } else {
                declared.mandatory.push(name.clone());
            }
        }
        parameters = Some(declared);
    }

    if !options.is_eval {
        for name in &options.local_names {
            builder.get_or_create_local(name);
        }
    }
    (builder, self_parameter, scope_variable, block_parameter, parameters)
}
