//! file: core/src/ir/lower/mod.rs
//! description: the generator that lowers AST nodes into expressions.
//!
//! `AstGenerator` owns the scope stack of one unit (reachable through
//! `Deref`) and the unit-wide services node lowering relies on: debug info,
//! return targets, hidden temporaries, block-parameter reads and the
//! exception-swallowing helper. One generator lowers exactly one unit on
//! one thread.

pub mod lower_expr;
pub mod lower_literal;
pub mod lower_stmt;
pub mod result_operation;
pub mod scope;
pub mod scope_builder;
pub mod statements;

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use log::debug;

use self::scope::ScopeStack;
use crate::ast::AstNode;
use crate::config::{CompilerOptions, GeneratorSettings, SourceEncoding};
use crate::ir::expr::{Expr, ExprType, GotoKind, LabelRef, SymbolDocument, VarRef};
use crate::ir::reflection::methods;
use crate::ir::value::Value;
use crate::location::Span;

pub use self::result_operation::ResultOperation;
pub use self::scope_builder::ScopeBuilder;

/// Source path reported for units without a document.
pub const EVAL_SOURCE_PATH: &str = "(eval)";

pub struct AstGenerator {
    scopes: ScopeStack,
    document: Option<Arc<SymbolDocument>>,
    encoding: SourceEncoding,
    options: CompilerOptions,
    settings: GeneratorSettings,
    print_interactive_result: bool,
    file_initializers: Vec<Expr>,
    source_path_constant: Option<Expr>,
}

impl Deref for AstGenerator {
    type Target = ScopeStack;

    fn deref(&self) -> &ScopeStack {
        &self.scopes
    }
}

impl DerefMut for AstGenerator {
    fn deref_mut(&mut self) -> &mut ScopeStack {
        &mut self.scopes
    }
}

impl AstGenerator {
    /// Starts generation of one unit. The document is only attached when
    /// `settings.debug_mode` is on; without it no debug info is emitted.
    pub fn begin_unit(
        document: Option<Arc<SymbolDocument>>,
        encoding: SourceEncoding,
        options: CompilerOptions,
        settings: GeneratorSettings,
        print_interactive_result: bool,
    ) -> AstGenerator {
        let document = document.filter(|_| settings.debug_mode);
        debug!(
            "begin unit {} (encoding {}, eval: {}, tracing: {})",
            document.as_ref().map(|d| d.file_name.as_str()).unwrap_or(EVAL_SOURCE_PATH),
            encoding.name(),
            options.is_eval,
            settings.enable_tracing
        );
        AstGenerator {
            scopes: ScopeStack::new(),
            document,
            encoding,
            options,
            settings,
            print_interactive_result,
            file_initializers: Vec::new(),
            source_path_constant: None,
        }
    }

    pub fn compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn debug_mode(&self) -> bool {
        self.settings.debug_mode
    }

    pub fn trace_enabled(&self) -> bool {
        self.settings.enable_tracing
    }

    pub fn debug_compiler(&self) -> bool {
        self.settings.debug_compiler
    }

    pub fn print_interactive_result(&self) -> bool {
        self.print_interactive_result
    }

    pub fn encoding(&self) -> SourceEncoding {
        self.encoding
    }

    pub fn document(&self) -> Option<&Arc<SymbolDocument>> {
        self.document.as_ref()
    }

    pub fn source_path(&self) -> &str {
        match &self.document {
            Some(document) => &document.file_name,
            None => EVAL_SOURCE_PATH,
        }
    }

    /// Constant holding `source_path`; built on first use and shared afterwards.
    pub fn source_path_constant(&mut self) -> Expr {
        let path = self.source_path().to_string();
        self.source_path_constant.get_or_insert_with(|| Expr::str(path)).clone()
    }

    /// Encoding argument passed to string construction primitives.
    pub fn encoding_constant(&self) -> Expr {
        Expr::Constant { value: Value::Str(self.encoding.name().to_string()), ty: ExprType::Encoding }
    }

    pub fn add_file_initializer(&mut self, initializer: Expr) {
        self.file_initializers.push(initializer);
    }

    pub fn file_initializers(&self) -> &[Expr] {
        &self.file_initializers
    }

    pub fn take_file_initializers(&mut self) -> Vec<Expr> {
        std::mem::take(&mut self.file_initializers)
    }

    pub fn current_frame_unique_id(&self) -> u32 {
        self.current_frame().unique_id()
    }

    /// Temporary in the current variable scope.
    pub fn define_hidden_variable(&self, name: &str, ty: ExprType) -> VarRef {
        self.current_scope().data().builder_mut().define_hidden_variable(name, ty)
    }

    /// Prefixes `expression` with a sequence point for `span`.
    pub fn add_debug_info(&self, expression: Expr, span: Option<&Span>) -> Expr {
        match (&self.document, span) {
            (Some(document), Some(span)) => Expr::block(vec![
                Expr::DebugInfo { document: document.clone(), span: *span },
                expression,
            ]),
            _ => expression,
        }
    }

    pub fn clear_debug_info(&self) -> Expr {
        match &self.document {
            Some(document) => Expr::ClearDebugInfo { document: document.clone() },
            None => Expr::Empty,
        }
    }

    pub fn debug_marker(&self, marker: &str) -> Expr {
        if self.debug_compiler() {
            methods().method("X").invoke(vec![Expr::str(marker)])
        } else {
            Expr::Empty
        }
    }

    pub fn debug_mark(&self, expression: Expr, marker: &str) -> Expr {
        if self.debug_compiler() {
            Expr::block(vec![methods().method("X").invoke(vec![Expr::str(marker)]), expression])
        } else {
            expression
        }
    }

    /// Return label of the current frame, created on first request.
    pub fn return_label(&self) -> LabelRef {
        self.current_frame().frame().return_label()
    }

    /// Jump to the current frame's return label carrying `expression`.
    pub fn make_return(&self, expression: Expr) -> Expr {
        let label = self.return_label();
        let value = if label.ty() != ExprType::Void && expression.ty() == ExprType::Void {
            Expr::block(vec![expression, Expr::null(ExprType::Object)])
        } else if !label.ty().is_assignable_from(expression.ty()) {
            Expr::convert(expression, label.ty())
        } else {
            expression
        };
        Expr::goto(GotoKind::Return, &label, Some(value))
    }

    /// Places the current frame's return label around `expression`. The
    /// label is consumed: a second call for the same frame leaves its input
    /// unwrapped.
    pub fn add_return_target(&self, expression: Expr) -> Expr {
        let expression = to_object(expression);
        match self.current_frame().frame().take_return_label() {
            Some(label) => Expr::Label { target: label, default: Some(Box::new(expression)) },
            None => expression,
        }
    }

    /// Evaluates `try_expression`; if it throws, evaluates `catch_expression`
    /// instead. Either result lands in one hidden temporary, which is the
    /// value of the whole expression.
    pub fn try_catch_any(&self, try_expression: Expr, catch_expression: Expr) -> Expr {
        let variable = self.define_hidden_variable("#value", ExprType::Object);
        Expr::block(vec![
            Expr::TryCatch {
                body: Box::new(Expr::assign(&variable, to_object(try_expression))),
                handler: Box::new(Expr::assign(&variable, to_object(catch_expression))),
            },
            variable.read(),
        ])
    }

    /// Reads the block parameter of the current method. Inside the method's
    /// own lambda this is a direct variable read; from nested lambdas the
    /// runtime walks the scope chain.
    pub fn make_method_block_parameter_read(&self) -> Expr {
        let lambda_scope = self.current_lambda_scope();
        let method = self.current_method();
        match &method.block_variable {
            Some(block) if lambda_scope.is_method(method) => block.read(),
            _ => methods()
                .method("GetMethodBlockParameter")
                .invoke(vec![self.current_scope_variable().read()]),
        }
    }

    /// Reads `self` of the block passed to the current method.
    pub fn make_method_block_parameter_self_read(&self) -> Expr {
        let lambda_scope = self.current_lambda_scope();
        let method = self.current_method();
        match &method.block_variable {
            Some(block) if lambda_scope.is_method(method) => {
                methods().method("GetProcSelf").invoke(vec![block.read()])
            }
            _ => methods()
                .method("GetMethodBlockParameterSelf")
                .invoke(vec![self.current_scope_variable().read()]),
        }
    }

    pub fn transform_expressions(&mut self, arguments: &[AstNode]) -> Vec<Expr> {
        arguments.iter().map(|argument| to_object(self.transform_read(argument))).collect()
    }

    /// Flattens `key => value` pairs into alternating key and value expressions.
    pub fn transform_maplets_to_expressions(&mut self, maplets: &[(AstNode, AstNode)]) -> Vec<Expr> {
        let mut result = Vec::with_capacity(maplets.len() * 2);
        for (key, value) in maplets {
            result.push(to_object(self.transform_read(key)));
            result.push(to_object(self.transform_read(value)));
        }
        result
    }

    pub fn transform_to_hash_constructor(&mut self, maplets: &[(AstNode, AstNode)]) -> Expr {
        let items = self.transform_maplets_to_expressions(maplets);
        self.make_hash_op_call(items)
    }

    pub fn make_hash_op_call(&self, items: Vec<Expr>) -> Expr {
        let scope = self.current_scope_variable().read();
        if items.is_empty() {
            methods().method("MakeHash0").invoke(vec![scope])
        } else {
            methods().method("MakeHash").invoke(vec![scope, Expr::NewArray(items)])
        }
    }
}

/// Coerces a lowered value to the uniform object type.
pub(crate) fn to_object(expression: Expr) -> Expr {
    match expression.ty() {
        ExprType::Object => expression,
        ExprType::Void => Expr::block(vec![expression, Expr::nil()]),
        _ => Expr::convert(expression, ExprType::Object),
    }
}
