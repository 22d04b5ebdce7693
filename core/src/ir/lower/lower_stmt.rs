//! file: core/src/ir/lower/lower_stmt.rs
//! description: lowering of loops, rescue, jumps and definitions.
//!
//! Jumps resolve against the innermost enclosing construct: a loop first,
//! then a rescue clause (`retry` only), then the current block frame, and
//! finally the method or eval frame, where the runtime takes over.

use super::result_operation::ResultOperation;
use super::scope_builder::ScopeBuilder;
use super::{to_object, AstGenerator};
use crate::ast::{AstNode, AstNodeKind, BlockDefinition, ModuleKind, Parameters, RescueClause};
use crate::ir::expr::{Expr, ExprType, GotoKind, LabelRef, LambdaExpr, LambdaKind, VarRef};
use crate::ir::reflection::methods;
use crate::ir::value::Value;
use crate::location::Span;

/// Declares formal parameters in order: positional, then `*rest`.
fn define_parameters(builder: &mut ScopeBuilder, parameters: &Parameters) {
    for name in parameters.positional_names() {
        builder.define_parameter(name);
    }
    if let Some(rest) = &parameters.unsplat {
        builder.define_parameter(rest);
    }
}

impl AstGenerator {
    /// Line reported to tracing hooks; nodes without a span report the unit's first line.
    fn line_constant(&self, span: Option<&Span>) -> Expr {
        let line = span.map(|span| span.start.line).unwrap_or(self.compiler_options().initial_line);
        Expr::Constant { value: Value::Int(line as i64), ty: ExprType::Integer }
    }

    /// Line reported when a traced frame is left.
    fn end_line_constant(&self, span: Option<&Span>) -> Expr {
        let line = span.map(|span| span.end.line).unwrap_or(self.compiler_options().initial_line);
        Expr::Constant { value: Value::Int(line as i64), ty: ExprType::Integer }
    }

    /// `while`/`until` loop. The loop value is nil unless a `break` carries one.
    pub(crate) fn transform_while(&mut self, condition: &AstNode, body: &[AstNode], negated: bool, post_test: bool) -> Expr {
        let result = self.define_hidden_variable("#loop-result", ExprType::Object);
        let skip_condition = self.define_hidden_variable("#skip-condition", ExprType::Boolean);
        let break_label = LabelRef::new("#break", ExprType::Void);
        let continue_label = LabelRef::new("#continue", ExprType::Void);
        let is_inner_loop = self.current_loop().is_some();

        self.enter_loop(skip_condition.clone(), result.clone(), break_label.clone(), continue_label.clone());
        let body = self.transform_body(body, &ResultOperation::Ignore);
        let test = self.transform_condition(condition, !negated);
        self.leave_loop();

        let check = Expr::condition(
            skip_condition.read(),
            Expr::assign(&skip_condition, Expr::bool(false)),
            Expr::condition(test, Expr::Empty, Expr::goto(GotoKind::Break, &break_label, None), ExprType::Void),
            ExprType::Void,
        );
        let looping = Expr::Loop {
            body: Box::new(Expr::block(vec![check, body])),
            break_label: Some(break_label),
            continue_label: Some(continue_label),
        };

        let scope = self.current_scope_variable();
        let mut statements = vec![
            self.clear_debug_info(),
            self.debug_marker("loop"),
            Expr::assign(&result, Expr::nil()),
            Expr::assign(&skip_condition, Expr::bool(post_test)),
        ];
        if is_inner_loop {
            statements.push(looping);
        } else {
            statements.push(methods().method("EnterLoop").invoke(vec![scope.read()]));
            statements.push(looping);
            statements.push(methods().method("LeaveLoop").invoke(vec![scope.read()]));
        }
        statements.push(self.clear_debug_info());
        statements.push(result.read());
        Expr::block(statements)
    }

    /// `begin ... rescue ... else ... end`. The protected region runs in a
    /// loop so that `retry` from a clause restarts it. `else` runs after the
    /// region completed without an exception, outside the clauses' reach.
    pub(crate) fn transform_begin(&mut self, body: &[AstNode], rescue_clauses: &[RescueClause], else_body: Option<&[AstNode]>) -> Expr {
        let result = self.define_hidden_variable("#rescue-result", ExprType::Object);
        let store = ResultOperation::store(&result);
        let protected = self.transform_body(body, &store);
        let else_part = else_body.map(|else_body| self.transform_body(else_body, &store));

        if rescue_clauses.is_empty() {
            let mut statements = vec![protected];
            statements.extend(else_part);
            statements.push(result.read());
            return Expr::block(statements);
        }

        let retrying = self.define_hidden_variable("#retrying", ExprType::Boolean);
        let retry_label = LabelRef::new("#retry", ExprType::Void);
        let end_label = LabelRef::new("#rescue-end", ExprType::Void);
        let scope = self.current_scope_variable();

        self.enter_rescue_clause(retrying.clone(), retry_label.clone());
        let exception = methods().method("GetCurrentException").invoke(vec![scope.read()]);
        let reraise = Expr::Invoke {
            site: self.call_site("raise", false),
            receiver: Box::new(to_object(self.current_self_variable().read())),
            args: vec![to_object(exception)],
            block: None,
        };
        let mut handler = reraise;
        for clause in rescue_clauses.iter().rev() {
            let test = self.transform_rescue_test(clause, &scope);
            let body = self.transform_rescue_body(clause, &result, &scope);
            handler = Expr::condition(test, body, handler, ExprType::Void);
        }
        self.leave_rescue_clause();

        // `retry` and jumps out of a clause leave through the finally
        let handler = Expr::block(vec![
            methods().method("EnterRescue").invoke(vec![scope.read()]),
            Expr::try_finally(handler, methods().method("LeaveRescue").invoke(vec![scope.read()])),
        ]);
        let handler = self.debug_mark(handler, "rescue");

        let completed = else_part
            .as_ref()
            .map(|_| self.define_hidden_variable("#completed", ExprType::Boolean));
        let protected = match &completed {
            Some(completed) => Expr::block(vec![protected, Expr::assign(completed, Expr::bool(true))]),
            None => protected,
        };
        let looping = Expr::Loop {
            body: Box::new(Expr::block(vec![
                Expr::assign(&retrying, Expr::bool(false)),
                Expr::TryCatch { body: Box::new(protected), handler: Box::new(handler) },
                Expr::condition(
                    retrying.read(),
                    Expr::Empty,
                    Expr::goto(GotoKind::Break, &end_label, None),
                    ExprType::Void,
                ),
            ])),
            break_label: Some(end_label),
            continue_label: Some(retry_label),
        };

        match (completed, else_part) {
            (Some(completed), Some(else_part)) => Expr::block(vec![
                Expr::assign(&completed, Expr::bool(false)),
                looping,
                Expr::condition(completed.read(), else_part, Expr::Empty, ExprType::Void),
                result.read(),
            ]),
            _ => Expr::block(vec![looping, result.read()]),
        }
    }

    /// Matches the current exception against the clause's classes; a bare
    /// `rescue` matches `StandardError`.
    fn transform_rescue_test(&mut self, clause: &RescueClause, scope: &VarRef) -> Expr {
        let mut classes = clause.exception_classes.iter().rev();
        let Some(last) = classes.next() else {
            return methods().method("CompareDefaultException").invoke(vec![scope.read()]);
        };
        let mut test = self.transform_exception_match(last, scope);
        for class in classes {
            let matched = self.transform_exception_match(class, scope);
            test = Expr::condition(matched, Expr::bool(true), test, ExprType::Boolean);
        }
        test
    }

    fn transform_exception_match(&mut self, class: &AstNode, scope: &VarRef) -> Expr {
        let exception = methods().method("GetCurrentException").invoke(vec![scope.read()]);
        let class = to_object(self.transform_read(class));
        let matched = Expr::Invoke {
            site: self.call_site("===", false),
            receiver: Box::new(class),
            args: vec![to_object(exception)],
            block: None,
        };
        methods().method("IsTrue").invoke(vec![matched])
    }

    fn transform_rescue_body(&mut self, clause: &RescueClause, result: &VarRef, scope: &VarRef) -> Expr {
        let mut body = Vec::new();
        if let Some(target) = &clause.target {
            let exception = methods().method("GetCurrentException").invoke(vec![scope.read()]);
            let variable = match self.resolve_local(target) {
                Some(variable) => variable,
                None => self.current_scope().data().builder_mut().get_or_create_local(target),
            };
            body.push(Expr::assign(&variable, to_object(exception)));
        }
        body.push(self.transform_body(&clause.body, &ResultOperation::store(result)));
        Expr::block(body)
    }

    fn transform_jump_value(&mut self, value: Option<&AstNode>) -> Expr {
        match value {
            Some(value) => to_object(self.transform_read(value)),
            None => Expr::nil(),
        }
    }

    /// `break`, `next`, `redo`, `retry` and `return` as statements.
    pub(crate) fn transform_jump(&mut self, node: &AstNode) -> Expr {
        match &node.kind {
            AstNodeKind::Break { value } => self.transform_break(value.as_deref()),
            AstNodeKind::Next { value } => self.transform_next(value.as_deref()),
            AstNodeKind::Redo => self.transform_redo(),
            AstNodeKind::Retry => self.transform_retry(),
            AstNodeKind::Return { value } => self.transform_return(value.as_deref()),
            other => unreachable!("not a jump: {:?}", other),
        }
    }

    fn transform_break(&mut self, value: Option<&AstNode>) -> Expr {
        let value = self.transform_jump_value(value);
        if let Some(current) = self.current_loop() {
            return Expr::block(vec![
                Expr::assign(&current.result_variable, value),
                Expr::goto(GotoKind::Break, &current.break_label, None),
                Expr::Empty,
            ]);
        }
        if let Some(block) = self.current_block() {
            let unwound = methods().method("BlockBreak").invoke(vec![block.bfc_variable.read(), value]);
            return self.make_return(unwound);
        }
        if self.in_eval_top_level() {
            return methods().method("EvalBreak").invoke(vec![self.current_scope_variable().read(), value]);
        }
        methods().method("MethodBreak").invoke(vec![value])
    }

    fn transform_next(&mut self, value: Option<&AstNode>) -> Expr {
        let value = self.transform_jump_value(value);
        if let Some(current) = self.current_loop() {
            return Expr::block(vec![
                value,
                Expr::goto(GotoKind::Continue, &current.continue_label, None),
                Expr::Empty,
            ]);
        }
        if self.current_block().is_some() {
            return self.make_return(value);
        }
        let name = if self.in_eval_top_level() { "EvalNext" } else { "MethodNext" };
        methods().method(name).invoke(vec![self.current_scope_variable().read(), value])
    }

    fn transform_redo(&mut self) -> Expr {
        if let Some(current) = self.current_loop() {
            return Expr::block(vec![
                Expr::assign(&current.redo_variable, Expr::bool(true)),
                Expr::goto(GotoKind::Continue, &current.continue_label, None),
                Expr::Empty,
            ]);
        }
        if let Some(block) = self.current_block() {
            return Expr::block(vec![Expr::goto(GotoKind::Goto, &block.redo_label, None), Expr::Empty]);
        }
        let name = if self.in_eval_top_level() { "EvalRedo" } else { "MethodRedo" };
        methods().method(name).invoke(vec![self.current_scope_variable().read()])
    }

    fn transform_retry(&mut self) -> Expr {
        if let Some(rescue) = self.current_rescue() {
            return Expr::block(vec![
                Expr::assign(&rescue.retrying_variable, Expr::bool(true)),
                Expr::goto(GotoKind::Continue, &rescue.retry_label, None),
                Expr::Empty,
            ]);
        }
        if let Some(block) = self.current_block() {
            let retried = methods().method("BlockRetry").invoke(vec![block.bfc_variable.read()]);
            return self.make_return(retried);
        }
        let scope = self.current_scope_variable().read();
        if self.in_eval_top_level() {
            return methods().method("EvalRetry").invoke(vec![scope]);
        }
        let block = self.make_method_block_parameter_read();
        let retried = methods().method("MethodRetry").invoke(vec![scope, block]);
        self.make_return(retried)
    }

    fn transform_return(&mut self, value: Option<&AstNode>) -> Expr {
        let value = self.transform_jump_value(value);
        if let Some(block) = self.current_block() {
            let returned = methods().method("BlockReturn").invoke(vec![block.bfc_variable.read(), value]);
            return self.make_return(returned);
        }
        if self.in_eval_top_level() {
            let returned = methods()
                .method("EvalReturn")
                .invoke(vec![self.current_scope_variable().read(), value]);
            return self.make_return(returned);
        }
        self.make_return(value)
    }

    /// Optional parameters left at the runtime's default marker take the
    /// value of their default expression.
    fn transform_default_arguments(&mut self, parameters: &Parameters) -> Vec<Expr> {
        let mut initializers = Vec::with_capacity(parameters.optional.len());
        for (name, default) in &parameters.optional {
            let Some(parameter) = self.resolve_local(name) else {
                continue;
            };
            let marker = methods().field("DefaultArgument").read(None);
            let value = to_object(self.transform_read(default));
            initializers.push(Expr::condition(
                Expr::reference_equal(parameter.read(), marker),
                Expr::assign(&parameter, value),
                Expr::Empty,
                ExprType::Void,
            ));
        }
        initializers
    }

    /// Compiles a block to its own lambda and wraps it in a `DefineBlock`
    /// call evaluated in the enclosing scope.
    pub(crate) fn transform_block_definition(&mut self, block: &BlockDefinition, span: Option<&Span>) -> Expr {
        let outer_scope = self.current_scope_variable().read();
        let outer_self = to_object(self.current_self_variable().read());
        let method_name = self.current_method().method_name.clone().unwrap_or_else(|| "<main>".to_string());

        let mut builder = ScopeBuilder::new();
        let self_variable = builder.define_hidden_parameter("#self", ExprType::Object);
        let bfc = builder.define_hidden_parameter("#bfc", ExprType::BlockParam);
        define_parameters(&mut builder, &block.parameters);
        if let Some(name) = &block.parameters.block {
            builder.define_parameter(name);
        }
        let scope_variable = builder.define_hidden_variable("#scope", ExprType::Scope);
        let redo_label = LabelRef::new("#redo", ExprType::Void);

        let scope = self.enter_block_definition(builder, bfc.clone(), self_variable.clone(), scope_variable.clone(), redo_label.clone());
        let mut body = vec![Expr::assign(
            &scope_variable,
            methods().method("CreateBlockScope").invoke(vec![outer_scope.clone(), bfc.read(), self_variable.read()]),
        )];
        body.extend(self.transform_default_arguments(&block.parameters));
        let statements = Expr::block(vec![
            Expr::Label { target: redo_label, default: None },
            self.transform_body(&block.body, &ResultOperation::Return),
        ]);
        if self.trace_enabled() {
            let path = self.source_path_constant();
            body.push(methods().method("TraceBlockCall").invoke(vec![
                scope_variable.read(),
                bfc.read(),
                path.clone(),
                self.line_constant(span),
            ]));
            let traced_return = methods().method("TraceBlockReturn").invoke(vec![
                scope_variable.read(),
                bfc.read(),
                path,
                self.end_line_constant(span),
            ]);
            body.push(Expr::try_finally(statements, traced_return));
        } else {
            body.push(statements);
        }
        let body = self.add_return_target(Expr::block(body));

        let (parameters, variables) = {
            let builder = scope.variable.builder();
            (builder.parameters().to_vec(), builder.variables().to_vec())
        };
        let unique_id = scope.frame.unique_id;
        self.leave_block_definition();

        let lambda = LambdaExpr {
            kind: LambdaKind::Block,
            name: format!("block in {}", method_name),
            unique_id,
            parameters,
            variables,
            body,
        };
        methods()
            .method("DefineBlock")
            .invoke(vec![outer_scope, outer_self, Expr::Lambda(Box::new(lambda))])
    }

    /// `def [target.]name(params) ... end`.
    pub(crate) fn transform_method_definition(
        &mut self,
        target: Option<&AstNode>,
        name: &str,
        parameters: &Parameters,
        statements: &[AstNode],
        span: Option<&Span>,
    ) -> Expr {
        let outer_scope = self.current_scope_variable().read();
        let owner = match target {
            Some(target) => to_object(self.transform_read(target)),
            None => to_object(self.current_self_variable().read()),
        };

        let mut builder = ScopeBuilder::new();
        let self_parameter = builder.define_hidden_parameter("#self", ExprType::Object);
        let block_parameter = builder.define_hidden_parameter("#block", ExprType::Proc);
        define_parameters(&mut builder, parameters);
        let proc_local = parameters.block.as_ref().map(|name| builder.define_variable(name));
        let scope_variable = builder.define_hidden_variable("#scope", ExprType::Scope);

        let method = self.enter_method_definition(
            builder,
            self_parameter.clone(),
            scope_variable.clone(),
            Some(block_parameter.clone()),
            Some(name.to_string()),
            Some(parameters.clone()),
        );
        let mut prologue = vec![Expr::assign(
            &scope_variable,
            methods().method("CreateMethodScope").invoke(vec![
                outer_scope.clone(),
                Expr::str(name),
                self_parameter.read(),
                block_parameter.read(),
            ]),
        )];
        if let Some(local) = proc_local {
            prologue.push(Expr::assign(&local, to_object(block_parameter.read())));
        }
        prologue.extend(self.transform_default_arguments(parameters));
        let body = if self.trace_enabled() {
            let path = self.source_path_constant();
            prologue.push(methods().method("TraceMethodCall").invoke(vec![
                scope_variable.read(),
                path.clone(),
                self.line_constant(span),
            ]));
            let traced_return = methods().method("TraceMethodReturn").invoke(vec![
                scope_variable.read(),
                path,
                self.end_line_constant(span),
            ]);
            let statements = self.transform_body(statements, &ResultOperation::Return);
            prologue.push(Expr::try_finally(statements, traced_return));
            Expr::block(prologue)
        } else {
            self.transform_statements(Some(Expr::block(prologue)), statements, None, &ResultOperation::Return)
        };
        let body = self.add_return_target(body);

        let (lambda_parameters, variables) = {
            let builder = method.variable.builder();
            (builder.parameters().to_vec(), builder.variables().to_vec())
        };
        let unique_id = method.frame.unique_id;
        self.leave_method_definition();

        let lambda = LambdaExpr {
            kind: LambdaKind::Method,
            name: name.to_string(),
            unique_id,
            parameters: lambda_parameters,
            variables,
            body,
        };
        methods()
            .method("DefineMethod")
            .invoke(vec![owner, outer_scope, Expr::Lambda(Box::new(lambda))])
    }

    /// `module`, `class` and `class << target` bodies run inline with the
    /// module as `self`; their value is the value of the last statement.
    pub(crate) fn transform_module_definition(&mut self, kind: &ModuleKind, statements: &[AstNode]) -> Expr {
        let outer_scope = self.current_scope_variable().read();
        let definition = match kind {
            ModuleKind::Module { name } => methods().method("DefineModule").invoke(vec![
                outer_scope.clone(),
                Expr::null(ExprType::Object),
                Expr::str(name.as_str()),
            ]),
            ModuleKind::Class { name, superclass } => {
                let superclass = match superclass {
                    Some(superclass) => to_object(self.transform_read(superclass)),
                    None => Expr::null(ExprType::Object),
                };
                methods().method("DefineClass").invoke(vec![
                    outer_scope.clone(),
                    Expr::null(ExprType::Object),
                    Expr::str(name.as_str()),
                    superclass,
                ])
            }
            ModuleKind::Singleton { target } => {
                let target = to_object(self.transform_read(target));
                methods().method("DefineSingletonClass").invoke(vec![outer_scope.clone(), target])
            }
        };
        let result = self.define_hidden_variable("#module-result", ExprType::Object);

        let mut builder = ScopeBuilder::new();
        let module_variable = builder.define_hidden_variable("#module", ExprType::Module);
        let scope_variable = builder.define_hidden_variable("#scope", ExprType::Scope);
        let is_singleton = matches!(kind, ModuleKind::Singleton { .. });
        let module = self.enter_module_definition(builder, module_variable.clone(), scope_variable.clone(), is_singleton);
        let body = self.transform_body(statements, &ResultOperation::store(&result));
        let variables = module.variable.builder().variables().to_vec();
        self.leave_module_definition();

        Expr::Block {
            variables,
            body: vec![
                Expr::assign(&module_variable, definition),
                Expr::assign(
                    &scope_variable,
                    methods().method("CreateModuleScope").invoke(vec![outer_scope, module_variable.read()]),
                ),
                body,
                result.read(),
            ],
        }
    }

    /// `BEGIN { }` block: runs before the unit body in a scope of its own
    /// that shares the unit's `self`.
    pub fn transform_file_initializer(&mut self, statements: &[AstNode]) {
        let outer_scope = self.current_scope_variable().read();
        let self_variable = self.current_self_variable();

        let mut builder = ScopeBuilder::new();
        let scope_variable = builder.define_hidden_variable("#scope", ExprType::Scope);
        let scope = self.enter_file_initializer(builder, self_variable, scope_variable.clone());
        let body = self.transform_body(statements, &ResultOperation::Ignore);
        let variables = scope.variable.builder().variables().to_vec();
        self.leave_file_initializer();

        self.add_file_initializer(Expr::Block {
            variables,
            body: vec![
                Expr::assign(
                    &scope_variable,
                    methods().method("CreateFileInitializerScope").invoke(vec![outer_scope]),
                ),
                body,
            ],
        });
    }
}
