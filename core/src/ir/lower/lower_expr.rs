//! file: core/src/ir/lower/lower_expr.rs
//! description: lowering of expression nodes.
//!
//! Every node can be lowered four ways: as a value (`transform_read`), as a
//! discarded statement (`transform`), as the last statement of a body with a
//! `ResultOperation` applied (`transform_result`), and as a truth test
//! (`transform_condition`). Control-flow and definition nodes live in
//! `lower_stmt`; literals in `lower_literal`.

use super::result_operation::ResultOperation;
use super::scope::VariableScopeRef;
use super::{to_object, AstGenerator};
use crate::ast::{AstNode, AstNodeKind, BlockDefinition, Parameters};
use crate::ir::expr::{CallSite, Expr, ExprType, VarRef};
use crate::ir::reflection::methods;
use crate::ir::value::Value;
use crate::location::Span;

impl AstGenerator {
    /// Lowers `node` as a statement whose value is discarded.
    pub fn transform(&mut self, node: &AstNode) -> Expr {
        let expression = match &node.kind {
            AstNodeKind::Break { .. }
            | AstNodeKind::Next { .. }
            | AstNodeKind::Redo
            | AstNodeKind::Retry
            | AstNodeKind::Return { .. } => self.transform_jump(node),
            AstNodeKind::If { condition, body, else_body, negated } => {
                self.transform_if_statement(condition, body, else_body.as_deref(), *negated)
            }
            _ => self.transform_read(node),
        };
        self.add_debug_info(expression, node.get_span())
    }

    /// Lowers `node` as the last statement of a body: its value is stored
    /// or returned per `result_operation`.
    pub fn transform_result(&mut self, node: &AstNode, result_operation: &ResultOperation) -> Expr {
        match &node.kind {
            // jumps never produce a value to dispose of
            AstNodeKind::Break { .. }
            | AstNodeKind::Next { .. }
            | AstNodeKind::Redo
            | AstNodeKind::Retry
            | AstNodeKind::Return { .. } => return self.transform(node),
            AstNodeKind::If { condition, body, else_body, negated } => {
                let test = self.transform_condition(condition, !*negated);
                let if_true = self.transform_body(body, result_operation);
                let if_false = self.transform_body(else_body.as_deref().unwrap_or(&[]), result_operation);
                let expression = Expr::condition(test, if_true, if_false, ExprType::Void);
                return self.add_debug_info(expression, node.get_span());
            }
            _ => {}
        }

        let value = self.transform_read(node);
        let statement = match result_operation.variable() {
            Some(variable) => Expr::assign(variable, Expr::convert_if_needed(value, variable.ty())),
            None => self.make_return(value),
        };
        self.add_debug_info(statement, node.get_span())
    }

    /// Truth test of `node`; `positive == false` tests for falsiness.
    pub fn transform_condition(&mut self, node: &AstNode, positive: bool) -> Expr {
        match &node.kind {
            AstNodeKind::True => Expr::bool(positive),
            AstNodeKind::False | AstNodeKind::Nil => Expr::bool(!positive),
            AstNodeKind::Not { operand } => self.transform_condition(operand, !positive),
            AstNodeKind::BlockGiven => {
                let given = self.transform_read(node);
                if positive { given } else { Expr::not(given) }
            }
            _ => {
                let value = to_object(self.transform_read_step(node));
                let name = if positive { "IsTrue" } else { "IsFalse" };
                methods().method(name).invoke(vec![value])
            }
        }
    }

    /// Value of the last statement of a parenthesized body or condition.
    pub fn transform_read_step(&mut self, node: &AstNode) -> Expr {
        self.transform_read(node)
    }

    /// Lowers `node` to an expression producing its value.
    pub fn transform_read(&mut self, node: &AstNode) -> Expr {
        match &node.kind {
            AstNodeKind::Nil => Expr::nil(),
            AstNodeKind::True => Expr::bool(true),
            AstNodeKind::False => Expr::bool(false),
            AstNodeKind::SelfRef => self.current_self_variable().read(),
            AstNodeKind::Integer { value } => Expr::constant(Value::Int(*value)),
            AstNodeKind::Float { value } => Expr::constant(Value::Float(*value)),
            AstNodeKind::String { parts } => self.transform_string_literal(parts),
            AstNodeKind::Symbol { parts } => self.transform_symbol_literal(parts),
            AstNodeKind::Regex { parts, options } => self.transform_regex_literal(parts, *options),
            AstNodeKind::Array { items } => self.transform_array_literal(items),
            AstNodeKind::Hash { maplets } => self.transform_to_hash_constructor(maplets),
            AstNodeKind::Range { begin, end, exclusive } => self.transform_range_literal(begin, end, *exclusive),

            AstNodeKind::LocalVariable { name } => self.transform_local_read(name),
            AstNodeKind::LocalAssignment { name, value } => self.transform_local_write(name, value),
            AstNodeKind::InstanceVariable { name } => methods().method("GetInstanceVariable").invoke(vec![
                self.current_scope_variable().read(),
                to_object(self.current_self_variable().read()),
                Expr::str(name.as_str()),
            ]),
            AstNodeKind::InstanceAssignment { name, value } => {
                let value = to_object(self.transform_read(value));
                methods().method("SetInstanceVariable").invoke(vec![
                    value,
                    to_object(self.current_self_variable().read()),
                    self.current_scope_variable().read(),
                    Expr::str(name.as_str()),
                ])
            }
            AstNodeKind::GlobalVariable { name } => self.transform_scoped_read("GetGlobalVariable", name),
            AstNodeKind::GlobalAssignment { name, value } => self.transform_scoped_write("SetGlobalVariable", name, value),
            AstNodeKind::ClassVariable { name } => self.transform_scoped_read("GetClassVariable", name),
            AstNodeKind::ClassVariableAssignment { name, value } => {
                self.transform_scoped_write("SetClassVariable", name, value)
            }
            AstNodeKind::Constant { name, is_global } => methods().method("GetUnqualifiedConstant").invoke(vec![
                self.current_scope_variable().read(),
                Expr::str(name.as_str()),
                Expr::bool(*is_global),
            ]),

            AstNodeKind::And { left, right } => self.transform_logical(left, right, true),
            AstNodeKind::Or { left, right } => self.transform_logical(left, right, false),
            AstNodeKind::Not { operand } => self.transform_condition(operand, false),
            AstNodeKind::If { condition, body, else_body, negated } => {
                let test = self.transform_condition(condition, !*negated);
                let if_true = self.transform_branch(Some(body.as_slice()));
                let if_false = self.transform_branch(else_body.as_deref());
                Expr::condition(test, if_true, if_false, ExprType::Object)
            }
            AstNodeKind::Parenthesized { statements } => self.transform_branch(Some(statements.as_slice())),
            AstNodeKind::While { condition, body, negated, post_test } => {
                self.transform_while(condition, body, *negated, *post_test)
            }
            AstNodeKind::Begin { body, rescue_clauses, else_body } => {
                self.transform_begin(body, rescue_clauses, else_body.as_deref())
            }

            AstNodeKind::Break { .. }
            | AstNodeKind::Next { .. }
            | AstNodeKind::Redo
            | AstNodeKind::Retry
            | AstNodeKind::Return { .. } => Expr::block(vec![self.transform_jump(node), Expr::nil()]),

            AstNodeKind::Yield { args, splat, rhs } => self.transform_yield(args, splat.as_deref(), rhs.as_deref()),
            AstNodeKind::BlockGiven => {
                let block = self.make_method_block_parameter_read();
                Expr::not(Expr::reference_equal(block, Expr::null(ExprType::Proc)))
            }
            AstNodeKind::MethodCall { receiver, name, args, splat, block } => {
                let block = block.as_deref();
                self.transform_method_call(receiver.as_deref(), name, args, splat.as_deref(), block, node.get_span())
            }
            AstNodeKind::Super { args, block } => self.transform_super(args.as_deref(), block.as_deref(), node.get_span()),
            AstNodeKind::MethodDefinition { target, name, parameters, body } => {
                self.transform_method_definition(target.as_deref(), name, parameters, body, node.get_span())
            }
            AstNodeKind::ModuleDefinition { kind, body } => self.transform_module_definition(kind, body),
        }
    }

    pub(crate) fn transform_branch(&mut self, statements: Option<&[AstNode]>) -> Expr {
        match self.transform_statements_to_expression(statements) {
            Some(value) => to_object(value),
            None => Expr::nil(),
        }
    }

    fn transform_if_statement(&mut self, condition: &AstNode, body: &[AstNode], else_body: Option<&[AstNode]>, negated: bool) -> Expr {
        let test = self.transform_condition(condition, !negated);
        let if_true = self.transform_body(body, &ResultOperation::Ignore);
        let if_false = self.transform_body(else_body.unwrap_or(&[]), &ResultOperation::Ignore);
        Expr::condition(test, if_true, if_false, ExprType::Void)
    }

    /// `left && right` / `left || right` keeping the deciding operand's value.
    fn transform_logical(&mut self, left: &AstNode, right: &AstNode, is_conjunction: bool) -> Expr {
        let temp = self.define_hidden_variable("#tmp", ExprType::Object);
        let left = to_object(self.transform_read(left));
        let right = to_object(self.transform_read(right));
        let test = methods().method("IsTrue").invoke(vec![Expr::assign(&temp, left)]);
        if is_conjunction {
            Expr::condition(test, right, temp.read(), ExprType::Object)
        } else {
            Expr::condition(test, temp.read(), right, ExprType::Object)
        }
    }

    /// Finds a compiled local visible from the current scope. Blocks see the
    /// locals of their enclosing scopes; methods, modules and file
    /// initializers start a fresh local namespace.
    pub fn resolve_local(&self, name: &str) -> Option<VarRef> {
        let mut scope = Some(self.current_scope().clone());
        while let Some(current) = scope {
            if let Some(variable) = current.data().builder().lookup_local(name) {
                return Some(variable);
            }
            scope = match &current {
                VariableScopeRef::Block(_) => current.data().parent_variable_scope.clone(),
                _ => None,
            };
        }
        None
    }

    fn transform_local_read(&mut self, name: &str) -> Expr {
        match self.resolve_local(name) {
            Some(variable) => variable.read(),
            None => self.transform_scoped_read("GetLocalVariable", name),
        }
    }

    fn transform_local_write(&mut self, name: &str, value: &AstNode) -> Expr {
        let value = to_object(self.transform_read(value));
        let variable = match self.resolve_local(name) {
            Some(variable) => variable,
            None if self.is_binding_local(name) => {
                return methods().method("SetLocalVariable").invoke(vec![
                    value,
                    self.current_scope_variable().read(),
                    Expr::str(name),
                ]);
            }
            None => self.current_scope().data().builder_mut().get_or_create_local(name),
        };
        Expr::assign(&variable, value)
    }

    /// Locals of an enclosing binding (eval) live in the runtime scope.
    fn is_binding_local(&self, name: &str) -> bool {
        self.compiler_options().is_eval && self.compiler_options().local_names.iter().any(|local| local == name)
    }

    fn transform_scoped_read(&mut self, primitive: &str, name: &str) -> Expr {
        methods()
            .method(primitive)
            .invoke(vec![self.current_scope_variable().read(), Expr::str(name)])
    }

    fn transform_scoped_write(&mut self, primitive: &str, name: &str, value: &AstNode) -> Expr {
        let value = to_object(self.transform_read(value));
        methods()
            .method(primitive)
            .invoke(vec![value, self.current_scope_variable().read(), Expr::str(name)])
    }

    pub(crate) fn call_site(&self, method: &str, has_splat: bool) -> CallSite {
        CallSite { method: method.to_string(), frame_id: self.current_frame_unique_id(), has_splat }
    }

    fn transform_method_call(
        &mut self,
        receiver: Option<&AstNode>,
        name: &str,
        args: &[AstNode],
        splat: Option<&AstNode>,
        block: Option<&BlockDefinition>,
        span: Option<&Span>,
    ) -> Expr {
        let receiver = match receiver {
            Some(receiver) => to_object(self.transform_read(receiver)),
            None => to_object(self.current_self_variable().read()),
        };
        let mut arguments = self.transform_expressions(args);
        if let Some(splat) = splat {
            let value = to_object(self.transform_read(splat));
            arguments.push(methods().method("Splat").invoke(vec![value]));
        }
        let site = self.call_site(name, splat.is_some());
        let block = block.map(|block| Box::new(self.transform_block_definition(block, span)));
        Expr::Invoke { site, receiver: Box::new(receiver), args: arguments, block }
    }

    /// `super`; without explicit arguments the current method's parameters
    /// are forwarded. A block is passed explicitly or forwarded from the method.
    fn transform_super(&mut self, args: Option<&[AstNode]>, block: Option<&BlockDefinition>, span: Option<&Span>) -> Expr {
        let (arguments, has_splat) = match args {
            Some(args) => (self.transform_expressions(args), false),
            None => {
                let parameters = self.current_method().parameters.clone();
                match parameters {
                    Some(parameters) => self.forwarded_arguments(&parameters),
                    None => (Vec::new(), false),
                }
            }
        };
        let block = match block {
            Some(block) => self.transform_block_definition(block, span),
            None => self.make_method_block_parameter_read(),
        };
        let site = self.call_site("super", has_splat);
        let receiver = to_object(self.current_self_variable().read());
        Expr::Invoke { site, receiver: Box::new(receiver), args: arguments, block: Some(Box::new(block)) }
    }

    fn forwarded_arguments(&mut self, parameters: &Parameters) -> (Vec<Expr>, bool) {
        let mut arguments: Vec<Expr> = parameters
            .positional_names()
            .into_iter()
            .map(|name| self.transform_local_read(name))
            .collect();
        if let Some(rest) = &parameters.unsplat {
            let value = self.transform_local_read(rest);
            arguments.push(methods().method("Splat").invoke(vec![value]));
        }
        (arguments, parameters.unsplat.is_some())
    }

    /// `yield`: picks the primitive by arity, passes the block's `self` and a
    /// fresh block-frame-control handle, and returns from the current frame
    /// when the block requested it.
    fn transform_yield(&mut self, args: &[AstNode], splat: Option<&AstNode>, rhs: Option<&AstNode>) -> Expr {
        let block = self.make_method_block_parameter_read();
        let block_self = self.make_method_block_parameter_self_read();
        let bfc = self.define_hidden_variable("#yielded-bfc", ExprType::BlockParam);
        let result = self.define_hidden_variable("#yield-result", ExprType::Object);

        let mut positional = self.transform_expressions(args);
        let splat = splat.map(|splat| {
            let value = to_object(self.transform_read(splat));
            methods().method("Splat").invoke(vec![value])
        });
        let rhs = rhs.map(|rhs| to_object(self.transform_read(rhs)));
        let dispatch = methods().yield_dispatch(positional.len(), splat.is_some(), rhs.is_some());

        let mut arguments = Vec::new();
        match (splat, rhs) {
            (Some(splat), Some(rhs)) if dispatch.has_rhs_slot => {
                arguments.push(Expr::NewArray(positional));
                arguments.push(splat);
                arguments.push(rhs);
            }
            (Some(splat), rhs) => {
                arguments.extend(pack(positional, dispatch.has_argument_array));
                let splat = match rhs {
                    Some(rhs) => {
                        let tail = methods().make_array(1).invoke(vec![rhs]);
                        methods().method("SplatAppend").invoke(vec![splat, to_object(tail)])
                    }
                    None => splat,
                };
                arguments.push(splat);
            }
            (None, rhs) => {
                positional.extend(rhs);
                arguments.extend(pack(positional, dispatch.has_argument_array));
            }
        }
        arguments.push(block.clone());
        arguments.push(block_self);
        arguments.push(bfc.read());

        let scope = self.current_scope_variable().read();
        let should_return = match self.current_block() {
            Some(current) => methods().method("BlockYield").invoke(vec![
                scope,
                current.bfc_variable.read(),
                bfc.read(),
                result.read(),
            ]),
            None if self.in_eval_top_level() => {
                methods().method("EvalYield").invoke(vec![scope, bfc.read(), result.read()])
            }
            None => methods().method("MethodYield").invoke(vec![scope, bfc.read(), result.read()]),
        };

        Expr::block(vec![
            Expr::assign(&bfc, methods().method("CreateBfcForYield").invoke(vec![block])),
            Expr::assign(&result, dispatch.op.invoke(arguments)),
            Expr::condition(should_return, self.make_return(result.read()), Expr::Empty, ExprType::Void),
            result.read(),
        ])
    }

    /// True while lowering the top-level frame of an eval unit.
    pub(crate) fn in_eval_top_level(&self) -> bool {
        if !self.compiler_options().is_eval {
            return false;
        }
        match (self.top_level_scope(), self.try_current_method()) {
            (Some(top), Some(method)) => std::rc::Rc::ptr_eq(top, method),
            _ => false,
        }
    }
}

/// Packs positional arguments into one object array when the primitive takes one.
fn pack(positional: Vec<Expr>, has_argument_array: bool) -> Vec<Expr> {
    if has_argument_array {
        vec![Expr::NewArray(positional)]
    } else {
        positional
    }
}
