//! file: core/src/ast/build.rs
//! description: shorthand constructors for AST nodes.
//!
//! Used by drivers that synthesize code and by tests; a parser builds the
//! same nodes with spans attached.

use super::kind::{AstNodeKind, BlockDefinition, ModuleKind, Parameters, RescueClause, StringPart};
use super::node::AstNode;

pub fn nil() -> AstNode {
    AstNode::new(AstNodeKind::Nil)
}

pub fn true_() -> AstNode {
    AstNode::new(AstNodeKind::True)
}

pub fn false_() -> AstNode {
    AstNode::new(AstNodeKind::False)
}

pub fn self_() -> AstNode {
    AstNode::new(AstNodeKind::SelfRef)
}

pub fn int(value: i64) -> AstNode {
    AstNode::new(AstNodeKind::Integer { value })
}

pub fn float(value: f64) -> AstNode {
    AstNode::new(AstNodeKind::Float { value })
}

pub fn str(text: &str) -> AstNode {
    AstNode::new(AstNodeKind::String { parts: vec![StringPart::Literal(text.to_string())] })
}

pub fn interpolated(parts: Vec<StringPart>) -> AstNode {
    AstNode::new(AstNodeKind::String { parts })
}

pub fn sym(name: &str) -> AstNode {
    AstNode::new(AstNodeKind::Symbol { parts: vec![StringPart::Literal(name.to_string())] })
}

pub fn lit(text: &str) -> StringPart {
    StringPart::Literal(text.to_string())
}

pub fn interp(node: AstNode) -> StringPart {
    StringPart::Interpolation(node)
}

pub fn array(items: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::Array { items })
}

pub fn local(name: &str) -> AstNode {
    AstNode::new(AstNodeKind::LocalVariable { name: name.to_string() })
}

pub fn assign(name: &str, value: AstNode) -> AstNode {
    AstNode::new(AstNodeKind::LocalAssignment { name: name.to_string(), value: value.boxed() })
}

pub fn ivar(name: &str) -> AstNode {
    AstNode::new(AstNodeKind::InstanceVariable { name: name.to_string() })
}

pub fn constant(name: &str) -> AstNode {
    AstNode::new(AstNodeKind::Constant { name: name.to_string(), is_global: false })
}

pub fn not(operand: AstNode) -> AstNode {
    AstNode::new(AstNodeKind::Not { operand: operand.boxed() })
}

pub fn if_(condition: AstNode, body: Vec<AstNode>, else_body: Option<Vec<AstNode>>) -> AstNode {
    AstNode::new(AstNodeKind::If { condition: condition.boxed(), body, else_body, negated: false })
}

pub fn unless(condition: AstNode, body: Vec<AstNode>, else_body: Option<Vec<AstNode>>) -> AstNode {
    AstNode::new(AstNodeKind::If { condition: condition.boxed(), body, else_body, negated: true })
}

pub fn while_(condition: AstNode, body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::While { condition: condition.boxed(), body, negated: false, post_test: false })
}

pub fn until(condition: AstNode, body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::While { condition: condition.boxed(), body, negated: true, post_test: false })
}

pub fn break_(value: Option<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::Break { value: value.map(AstNode::boxed) })
}

pub fn next(value: Option<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::Next { value: value.map(AstNode::boxed) })
}

pub fn redo() -> AstNode {
    AstNode::new(AstNodeKind::Redo)
}

pub fn retry() -> AstNode {
    AstNode::new(AstNodeKind::Retry)
}

pub fn return_(value: Option<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::Return { value: value.map(AstNode::boxed) })
}

pub fn yield_(args: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::Yield { args, splat: None, rhs: None })
}

pub fn yield_splat(args: Vec<AstNode>, splat: AstNode, rhs: Option<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::Yield { args, splat: Some(splat.boxed()), rhs: rhs.map(AstNode::boxed) })
}

pub fn begin_rescue(body: Vec<AstNode>, rescue_body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::Begin {
        body,
        rescue_clauses: vec![RescueClause { exception_classes: Vec::new(), target: None, body: rescue_body }],
        else_body: None,
    })
}

/// Receiverless call.
pub fn call(name: &str, args: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::MethodCall { receiver: None, name: name.to_string(), args, splat: None, block: None })
}

pub fn send(receiver: AstNode, name: &str, args: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::MethodCall {
        receiver: Some(receiver.boxed()),
        name: name.to_string(),
        args,
        splat: None,
        block: None,
    })
}

pub fn call_with_block(receiver: Option<AstNode>, name: &str, args: Vec<AstNode>, params: &[&str], body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::MethodCall {
        receiver: receiver.map(AstNode::boxed),
        name: name.to_string(),
        args,
        splat: None,
        block: Some(Box::new(BlockDefinition { parameters: Parameters::new(params), body })),
    })
}

pub fn def(name: &str, params: &[&str], body: Vec<AstNode>) -> AstNode {
    def_with(name, Parameters::new(params), body)
}

pub fn def_with(name: &str, parameters: Parameters, body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::MethodDefinition { target: None, name: name.to_string(), parameters, body })
}

pub fn module(name: &str, body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::ModuleDefinition { kind: ModuleKind::Module { name: name.to_string() }, body })
}

pub fn class(name: &str, superclass: Option<AstNode>, body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::ModuleDefinition {
        kind: ModuleKind::Class { name: name.to_string(), superclass: superclass.map(AstNode::boxed) },
        body,
    })
}

pub fn singleton_class(target: AstNode, body: Vec<AstNode>) -> AstNode {
    AstNode::new(AstNodeKind::ModuleDefinition { kind: ModuleKind::Singleton { target: target.boxed() }, body })
}

/// `super` forwarding the current method's parameters.
pub fn zsuper() -> AstNode {
    AstNode::new(AstNodeKind::Super { args: None, block: None })
}
