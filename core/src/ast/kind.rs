//! file: core/src/ast/kind.rs
//! description: AST node kinds handed to the generator by the parser.
//!
//! The parser is an external collaborator; these types only carry what
//! lowering needs. Statement lists are plain `Vec<AstNode>`.
//!
use super::node::AstNode;

/// One piece of a string, symbol or regex literal.
#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Literal(String),
    /// `#{...}` interpolation.
    Interpolation(AstNode),
}

/// Formal parameters of a method or block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    pub mandatory: Vec<String>,
    /// Optional parameters with their default value expressions.
    pub optional: Vec<(String, AstNode)>,
    /// `*rest`
    pub unsplat: Option<String>,
    /// `&block`
    pub block: Option<String>,
}

impl Parameters {
    pub fn new(mandatory: &[&str]) -> Self {
        Parameters { mandatory: mandatory.iter().map(|s| s.to_string()).collect(), ..Parameters::default() }
    }

    /// Names of mandatory, optional and rest parameters in declaration order.
    pub fn positional_names(&self) -> Vec<&str> {
        self.mandatory
            .iter()
            .map(String::as_str)
            .chain(self.optional.iter().map(|(name, _)| name.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RescueClause {
    /// Empty means `StandardError`.
    pub exception_classes: Vec<AstNode>,
    /// `=> name`
    pub target: Option<String>,
    pub body: Vec<AstNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockDefinition {
    pub parameters: Parameters,
    pub body: Vec<AstNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleKind {
    Module { name: String },
    Class { name: String, superclass: Option<Box<AstNode>> },
    /// `class << target`
    Singleton { target: Box<AstNode> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstNodeKind {
    Nil,
    True,
    False,
    SelfRef,
    Integer { value: i64 },
    Float { value: f64 },
    String { parts: Vec<StringPart> },
    Symbol { parts: Vec<StringPart> },
    Regex { parts: Vec<StringPart>, options: i64 },
    Array { items: Vec<AstNode> },
    Hash { maplets: Vec<(AstNode, AstNode)> },
    Range { begin: Box<AstNode>, end: Box<AstNode>, exclusive: bool },

    LocalVariable { name: String },
    LocalAssignment { name: String, value: Box<AstNode> },
    InstanceVariable { name: String },
    InstanceAssignment { name: String, value: Box<AstNode> },
    GlobalVariable { name: String },
    GlobalAssignment { name: String, value: Box<AstNode> },
    ClassVariable { name: String },
    ClassVariableAssignment { name: String, value: Box<AstNode> },
    /// Unqualified constant, `::Name` when `is_global`.
    Constant { name: String, is_global: bool },

    And { left: Box<AstNode>, right: Box<AstNode> },
    Or { left: Box<AstNode>, right: Box<AstNode> },
    Not { operand: Box<AstNode> },
    /// `if` (or `unless` when `negated`).
    If { condition: Box<AstNode>, body: Vec<AstNode>, else_body: Option<Vec<AstNode>>, negated: bool },
    /// `while` (or `until` when `negated`); `post_test` for `begin ... end while`.
    While { condition: Box<AstNode>, body: Vec<AstNode>, negated: bool, post_test: bool },
    Parenthesized { statements: Vec<AstNode> },
    Begin { body: Vec<AstNode>, rescue_clauses: Vec<RescueClause>, else_body: Option<Vec<AstNode>> },

    Break { value: Option<Box<AstNode>> },
    Next { value: Option<Box<AstNode>> },
    Redo,
    Retry,
    Return { value: Option<Box<AstNode>> },
    /// `rhs` is the value of an assignment whose target is the yield (`yield[a] = rhs`).
    Yield { args: Vec<AstNode>, splat: Option<Box<AstNode>>, rhs: Option<Box<AstNode>> },
    BlockGiven,

    MethodCall {
        receiver: Option<Box<AstNode>>,
        name: String,
        args: Vec<AstNode>,
        splat: Option<Box<AstNode>>,
        block: Option<Box<BlockDefinition>>,
    },
    /// `super` without parentheses when `args` is `None`: the current method's parameters are forwarded.
    Super { args: Option<Vec<AstNode>>, block: Option<Box<BlockDefinition>> },
    MethodDefinition { target: Option<Box<AstNode>>, name: String, parameters: Parameters, body: Vec<AstNode> },
    ModuleDefinition { kind: ModuleKind, body: Vec<AstNode> },
}
