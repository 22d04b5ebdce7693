//! file: core/src/ir/expr.rs
//! description: the expression tree produced by lowering.
//!
//! A lowered unit is a single `Expr::Lambda`. Variables and labels are shared
//! by reference: two `VarRef`s are equal only when they point at the same
//! allocation, never because their names match.

use std::fmt;
use std::sync::Arc;

use super::reflection::OpHandle;
use super::value::Value;
use crate::location::Span;

/// Static types tracked for lowered expressions and primitive signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprType {
    Void,
    Object,
    Boolean,
    Integer,
    Float,
    /// Immutable host string (literal parts, names).
    String,
    Symbol,
    MutableString,
    Regex,
    Array,
    Hash,
    Range,
    Proc,
    /// The runtime scope object used for dynamic lookups.
    Scope,
    /// Block-frame-control handle.
    BlockParam,
    Exception,
    ObjectArray,
    Module,
    Encoding,
    Lambda,
}

impl ExprType {
    /// Whether a value of type `other` can be stored where `self` is expected.
    pub fn is_assignable_from(self, other: ExprType) -> bool {
        self == other || (self == ExprType::Object && other != ExprType::Void)
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Local,
    Parameter,
    /// Compiler temporary, named with a leading `#`.
    Hidden,
}

#[derive(Debug)]
pub struct Variable {
    pub name: String,
    pub ty: ExprType,
    pub kind: VariableKind,
}

#[derive(Debug, Clone)]
pub struct VarRef(Arc<Variable>);

impl VarRef {
    pub fn new(name: impl Into<String>, ty: ExprType, kind: VariableKind) -> Self {
        VarRef(Arc::new(Variable { name: name.into(), ty, kind }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> ExprType {
        self.0.ty
    }

    pub fn kind(&self) -> VariableKind {
        self.0.kind
    }

    pub fn read(&self) -> Expr {
        Expr::Variable(self.clone())
    }
}

impl PartialEq for VarRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug)]
pub struct LabelTarget {
    pub name: String,
    pub ty: ExprType,
}

#[derive(Debug, Clone)]
pub struct LabelRef(Arc<LabelTarget>);

impl LabelRef {
    pub fn new(name: impl Into<String>, ty: ExprType) -> Self {
        LabelRef(Arc::new(LabelTarget { name: name.into(), ty }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> ExprType {
        self.0.ty
    }
}

impl PartialEq for LabelRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Document that debug-info expressions refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolDocument {
    pub file_name: String,
}

impl SymbolDocument {
    pub fn new(file_name: impl Into<String>) -> Arc<Self> {
        Arc::new(SymbolDocument { file_name: file_name.into() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GotoKind {
    Goto,
    Break,
    Continue,
    Return,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaKind {
    TopLevel,
    Method,
    Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaExpr {
    pub kind: LambdaKind,
    pub name: String,
    pub unique_id: u32,
    pub parameters: Vec<VarRef>,
    pub variables: Vec<VarRef>,
    pub body: Expr,
}

/// Dynamic method call site. `frame_id` keys the site's cache to the frame
/// that contains it so recompiled code never shares stale caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub method: String,
    pub frame_id: u32,
    pub has_splat: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Void no-op.
    Empty,
    Constant { value: Value, ty: ExprType },
    Variable(VarRef),
    Assign { target: VarRef, value: Box<Expr> },
    Block { variables: Vec<VarRef>, body: Vec<Expr> },
    Label { target: LabelRef, default: Option<Box<Expr>> },
    Goto { kind: GotoKind, target: LabelRef, value: Option<Box<Expr>> },
    Loop { body: Box<Expr>, break_label: Option<LabelRef>, continue_label: Option<LabelRef> },
    Condition { test: Box<Expr>, if_true: Box<Expr>, if_false: Box<Expr>, ty: ExprType },
    Call { op: &'static OpHandle, args: Vec<Expr> },
    /// Read of a primitive field handle, optionally off an instance.
    Field { field: &'static OpHandle, instance: Option<Box<Expr>> },
    Invoke { site: CallSite, receiver: Box<Expr>, args: Vec<Expr>, block: Option<Box<Expr>> },
    NewArray(Vec<Expr>),
    Convert { operand: Box<Expr>, ty: ExprType },
    /// Evaluates `body`; any exception switches to `handler`.
    TryCatch { body: Box<Expr>, handler: Box<Expr> },
    /// Evaluates `body`; `finally` runs on every exit, jumps and exceptions included.
    TryFinally { body: Box<Expr>, finally: Box<Expr> },
    DebugInfo { document: Arc<SymbolDocument>, span: Span },
    ClearDebugInfo { document: Arc<SymbolDocument> },
    Not(Box<Expr>),
    /// Reference equality of two operands.
    ReferenceEqual { left: Box<Expr>, right: Box<Expr> },
    Lambda(Box<LambdaExpr>),
}

impl Expr {
    pub fn nil() -> Expr {
        Expr::Constant { value: Value::Nil, ty: ExprType::Object }
    }

    /// A null constant of the given static type.
    pub fn null(ty: ExprType) -> Expr {
        Expr::Constant { value: Value::Nil, ty }
    }

    pub fn bool(value: bool) -> Expr {
        Expr::Constant { value: Value::Bool(value), ty: ExprType::Boolean }
    }

    pub fn constant(value: Value) -> Expr {
        let ty = value.natural_type();
        Expr::Constant { value, ty }
    }

    pub fn str(value: impl Into<String>) -> Expr {
        Expr::constant(Value::Str(value.into()))
    }

    pub fn block(body: Vec<Expr>) -> Expr {
        Expr::Block { variables: Vec::new(), body }
    }

    pub fn assign(target: &VarRef, value: Expr) -> Expr {
        Expr::Assign { target: target.clone(), value: Box::new(value) }
    }

    pub fn call(op: &'static OpHandle, args: Vec<Expr>) -> Expr {
        Expr::Call { op, args }
    }

    pub fn convert(operand: Expr, ty: ExprType) -> Expr {
        Expr::Convert { operand: Box::new(operand), ty }
    }

    /// Converts only when the operand is not already assignable to `ty`.
    pub fn convert_if_needed(operand: Expr, ty: ExprType) -> Expr {
        if ty.is_assignable_from(operand.ty()) {
            operand
        } else {
            Expr::convert(operand, ty)
        }
    }

    pub fn goto(kind: GotoKind, target: &LabelRef, value: Option<Expr>) -> Expr {
        Expr::Goto { kind, target: target.clone(), value: value.map(Box::new) }
    }

    pub fn condition(test: Expr, if_true: Expr, if_false: Expr, ty: ExprType) -> Expr {
        Expr::Condition {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            ty,
        }
    }

    pub fn try_finally(body: Expr, finally: Expr) -> Expr {
        Expr::TryFinally { body: Box::new(body), finally: Box::new(finally) }
    }

    pub fn not(operand: Expr) -> Expr {
        Expr::Not(Box::new(operand))
    }

    pub fn reference_equal(left: Expr, right: Expr) -> Expr {
        Expr::ReferenceEqual { left: Box::new(left), right: Box::new(right) }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Expr::Empty)
    }

    pub fn ty(&self) -> ExprType {
        match self {
            Expr::Empty => ExprType::Void,
            Expr::Constant { ty, .. } => *ty,
            Expr::Variable(var) => var.ty(),
            Expr::Assign { target, .. } => target.ty(),
            Expr::Block { body, .. } => body.last().map(Expr::ty).unwrap_or(ExprType::Void),
            Expr::Label { target, .. } => target.ty(),
            Expr::Goto { .. } => ExprType::Void,
            Expr::Loop { break_label, .. } => {
                break_label.as_ref().map(LabelRef::ty).unwrap_or(ExprType::Void)
            }
            Expr::Condition { ty, .. } => *ty,
            Expr::Call { op, .. } => op.return_type,
            Expr::Field { field, .. } => field.return_type,
            Expr::Invoke { .. } => ExprType::Object,
            Expr::NewArray(_) => ExprType::ObjectArray,
            Expr::Convert { ty, .. } => *ty,
            Expr::TryCatch { body, .. } | Expr::TryFinally { body, .. } => body.ty(),
            Expr::DebugInfo { .. } | Expr::ClearDebugInfo { .. } => ExprType::Void,
            Expr::Not(_) | Expr::ReferenceEqual { .. } => ExprType::Boolean,
            Expr::Lambda(_) => ExprType::Lambda,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => write!(f, "()"),
            Expr::Constant { value, ty } => {
                if *ty == value.natural_type() {
                    write!(f, "{}", value)
                } else {
                    write!(f, "{}:{}", value, ty)
                }
            }
            Expr::Variable(var) => write!(f, "{}", var.name()),
            Expr::Assign { target, value } => write!(f, "(= {} {})", target.name(), value),
            Expr::Block { variables, body } => {
                write!(f, "(block")?;
                if !variables.is_empty() {
                    let names: Vec<&str> = variables.iter().map(VarRef::name).collect();
                    write!(f, " [{}]", names.join(" "))?;
                }
                write_list(f, body)?;
                write!(f, ")")
            }
            Expr::Label { target, default } => match default {
                Some(d) => write!(f, "(label {} {})", target.name(), d),
                None => write!(f, "(label {})", target.name()),
            },
            Expr::Goto { kind, target, value } => {
                let word = match kind {
                    GotoKind::Goto => "goto",
                    GotoKind::Break => "break",
                    GotoKind::Continue => "continue",
                    GotoKind::Return => "return",
                };
                match value {
                    Some(v) => write!(f, "({} {} {})", word, target.name(), v),
                    None => write!(f, "({} {})", word, target.name()),
                }
            }
            Expr::Loop { body, .. } => write!(f, "(loop {})", body),
            Expr::Condition { test, if_true, if_false, .. } => {
                write!(f, "(if {} {} {})", test, if_true, if_false)
            }
            Expr::Call { op, args } => {
                write!(f, "({}", op.name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Field { field, instance } => match instance {
                Some(i) => write!(f, "{}.{}", i, field.name),
                None => write!(f, "{}", field.name),
            },
            Expr::Invoke { site, receiver, args, block } => {
                write!(f, "(send {} {}", receiver, site.method)?;
                write_list(f, args)?;
                if let Some(b) = block {
                    write!(f, " &{}", b)?;
                }
                write!(f, ")")
            }
            Expr::NewArray(items) => {
                write!(f, "(array")?;
                write_list(f, items)?;
                write!(f, ")")
            }
            Expr::Convert { operand, ty } => write!(f, "(convert {} {})", ty, operand),
            Expr::TryCatch { body, handler } => write!(f, "(try {} (catch {}))", body, handler),
            Expr::TryFinally { body, finally } => write!(f, "(try {} (finally {}))", body, finally),
            Expr::DebugInfo { document, span } => {
                write!(f, "(debug-info {} {})", document.file_name, span)
            }
            Expr::ClearDebugInfo { document } => write!(f, "(clear-debug-info {})", document.file_name),
            Expr::Not(operand) => write!(f, "(not {})", operand),
            Expr::ReferenceEqual { left, right } => write!(f, "(eq? {} {})", left, right),
            Expr::Lambda(lambda) => {
                let params: Vec<&str> = lambda.parameters.iter().map(VarRef::name).collect();
                write!(f, "(lambda {}#{} ({}) {})", lambda.name, lambda.unique_id, params.join(" "), lambda.body)
            }
        }
    }
}
