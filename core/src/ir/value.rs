use std::fmt;

use super::expr::ExprType;

/// Compile-time constants embedded in the expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
}

impl Value {
    /// Static type the constant has when no explicit type is requested.
    pub fn natural_type(&self) -> ExprType {
        match self {
            Value::Nil => ExprType::Object,
            Value::Bool(_) => ExprType::Boolean,
            Value::Int(_) => ExprType::Integer,
            Value::Float(_) => ExprType::Float,
            Value::Str(_) => ExprType::String,
            Value::Symbol(_) => ExprType::Symbol,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Symbol(s) => write!(f, ":{}", s),
        }
    }
}
