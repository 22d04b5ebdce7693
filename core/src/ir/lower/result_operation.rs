use crate::ir::expr::VarRef;

/// What happens to the value of the last statement of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultOperation {
    /// Discard the value.
    Ignore,
    /// Return the value from the enclosing frame.
    Return,
    /// Assign the value into the given variable.
    Store(VarRef),
}

impl ResultOperation {
    pub fn store(variable: &VarRef) -> Self {
        ResultOperation::Store(variable.clone())
    }

    pub fn is_ignore(&self) -> bool {
        matches!(self, ResultOperation::Ignore)
    }

    pub fn variable(&self) -> Option<&VarRef> {
        match self {
            ResultOperation::Store(variable) => Some(variable),
            _ => None,
        }
    }
}
