use crate::ir::expr::{ExprType, VarRef, VariableKind};
use std::collections::HashMap;

/// Local-variable table of one variable scope. Named locals are looked up by
/// name; hidden temporaries are only reachable through the `VarRef` handed
/// out when they were defined.
#[derive(Debug, Default)]
pub struct ScopeBuilder {
    locals: HashMap<String, VarRef>,
    parameters: Vec<VarRef>,
    variables: Vec<VarRef>,
}

impl ScopeBuilder {
    pub fn new() -> Self {
        ScopeBuilder::default()
    }

    pub fn define_parameter(&mut self, name: &str) -> VarRef {
        let var = VarRef::new(name, ExprType::Object, VariableKind::Parameter);
        self.locals.insert(name.to_string(), var.clone());
        self.parameters.push(var.clone());
        var
    }

    /// Parameter that is not visible to source code (`#self`, `#scope`, `#block`).
    pub fn define_hidden_parameter(&mut self, name: &str, ty: ExprType) -> VarRef {
        let var = VarRef::new(name, ty, VariableKind::Hidden);
        self.parameters.push(var.clone());
        var
    }

    pub fn define_variable(&mut self, name: &str) -> VarRef {
        let var = VarRef::new(name, ExprType::Object, VariableKind::Local);
        self.locals.insert(name.to_string(), var.clone());
        self.variables.push(var.clone());
        var
    }

    pub fn get_or_create_local(&mut self, name: &str) -> VarRef {
        if let Some(var) = self.locals.get(name) {
            var.clone()
        } else {
            self.define_variable(name)
        }
    }

    pub fn lookup_local(&self, name: &str) -> Option<VarRef> {
        self.locals.get(name).cloned()
    }

    /// Compiler temporary. Several temporaries may share a name.
    pub fn define_hidden_variable(&mut self, name: &str, ty: ExprType) -> VarRef {
        let var = VarRef::new(name, ty, VariableKind::Hidden);
        self.variables.push(var.clone());
        var
    }

    pub fn parameters(&self) -> &[VarRef] {
        &self.parameters
    }

    pub fn variables(&self) -> &[VarRef] {
        &self.variables
    }
}
