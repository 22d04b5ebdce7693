//! file: core/src/ir/lower/statements.rs
//! description: lowering of statement sequences.
//!
//! `transform_statements` applies a `ResultOperation` to the last statement
//! of a body; the `*_to_expression` variants produce the value of a body
//! for use in conditions and operands.

use super::result_operation::ResultOperation;
use super::AstGenerator;
use crate::ast::AstNode;
use crate::ir::expr::{Expr, GotoKind};

impl AstGenerator {
    /// Lowers `prologue; statements...; epilogue` into one expression.
    ///
    /// An empty sequence still honors the result operation (nil is stored or
    /// returned). A sequence of exactly one component is returned without a
    /// block around it. Longer sequences end with an `Empty` so the block
    /// is void-typed however the last statement was lowered.
    pub fn transform_statements(
        &mut self,
        prologue: Option<Expr>,
        statements: &[AstNode],
        epilogue: Option<Expr>,
        result_operation: &ResultOperation,
    ) -> Expr {
        let count = statements.len() + usize::from(prologue.is_some()) + usize::from(epilogue.is_some());

        if count == 0 {
            return match result_operation {
                ResultOperation::Ignore => Expr::Empty,
                ResultOperation::Store(variable) => Expr::assign(variable, Expr::null(variable.ty())),
                ResultOperation::Return => {
                    let label = self.return_label();
                    Expr::goto(GotoKind::Return, &label, Some(Expr::nil()))
                }
            };
        }

        if count == 1 {
            if let Some(prologue) = prologue {
                return prologue;
            }
            if let Some(epilogue) = epilogue {
                return epilogue;
            }
            return self.transform_last(&statements[0], result_operation);
        }

        let mut body = Vec::with_capacity(count + 1);
        if let Some(prologue) = prologue {
            body.push(prologue);
        }
        if let Some((last, leading)) = statements.split_last() {
            for statement in leading {
                body.push(self.transform(statement));
            }
            body.push(self.transform_last(last, result_operation));
        }
        if let Some(epilogue) = epilogue {
            body.push(epilogue);
        }
        body.push(Expr::Empty);
        Expr::block(body)
    }

    /// `transform_statements` without prologue and epilogue.
    pub fn transform_body(&mut self, statements: &[AstNode], result_operation: &ResultOperation) -> Expr {
        self.transform_statements(None, statements, None, result_operation)
    }

    fn transform_last(&mut self, statement: &AstNode, result_operation: &ResultOperation) -> Expr {
        if result_operation.is_ignore() {
            self.transform(statement)
        } else {
            self.transform_result(statement, result_operation)
        }
    }

    /// Value of the last statement, or `None` for a missing or empty body.
    pub fn transform_statements_to_expression(&mut self, statements: Option<&[AstNode]>) -> Option<Expr> {
        let statements = statements.filter(|s| !s.is_empty())?;
        let (last, leading) = statements.split_last()?;
        let last = self.transform_read_step(last);
        Some(self.sequence(leading, last))
    }

    /// Truth of the last statement with the given polarity. A missing or
    /// empty body is the constant `!positive`.
    pub fn transform_statements_to_boolean_expression(&mut self, statements: Option<&[AstNode]>, positive: bool) -> Expr {
        let statements = match statements {
            Some(statements) if !statements.is_empty() => statements,
            _ => return Expr::bool(!positive),
        };
        match statements.split_last() {
            Some((last, leading)) => {
                let last = self.transform_condition(last, positive);
                self.sequence(leading, last)
            }
            None => Expr::bool(!positive),
        }
    }

    fn sequence(&mut self, leading: &[AstNode], last: Expr) -> Expr {
        if leading.is_empty() {
            return last;
        }
        let mut body: Vec<Expr> = leading.iter().map(|statement| self.transform(statement)).collect();
        body.push(last);
        Expr::block(body)
    }
}
