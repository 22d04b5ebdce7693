//! file: core/src/ir/lower/lower_literal.rs
//! description: lowering of string, symbol, regex, array, hash and range literals.
//!
//! Interpolated literals are built from "pieces": adjacent literal parts are
//! merged, evaluated parts become mutable strings. Up to
//! `MAKE_STRING_PARAM_COUNT` pieces select a suffix-coded primitive
//! (`M`, `LM`, `ML`, `MM`); more pieces go through the `N` array form.

use super::{to_object, AstGenerator};
use crate::ast::{AstNode, StringPart};
use crate::ir::expr::{Expr, ExprType};
use crate::ir::reflection::{methods, MAKE_STRING_PARAM_COUNT, OPTIMIZED_OP_CALL_PARAM_COUNT};
use crate::ir::value::Value;

enum Piece {
    Literal(String),
    Evaluated(Expr),
}

impl Piece {
    fn code(&self) -> char {
        match self {
            Piece::Literal(_) => 'L',
            Piece::Evaluated(_) => 'M',
        }
    }

    fn into_expr(self) -> Expr {
        match self {
            Piece::Literal(text) => Expr::str(text),
            Piece::Evaluated(expr) => expr,
        }
    }
}

/// Arguments and suffix of a construction call for non-literal pieces.
struct Construction {
    suffix: String,
    args: Vec<Expr>,
}

fn construction(pieces: Vec<Piece>) -> Construction {
    if pieces.len() <= MAKE_STRING_PARAM_COUNT {
        let suffix: String = pieces.iter().map(Piece::code).collect();
        Construction { suffix, args: pieces.into_iter().map(Piece::into_expr).collect() }
    } else {
        let items = pieces.into_iter().map(Piece::into_expr).collect();
        Construction { suffix: "N".to_string(), args: vec![Expr::NewArray(items)] }
    }
}

impl AstGenerator {
    fn string_pieces(&mut self, parts: &[StringPart]) -> Vec<Piece> {
        let mut pieces: Vec<Piece> = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                StringPart::Literal(text) => match pieces.last_mut() {
                    Some(Piece::Literal(previous)) => previous.push_str(text),
                    _ => pieces.push(Piece::Literal(text.clone())),
                },
                StringPart::Interpolation(node) => {
                    let value = to_object(self.transform_read(node));
                    let string = methods().method("ObjectToMutableString").invoke(vec![value]);
                    pieces.push(Piece::Evaluated(string));
                }
            }
        }
        pieces
    }

    /// Literal text when no part is interpolated.
    fn literal_text(pieces: &[Piece]) -> Option<String> {
        match pieces {
            [] => Some(String::new()),
            [Piece::Literal(text)] => Some(text.clone()),
            _ => None,
        }
    }

    pub fn transform_string_literal(&mut self, parts: &[StringPart]) -> Expr {
        let pieces = self.string_pieces(parts);
        let encoding = self.encoding_constant();
        if let Some(text) = Self::literal_text(&pieces) {
            return methods().method("CreateMutableStringL").invoke(vec![Expr::str(text), encoding]);
        }
        let Construction { suffix, mut args } = construction(pieces);
        args.push(encoding);
        methods().create_mutable_string(&suffix).invoke(args)
    }

    pub fn transform_symbol_literal(&mut self, parts: &[StringPart]) -> Expr {
        let pieces = self.string_pieces(parts);
        if let Some(text) = Self::literal_text(&pieces) {
            return Expr::constant(Value::Symbol(text));
        }
        let Construction { suffix, mut args } = construction(pieces);
        args.push(self.encoding_constant());
        args.push(self.current_scope_variable().read());
        methods().create_symbol(&suffix).invoke(args)
    }

    pub fn transform_regex_literal(&mut self, parts: &[StringPart], options: i64) -> Expr {
        let pieces = self.string_pieces(parts);
        let encoding = self.encoding_constant();
        let options = Expr::Constant { value: Value::Int(options), ty: ExprType::Integer };
        if let Some(text) = Self::literal_text(&pieces) {
            return methods().method("CreateRegexL").invoke(vec![Expr::str(text), encoding, options]);
        }
        let Construction { suffix, mut args } = construction(pieces);
        args.push(encoding);
        args.push(options);
        methods().create_regex(&suffix).invoke(args)
    }

    pub fn transform_array_literal(&mut self, items: &[AstNode]) -> Expr {
        let items = self.transform_expressions(items);
        let op = methods().make_array(items.len());
        if items.len() <= OPTIMIZED_OP_CALL_PARAM_COUNT {
            op.invoke(items)
        } else {
            op.invoke(vec![Expr::NewArray(items)])
        }
    }

    pub fn transform_range_literal(&mut self, begin: &AstNode, end: &AstNode, exclusive: bool) -> Expr {
        let begin = to_object(self.transform_read(begin));
        let end = to_object(self.transform_read(end));
        let name = if exclusive { "CreateExclusiveRange" } else { "CreateInclusiveRange" };
        methods().method(name).invoke(vec![begin, end, self.current_scope_variable().read()])
    }
}
