use crate::location::Span;

use super::kind::AstNodeKind;

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    id: usize,
    pub kind: AstNodeKind,
    pub span: Option<Span>,
}

impl AstNode {
    fn create_id() -> usize {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(1);
        COUNTER.fetch_add(1, Ordering::Relaxed)
    }

    pub fn new(kind: AstNodeKind) -> Self {
        AstNode { id: Self::create_id(), kind, span: None }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn get_id(&self) -> usize {
        self.id
    }

    pub fn get_kind(&self) -> &AstNodeKind {
        &self.kind
    }

    pub fn get_span(&self) -> Option<&Span> {
        self.span.as_ref()
    }

    pub fn boxed(self) -> Box<AstNode> {
        Box::new(self)
    }
}

/// Top-level input of the generator: one parsed source file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceUnitTree {
    /// Bodies of `BEGIN { }` blocks in source order.
    pub initializers: Vec<Vec<AstNode>>,
    pub statements: Vec<AstNode>,
}

impl SourceUnitTree {
    pub fn new(statements: Vec<AstNode>) -> Self {
        SourceUnitTree { initializers: Vec::new(), statements }
    }
}
