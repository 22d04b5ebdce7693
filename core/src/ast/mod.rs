//! file: core/src/ast/mod.rs
//! description: the abstract syntax tree consumed by the generator.

pub mod build;
pub mod kind;
pub mod node;

pub use kind::{AstNodeKind, BlockDefinition, ModuleKind, Parameters, RescueClause, StringPart};
pub use node::{AstNode, SourceUnitTree};
