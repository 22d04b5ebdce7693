pub mod ast;
pub mod config;
pub mod error;
pub mod ir;
pub mod location;

use std::path::Path;

pub use ast::{AstNode, AstNodeKind, SourceUnitTree};
pub use config::{CompilerOptions, GeneratorSettings, SourceEncoding};
pub use error::{ConfigError, ConfigErrorKind, IronstoneErrorExt, Level};
pub use ir::expr::{Expr, LambdaExpr, SymbolDocument};
pub use ir::lower::AstGenerator;
pub use ir::transform_source_unit;
pub use location::{Location, Span};

pub fn generate_error_report<E: IronstoneErrorExt + ?Sized>(error: &E) -> String {
    let level = error.level();
    let location = match error.location() {
        Some(loc) => loc.to_string(),
        None => "unknown location".to_string(),
    };
    let message = error.message();

    format!("IRONSTONE | {} | {} | {} | {}", level, error.issuer(), location, message)
}

/// Lowers `tree` with options and settings read from JSON files.
///
/// Both files are validated while loading. `source_path` names
/// the document sequence points refer to when debug mode is on. Source
/// text is taken to be UTF-8.
pub fn compile_source_unit<P: AsRef<Path>>(
    tree: &SourceUnitTree,
    source_path: Option<&str>,
    options_path: P,
    settings_path: P,
    print_interactive_result: bool,
) -> Result<LambdaExpr, Box<dyn IronstoneErrorExt>> {
    let options = CompilerOptions::load_from_file(options_path)?;
    let settings = GeneratorSettings::load_from_file(settings_path)?;

    let document = source_path.map(SymbolDocument::new);
    Ok(transform_source_unit(tree, document, SourceEncoding::Utf8, options, settings, print_interactive_result))
}
