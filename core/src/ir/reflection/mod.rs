//! file: core/src/ir/reflection/mod.rs
//! description: resolved handles to runtime-library primitives.
//!
//! The cache is resolved once per process against the bundled runtime
//! library and shared by every generator. A host that ships its own runtime
//! library can check that it stays in lock-step with the generator by
//! resolving a private cache against it.

pub mod catalog;

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::info;

use crate::ir::expr::{Expr, ExprType};
use self::catalog::{CatalogEntry, CATALOG};
pub use self::catalog::HandleKind;

/// Highest arity with a dedicated `Yield`/`YieldSplat` primitive.
pub const MAX_BLOCK_ARITY: usize = 4;
/// Highest number of string parts with a dedicated construction primitive.
pub const MAKE_STRING_PARAM_COUNT: usize = 2;
/// Highest element count with a dedicated `MakeArray` primitive.
pub const OPTIMIZED_OP_CALL_PARAM_COUNT: usize = 5;

const EXPECT_PRIMITIVE: &str = "runtime library does not export primitive";
const EXPECT_SIGNATURE: &str = "runtime library primitive has an unexpected signature";

/// Signature a runtime library reports for one of its exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<ExprType>,
    pub return_type: ExprType,
}

/// The supporting runtime library the generated code calls into.
pub trait RuntimeLibrary {
    fn name(&self) -> &str;

    fn lookup(&self, kind: HandleKind, name: &str) -> Option<Signature>;
}

/// The runtime library shipped with the generator; exports the whole catalog.
pub struct BundledLibrary;

impl RuntimeLibrary for BundledLibrary {
    fn name(&self) -> &str {
        "ironstone-runtime"
    }

    fn lookup(&self, kind: HandleKind, name: &str) -> Option<Signature> {
        CATALOG
            .iter()
            .find(|entry| entry.kind == kind && entry.name == name)
            .map(|entry| Signature { params: entry.params.to_vec(), return_type: entry.return_type })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct OpHandle {
    pub name: &'static str,
    pub kind: HandleKind,
    pub params: &'static [ExprType],
    pub return_type: ExprType,
}

impl OpHandle {
    /// Builds a call to this primitive. The argument count must match the signature.
    pub fn invoke(&'static self, args: Vec<Expr>) -> Expr {
        assert_eq!(
            args.len(),
            self.params.len(),
            "primitive {} called with a wrong number of arguments",
            self.name
        );
        Expr::call(self, args)
    }

    /// Builds a read of this field handle.
    pub fn read(&'static self, instance: Option<Expr>) -> Expr {
        assert_eq!(self.kind, HandleKind::Field, "{} is not a field", self.name);
        Expr::Field { field: self, instance: instance.map(Box::new) }
    }
}

/// Result of choosing a yield primitive for a call site.
#[derive(Debug, Clone, Copy)]
pub struct YieldDispatch<'a> {
    pub op: &'a OpHandle,
    /// Positional arguments are passed packed into one object array.
    pub has_argument_array: bool,
    /// The right-hand side travels in its own slot (`YieldSplatNRhs`) rather
    /// than as a positional argument or a splat tail.
    pub has_rhs_slot: bool,
}

pub struct ReflectionCache {
    library: String,
    methods: HashMap<&'static str, OpHandle>,
    fields: HashMap<&'static str, OpHandle>,
}

fn resolve_entry(library: &dyn RuntimeLibrary, entry: &CatalogEntry) -> OpHandle {
    let found = library.lookup(entry.kind, entry.name);
    assert!(found.is_some(), "{}: {} ({})", EXPECT_PRIMITIVE, entry.name, library.name());
    if let Some(signature) = found {
        assert!(
            signature.params == entry.params && signature.return_type == entry.return_type,
            "{}: {} ({})",
            EXPECT_SIGNATURE,
            entry.name,
            library.name()
        );
    }
    OpHandle { name: entry.name, kind: entry.kind, params: entry.params, return_type: entry.return_type }
}

impl ReflectionCache {
    /// Resolves every catalog entry against `library`. Panics when the
    /// library and the generator disagree on any primitive.
    pub fn resolve(library: &dyn RuntimeLibrary) -> ReflectionCache {
        let mut methods = HashMap::new();
        let mut fields = HashMap::new();
        for entry in CATALOG {
            let handle = resolve_entry(library, entry);
            match entry.kind {
                HandleKind::Method => methods.insert(entry.name, handle),
                HandleKind::Field => fields.insert(entry.name, handle),
            };
        }
        info!(
            "resolved {} methods and {} fields against {}",
            methods.len(),
            fields.len(),
            library.name()
        );
        ReflectionCache { library: library.name().to_string(), methods, fields }
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn len(&self) -> usize {
        self.methods.len() + self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn try_method(&self, name: &str) -> Option<&OpHandle> {
        self.methods.get(name)
    }

    pub fn method(&self, name: &str) -> &OpHandle {
        match self.methods.get(name) {
            Some(handle) => handle,
            None => panic!("{}: {}", EXPECT_PRIMITIVE, name),
        }
    }

    pub fn field(&self, name: &str) -> &OpHandle {
        match self.fields.get(name) {
            Some(handle) => handle,
            None => panic!("{}: {}", EXPECT_PRIMITIVE, name),
        }
    }

    /// `Yield0`..`Yield4`, `YieldN` beyond that.
    pub fn yield_(&self, argument_count: usize) -> &OpHandle {
        match argument_count {
            0 => self.method("Yield0"),
            1 => self.method("Yield1"),
            2 => self.method("Yield2"),
            3 => self.method("Yield3"),
            4 => self.method("Yield4"),
            _ => self.method("YieldN"),
        }
    }

    /// `YieldSplat0`..`YieldSplat4`, `YieldSplatN` beyond that.
    pub fn yield_splat(&self, argument_count: usize) -> &OpHandle {
        match argument_count {
            0 => self.method("YieldSplat0"),
            1 => self.method("YieldSplat1"),
            2 => self.method("YieldSplat2"),
            3 => self.method("YieldSplat3"),
            4 => self.method("YieldSplat4"),
            _ => self.method("YieldSplatN"),
        }
    }

    /// Picks the yield primitive for `argument_count` positional arguments,
    /// an optional splat and an optional right-hand side.
    ///
    /// The rhs counts as one more argument. Without a splat it is passed
    /// positionally. With a splat it goes after the splatted items: appended
    /// to the splat list while the fixed-arity primitives suffice, in the
    /// dedicated `YieldSplatNRhs` slot once arguments spill into an array.
    pub fn yield_dispatch(&self, argument_count: usize, has_splat: bool, has_rhs: bool) -> YieldDispatch<'_> {
        let adjusted = argument_count + usize::from(has_rhs);
        let has_argument_array = adjusted > MAX_BLOCK_ARITY;
        let (op, has_rhs_slot) = match (has_splat, has_rhs) {
            (true, true) if has_argument_array => (self.method("YieldSplatNRhs"), true),
            (true, true) => (self.yield_splat(argument_count), false),
            (true, false) => (self.yield_splat(adjusted), false),
            (false, _) => (self.yield_(adjusted), false),
        };
        YieldDispatch { op, has_argument_array, has_rhs_slot }
    }

    pub fn create_mutable_string(&self, suffix: &str) -> &OpHandle {
        self.method(suffixed("CreateMutableString", suffix))
    }

    pub fn create_symbol(&self, suffix: &str) -> &OpHandle {
        self.method(suffixed("CreateSymbol", suffix))
    }

    pub fn create_regex(&self, suffix: &str) -> &OpHandle {
        self.method(suffixed("CreateRegex", suffix))
    }

    /// `MakeArray0`..`MakeArray5`, `MakeArrayN` beyond that.
    pub fn make_array(&self, count: usize) -> &OpHandle {
        match count {
            0 => self.method("MakeArray0"),
            1 => self.method("MakeArray1"),
            2 => self.method("MakeArray2"),
            3 => self.method("MakeArray3"),
            4 => self.method("MakeArray4"),
            5 => self.method("MakeArray5"),
            _ => self.method("MakeArrayN"),
        }
    }
}

fn suffixed(family: &str, suffix: &str) -> &'static str {
    match (family, suffix) {
        ("CreateMutableString", "N") => "CreateMutableStringN",
        ("CreateMutableString", "M") => "CreateMutableStringM",
        ("CreateMutableString", "LM") => "CreateMutableStringLM",
        ("CreateMutableString", "ML") => "CreateMutableStringML",
        ("CreateMutableString", "MM") => "CreateMutableStringMM",
        ("CreateSymbol", "N") => "CreateSymbolN",
        ("CreateSymbol", "M") => "CreateSymbolM",
        ("CreateSymbol", "LM") => "CreateSymbolLM",
        ("CreateSymbol", "ML") => "CreateSymbolML",
        ("CreateSymbol", "MM") => "CreateSymbolMM",
        ("CreateRegex", "N") => "CreateRegexN",
        ("CreateRegex", "M") => "CreateRegexM",
        ("CreateRegex", "LM") => "CreateRegexLM",
        ("CreateRegex", "ML") => "CreateRegexML",
        ("CreateRegex", "MM") => "CreateRegexMM",
        _ => unreachable!("no {} primitive for suffix '{}'", family, suffix),
    }
}

lazy_static! {
    static ref METHODS: ReflectionCache = ReflectionCache::resolve(&BundledLibrary);
}

/// The process-wide cache resolved against the bundled runtime library.
pub fn methods() -> &'static ReflectionCache {
    &METHODS
}
