//! file: core/src/ir/reflection/catalog.rs
//! description: every runtime primitive the generator may emit a call to.
//!
//! Each entry is the signature the generator expects. A runtime library has
//! to export a matching primitive for every entry before any code can be
//! generated against it.

use crate::ir::expr::ExprType;
use crate::ir::expr::ExprType::{
    Array, BlockParam, Boolean, Encoding, Exception, Hash, Integer, Lambda, Module, MutableString,
    Object, ObjectArray, Proc, Range, Regex, Scope, String, Symbol, Void,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Method,
    Field,
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub kind: HandleKind,
    pub params: &'static [ExprType],
    pub return_type: ExprType,
}

const fn method(name: &'static str, params: &'static [ExprType], return_type: ExprType) -> CatalogEntry {
    CatalogEntry { name, kind: HandleKind::Method, params, return_type }
}

const fn field(name: &'static str, return_type: ExprType) -> CatalogEntry {
    CatalogEntry { name, kind: HandleKind::Field, params: &[], return_type }
}

pub static CATALOG: &[CatalogEntry] = &[
    // arrays and hashes
    method("MakeArray0", &[], Array),
    method("MakeArray1", &[Object], Array),
    method("MakeArray2", &[Object, Object], Array),
    method("MakeArray3", &[Object, Object, Object], Array),
    method("MakeArray4", &[Object, Object, Object, Object], Array),
    method("MakeArray5", &[Object, Object, Object, Object, Object], Array),
    method("MakeArrayN", &[ObjectArray], Array),
    method("AddItem", &[Array, Object], Array),
    method("MakeHash0", &[Scope], Hash),
    method("MakeHash", &[Scope, ObjectArray], Hash),
    method("CreateInclusiveRange", &[Object, Object, Scope], Range),
    method("CreateExclusiveRange", &[Object, Object, Scope], Range),
    // strings: L = literal part, M = evaluated part, N = part array
    method("CreateMutableStringL", &[String, Encoding], MutableString),
    method("CreateMutableStringB", &[String, Encoding], MutableString),
    method("CreateMutableStringM", &[MutableString, Encoding], MutableString),
    method("CreateMutableStringLM", &[String, MutableString, Encoding], MutableString),
    method("CreateMutableStringML", &[MutableString, String, Encoding], MutableString),
    method("CreateMutableStringMM", &[MutableString, MutableString, Encoding], MutableString),
    method("CreateMutableStringN", &[ObjectArray, Encoding], MutableString),
    method("CreateSymbolM", &[MutableString, Encoding, Scope], Symbol),
    method("CreateSymbolLM", &[String, MutableString, Encoding, Scope], Symbol),
    method("CreateSymbolML", &[MutableString, String, Encoding, Scope], Symbol),
    method("CreateSymbolMM", &[MutableString, MutableString, Encoding, Scope], Symbol),
    method("CreateSymbolN", &[ObjectArray, Encoding, Scope], Symbol),
    method("CreateRegexL", &[String, Encoding, Integer], Regex),
    method("CreateRegexB", &[String, Encoding, Integer], Regex),
    method("CreateRegexM", &[MutableString, Encoding, Integer], Regex),
    method("CreateRegexLM", &[String, MutableString, Encoding, Integer], Regex),
    method("CreateRegexML", &[MutableString, String, Encoding, Integer], Regex),
    method("CreateRegexMM", &[MutableString, MutableString, Encoding, Integer], Regex),
    method("CreateRegexN", &[ObjectArray, Encoding, Integer], Regex),
    method("ConvertSymbolToMutableString", &[Symbol], MutableString),
    method("ObjectToMutableString", &[Object], MutableString),
    // variables and constants
    method("GetLocalVariable", &[Scope, String], Object),
    method("SetLocalVariable", &[Object, Scope, String], Object),
    method("GetInstanceVariable", &[Scope, Object, String], Object),
    method("SetInstanceVariable", &[Object, Object, Scope, String], Object),
    method("GetGlobalVariable", &[Scope, String], Object),
    method("SetGlobalVariable", &[Object, Scope, String], Object),
    method("GetClassVariable", &[Scope, String], Object),
    method("SetClassVariable", &[Object, Scope, String], Object),
    method("GetUnqualifiedConstant", &[Scope, String, Boolean], Object),
    method("GetQualifiedConstant", &[Scope, ObjectArray, Boolean], Object),
    method("SetUnqualifiedConstant", &[Object, Scope, String], Object),
    // runtime scopes
    method("CreateMethodScope", &[Scope, String, Object, Proc], Scope),
    method("CreateBlockScope", &[Scope, BlockParam, Object], Scope),
    method("CreateModuleScope", &[Scope, Module], Scope),
    method("CreateFileInitializerScope", &[Scope], Scope),
    method("GetMethodBlockParameter", &[Scope], Proc),
    method("GetMethodBlockParameterSelf", &[Scope], Object),
    method("GetProcSelf", &[Proc], Object),
    // definitions
    method("DefineMethod", &[Object, Scope, Lambda], Object),
    method("DefineBlock", &[Scope, Object, Lambda], Proc),
    method("DefineLambda", &[Scope, Object, Lambda], Proc),
    method("DefineModule", &[Scope, Object, String], Module),
    method("DefineClass", &[Scope, Object, String, Object], Module),
    method("DefineSingletonClass", &[Scope, Object], Module),
    method("CreateBfcForYield", &[Proc], BlockParam),
    method("ToProcValidator", &[String, Object], Proc),
    // block frame control
    method("BlockBreak", &[BlockParam, Object], Object),
    method("BlockReturn", &[BlockParam, Object], Object),
    method("BlockRetry", &[BlockParam], Object),
    method("BlockPropagateReturn", &[BlockParam, Object], Object),
    method("BlockYield", &[Scope, BlockParam, BlockParam, Object], Boolean),
    // method frame control
    method("MethodBreak", &[Object], Void),
    method("MethodNext", &[Scope, Object], Void),
    method("MethodRedo", &[Scope], Void),
    method("MethodRetry", &[Scope, Proc], Object),
    method("MethodYield", &[Scope, BlockParam, Object], Boolean),
    method("MethodPropagateReturn", &[Scope, Proc, Object], Object),
    // eval frame control
    method("EvalBreak", &[Scope, Object], Void),
    method("EvalNext", &[Scope, Object], Void),
    method("EvalRedo", &[Scope], Void),
    method("EvalRetry", &[Scope], Void),
    method("EvalReturn", &[Scope, Object], Object),
    method("EvalYield", &[Scope, BlockParam, Object], Boolean),
    method("EnterLoop", &[Scope], Void),
    method("LeaveLoop", &[Scope], Void),
    method("EnterRescue", &[Scope], Void),
    method("LeaveRescue", &[Scope], Void),
    // exceptions and truthiness
    method("CanRescue", &[Scope, Exception], Boolean),
    method("CompareDefaultException", &[Scope], Boolean),
    method("GetCurrentException", &[Scope], Exception),
    method("SetCurrentException", &[Scope, Exception], Void),
    method("IsTrue", &[Object], Boolean),
    method("IsFalse", &[Object], Boolean),
    method("Splat", &[Object], Object),
    method("SplatAppend", &[Object, Object], Object),
    method("Unsplat", &[Object], Object),
    // yield
    method("Yield0", &[Proc, Object, BlockParam], Object),
    method("Yield1", &[Object, Proc, Object, BlockParam], Object),
    method("Yield2", &[Object, Object, Proc, Object, BlockParam], Object),
    method("Yield3", &[Object, Object, Object, Proc, Object, BlockParam], Object),
    method("Yield4", &[Object, Object, Object, Object, Proc, Object, BlockParam], Object),
    method("YieldN", &[ObjectArray, Proc, Object, BlockParam], Object),
    method("YieldSplat0", &[Object, Proc, Object, BlockParam], Object),
    method("YieldSplat1", &[Object, Object, Proc, Object, BlockParam], Object),
    method("YieldSplat2", &[Object, Object, Object, Proc, Object, BlockParam], Object),
    method("YieldSplat3", &[Object, Object, Object, Object, Proc, Object, BlockParam], Object),
    method("YieldSplat4", &[Object, Object, Object, Object, Object, Proc, Object, BlockParam], Object),
    method("YieldSplatN", &[ObjectArray, Object, Proc, Object, BlockParam], Object),
    method("YieldSplatNRhs", &[ObjectArray, Object, Object, Proc, Object, BlockParam], Object),
    // tracing and diagnostics
    method("TraceMethodCall", &[Scope, String, Integer], Void),
    method("TraceMethodReturn", &[Scope, String, Integer], Void),
    method("TraceBlockCall", &[Scope, BlockParam, String, Integer], Void),
    method("TraceBlockReturn", &[Scope, BlockParam, String, Integer], Void),
    method("TraceTopLevelCodeFrame", &[Scope, Exception], Boolean),
    method("PrintInteractiveResult", &[Scope, Object], Void),
    method("X", &[String], Void),
    // fields
    field("ConstantSiteCache_Value", Object),
    field("ConstantSiteCache_Version", Integer),
    field("RubyModule_Version", Integer),
    field("RubyContext_ConstantAccessVersion", Integer),
    field("DefaultArgument", Object),
    field("ForwardToBase", Object),
    field("NeedsUpdate", Object),
];
