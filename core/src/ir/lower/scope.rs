//! file: core/src/ir/lower/scope.rs
//! description: lexical scopes entered and left while lowering a unit.
//!
//! Scopes form parent-linked trees through `ScopeRef`. Alongside the generic
//! parent chain every scope records snapshots of the enclosing loop, rescue,
//! block, method, module and variable scope at the moment it was entered, so
//! that leaving it restores those "current" pointers exactly.
//!
//! Entering a block or a method starts a fresh loop/rescue region: a `break`
//! inside a block never sees a loop that encloses the block.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use log::{debug, trace};

use super::scope_builder::ScopeBuilder;
use crate::ast::Parameters;
use crate::ir::expr::{ExprType, LabelRef, VarRef};

const EXPECT_LOOP: &str = "leaving a loop that is not the current scope";
const EXPECT_RESCUE: &str = "leaving a rescue clause that is not the current scope";
const EXPECT_BLOCK: &str = "leaving a block that is not the current scope";
const EXPECT_METHOD: &str = "leaving a method that is not the current scope";
const EXPECT_MODULE: &str = "leaving a module that is not the current scope";
const EXPECT_FILE_INITIALIZER: &str = "leaving a file initializer that is not the current scope";
const EXPECT_NO_UNIT: &str = "entering a source unit while another scope is active";
const EXPECT_UNIT_CLOSED: &str = "source unit left with an open loop, rescue or block";
const EXPECT_IN_UNIT: &str = "no source unit is being generated";
const EXPECT_LAMBDA: &str = "variable scope chain has no enclosing frame";

/// Only cross-unit mutable state: frame ids are never reused within a process.
static NEXT_FRAME_ID: AtomicU32 = AtomicU32::new(0);

fn next_unique_id() -> u32 {
    NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed) + 1
}

fn same<T>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[derive(Debug)]
pub struct LoopScope {
    pub redo_variable: VarRef,
    pub result_variable: VarRef,
    pub break_label: LabelRef,
    pub continue_label: LabelRef,
    pub parent: Option<ScopeRef>,
    pub parent_loop: Option<Rc<LoopScope>>,
}

#[derive(Debug)]
pub struct RescueScope {
    pub retrying_variable: VarRef,
    pub retry_label: LabelRef,
    pub parent: Option<ScopeRef>,
    pub parent_rescue: Option<Rc<RescueScope>>,
}

/// Storage shared by every scope that owns locals.
#[derive(Debug)]
pub struct VariableData {
    builder: RefCell<ScopeBuilder>,
    pub self_variable: VarRef,
    pub runtime_scope_variable: VarRef,
    pub parent_variable_scope: Option<VariableScopeRef>,
}

impl VariableData {
    fn new(builder: ScopeBuilder, self_variable: VarRef, runtime_scope_variable: VarRef, parent: Option<VariableScopeRef>) -> Self {
        VariableData {
            builder: RefCell::new(builder),
            self_variable,
            runtime_scope_variable,
            parent_variable_scope: parent,
        }
    }

    pub fn builder(&self) -> Ref<'_, ScopeBuilder> {
        self.builder.borrow()
    }

    pub fn builder_mut(&self) -> RefMut<'_, ScopeBuilder> {
        self.builder.borrow_mut()
    }
}

/// Ancestry and return bookkeeping shared by methods and blocks.
#[derive(Debug)]
pub struct FrameData {
    pub unique_id: u32,
    pub parent_block: Option<Rc<BlockScope>>,
    pub parent_rescue: Option<Rc<RescueScope>>,
    pub parent_loop: Option<Rc<LoopScope>>,
    return_label: RefCell<Option<LabelRef>>,
}

impl FrameData {
    fn new(parent_block: Option<Rc<BlockScope>>, parent_rescue: Option<Rc<RescueScope>>, parent_loop: Option<Rc<LoopScope>>) -> Self {
        let unique_id = next_unique_id();
        debug!("frame #{} created", unique_id);
        FrameData { unique_id, parent_block, parent_rescue, parent_loop, return_label: RefCell::new(None) }
    }

    /// The frame's return label, created on first request.
    pub fn return_label(&self) -> LabelRef {
        self.return_label
            .borrow_mut()
            .get_or_insert_with(|| LabelRef::new("#return", ExprType::Object))
            .clone()
    }

    /// Hands the label out once; later calls see `None` until a new label is requested.
    pub fn take_return_label(&self) -> Option<LabelRef> {
        self.return_label.borrow_mut().take()
    }
}

/// Plain variable scope; used for `BEGIN { }` file initializers.
#[derive(Debug)]
pub struct VariableScope {
    pub variable: VariableData,
    pub parent: Option<ScopeRef>,
}

#[derive(Debug)]
pub struct BlockScope {
    pub variable: VariableData,
    pub frame: FrameData,
    pub bfc_variable: VarRef,
    pub redo_label: LabelRef,
    pub parent: Option<ScopeRef>,
}

#[derive(Debug)]
pub struct MethodScope {
    pub variable: VariableData,
    pub frame: FrameData,
    pub block_variable: Option<VarRef>,
    /// `None` for top-level code.
    pub method_name: Option<String>,
    /// `None` when the code is not inside a method body (used by `super`).
    pub parameters: Option<Parameters>,
    pub parent_method: Option<Rc<MethodScope>>,
    pub parent: Option<ScopeRef>,
}

#[derive(Debug)]
pub struct ModuleScope {
    pub variable: VariableData,
    pub is_singleton: bool,
    pub parent_module: Option<Rc<ModuleScope>>,
    pub parent: Option<ScopeRef>,
}

/// Any lexical scope.
#[derive(Debug, Clone)]
pub enum ScopeRef {
    Loop(Rc<LoopScope>),
    Rescue(Rc<RescueScope>),
    Variable(Rc<VariableScope>),
    Block(Rc<BlockScope>),
    Method(Rc<MethodScope>),
    Module(Rc<ModuleScope>),
}

impl ScopeRef {
    pub fn parent(&self) -> Option<&ScopeRef> {
        match self {
            ScopeRef::Loop(s) => s.parent.as_ref(),
            ScopeRef::Rescue(s) => s.parent.as_ref(),
            ScopeRef::Variable(s) => s.parent.as_ref(),
            ScopeRef::Block(s) => s.parent.as_ref(),
            ScopeRef::Method(s) => s.parent.as_ref(),
            ScopeRef::Module(s) => s.parent.as_ref(),
        }
    }

    /// Frames compile to their own lambda.
    pub fn is_lambda(&self) -> bool {
        matches!(self, ScopeRef::Block(_) | ScopeRef::Method(_))
    }

    pub fn as_variable_scope(&self) -> Option<VariableScopeRef> {
        match self {
            ScopeRef::Loop(_) | ScopeRef::Rescue(_) => None,
            ScopeRef::Variable(s) => Some(VariableScopeRef::Variable(s.clone())),
            ScopeRef::Block(s) => Some(VariableScopeRef::Block(s.clone())),
            ScopeRef::Method(s) => Some(VariableScopeRef::Method(s.clone())),
            ScopeRef::Module(s) => Some(VariableScopeRef::Module(s.clone())),
        }
    }

    pub fn ptr_eq(&self, other: &ScopeRef) -> bool {
        match (self, other) {
            (ScopeRef::Loop(a), ScopeRef::Loop(b)) => Rc::ptr_eq(a, b),
            (ScopeRef::Rescue(a), ScopeRef::Rescue(b)) => Rc::ptr_eq(a, b),
            (ScopeRef::Variable(a), ScopeRef::Variable(b)) => Rc::ptr_eq(a, b),
            (ScopeRef::Block(a), ScopeRef::Block(b)) => Rc::ptr_eq(a, b),
            (ScopeRef::Method(a), ScopeRef::Method(b)) => Rc::ptr_eq(a, b),
            (ScopeRef::Module(a), ScopeRef::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for ScopeRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A scope that owns local-variable storage.
#[derive(Debug, Clone)]
pub enum VariableScopeRef {
    Variable(Rc<VariableScope>),
    Block(Rc<BlockScope>),
    Method(Rc<MethodScope>),
    Module(Rc<ModuleScope>),
}

impl VariableScopeRef {
    pub fn data(&self) -> &VariableData {
        match self {
            VariableScopeRef::Variable(s) => &s.variable,
            VariableScopeRef::Block(s) => &s.variable,
            VariableScopeRef::Method(s) => &s.variable,
            VariableScopeRef::Module(s) => &s.variable,
        }
    }

    pub fn as_scope(&self) -> ScopeRef {
        match self {
            VariableScopeRef::Variable(s) => ScopeRef::Variable(s.clone()),
            VariableScopeRef::Block(s) => ScopeRef::Block(s.clone()),
            VariableScopeRef::Method(s) => ScopeRef::Method(s.clone()),
            VariableScopeRef::Module(s) => ScopeRef::Module(s.clone()),
        }
    }

    pub fn is_method(&self, method: &Rc<MethodScope>) -> bool {
        matches!(self, VariableScopeRef::Method(m) if Rc::ptr_eq(m, method))
    }
}

impl PartialEq for VariableScopeRef {
    fn eq(&self, other: &Self) -> bool {
        self.as_scope().ptr_eq(&other.as_scope())
    }
}

/// A lambda-compiled scope: the innermost block, else the innermost method.
#[derive(Debug, Clone)]
pub enum FrameRef {
    Block(Rc<BlockScope>),
    Method(Rc<MethodScope>),
}

impl FrameRef {
    pub fn frame(&self) -> &FrameData {
        match self {
            FrameRef::Block(s) => &s.frame,
            FrameRef::Method(s) => &s.frame,
        }
    }

    pub fn variable(&self) -> &VariableData {
        match self {
            FrameRef::Block(s) => &s.variable,
            FrameRef::Method(s) => &s.variable,
        }
    }

    pub fn unique_id(&self) -> u32 {
        self.frame().unique_id
    }
}

/// The "current" pointer of every scope kind. Replaced wholesale on each
/// enter/leave; equality is pointer identity.
#[derive(Debug, Clone, Default)]
pub struct ScopeState {
    pub element: Option<ScopeRef>,
    pub method: Option<Rc<MethodScope>>,
    pub block: Option<Rc<BlockScope>>,
    pub loop_scope: Option<Rc<LoopScope>>,
    pub rescue: Option<Rc<RescueScope>>,
    pub variable_scope: Option<VariableScopeRef>,
    pub module: Option<Rc<ModuleScope>>,
}

impl ScopeState {
    pub fn is_empty(&self) -> bool {
        self.element.is_none()
            && self.method.is_none()
            && self.block.is_none()
            && self.loop_scope.is_none()
            && self.rescue.is_none()
            && self.variable_scope.is_none()
            && self.module.is_none()
    }
}

impl PartialEq for ScopeState {
    fn eq(&self, other: &Self) -> bool {
        self.element == other.element
            && same(&self.method, &other.method)
            && same(&self.block, &other.block)
            && same(&self.loop_scope, &other.loop_scope)
            && same(&self.rescue, &other.rescue)
            && self.variable_scope == other.variable_scope
            && same(&self.module, &other.module)
    }
}

fn is_current<T>(current: &Option<Rc<T>>, element: &Option<ScopeRef>, wrap: fn(Rc<T>) -> ScopeRef) -> bool {
    match (current, element) {
        (Some(current), Some(element)) => wrap(current.clone()).ptr_eq(element),
        _ => false,
    }
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    state: ScopeState,
    top_level_scope: Option<Rc<MethodScope>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    /// Snapshot of every current pointer.
    pub fn state(&self) -> ScopeState {
        self.state.clone()
    }

    pub fn enter_loop(&mut self, redo_variable: VarRef, result_variable: VarRef, break_label: LabelRef, continue_label: LabelRef) -> Rc<LoopScope> {
        let scope = Rc::new(LoopScope {
            redo_variable,
            result_variable,
            break_label,
            continue_label,
            parent: self.state.element.clone(),
            parent_loop: self.state.loop_scope.clone(),
        });
        trace!("enter loop");
        self.state = ScopeState {
            element: Some(ScopeRef::Loop(scope.clone())),
            loop_scope: Some(scope.clone()),
            ..self.state.clone()
        };
        scope
    }

    pub fn leave_loop(&mut self) {
        assert!(is_current(&self.state.loop_scope, &self.state.element, ScopeRef::Loop), "{}", EXPECT_LOOP);
        if let Some(old) = self.state.loop_scope.clone() {
            trace!("leave loop");
            self.state = ScopeState {
                element: old.parent.clone(),
                loop_scope: old.parent_loop.clone(),
                ..self.state.clone()
            };
        }
    }

    pub fn enter_rescue_clause(&mut self, retrying_variable: VarRef, retry_label: LabelRef) -> Rc<RescueScope> {
        let scope = Rc::new(RescueScope {
            retrying_variable,
            retry_label,
            parent: self.state.element.clone(),
            parent_rescue: self.state.rescue.clone(),
        });
        trace!("enter rescue clause");
        self.state = ScopeState {
            element: Some(ScopeRef::Rescue(scope.clone())),
            rescue: Some(scope.clone()),
            ..self.state.clone()
        };
        scope
    }

    pub fn leave_rescue_clause(&mut self) {
        assert!(is_current(&self.state.rescue, &self.state.element, ScopeRef::Rescue), "{}", EXPECT_RESCUE);
        if let Some(old) = self.state.rescue.clone() {
            trace!("leave rescue clause");
            self.state = ScopeState {
                element: old.parent.clone(),
                rescue: old.parent_rescue.clone(),
                ..self.state.clone()
            };
        }
    }

    pub fn enter_block_definition(
        &mut self,
        builder: ScopeBuilder,
        bfc_variable: VarRef,
        self_variable: VarRef,
        runtime_scope_variable: VarRef,
        redo_label: LabelRef,
    ) -> Rc<BlockScope> {
        let scope = Rc::new(BlockScope {
            variable: VariableData::new(builder, self_variable, runtime_scope_variable, self.state.variable_scope.clone()),
            frame: FrameData::new(self.state.block.clone(), self.state.rescue.clone(), self.state.loop_scope.clone()),
            bfc_variable,
            redo_label,
            parent: self.state.element.clone(),
        });
        trace!("enter block #{}", scope.frame.unique_id);
        self.state = ScopeState {
            element: Some(ScopeRef::Block(scope.clone())),
            rescue: None,
            loop_scope: None,
            block: Some(scope.clone()),
            variable_scope: Some(VariableScopeRef::Block(scope.clone())),
            ..self.state.clone()
        };
        scope
    }

    pub fn leave_block_definition(&mut self) {
        assert!(is_current(&self.state.block, &self.state.element, ScopeRef::Block), "{}", EXPECT_BLOCK);
        if let Some(old) = self.state.block.clone() {
            trace!("leave block #{}", old.frame.unique_id);
            self.state = ScopeState {
                element: old.parent.clone(),
                rescue: old.frame.parent_rescue.clone(),
                loop_scope: old.frame.parent_loop.clone(),
                variable_scope: old.variable.parent_variable_scope.clone(),
                block: old.frame.parent_block.clone(),
                ..self.state.clone()
            };
        }
    }

    pub fn enter_method_definition(
        &mut self,
        builder: ScopeBuilder,
        self_parameter: VarRef,
        runtime_scope_variable: VarRef,
        block_parameter: Option<VarRef>,
        method_name: Option<String>,
        parameters: Option<Parameters>,
    ) -> Rc<MethodScope> {
        let scope = Rc::new(MethodScope {
            variable: VariableData::new(builder, self_parameter, runtime_scope_variable, self.state.variable_scope.clone()),
            frame: FrameData::new(self.state.block.clone(), self.state.rescue.clone(), self.state.loop_scope.clone()),
            block_variable: block_parameter,
            method_name,
            parameters,
            parent_method: self.state.method.clone(),
            parent: self.state.element.clone(),
        });
        trace!("enter method #{} {:?}", scope.frame.unique_id, scope.method_name);
        self.state = ScopeState {
            element: Some(ScopeRef::Method(scope.clone())),
            rescue: None,
            loop_scope: None,
            block: None,
            variable_scope: Some(VariableScopeRef::Method(scope.clone())),
            method: Some(scope.clone()),
            ..self.state.clone()
        };
        scope
    }

    pub fn leave_method_definition(&mut self) {
        assert!(is_current(&self.state.method, &self.state.element, ScopeRef::Method), "{}", EXPECT_METHOD);
        if let Some(old) = self.state.method.clone() {
            trace!("leave method #{}", old.frame.unique_id);
            self.state = ScopeState {
                element: old.parent.clone(),
                rescue: old.frame.parent_rescue.clone(),
                loop_scope: old.frame.parent_loop.clone(),
                block: old.frame.parent_block.clone(),
                variable_scope: old.variable.parent_variable_scope.clone(),
                method: old.parent_method.clone(),
                ..self.state.clone()
            };
        }
    }

    pub fn enter_module_definition(
        &mut self,
        builder: ScopeBuilder,
        self_variable: VarRef,
        runtime_scope_variable: VarRef,
        is_singleton: bool,
    ) -> Rc<ModuleScope> {
        let scope = Rc::new(ModuleScope {
            variable: VariableData::new(builder, self_variable, runtime_scope_variable, self.state.variable_scope.clone()),
            is_singleton,
            parent_module: self.state.module.clone(),
            parent: self.state.element.clone(),
        });
        trace!("enter module (singleton: {})", is_singleton);
        self.state = ScopeState {
            element: Some(ScopeRef::Module(scope.clone())),
            variable_scope: Some(VariableScopeRef::Module(scope.clone())),
            module: Some(scope.clone()),
            ..self.state.clone()
        };
        scope
    }

    pub fn leave_module_definition(&mut self) {
        assert!(is_current(&self.state.module, &self.state.element, ScopeRef::Module), "{}", EXPECT_MODULE);
        if let Some(old) = self.state.module.clone() {
            trace!("leave module");
            self.state = ScopeState {
                element: old.parent.clone(),
                variable_scope: old.variable.parent_variable_scope.clone(),
                module: old.parent_module.clone(),
                ..self.state.clone()
            };
        }
    }

    pub fn enter_file_initializer(&mut self, builder: ScopeBuilder, self_variable: VarRef, runtime_scope_variable: VarRef) -> Rc<VariableScope> {
        let scope = Rc::new(VariableScope {
            variable: VariableData::new(builder, self_variable, runtime_scope_variable, self.state.variable_scope.clone()),
            parent: self.state.element.clone(),
        });
        trace!("enter file initializer");
        self.state = ScopeState {
            element: Some(ScopeRef::Variable(scope.clone())),
            variable_scope: Some(VariableScopeRef::Variable(scope.clone())),
            ..self.state.clone()
        };
        scope
    }

    pub fn leave_file_initializer(&mut self) {
        let old = match (&self.state.variable_scope, &self.state.element) {
            (Some(VariableScopeRef::Variable(scope)), Some(ScopeRef::Variable(element))) if Rc::ptr_eq(scope, element) => scope.clone(),
            _ => panic!("{}", EXPECT_FILE_INITIALIZER),
        };
        trace!("leave file initializer");
        self.state = ScopeState {
            element: old.parent.clone(),
            variable_scope: old.variable.parent_variable_scope.clone(),
            ..self.state.clone()
        };
    }

    /// Enters the top-level method frame of a unit. Every current pointer must be empty.
    pub fn enter_source_unit(
        &mut self,
        builder: ScopeBuilder,
        self_parameter: VarRef,
        runtime_scope_variable: VarRef,
        block_parameter: Option<VarRef>,
        method_name: Option<String>,
        parameters: Option<Parameters>,
    ) -> Rc<MethodScope> {
        assert!(self.state.is_empty() && self.top_level_scope.is_none(), "{}", EXPECT_NO_UNIT);
        let scope = self.enter_method_definition(builder, self_parameter, runtime_scope_variable, block_parameter, method_name, parameters);
        self.top_level_scope = Some(scope.clone());
        scope
    }

    pub fn leave_source_unit(&mut self) {
        let at_top = is_current(&self.state.method, &self.state.element, ScopeRef::Method)
            && match (&self.state.variable_scope, &self.state.method, &self.top_level_scope) {
                (Some(scope), Some(method), Some(top)) => scope.is_method(method) && Rc::ptr_eq(method, top),
                _ => false,
            };
        assert!(at_top, "{}", EXPECT_METHOD);
        assert!(
            self.state.loop_scope.is_none() && self.state.rescue.is_none() && self.state.block.is_none(),
            "{}",
            EXPECT_UNIT_CLOSED
        );
        trace!("leave source unit");
        self.state = ScopeState::default();
        self.top_level_scope = None;
    }

    pub fn current_element(&self) -> Option<&ScopeRef> {
        self.state.element.as_ref()
    }

    pub fn current_loop(&self) -> Option<&Rc<LoopScope>> {
        self.state.loop_scope.as_ref()
    }

    pub fn current_rescue(&self) -> Option<&Rc<RescueScope>> {
        self.state.rescue.as_ref()
    }

    pub fn current_block(&self) -> Option<&Rc<BlockScope>> {
        self.state.block.as_ref()
    }

    pub fn current_module(&self) -> Option<&Rc<ModuleScope>> {
        self.state.module.as_ref()
    }

    pub fn top_level_scope(&self) -> Option<&Rc<MethodScope>> {
        self.top_level_scope.as_ref()
    }

    pub fn current_method(&self) -> &Rc<MethodScope> {
        match &self.state.method {
            Some(method) => method,
            None => panic!("{}", EXPECT_IN_UNIT),
        }
    }

    pub fn try_current_method(&self) -> Option<&Rc<MethodScope>> {
        self.state.method.as_ref()
    }

    /// Innermost block if any, otherwise the innermost method.
    pub fn current_frame(&self) -> FrameRef {
        match &self.state.block {
            Some(block) => FrameRef::Block(block.clone()),
            None => FrameRef::Method(self.current_method().clone()),
        }
    }

    pub fn current_scope(&self) -> &VariableScopeRef {
        match &self.state.variable_scope {
            Some(scope) => scope,
            None => panic!("{}", EXPECT_IN_UNIT),
        }
    }

    pub fn current_self_variable(&self) -> VarRef {
        self.current_scope().data().self_variable.clone()
    }

    pub fn current_scope_variable(&self) -> VarRef {
        self.current_scope().data().runtime_scope_variable.clone()
    }

    /// Innermost scope compiled to a lambda, found by walking the generic
    /// parent chain from the current variable scope.
    pub fn current_lambda_scope(&self) -> VariableScopeRef {
        let mut scope = Some(self.current_scope().as_scope());
        while let Some(current) = scope {
            if current.is_lambda() {
                if let Some(found) = current.as_variable_scope() {
                    return found;
                }
            }
            scope = current.parent().cloned();
        }
        panic!("{}", EXPECT_LAMBDA)
    }
}
