//! Call frames and the per-thread frame pool.
//!
//! A [`Call`] is the mutable per-invocation record: an argument stack, the
//! lexical scope chain, scratch value slots and the realm the invocation
//! belongs to. Arguments are addressed relative to `top`: argument `i` is
//! `stack[top + i]` and `this` is `stack[top - 1]`.
//!
//! Frames are reused. A frame caches one child frame for the calls it
//! makes, and top-level frames come from a small per-thread free list.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::{JsError, SourceLocation, StackFrame};
use crate::function::{Closure, CompiledCode};
use crate::object::{JsObject, ObjectRef};
use crate::property::PropertyFlags;
use crate::realm::Realm;
use crate::string_dict;
use crate::value::{CheapClone, JsString, JsValue};

/// Slot counts of a frame's fixed-size arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameShape {
    pub stack: usize,
    pub scope: usize,
    pub values: usize,
}

impl Default for FrameShape {
    fn default() -> Self {
        Self {
            stack: 64,
            scope: 16,
            values: 64,
        }
    }
}

/// The calling frame, as seen from a callee
#[derive(Debug, Clone, Default)]
pub struct CallerInfo {
    pub function_name: Option<JsString>,
    pub location: Option<SourceLocation>,
}

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static POOL: RefCell<FramePool> = RefCell::new(FramePool::new(2, FrameShape::default()));
}

/// Counts nested invocations on this thread for the overflow check.
struct DepthGuard;

impl DepthGuard {
    fn enter(max_depth: usize) -> Result<Self, JsError> {
        let depth = DEPTH.with(Cell::get);
        if depth >= max_depth {
            return Err(JsError::stack_overflow());
        }
        DEPTH.with(|d| d.set(depth + 1));
        Ok(DepthGuard)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Per-invocation state
pub struct Call {
    stack: Vec<JsValue>,
    top: usize,
    scope: Vec<JsValue>,
    scope_length: usize,
    values: Vec<JsValue>,
    realm: Option<Realm>,
    callee: JsValue,
    aux: JsValue,
    caller: Option<CallerInfo>,
    location: Option<SourceLocation>,
    child: Option<Box<Call>>,
    shape: FrameShape,
}

impl Call {
    pub fn new(shape: FrameShape) -> Self {
        Self {
            stack: vec![JsValue::Undefined; shape.stack.max(1)],
            top: 0,
            scope: vec![JsValue::Undefined; shape.scope.max(1)],
            scope_length: 0,
            values: vec![JsValue::Undefined; shape.values],
            realm: None,
            callee: JsValue::Undefined,
            aux: JsValue::Undefined,
            caller: None,
            location: None,
            child: None,
            shape,
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Reset bookkeeping, keeping the backing arrays as they are.
    pub fn clear(&mut self) {
        self.top = 0;
        self.aux = JsValue::Undefined;
        self.child = None;
    }

    /// Null every slot and drop every reference before pooling.
    pub fn free(&mut self) {
        self.stack.fill(JsValue::Undefined);
        self.scope.fill(JsValue::Undefined);
        self.values.fill(JsValue::Undefined);
        self.top = 0;
        self.scope_length = 0;
        self.realm = None;
        self.callee = JsValue::Undefined;
        self.aux = JsValue::Undefined;
        self.caller = None;
        self.location = None;
        self.child = None;
    }

    /// True when no slot references a value
    pub fn is_blank(&self) -> bool {
        let blank = |slots: &[JsValue]| slots.iter().all(JsValue::is_undefined);
        blank(&self.stack) && blank(&self.scope) && blank(&self.values) && self.realm.is_none()
    }

    pub fn realm(&self) -> Result<&Realm, JsError> {
        self.realm
            .as_ref()
            .ok_or_else(|| JsError::internal_error("call frame has no realm"))
    }

    pub fn set_realm(&mut self, realm: Option<Realm>) {
        self.realm = realm;
    }

    pub fn global(&self) -> Option<&ObjectRef> {
        self.realm.as_ref().map(Realm::global)
    }

    pub fn callee(&self) -> &JsValue {
        &self.callee
    }

    pub fn caller(&self) -> Option<&CallerInfo> {
        self.caller.as_ref()
    }

    pub fn aux(&self) -> &JsValue {
        &self.aux
    }

    pub fn set_aux(&mut self, value: JsValue) {
        self.aux = value;
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, location: SourceLocation) {
        self.location = Some(location);
    }

    /// Update the current line, keeping the file
    pub fn set_line(&mut self, line: u32) {
        match &mut self.location {
            Some(location) => {
                location.line = line;
                location.column = 0;
            }
            None => self.location = Some(SourceLocation::new(None, line, 0)),
        }
    }

    // ============ ARGUMENTS ============

    pub fn top(&self) -> usize {
        self.top
    }

    pub fn set_top(&mut self, top: usize) {
        self.top = top;
    }

    /// Argument `i` relative to `top`; `-1` is `this`.
    pub fn arg(&self, i: isize) -> JsValue {
        let index = self.top as isize + i;
        if index < 0 {
            return JsValue::Undefined;
        }
        self.stack.get(index as usize).cloned().unwrap_or_default()
    }

    /// Argument `i`, or undefined when fewer than `i + 1` were passed
    pub fn get_arg(&self, i: usize, argc: usize) -> JsValue {
        if i >= argc {
            return JsValue::Undefined;
        }
        self.arg(i as isize)
    }

    pub fn set_arg(&mut self, i: isize, value: JsValue) -> Result<(), JsError> {
        let index = self.top as isize + i;
        if index < 0 {
            return Err(JsError::stack_overflow());
        }
        match self.stack.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(JsError::stack_overflow()),
        }
    }

    pub fn this_value(&self) -> JsValue {
        self.arg(-1)
    }

    pub fn set_this(&mut self, value: JsValue) {
        if self.top > 0 {
            if let Some(slot) = self.stack.get_mut(self.top - 1) {
                *slot = value;
            }
        }
    }

    /// `this` converted to an object
    pub fn this_object(&self) -> Result<ObjectRef, JsError> {
        self.this_value().to_object()
    }

    pub fn args(&self, argc: usize) -> Vec<JsValue> {
        (0..argc).map(|i| self.arg(i as isize)).collect()
    }

    /// Numeric argument; missing ones are NaN
    pub fn arg_number(&self, i: usize, argc: usize) -> Result<f64, JsError> {
        if i >= argc {
            return Ok(f64::NAN);
        }
        self.arg(i as isize).to_number()
    }

    /// Int32 argument; missing ones are 0
    pub fn arg_int32(&self, i: usize, argc: usize) -> Result<i32, JsError> {
        if i >= argc {
            return Ok(0);
        }
        self.arg(i as isize).to_int32()
    }

    pub fn arg_string(&self, i: usize, argc: usize) -> Result<JsString, JsError> {
        self.get_arg(i, argc).to_js_string()
    }

    /// Lay out `this` and the arguments at the bottom of the stack.
    pub fn load_arguments(&mut self, this: JsValue, args: &[JsValue]) -> Result<(), JsError> {
        if args.len() + 1 > self.stack.len() {
            return Err(JsError::stack_overflow());
        }
        self.top = 1;
        self.stack[0] = this;
        for (slot, arg) in self.stack[1..].iter_mut().zip(args) {
            *slot = arg.clone();
        }
        Ok(())
    }

    /// Drop the references a finished call left in this frame.
    fn finish(&mut self, argc: usize) {
        let end = (self.top + argc).min(self.stack.len());
        self.stack[..end].fill(JsValue::Undefined);
        self.scope[..self.scope_length].fill(JsValue::Undefined);
        self.scope_length = 0;
        self.callee = JsValue::Undefined;
    }

    // ============ SCRATCH SLOTS ============

    pub fn value(&self, i: usize) -> JsValue {
        self.values.get(i).cloned().unwrap_or_default()
    }

    pub fn set_value(&mut self, i: usize, value: JsValue) -> Result<(), JsError> {
        match self.values.get_mut(i) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(JsError::range_error("value slot out of range")),
        }
    }

    // ============ SCOPE CHAIN ============

    pub fn scope_length(&self) -> usize {
        self.scope_length
    }

    pub fn scope_at(&self, i: usize) -> JsValue {
        if i >= self.scope_length {
            return JsValue::Undefined;
        }
        self.scope.get(i).cloned().unwrap_or_default()
    }

    /// Most-local scope object
    pub fn context(&self) -> JsValue {
        match self.scope_length {
            0 => JsValue::Undefined,
            n => self.scope_at(n - 1),
        }
    }

    pub fn push_scope(&mut self, value: JsValue) -> Result<(), JsError> {
        match self.scope.get_mut(self.scope_length) {
            Some(slot) => {
                *slot = value;
                self.scope_length += 1;
                Ok(())
            }
            None => Err(JsError::stack_overflow()),
        }
    }

    pub fn pop_scope(&mut self) -> Option<JsValue> {
        if self.scope_length == 0 {
            return None;
        }
        self.scope_length -= 1;
        self.scope
            .get_mut(self.scope_length)
            .map(std::mem::take)
    }

    /// Scope chain containing only the realm global
    pub fn reset_scope(&mut self) {
        self.scope[..self.scope_length].fill(JsValue::Undefined);
        self.scope_length = 0;
        if let Some(global) = self.global().cloned() {
            self.scope[0] = JsValue::Object(global);
            self.scope_length = 1;
        }
    }

    /// Install a closure's captured scopes, or just the global when it has none.
    pub fn fill_scope(&mut self, closure: &Closure) -> Result<(), JsError> {
        let captured = closure.scope();
        if captured.len() > self.scope.len() {
            return Err(JsError::stack_overflow());
        }
        if captured.is_empty() {
            self.reset_scope();
            return Ok(());
        }
        let old = self.scope_length;
        for (slot, value) in self.scope.iter_mut().zip(captured) {
            *slot = value.clone();
        }
        if old > captured.len() {
            self.scope[captured.len()..old].fill(JsValue::Undefined);
        }
        self.scope_length = captured.len();
        Ok(())
    }

    /// Scope object that binds `name`, searching innermost first, global last.
    pub fn find_scope_property(&self, name: &str) -> Result<Option<ObjectRef>, JsError> {
        for i in (0..self.scope_length).rev() {
            if let JsValue::Object(scope) = self.scope_at(i) {
                if scope.get_property(name)?.is_some() {
                    return Ok(Some(scope));
                }
            }
        }
        Ok(None)
    }

    /// Resolve an identifier; unresolved names are a ReferenceError.
    pub fn get_scope_property(&self, name: &str) -> Result<JsValue, JsError> {
        for i in (0..self.scope_length).rev() {
            if let JsValue::Object(scope) = self.scope_at(i) {
                if let Some(value) = scope.get_property(name)? {
                    return Ok(value);
                }
            }
        }
        Err(JsError::reference_error(name).at(self.location.as_ref()))
    }

    pub fn has_scope_property(&self, name: &str) -> Result<bool, JsError> {
        Ok(self.find_scope_property(name)?.is_some())
    }

    /// `typeof name`, which never fails for unresolved names
    pub fn scope_type_of(&self, name: &str) -> Result<&'static str, JsError> {
        for i in (0..self.scope_length).rev() {
            if let JsValue::Object(scope) = self.scope_at(i) {
                if let Some(value) = scope.get_property(name)? {
                    return Ok(value.type_of());
                }
            }
        }
        Ok("undefined")
    }

    /// Assign to the innermost binding of `name`; unbound names become
    /// properties of the global object.
    pub fn set_scope_property(&self, name: JsString, value: JsValue) -> Result<(), JsError> {
        for i in (1..self.scope_length).rev() {
            if let JsValue::Object(scope) = self.scope_at(i) {
                if scope.get_property(name.as_str())?.is_some() {
                    return scope.set_property(name, value);
                }
            }
        }
        self.global_object()?.set_property(name, value)
    }

    pub fn delete_scope_property(&self, name: &str) -> Result<bool, JsError> {
        for i in (1..self.scope_length).rev() {
            if let JsValue::Object(scope) = self.scope_at(i) {
                if scope.get_property(name)?.is_some() {
                    return scope.delete_property(name);
                }
            }
        }
        self.global_object()?.delete_property(name)
    }

    /// Declare `name` in the most-local scope (`var`)
    pub fn declare(&self, name: JsString, value: JsValue) -> Result<(), JsError> {
        match self.context() {
            JsValue::Object(scope) => {
                scope.put(name, value, PropertyFlags::DONT_DELETE);
                Ok(())
            }
            _ => Err(JsError::internal_error("no scope to declare in")),
        }
    }

    pub fn global_object(&self) -> Result<ObjectRef, JsError> {
        self.global()
            .cloned()
            .ok_or_else(|| JsError::internal_error("call frame has no realm"))
    }

    pub fn get_global_variable(&self, name: &str) -> Result<JsValue, JsError> {
        match self.global_object()?.get_property(name)? {
            Some(value) => Ok(value),
            None => Err(JsError::reference_error(name).at(self.location.as_ref())),
        }
    }

    // ============ INVOCATION ============

    fn max_depth(&self) -> usize {
        self.realm
            .as_ref()
            .map(|r| r.config().max_call_depth)
            .unwrap_or(EngineConfig::DEFAULT_MAX_CALL_DEPTH)
    }

    fn caller_info(&self) -> CallerInfo {
        CallerInfo {
            function_name: match &self.callee {
                JsValue::Object(f) => f.function_name(),
                _ => None,
            },
            location: self.location.clone(),
        }
    }

    /// The cached child frame, prepared for a call from this one
    pub fn child_frame(&mut self) -> &mut Call {
        let realm = self.realm.clone();
        let shape = self.shape;
        let caller = self.caller_info();
        let child = self
            .child
            .get_or_insert_with(|| Box::new(Call::new(shape)));
        child.top = 0;
        child.aux = JsValue::Undefined;
        child.realm = realm;
        child.caller = Some(caller);
        child.location = None;
        child
    }

    fn stack_frame(&self) -> StackFrame {
        StackFrame {
            function_name: match &self.callee {
                JsValue::Object(f) => f.function_name().map(|n| n.to_string()),
                _ => None,
            },
            location: self.location.clone(),
        }
    }

    /// Call `callee` with `this` and `args` in the child frame.
    pub fn invoke(
        &mut self,
        callee: &JsValue,
        this: JsValue,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        let JsValue::Object(function) = callee else {
            return Err(JsError::not_a_function(callee.describe()).at(self.location.as_ref()));
        };
        let _depth = DepthGuard::enter(self.max_depth())?;
        let child = self.child_frame();
        child.load_arguments(this, args)?;
        child.callee = callee.clone();
        let result = function.call(child, args.len());
        let frame = child.stack_frame();
        child.finish(args.len());
        result.map_err(|e| e.at(frame.location.as_ref()).with_frame(frame))
    }

    /// `new callee(args)`
    pub fn construct(&mut self, callee: &JsValue, args: &[JsValue]) -> Result<JsValue, JsError> {
        let JsValue::Object(function) = callee else {
            return Err(JsError::not_a_constructor(callee.describe()).at(self.location.as_ref()));
        };
        let _depth = DepthGuard::enter(self.max_depth())?;
        let child = self.child_frame();
        child.load_arguments(JsValue::Null, args)?;
        child.callee = callee.clone();
        let result = function.construct(child, args.len());
        let frame = child.stack_frame();
        child.finish(args.len());
        result.map_err(|e| e.at(frame.location.as_ref()).with_frame(frame))
    }

    /// `base.name(args)`
    pub fn call_method(
        &mut self,
        base: &JsValue,
        name: &str,
        args: &[JsValue],
    ) -> Result<JsValue, JsError> {
        match base.get_property(name)? {
            Some(method) if method.is_callable() => self.invoke(&method, base.clone(), args),
            _ => Err(JsError::not_a_function(name).at(self.location.as_ref())),
        }
    }

    /// `name(args)` resolved through the scope chain; `this` is the global.
    pub fn call_scope(&mut self, name: &str, args: &[JsValue]) -> Result<JsValue, JsError> {
        let function = self.get_scope_property(name)?;
        if !function.is_callable() {
            return Err(JsError::not_a_function(name).at(self.location.as_ref()));
        }
        let this = JsValue::Object(self.global_object()?);
        self.invoke(&function, this, args)
    }

    /// `new name(args)` resolved through the scope chain
    pub fn new_scope(&mut self, name: &str, args: &[JsValue]) -> Result<JsValue, JsError> {
        let function = self.get_scope_property(name)?;
        if !function.is_object() {
            return Err(JsError::not_a_constructor(name).at(self.location.as_ref()));
        }
        self.construct(&function, args)
    }

    /// Create a closure capturing this frame's current scope chain.
    pub fn new_closure(
        &self,
        name: Option<&str>,
        params: &[&str],
        code: Arc<dyn CompiledCode>,
    ) -> Result<JsValue, JsError> {
        let realm = self.realm()?;
        let scope: Vec<JsValue> = (0..self.scope_length).map(|i| self.scope_at(i)).collect();
        let closure = Closure::new(
            name.map(string_dict::intern),
            params.iter().map(|p| string_dict::intern(p)).collect(),
            code,
            scope,
        );
        Ok(JsValue::Object(realm.create_closure(closure)))
    }

    /// Activation object for a closure invocation: parameters plus `arguments`.
    pub(crate) fn create_activation(
        &self,
        callee: &ObjectRef,
        params: &[JsString],
        argc: usize,
    ) -> Result<ObjectRef, JsError> {
        let realm = self.realm()?;
        let activation = ObjectRef::new(JsObject::new("Call", None));
        let args = self.args(argc);
        let arguments = realm.create_arguments(callee, &args);
        activation.put(
            string_dict::intern("arguments"),
            JsValue::Object(arguments),
            PropertyFlags::DONT_DELETE,
        );
        for (i, param) in params.iter().enumerate() {
            activation.put(param.cheap_clone(), self.get_arg(i, argc), PropertyFlags::DONT_DELETE);
        }
        Ok(activation)
    }
}

/// Bounded free list of frames
pub struct FramePool {
    free: Vec<Box<Call>>,
    capacity: usize,
    shape: FrameShape,
    allocated: usize,
}

impl FramePool {
    pub fn new(capacity: usize, shape: FrameShape) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
            shape,
            allocated: 0,
        }
    }

    /// A cleared frame: pooled if one is free, otherwise newly allocated
    pub fn acquire(&mut self) -> Box<Call> {
        match self.free.pop() {
            Some(mut frame) => {
                frame.clear();
                frame
            }
            None => {
                tracing::trace!(allocated = self.allocated + 1, "frame pool miss");
                self.allocated += 1;
                Box::new(Call::new(self.shape))
            }
        }
    }

    /// Blank the frame and keep it if there is room.
    pub fn release(&mut self, mut frame: Box<Call>) {
        frame.free();
        if self.free.len() < self.capacity && frame.shape == self.shape {
            self.free.push(frame);
        }
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Frames this pool has had to allocate
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    /// Adopt new limits; pooled frames of another shape are dropped.
    pub fn reconfigure(&mut self, capacity: usize, shape: FrameShape) {
        self.capacity = capacity;
        if shape != self.shape {
            self.shape = shape;
            self.free.clear();
        }
        self.free.truncate(capacity);
    }
}

/// Apply a configuration to this thread's pool
pub fn configure_thread_pool(config: &EngineConfig) {
    POOL.with(|pool| {
        pool.borrow_mut()
            .reconfigure(config.frame_pool_capacity, config.frame_shape())
    });
}

/// Take a frame from this thread's pool, bound to `realm`.
pub fn acquire_frame(realm: Option<&Realm>) -> Box<Call> {
    let mut frame = POOL.with(|pool| pool.borrow_mut().acquire());
    frame.realm = realm.cloned();
    frame.reset_scope();
    if let Some(global) = realm.map(Realm::global) {
        frame.stack[0] = JsValue::Object(global.cheap_clone());
        frame.top = 1;
    }
    frame
}

pub fn release_frame(frame: Box<Call>) {
    POOL.with(|pool| pool.borrow_mut().release(frame));
}

/// Run `f` in a pooled frame bound to the current realm.
pub fn with_frame<R>(f: impl FnOnce(&mut Call) -> Result<R, JsError>) -> Result<R, JsError> {
    let realm = Realm::current();
    let mut frame = acquire_frame(realm.as_ref());
    let result = f(&mut frame);
    release_frame(frame);
    result
}

/// Pooled frames available on this thread
pub fn pooled_frames() -> usize {
    POOL.with(|pool| pool.borrow().len())
}
