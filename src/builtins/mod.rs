//! Native built-in library.
//!
//! Every native function is a function object tagged with a [`NativeOp`]:
//! the built-in it belongs to plus that built-in's numeric opcode. Each
//! built-in module owns an opcode enum and a `call` entry point that
//! dispatches on it; [`NativeOp::call`] and [`NativeOp::construct`] route
//! to the right module.

pub mod array;
pub mod boolean;
pub mod date;
pub mod function;
pub mod global;
pub mod math;
pub mod number;
pub mod object;
pub mod regexp;
pub mod string;

use crate::call::Call;
use crate::error::JsError;
use crate::function::{Function, NativeFunction};
use crate::object::{IntrinsicLink, JsObject, ObjectKind, ObjectRef};
use crate::property::PropertyFlags;
use crate::string_dict;
use crate::value::{CheapClone, JsValue};

pub use array::ArrayOp;
pub use boolean::BooleanOp;
pub use date::DateOp;
pub use function::FunctionOp;
pub use global::GlobalOp;
pub use math::MathOp;
pub use number::NumberOp;
pub use object::ObjectOp;
pub use regexp::RegExpOp;
pub use string::StringOp;

/// Identity of a native function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeOp {
    Object(ObjectOp),
    Function(FunctionOp),
    Array(ArrayOp),
    String(StringOp),
    Boolean(BooleanOp),
    Number(NumberOp),
    Math(MathOp),
    Date(DateOp),
    RegExp(RegExpOp),
    Global(GlobalOp),
}

impl NativeOp {
    /// The numeric opcode within its built-in
    pub fn code(self) -> u16 {
        match self {
            NativeOp::Object(op) => op as u16,
            NativeOp::Function(op) => op as u16,
            NativeOp::Array(op) => op as u16,
            NativeOp::String(op) => op as u16,
            NativeOp::Boolean(op) => op as u16,
            NativeOp::Number(op) => op as u16,
            NativeOp::Math(op) => op as u16,
            NativeOp::Date(op) => op as u16,
            NativeOp::RegExp(op) => op as u16,
            NativeOp::Global(op) => op as u16,
        }
    }

    /// Plain call; `this` is argument -1 of the frame.
    pub fn call(self, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
        match self {
            NativeOp::Object(op) => object::call(op, call, argc),
            NativeOp::Function(op) => function::call(op, call, argc),
            NativeOp::Array(op) => array::call(op, call, argc),
            NativeOp::String(op) => string::call(op, call, argc),
            NativeOp::Boolean(op) => boolean::call(op, call, argc),
            NativeOp::Number(op) => number::call(op, call, argc),
            NativeOp::Math(op) => math::call(op, call, argc),
            NativeOp::Date(op) => date::call(op, call, argc),
            NativeOp::RegExp(op) => regexp::call(op, call, argc),
            NativeOp::Global(op) => global::call(op, call, argc),
        }
    }

    /// `new` on a native. Only the constructors accept it.
    pub fn construct(self, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
        match self {
            NativeOp::Object(ObjectOp::New) => object::construct(call, argc),
            NativeOp::Function(FunctionOp::New) => function::call(FunctionOp::New, call, argc),
            NativeOp::Array(ArrayOp::New) => array::construct(call, argc),
            NativeOp::String(StringOp::New) => string::construct(call, argc),
            NativeOp::Boolean(BooleanOp::New) => boolean::construct(call, argc),
            NativeOp::Number(NumberOp::New) => number::construct(call, argc),
            NativeOp::Date(DateOp::New) => date::construct(call, argc),
            NativeOp::RegExp(RegExpOp::New) => regexp::construct(call, argc),
            other => Err(JsError::not_a_constructor(format!(
                "native function {}",
                other.code()
            ))),
        }
    }
}

/// A gold constructor/prototype pair
pub(crate) struct Intrinsic {
    pub constructor: ObjectRef,
    pub prototype: ObjectRef,
}

/// Point a constructor and its prototype at each other.
pub(crate) fn link(constructor: &ObjectRef, prototype: &ObjectRef) {
    constructor.set_link(IntrinsicLink::Prototype(prototype.cheap_clone()));
    prototype.set_link(IntrinsicLink::Constructor(constructor.cheap_clone()));
}

/// Helpers for populating the gold realm
pub(crate) struct Builder {
    object_prototype: ObjectRef,
    function_prototype: ObjectRef,
}

impl Builder {
    pub fn new(object_prototype: ObjectRef, function_prototype: ObjectRef) -> Self {
        Self {
            object_prototype,
            function_prototype,
        }
    }

    pub fn object_prototype(&self) -> &ObjectRef {
        &self.object_prototype
    }

    pub fn function_prototype(&self) -> &ObjectRef {
        &self.function_prototype
    }

    /// A native function object
    pub fn native(&self, name: &str, arity: u32, op: NativeOp) -> ObjectRef {
        ObjectRef::new(JsObject::with_kind(
            "Function",
            Some(self.function_prototype.cheap_clone()),
            ObjectKind::Function(Function::Native(NativeFunction {
                name: string_dict::intern(name),
                arity,
                op,
            })),
        ))
    }

    /// Install a hidden native method on `target`
    pub fn method(&self, target: &ObjectRef, name: &str, arity: u32, op: NativeOp) {
        let function = self.native(name, arity, op);
        target.define_builtin(name, JsValue::Object(function), PropertyFlags::HIDDEN);
    }

    /// Install a read-only, hidden, permanent value on `target`
    pub fn constant(&self, target: &ObjectRef, name: &str, value: JsValue) {
        target.define_builtin(name, value, PropertyFlags::CONSTANT);
    }

    /// An object inheriting from `Object.prototype`
    pub fn object(&self, class: &str, kind: ObjectKind) -> ObjectRef {
        ObjectRef::new(JsObject::with_kind(
            class,
            Some(self.object_prototype.cheap_clone()),
            kind,
        ))
    }

    /// A constructor native linked to a fresh prototype of `kind`
    pub fn class(&self, name: &str, arity: u32, op: NativeOp, kind: ObjectKind) -> Intrinsic {
        let prototype = self.object(name, kind);
        let constructor = self.native(name, arity, op);
        link(&constructor, &prototype);
        Intrinsic {
            constructor,
            prototype,
        }
    }
}

/// `this` as a specific kind of object, or a TypeError naming the method.
pub(crate) fn this_kind<T>(
    call: &Call,
    method: &str,
    extract: impl FnOnce(&ObjectKind) -> Option<T>,
) -> Result<T, JsError> {
    match call.this_value() {
        JsValue::Object(obj) => {
            extract(&obj.borrow().kind).ok_or_else(|| JsError::type_error(format!(
                "{} called on incompatible object",
                method
            )))
        }
        _ => Err(JsError::type_error(format!(
            "{} called on incompatible object",
            method
        ))),
    }
}
