//! Function constructor and Function.prototype methods

use crate::call::Call;
use crate::error::JsError;
use crate::function::NativeFunction;
use crate::object::{ObjectKind, ObjectRef};
use crate::string_dict;
use crate::value::JsValue;

use super::{Builder, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionOp {
    /// `Function.prototype` itself, which accepts any arguments and returns undefined
    Empty = 0,
    New = 1,
    ToString = 2,
    Call = 3,
    Apply = 4,
}

/// The native behind `Function.prototype`
pub(crate) fn empty() -> NativeFunction {
    NativeFunction {
        name: string_dict::intern(""),
        arity: 0,
        op: NativeOp::Function(FunctionOp::Empty),
    }
}

pub(crate) fn init(b: &Builder) -> ObjectRef {
    let proto = b.function_prototype();
    let constructor = b.native("Function", 1, NativeOp::Function(FunctionOp::New));
    super::link(&constructor, proto);

    let op = NativeOp::Function;
    b.method(proto, "toString", 0, op(FunctionOp::ToString));
    b.method(proto, "call", 1, op(FunctionOp::Call));
    b.method(proto, "apply", 2, op(FunctionOp::Apply));
    constructor
}

pub(crate) fn call(op: FunctionOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        FunctionOp::Empty => Ok(JsValue::Undefined),
        FunctionOp::New => Err(JsError::type_error(
            "Function constructor requires a script compiler",
        )),
        FunctionOp::ToString => {
            let text = super::this_kind(call, "Function.prototype.toString", |kind| match kind {
                ObjectKind::Function(f) => Some(f.source_string()),
                _ => None,
            })?;
            Ok(JsValue::from(text))
        }
        FunctionOp::Call => {
            let function = callable_this(call)?;
            let this = receiver(call, call.get_arg(0, argc))?;
            let args: Vec<JsValue> = (1..argc).map(|i| call.arg(i as isize)).collect();
            call.invoke(&function, this, &args)
        }
        FunctionOp::Apply => {
            let function = callable_this(call)?;
            let this = receiver(call, call.get_arg(0, argc))?;
            let args = spread(&call.get_arg(1, argc))?;
            call.invoke(&function, this, &args)
        }
    }
}

fn callable_this(call: &Call) -> Result<JsValue, JsError> {
    let this = call.this_value();
    if !this.is_callable() {
        return Err(JsError::not_a_function(this.describe()));
    }
    Ok(this)
}

/// A null or undefined receiver means the global object.
fn receiver(call: &Call, this: JsValue) -> Result<JsValue, JsError> {
    if this.is_null_or_undefined() {
        return Ok(JsValue::Object(call.global_object()?));
    }
    Ok(this)
}

/// Elements of an array-like object
pub(crate) fn spread(list: &JsValue) -> Result<Vec<JsValue>, JsError> {
    match list {
        JsValue::Undefined | JsValue::Null => Ok(Vec::new()),
        JsValue::Object(obj) => {
            let length = obj.get("length")?.to_uint32()?;
            (0..length)
                .map(|i| obj.get(string_dict::index_name(i).as_str()))
                .collect()
        }
        other => Err(JsError::type_error(format!(
            "{} is not an array",
            other.describe()
        ))),
    }
}
