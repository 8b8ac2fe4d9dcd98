//! Object constructor and Object.prototype methods

use crate::call::Call;
use crate::error::JsError;
use crate::object::{MAX_PROTOTYPE_DEPTH, ObjectRef};
use crate::value::JsValue;

use super::{Builder, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOp {
    New = 1,
    ToString = 2,
    ValueOf = 3,
    HasOwnProperty = 4,
    IsPrototypeOf = 5,
    PropertyIsEnumerable = 6,
    ToLocaleString = 7,
    Watch = 8,
    Unwatch = 9,
}

/// Populate the gold `Object.prototype` and return the constructor.
pub(crate) fn init(b: &Builder) -> ObjectRef {
    let proto = b.object_prototype();
    let constructor = b.native("Object", 1, NativeOp::Object(ObjectOp::New));
    super::link(&constructor, proto);

    let op = NativeOp::Object;
    b.method(proto, "toString", 0, op(ObjectOp::ToString));
    b.method(proto, "toLocaleString", 0, op(ObjectOp::ToLocaleString));
    b.method(proto, "valueOf", 0, op(ObjectOp::ValueOf));
    b.method(proto, "hasOwnProperty", 1, op(ObjectOp::HasOwnProperty));
    b.method(proto, "isPrototypeOf", 1, op(ObjectOp::IsPrototypeOf));
    b.method(proto, "propertyIsEnumerable", 1, op(ObjectOp::PropertyIsEnumerable));
    b.method(proto, "watch", 2, op(ObjectOp::Watch));
    b.method(proto, "unwatch", 1, op(ObjectOp::Unwatch));
    constructor
}

pub(crate) fn call(op: ObjectOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        ObjectOp::New => construct(call, argc),
        ObjectOp::ToString | ObjectOp::ToLocaleString => {
            let this = call.this_object()?;
            Ok(JsValue::from(format!("[object {}]", this.class_name())))
        }
        ObjectOp::ValueOf => Ok(JsValue::Object(call.this_object()?)),
        ObjectOp::HasOwnProperty => {
            let key = call.get_arg(0, argc).to_property_key()?;
            Ok(JsValue::Boolean(call.this_object()?.has_own_property(key.as_str())?))
        }
        ObjectOp::IsPrototypeOf => {
            let this = call.this_object()?;
            let JsValue::Object(target) = call.get_arg(0, argc) else {
                return Ok(JsValue::Boolean(false));
            };
            Ok(JsValue::Boolean(inherits_from(&target, &this)))
        }
        ObjectOp::PropertyIsEnumerable => {
            let key = call.get_arg(0, argc).to_property_key()?;
            let enumerable = call
                .this_object()?
                .own_flags(key.as_str())
                .is_some_and(|flags| flags.is_enumerable());
            Ok(JsValue::Boolean(enumerable))
        }
        ObjectOp::Watch => {
            let key = call.get_arg(0, argc).to_property_key()?;
            let handler = call.get_arg(1, argc);
            if !handler.is_callable() {
                return Err(JsError::not_a_function(handler.describe()));
            }
            call.this_object()?.watch(key, handler);
            Ok(JsValue::Undefined)
        }
        ObjectOp::Unwatch => {
            let key = call.get_arg(0, argc).to_property_key()?;
            call.this_object()?.unwatch(key.as_str());
            Ok(JsValue::Undefined)
        }
    }
}

/// `Object(v)` and `new Object(v)`
pub(crate) fn construct(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let value = call.get_arg(0, argc);
    if value.is_null_or_undefined() {
        return Ok(JsValue::Object(call.realm()?.create_object()));
    }
    Ok(JsValue::Object(call.realm()?.wrap_primitive(&value)?))
}

/// True if `ancestor` is on `obj`'s prototype chain (excluding `obj`)
fn inherits_from(obj: &ObjectRef, ancestor: &ObjectRef) -> bool {
    let mut cursor = obj.prototype();
    let mut depth = 0;
    while let Some(proto) = cursor {
        if ObjectRef::ptr_eq(&proto, ancestor) {
            return true;
        }
        depth += 1;
        if depth > MAX_PROTOTYPE_DEPTH {
            return false;
        }
        cursor = proto.prototype();
    }
    false
}
