//! Boolean constructor and Boolean.prototype methods

use crate::call::Call;
use crate::error::JsError;
use crate::object::ObjectKind;
use crate::value::JsValue;

use super::{Builder, Intrinsic, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    New = 1,
    ToString = 2,
    ValueOf = 3,
}

pub(crate) fn init(b: &Builder) -> Intrinsic {
    let boolean = b.class(
        "Boolean",
        1,
        NativeOp::Boolean(BooleanOp::New),
        ObjectKind::Boolean(false),
    );
    let op = NativeOp::Boolean;
    b.method(&boolean.prototype, "toString", 0, op(BooleanOp::ToString));
    b.method(&boolean.prototype, "valueOf", 0, op(BooleanOp::ValueOf));
    boolean
}

pub(crate) fn call(op: BooleanOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        BooleanOp::New => Ok(JsValue::Boolean(call.get_arg(0, argc).to_boolean())),
        BooleanOp::ToString => {
            let value = this_boolean(call, "Boolean.prototype.toString")?;
            Ok(JsValue::from(if value { "true" } else { "false" }))
        }
        BooleanOp::ValueOf => Ok(JsValue::Boolean(this_boolean(
            call,
            "Boolean.prototype.valueOf",
        )?)),
    }
}

/// `new Boolean(v)`
pub(crate) fn construct(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let value = JsValue::Boolean(call.get_arg(0, argc).to_boolean());
    Ok(JsValue::Object(call.realm()?.wrap_primitive(&value)?))
}

fn this_boolean(call: &Call, method: &str) -> Result<bool, JsError> {
    if let JsValue::Boolean(b) = call.this_value() {
        return Ok(b);
    }
    super::this_kind(call, method, |kind| match kind {
        ObjectKind::Boolean(b) => Some(*b),
        _ => None,
    })
}
