//! Number constructor, its constants and Number.prototype methods

use crate::call::Call;
use crate::convert;
use crate::error::JsError;
use crate::format;
use crate::object::ObjectKind;
use crate::value::JsValue;

use super::{Builder, Intrinsic, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOp {
    New = 1,
    ToString = 2,
    ValueOf = 3,
    ToFixed = 4,
    ToExponential = 5,
    ToPrecision = 6,
    ToLocaleString = 7,
}

pub(crate) fn init(b: &Builder) -> Intrinsic {
    let number = b.class(
        "Number",
        1,
        NativeOp::Number(NumberOp::New),
        ObjectKind::Number(0.0),
    );
    let ctor = &number.constructor;
    b.constant(ctor, "MAX_VALUE", JsValue::Number(f64::MAX));
    b.constant(ctor, "MIN_VALUE", JsValue::Number(f64::from_bits(1)));
    b.constant(ctor, "NaN", JsValue::Number(f64::NAN));
    b.constant(ctor, "POSITIVE_INFINITY", JsValue::Number(f64::INFINITY));
    b.constant(ctor, "NEGATIVE_INFINITY", JsValue::Number(f64::NEG_INFINITY));

    let proto = &number.prototype;
    let op = NativeOp::Number;
    b.method(proto, "toString", 1, op(NumberOp::ToString));
    b.method(proto, "toLocaleString", 0, op(NumberOp::ToLocaleString));
    b.method(proto, "valueOf", 0, op(NumberOp::ValueOf));
    b.method(proto, "toFixed", 1, op(NumberOp::ToFixed));
    b.method(proto, "toExponential", 1, op(NumberOp::ToExponential));
    b.method(proto, "toPrecision", 1, op(NumberOp::ToPrecision));
    number
}

pub(crate) fn call(op: NumberOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        NumberOp::New => {
            if argc == 0 {
                return Ok(JsValue::Number(0.0));
            }
            Ok(JsValue::Number(call.arg(0).to_number()?))
        }
        NumberOp::ValueOf => Ok(JsValue::Number(this_number(call, "valueOf")?)),
        NumberOp::ToString => {
            let n = this_number(call, "toString")?;
            let radix = match call.get_arg(0, argc) {
                JsValue::Undefined => 10.0,
                other => other.to_integer()?,
            };
            if !(2.0..=36.0).contains(&radix) {
                return Err(JsError::range_error(format!(
                    "toString() radix must be between 2 and 36, got {}",
                    convert::number_to_string(radix)
                )));
            }
            Ok(JsValue::from(convert::number_to_radix_string(n, radix as u32)))
        }
        NumberOp::ToLocaleString => {
            let n = this_number(call, "toLocaleString")?;
            Ok(JsValue::from(convert::number_to_string(n)))
        }
        NumberOp::ToFixed => {
            let n = this_number(call, "toFixed")?;
            let digits = digits_arg(call, argc, "toFixed", 0, 20)?.unwrap_or(0);
            Ok(JsValue::from(format::to_fixed(n, digits)))
        }
        NumberOp::ToExponential => {
            let n = this_number(call, "toExponential")?;
            let digits = digits_arg(call, argc, "toExponential", 0, 20)?;
            Ok(JsValue::from(format::to_exponential(n, digits)))
        }
        NumberOp::ToPrecision => {
            let n = this_number(call, "toPrecision")?;
            match digits_arg(call, argc, "toPrecision", 1, 21)? {
                Some(precision) => Ok(JsValue::from(format::to_precision(n, precision))),
                None => Ok(JsValue::from(convert::number_to_string(n))),
            }
        }
    }
}

/// `new Number(v)`
pub(crate) fn construct(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let value = if argc == 0 {
        0.0
    } else {
        call.arg(0).to_number()?
    };
    Ok(JsValue::Object(call.realm()?.wrap_primitive(&JsValue::Number(value))?))
}

fn this_number(call: &Call, method: &str) -> Result<f64, JsError> {
    if let JsValue::Number(n) = call.this_value() {
        return Ok(n);
    }
    super::this_kind(call, &format!("Number.prototype.{}", method), |kind| match kind {
        ObjectKind::Number(n) => Some(*n),
        _ => None,
    })
}

/// An optional digit count in `min..=max`; undefined means absent.
fn digits_arg(
    call: &Call,
    argc: usize,
    method: &str,
    min: usize,
    max: usize,
) -> Result<Option<usize>, JsError> {
    let value = call.get_arg(0, argc);
    if value.is_undefined() {
        return Ok(None);
    }
    let digits = value.to_integer()?;
    if digits < min as f64 || digits > max as f64 {
        return Err(JsError::range_error(format!(
            "{}() digits argument must be between {} and {}",
            method, min, max
        )));
    }
    Ok(Some(digits as usize))
}
