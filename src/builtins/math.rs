//! The Math object

use crate::call::Call;
use crate::error::JsError;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::JsValue;

use super::{Builder, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Abs = 1,
    Acos = 2,
    Asin = 3,
    Atan = 4,
    Atan2 = 5,
    Ceil = 6,
    Cos = 7,
    Exp = 8,
    Floor = 9,
    Log = 10,
    Max = 11,
    Min = 12,
    Pow = 13,
    Random = 14,
    Round = 15,
    Sin = 16,
    Sqrt = 17,
    Tan = 18,
}

const FUNCTIONS: &[(&str, u32, MathOp)] = &[
    ("abs", 1, MathOp::Abs),
    ("acos", 1, MathOp::Acos),
    ("asin", 1, MathOp::Asin),
    ("atan", 1, MathOp::Atan),
    ("atan2", 2, MathOp::Atan2),
    ("ceil", 1, MathOp::Ceil),
    ("cos", 1, MathOp::Cos),
    ("exp", 1, MathOp::Exp),
    ("floor", 1, MathOp::Floor),
    ("log", 1, MathOp::Log),
    ("max", 2, MathOp::Max),
    ("min", 2, MathOp::Min),
    ("pow", 2, MathOp::Pow),
    ("random", 0, MathOp::Random),
    ("round", 1, MathOp::Round),
    ("sin", 1, MathOp::Sin),
    ("sqrt", 1, MathOp::Sqrt),
    ("tan", 1, MathOp::Tan),
];

pub(crate) fn init(b: &Builder) -> ObjectRef {
    let math = b.object("Math", ObjectKind::Ordinary);
    let constants = [
        ("E", std::f64::consts::E),
        ("LN10", std::f64::consts::LN_10),
        ("LN2", std::f64::consts::LN_2),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("PI", std::f64::consts::PI),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
        ("SQRT2", std::f64::consts::SQRT_2),
    ];
    for (name, value) in constants {
        b.constant(&math, name, JsValue::Number(value));
    }
    for &(name, arity, op) in FUNCTIONS {
        b.method(&math, name, arity, NativeOp::Math(op));
    }
    math
}

pub(crate) fn call(op: MathOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let x = || call.arg_number(0, argc);
    let n = match op {
        MathOp::Abs => x()?.abs(),
        MathOp::Acos => libm::acos(x()?),
        MathOp::Asin => libm::asin(x()?),
        MathOp::Atan => libm::atan(x()?),
        MathOp::Atan2 => libm::atan2(x()?, call.arg_number(1, argc)?),
        MathOp::Ceil => libm::ceil(x()?),
        MathOp::Cos => libm::cos(x()?),
        MathOp::Exp => libm::exp(x()?),
        MathOp::Floor => libm::floor(x()?),
        MathOp::Log => libm::log(x()?),
        MathOp::Max => extremum(call, argc, f64::NEG_INFINITY, |a, b| {
            a > b || (a == 0.0 && b == 0.0 && b.is_sign_negative())
        })?,
        MathOp::Min => extremum(call, argc, f64::INFINITY, |a, b| {
            a < b || (a == 0.0 && b == 0.0 && a.is_sign_negative())
        })?,
        MathOp::Pow => pow(x()?, call.arg_number(1, argc)?),
        MathOp::Random => call.realm()?.random(),
        MathOp::Round => round(x()?),
        MathOp::Sin => libm::sin(x()?),
        MathOp::Sqrt => libm::sqrt(x()?),
        MathOp::Tan => libm::tan(x()?),
    };
    Ok(JsValue::Number(n))
}

/// Fold the arguments with `keep(a, b)` choosing `a` over `b`; any NaN wins.
fn extremum(
    call: &Call,
    argc: usize,
    empty: f64,
    keep: impl Fn(f64, f64) -> bool,
) -> Result<f64, JsError> {
    let mut best = empty;
    for i in 0..argc {
        let n = call.arg(i as isize).to_number()?;
        if n.is_nan() {
            return Ok(f64::NAN);
        }
        if !keep(best, n) {
            best = n;
        }
    }
    Ok(best)
}

fn pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    libm::pow(base, exponent)
}

/// Round half toward positive infinity, keeping the sign of zero.
fn round(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    let floor = libm::floor(x);
    if x - floor >= 0.5 { floor + 1.0 } else { floor }
}
