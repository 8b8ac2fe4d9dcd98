//! Array built-in methods
//!
//! The methods are generic: they work on any object through its `length`
//! and index properties, so they can be borrowed by array-likes.

use std::cmp::Ordering;

use crate::call::Call;
use crate::error::JsError;
use crate::object::{ObjectKind, ObjectRef};
use crate::string_dict;
use crate::value::{JsString, JsValue};

use super::{Builder, Intrinsic, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOp {
    New = 1,
    Join = 2,
    ToString = 3,
    Reverse = 4,
    Sort = 5,
    Concat = 6,
    Pop = 7,
    Push = 8,
    Shift = 9,
    Unshift = 10,
    Slice = 11,
    Splice = 12,
}

pub(crate) fn init(b: &Builder) -> Intrinsic {
    let array = b.class(
        "Array",
        1,
        NativeOp::Array(ArrayOp::New),
        ObjectKind::Array { length: 0 },
    );
    let proto = &array.prototype;
    let op = NativeOp::Array;
    b.method(proto, "join", 1, op(ArrayOp::Join));
    b.method(proto, "toString", 0, op(ArrayOp::ToString));
    b.method(proto, "reverse", 0, op(ArrayOp::Reverse));
    b.method(proto, "sort", 0, op(ArrayOp::Sort));
    b.method(proto, "concat", 0, op(ArrayOp::Concat));
    b.method(proto, "pop", 0, op(ArrayOp::Pop));
    b.method(proto, "push", 0, op(ArrayOp::Push));
    b.method(proto, "shift", 0, op(ArrayOp::Shift));
    b.method(proto, "unshift", 0, op(ArrayOp::Unshift));
    b.method(proto, "slice", 2, op(ArrayOp::Slice));
    b.method(proto, "splice", 0, op(ArrayOp::Splice));
    array
}

pub(crate) fn call(op: ArrayOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        ArrayOp::New => construct(call, argc),
        ArrayOp::Join => {
            let this = call.this_object()?;
            let separator = if argc == 0 {
                string_dict::intern(",")
            } else {
                call.arg(0).to_js_string()?
            };
            join(&this, separator.as_str()).map(JsValue::String)
        }
        ArrayOp::ToString => join(&call.this_object()?, ",").map(JsValue::String),
        ArrayOp::Reverse => reverse(call),
        ArrayOp::Sort => sort(call, argc),
        ArrayOp::Concat => concat(call, argc),
        ArrayOp::Pop => pop(call),
        ArrayOp::Push => push(call, argc),
        ArrayOp::Shift => shift(call),
        ArrayOp::Unshift => unshift(call, argc),
        ArrayOp::Slice => slice(call, argc),
        ArrayOp::Splice => splice(call, argc),
    }
}

/// `Array(...)` and `new Array(...)`
pub(crate) fn construct(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let array = call.realm()?.create_array(Vec::new());
    if argc == 1 {
        let arg = call.arg(0);
        if let JsValue::Number(n) = arg {
            let length = JsValue::Number(crate::convert::to_int32(n) as f64);
            array.set_property(string_dict::intern("length"), length)?;
        } else {
            set_index(&array, 0, arg)?;
        }
        return Ok(JsValue::Object(array));
    }
    for i in 0..argc {
        set_index(&array, i as i64, call.arg(i as isize))?;
    }
    Ok(JsValue::Object(array))
}

fn key(index: i64) -> JsString {
    if (0..=u32::MAX as i64).contains(&index) {
        string_dict::index_name(index as u32)
    } else {
        JsString::from(index.to_string())
    }
}

fn length_of(obj: &ObjectRef) -> Result<i64, JsError> {
    Ok(obj.get("length")?.to_int32()? as i64)
}

fn set_length(obj: &ObjectRef, length: i64) -> Result<(), JsError> {
    obj.set_property(string_dict::intern("length"), JsValue::Number(length as f64))
}

fn get_index(obj: &ObjectRef, index: i64) -> Result<Option<JsValue>, JsError> {
    obj.get_property(key(index).as_str())
}

fn set_index(obj: &ObjectRef, index: i64, value: JsValue) -> Result<(), JsError> {
    obj.set_property(key(index), value)
}

/// Move `from` to `to`, deleting `to` when `from` is absent.
fn move_index(obj: &ObjectRef, from: i64, to: i64) -> Result<(), JsError> {
    match get_index(obj, from)? {
        Some(value) => set_index(obj, to, value),
        None => obj.delete_property(key(to).as_str()).map(|_| ()),
    }
}

/// Join the elements with `separator`; a cycle back into an array being
/// joined renders as `...`.
pub(crate) fn join(array: &ObjectRef, separator: &str) -> Result<JsString, JsError> {
    if !array.begin_visit() {
        return Ok(string_dict::intern("..."));
    }
    let result = join_elements(array, separator);
    array.end_visit();
    result
}

fn join_elements(array: &ObjectRef, separator: &str) -> Result<JsString, JsError> {
    let length = length_of(array)?;
    let mut out = String::new();
    for i in 0..length {
        if i != 0 {
            out.push_str(separator);
        }
        match get_index(array, i)? {
            None | Some(JsValue::Undefined) | Some(JsValue::Null) => {}
            Some(value) => out.push_str(value.to_js_string()?.as_str()),
        }
    }
    Ok(JsString::from(out))
}

fn reverse(call: &mut Call) -> Result<JsValue, JsError> {
    let array = call.this_object()?;
    let length = length_of(&array)?;
    for k in 0..length / 2 {
        let low = k;
        let high = length - k - 1;
        let first = get_index(&array, low)?;
        let second = get_index(&array, high)?;
        match first {
            Some(value) => set_index(&array, high, value)?,
            None => {
                array.delete_property(key(high).as_str())?;
            }
        }
        match second {
            Some(value) => set_index(&array, low, value)?,
            None => {
                array.delete_property(key(low).as_str())?;
            }
        }
    }
    Ok(JsValue::Object(array))
}

fn sort(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let array = call.this_object()?;
    let comparator = match call.get_arg(0, argc) {
        JsValue::Undefined => None,
        cmp => Some(cmp),
    };
    let length = length_of(&array)?.max(0);
    let mut values = Vec::with_capacity(length as usize);
    for i in 0..length {
        values.push(get_index(&array, i)?.unwrap_or_default());
    }

    let len = values.len();
    qsort(call, &mut values, 0, len, comparator.as_ref())?;

    for (i, value) in values.into_iter().enumerate() {
        if value.is_undefined() {
            array.delete_property(key(i as i64).as_str())?;
        } else {
            set_index(&array, i as i64, value)?;
        }
    }
    Ok(JsValue::Object(array))
}

/// Identity test used by the sort partitioner
fn same(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Object(x), JsValue::Object(y)) => ObjectRef::ptr_eq(x, y),
        _ => a.strict_equals(b),
    }
}

/// Sort order: undefined last, then null, then the comparator (or string
/// order when there is none).
fn compare(
    call: &mut Call,
    comparator: Option<&JsValue>,
    a: &JsValue,
    b: &JsValue,
) -> Result<i32, JsError> {
    if same(a, b) {
        return Ok(0);
    }
    match (a, b) {
        (JsValue::Undefined, _) => return Ok(1),
        (_, JsValue::Undefined) => return Ok(-1),
        (JsValue::Null, _) => return Ok(1),
        (_, JsValue::Null) => return Ok(-1),
        _ => {}
    }
    match comparator {
        Some(cmp) => call
            .invoke(cmp, JsValue::Null, &[a.clone(), b.clone()])?
            .to_int32(),
        None => {
            let order = a.to_js_string()?.utf16_cmp(&b.to_js_string()?);
            Ok(match order {
                Ordering::Less => -1,
                Ordering::Equal => 0,
                Ordering::Greater => 1,
            })
        }
    }
}

/// Three-way partitioning quicksort.
///
/// The median of first, middle and last becomes the key; elements equal
/// to the key collect in a run (`keys`) just above the lower partition and
/// greater elements are swapped to the tail. Elements that compare equal
/// are never swapped past each other, so a comparator that always returns
/// zero leaves the input untouched.
fn qsort(
    call: &mut Call,
    values: &mut [JsValue],
    offset: usize,
    length: usize,
    comparator: Option<&JsValue>,
) -> Result<(), JsError> {
    if length == 2 {
        if compare(call, comparator, &values[offset], &values[offset + 1])? > 0 {
            values.swap(offset, offset + 1);
        }
        return Ok(());
    }
    if length < 2 {
        return Ok(());
    }

    let key_index = offset + length / 2;
    let last = offset + length - 1;
    let mut key = values[key_index].clone();
    let mut keys = 0usize;
    let mut tail = 0usize;

    let order = compare(call, comparator, &values[offset], &key)?;
    if order > 0 {
        values.swap(offset, key_index);
        key = values[key_index].clone();
    } else if order == 0 {
        keys += 1;
    }

    let order = compare(call, comparator, &key, &values[last])?;
    if order > 0 {
        values.swap(last, key_index);
        key = values[key_index].clone();
        keys = 0;
        tail = 1;

        let order = compare(call, comparator, &values[offset], &key)?;
        if order > 0 {
            values.swap(offset, key_index);
            key = values[key_index].clone();
        } else if order == 0 {
            keys += 1;
        }
    } else if order < 0 {
        tail = 1;
    }

    let mut i = if key_index == offset + 1 {
        keys += 1;
        2 + tail
    } else {
        1 + tail
    };

    while i < length {
        let index = offset + i - tail;
        i += 1;
        if same(&values[index], &key) {
            keys += 1;
            continue;
        }
        let order = compare(call, comparator, &key, &values[index])?;
        if order > 0 && keys != 0 {
            values.swap(index, index - keys);
        } else if order < 0 {
            values.swap(offset + length - tail - 1, index);
            tail += 1;
        } else if order == 0 {
            keys += 1;
        }
    }

    let low = length.saturating_sub(tail + keys);
    if low > 1 {
        qsort(call, values, offset, low, comparator)?;
    }
    if tail > 1 {
        qsort(call, values, offset + length - tail, tail, comparator)?;
    }
    Ok(())
}

fn concat(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let result = call.realm()?.create_array(Vec::new());
    let mut k: i64 = 0;
    for i in -1..argc as isize {
        let arg = call.arg(i);
        let JsValue::Object(obj) = arg else {
            if !arg.is_null_or_undefined() {
                set_index(&result, k, arg)?;
                k += 1;
            }
            continue;
        };
        let length = match obj.get_property("length")? {
            Some(length) => length.to_int32()? as i64,
            None => -1,
        };
        if length < 0 {
            set_index(&result, k, JsValue::Object(obj))?;
            k += 1;
            continue;
        }
        for j in 0..length {
            if let Some(value) = get_index(&obj, j)? {
                set_index(&result, k, value)?;
            }
            k += 1;
        }
    }
    set_length(&result, k)?;
    Ok(JsValue::Object(result))
}

fn pop(call: &mut Call) -> Result<JsValue, JsError> {
    let obj = call.this_object()?;
    let length = match obj.get_property("length")? {
        Some(length) => length.to_int32()? as i64,
        None => return Ok(JsValue::Undefined),
    };
    if length <= 0 {
        return Ok(JsValue::Undefined);
    }
    let value = get_index(&obj, length - 1)?.unwrap_or_default();
    set_length(&obj, length - 1)?;
    Ok(value)
}

fn push(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let obj = call.this_object()?;
    let length = length_of(&obj)?.max(0);
    for i in 0..argc {
        set_index(&obj, length + i as i64, call.arg(i as isize))?;
    }
    let new_length = length + argc as i64;
    set_length(&obj, new_length)?;
    Ok(JsValue::Number(new_length as f64))
}

fn shift(call: &mut Call) -> Result<JsValue, JsError> {
    let obj = call.this_object()?;
    let length = match obj.get_property("length")? {
        Some(length) => length.to_int32()? as i64,
        None => return Ok(JsValue::Undefined),
    };
    if length <= 0 {
        return Ok(JsValue::Undefined);
    }
    let value = get_index(&obj, 0)?.unwrap_or_default();
    for i in 1..length {
        move_index(&obj, i, i - 1)?;
    }
    set_length(&obj, length - 1)?;
    Ok(value)
}

fn unshift(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let obj = call.this_object()?;
    let length = length_of(&obj)?.max(0);
    if argc == 0 {
        return Ok(JsValue::Number(length as f64));
    }
    let shift = argc as i64;
    for i in (0..length).rev() {
        move_index(&obj, i, i + shift)?;
    }
    for i in 0..argc {
        set_index(&obj, i as i64, call.arg(i as isize))?;
    }
    let new_length = length + shift;
    set_length(&obj, new_length)?;
    Ok(JsValue::Number(new_length as f64))
}

/// Resolve a relative index: negative counts back from `length`, and the
/// result is clamped to `[0, length]`.
fn relative_index(value: i64, length: i64) -> i64 {
    if value < 0 {
        (value + length).max(0)
    } else {
        value.min(length)
    }
}

fn slice(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let obj = call.this_object()?;
    let length = length_of(&obj)?;
    let result = call.realm()?.create_array(Vec::new());
    if length <= 0 {
        return Ok(JsValue::Object(result));
    }
    let start = relative_index(call.arg_int32(0, argc)? as i64, length);
    let end = if argc > 1 {
        relative_index(call.arg(1).to_int32()? as i64, length)
    } else {
        length
    };
    if start >= end {
        return Ok(JsValue::Object(result));
    }
    for i in 0..end - start {
        if let Some(value) = get_index(&obj, start + i)? {
            set_index(&result, i, value)?;
        }
    }
    set_length(&result, end - start)?;
    Ok(JsValue::Object(result))
}

fn splice(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let obj = call.this_object()?;
    let realm = call.realm()?.clone();
    let removed = realm.create_array(Vec::new());
    if argc == 0 {
        return Ok(JsValue::Object(removed));
    }

    let length = length_of(&obj)?.max(0);
    let index = relative_index(call.arg(0).to_int32()? as i64, length);
    let count = if argc >= 2 {
        (call.arg(1).to_int32()? as i64).clamp(0, length - index)
    } else {
        length - index
    };
    let items: Vec<JsValue> = (2..argc).map(|i| call.arg(i as isize)).collect();

    for i in 0..count {
        let value = get_index(&obj, index + i)?.unwrap_or_default();
        set_index(&removed, i, value)?;
    }

    let delta = items.len() as i64 - count;
    if delta < 0 {
        for from in index + count..length {
            move_index(&obj, from, from + delta)?;
        }
    } else if delta > 0 {
        for from in (index + count..length).rev() {
            move_index(&obj, from, from + delta)?;
        }
    }

    for (i, item) in items.into_iter().enumerate() {
        set_index(&obj, index + i as i64, item)?;
    }
    set_length(&obj, length + delta)?;
    Ok(JsValue::Object(removed))
}
