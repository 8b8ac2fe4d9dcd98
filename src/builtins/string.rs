//! String constructor and String.prototype methods
//!
//! Positions and lengths are in UTF-16 code units. Methods convert `this`
//! with ToString, so they work on primitives, wrappers and any other
//! receiver they are borrowed by.

use std::sync::Arc;

use crate::call::Call;
use crate::error::JsError;
use crate::format;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::{CheapClone, JsString, JsValue};

use super::regexp::{self, RegExpData, RegExpMatch};
use super::{Builder, Intrinsic, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    New = 1,
    ToString = 2,
    FromCharCode = 3,
    ValueOf = 4,
    CharAt = 5,
    CharCodeAt = 6,
    IndexOf = 7,
    LastIndexOf = 8,
    Split = 9,
    Substring = 10,
    ToUpperCase = 11,
    ToLowerCase = 12,
    Concat = 13,
    Match = 14,
    Replace = 15,
    Search = 16,
    Slice = 17,
    Substr = 18,
    Printf = 19,
    Contains = 20,
    StartsWith = 21,
    EndsWith = 22,
    GetBytes = 23,
}

pub(crate) fn init(b: &Builder) -> Intrinsic {
    let string = b.class(
        "String",
        1,
        NativeOp::String(StringOp::New),
        ObjectKind::String(JsString::from("")),
    );
    let op = NativeOp::String;
    b.method(&string.constructor, "fromCharCode", 0, op(StringOp::FromCharCode));
    b.method(&string.constructor, "printf", 1, op(StringOp::Printf));

    let proto = &string.prototype;
    b.method(proto, "valueOf", 0, op(StringOp::ValueOf));
    b.method(proto, "toString", 0, op(StringOp::ToString));
    b.method(proto, "charAt", 1, op(StringOp::CharAt));
    b.method(proto, "charCodeAt", 1, op(StringOp::CharCodeAt));
    b.method(proto, "indexOf", 2, op(StringOp::IndexOf));
    b.method(proto, "lastIndexOf", 2, op(StringOp::LastIndexOf));
    b.method(proto, "split", 1, op(StringOp::Split));
    b.method(proto, "substring", 2, op(StringOp::Substring));
    b.method(proto, "toUpperCase", 0, op(StringOp::ToUpperCase));
    b.method(proto, "toLowerCase", 0, op(StringOp::ToLowerCase));
    b.method(proto, "concat", 1, op(StringOp::Concat));
    b.method(proto, "match", 1, op(StringOp::Match));
    b.method(proto, "replace", 2, op(StringOp::Replace));
    b.method(proto, "search", 1, op(StringOp::Search));
    b.method(proto, "slice", 2, op(StringOp::Slice));
    b.method(proto, "substr", 2, op(StringOp::Substr));
    b.method(proto, "contains", 1, op(StringOp::Contains));
    b.method(proto, "startsWith", 1, op(StringOp::StartsWith));
    b.method(proto, "endsWith", 1, op(StringOp::EndsWith));
    b.method(proto, "getBytes", 1, op(StringOp::GetBytes));
    string
}

pub(crate) fn call(op: StringOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        StringOp::New => {
            if argc == 0 {
                return Ok(JsValue::from(""));
            }
            Ok(JsValue::String(call.arg(0).to_js_string()?))
        }
        StringOp::FromCharCode => {
            let units = (0..argc)
                .map(|i| Ok(call.arg(i as isize).to_uint32()? as u16))
                .collect::<Result<Vec<u16>, JsError>>()?;
            Ok(JsValue::String(JsString::from_utf16(&units)))
        }
        StringOp::ToString | StringOp::ValueOf => this_string_value(call),
        StringOp::Printf => {
            if argc == 0 {
                return Ok(JsValue::from(""));
            }
            let pattern = call.arg(0).to_js_string()?;
            let args: Vec<JsValue> = (1..argc).map(|i| call.arg(i as isize)).collect();
            Ok(JsValue::from(format::sprintf(pattern.as_str(), &args)?))
        }
        StringOp::ToUpperCase => Ok(JsValue::from(this_string(call)?.as_str().to_uppercase())),
        StringOp::ToLowerCase => Ok(JsValue::from(this_string(call)?.as_str().to_lowercase())),
        StringOp::CharAt => char_at(call, argc),
        StringOp::CharCodeAt => char_code_at(call, argc),
        StringOp::IndexOf => index_of(call, argc),
        StringOp::LastIndexOf => last_index_of(call, argc),
        StringOp::Split => split(call, argc),
        StringOp::Substring => substring(call, argc),
        StringOp::Concat => {
            let mut out = this_string(call)?.to_string();
            for i in 0..argc {
                out.push_str(call.arg(i as isize).to_js_string()?.as_str());
            }
            Ok(JsValue::from(out))
        }
        StringOp::Match => match_(call, argc),
        StringOp::Replace => replace(call, argc),
        StringOp::Search => search(call, argc),
        StringOp::Slice => slice(call, argc),
        StringOp::Substr => substr(call, argc),
        StringOp::Contains | StringOp::StartsWith | StringOp::EndsWith => {
            let text = this_string(call)?;
            if argc < 1 {
                return Ok(JsValue::Boolean(false));
            }
            let needle = call.arg(0).to_js_string()?;
            let found = match op {
                StringOp::Contains => text.as_str().contains(needle.as_str()),
                StringOp::StartsWith => text.as_str().starts_with(needle.as_str()),
                _ => text.as_str().ends_with(needle.as_str()),
            };
            Ok(JsValue::Boolean(found))
        }
        StringOp::GetBytes => get_bytes(call, argc),
    }
}

/// `new String(v)`
pub(crate) fn construct(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let value = if argc == 0 {
        JsString::from("")
    } else {
        call.arg(0).to_js_string()?
    };
    Ok(JsValue::Object(call.realm()?.wrap_primitive(&JsValue::String(value))?))
}

fn this_string(call: &Call) -> Result<JsString, JsError> {
    call.this_value().to_js_string()
}

/// `toString`/`valueOf` only accept strings and String wrappers.
fn this_string_value(call: &Call) -> Result<JsValue, JsError> {
    match call.this_value() {
        JsValue::String(s) => Ok(JsValue::String(s)),
        JsValue::Object(obj) => match &obj.borrow().kind {
            ObjectKind::String(s) => Ok(JsValue::String(s.cheap_clone())),
            _ => Err(JsError::type_error("toString expects string object")),
        },
        _ => Err(JsError::type_error("toString expects string object")),
    }
}

/// An integer position argument, clamped into `i64`
fn position(value: &JsValue) -> Result<i64, JsError> {
    let n = value.to_integer()?;
    Ok(n.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

fn clamp(n: i64, len: usize) -> usize {
    n.clamp(0, len as i64) as usize
}

fn char_at(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::from(""));
    }
    let index = position(&call.arg(0))?;
    let ch = usize::try_from(index).ok().and_then(|i| text.char_at(i));
    Ok(JsValue::String(ch.unwrap_or_else(|| JsString::from(""))))
}

fn char_code_at(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::Number(f64::NAN));
    }
    let index = position(&call.arg(0))?;
    let unit = usize::try_from(index).ok().and_then(|i| text.code_unit_at(i));
    Ok(JsValue::Number(unit.map_or(f64::NAN, f64::from)))
}

/// First occurrence of `needle` in `hay` at or after `from`
fn find_units(hay: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    let last = hay.len() - needle.len();
    (from..=last).find(|&i| hay.get(i..i + needle.len()) == Some(needle))
}

/// Last occurrence of `needle` in `hay` starting at or before `from`
fn rfind_units(hay: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > hay.len() {
        return None;
    }
    let last = (hay.len() - needle.len()).min(from);
    (0..=last)
        .rev()
        .find(|&i| hay.get(i..i + needle.len()) == Some(needle))
}

fn index_of(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::Number(-1.0));
    }
    let needle = call.arg(0).to_js_string()?;
    let hay = text.to_utf16();
    let from = if argc > 1 {
        clamp(position(&call.arg(1))?, hay.len())
    } else {
        0
    };
    let found = find_units(&hay, &needle.to_utf16(), from);
    Ok(JsValue::Number(found.map_or(-1.0, |i| i as f64)))
}

fn last_index_of(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::Number(-1.0));
    }
    let needle = call.arg(0).to_js_string()?;
    let hay = text.to_utf16();
    let from = match call.get_arg(1, argc) {
        JsValue::Undefined => hay.len() as i64,
        other => {
            let n = other.to_number()?;
            if n.is_nan() {
                hay.len() as i64
            } else {
                position(&other)?
            }
        }
    };
    if from < 0 {
        return Ok(JsValue::Number(-1.0));
    }
    let found = rfind_units(&hay, &needle.to_utf16(), from as usize);
    Ok(JsValue::Number(found.map_or(-1.0, |i| i as f64)))
}

fn substring(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::String(text));
    }
    let len = text.utf16_len();
    let start = clamp(position(&call.arg(0))?, len);
    let end = match call.get_arg(1, argc) {
        JsValue::Undefined => len,
        other => clamp(position(&other)?, len),
    };
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    Ok(JsValue::String(text.utf16_slice(start, end)))
}

/// A position where negative values count back from `len`
fn relative(n: i64, len: usize) -> usize {
    if n < 0 {
        clamp(n.saturating_add(len as i64), len)
    } else {
        clamp(n, len)
    }
}

fn slice(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::String(text));
    }
    let len = text.utf16_len();
    let start = relative(position(&call.arg(0))?, len);
    let end = match call.get_arg(1, argc) {
        JsValue::Undefined => len,
        other => relative(position(&other)?, len),
    };
    if start >= end {
        return Ok(JsValue::from(""));
    }
    Ok(JsValue::String(text.utf16_slice(start, end)))
}

fn substr(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::String(text));
    }
    let len = text.utf16_len();
    let start = relative(position(&call.arg(0))?, len);
    let count = match call.get_arg(1, argc) {
        JsValue::Undefined => len as i64,
        other => position(&other)?,
    };
    if count <= 0 {
        return Ok(JsValue::from(""));
    }
    let end = clamp((start as i64).saturating_add(count), len);
    Ok(JsValue::String(text.utf16_slice(start, end)))
}

fn split(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    let separator = call.get_arg(0, argc);
    let limit = match call.get_arg(1, argc) {
        JsValue::Undefined => u32::MAX as usize,
        other => other.to_uint32()? as usize,
    };
    let realm = call.realm()?;
    if limit == 0 {
        return Ok(JsValue::Object(realm.create_array(Vec::new())));
    }
    if separator.is_undefined() {
        return Ok(JsValue::Object(realm.create_array(vec![JsValue::String(text)])));
    }

    let mut parts: Vec<JsValue> = Vec::new();
    if let Some(data) = regexp::as_regexp(&separator) {
        split_regexp(&data, &text, limit, &mut parts)?;
    } else {
        let separator = separator.to_js_string()?;
        if separator.is_empty() {
            parts.extend(
                text.to_utf16()
                    .iter()
                    .take(limit)
                    .map(|unit| JsValue::String(JsString::from_utf16(&[*unit]))),
            );
        } else {
            parts.extend(
                text.as_str()
                    .split(separator.as_str())
                    .take(limit)
                    .map(JsValue::from),
            );
        }
    }
    Ok(JsValue::Object(realm.create_array(parts)))
}

fn split_regexp(
    data: &RegExpData,
    text: &JsString,
    limit: usize,
    parts: &mut Vec<JsValue>,
) -> Result<(), JsError> {
    let s = text.as_str();
    if s.is_empty() {
        if data.find_at(s, 0)?.is_none() {
            parts.push(JsValue::String(text.cheap_clone()));
        }
        return Ok(());
    }
    let mut p = 0;
    let mut q = 0;
    while q < s.len() {
        let Some(m) = data.find_at(s, q)? else {
            break;
        };
        if m.start >= s.len() {
            break;
        }
        if m.end == p {
            q = regexp::next_boundary(s, m.start);
            continue;
        }
        parts.push(JsValue::from(s.get(p..m.start).unwrap_or("")));
        if parts.len() >= limit {
            return Ok(());
        }
        for i in 1..m.groups.len() {
            parts.push(match m.group(s, i) {
                Some(group) => JsValue::from(group),
                None => JsValue::Undefined,
            });
            if parts.len() >= limit {
                return Ok(());
            }
        }
        p = m.end;
        q = p;
    }
    parts.push(JsValue::from(s.get(p..).unwrap_or("")));
    Ok(())
}

/// The RegExp object a `match`/`search` argument stands for
fn regexp_arg(call: &Call, pattern: &JsValue) -> Result<(ObjectRef, Arc<RegExpData>), JsError> {
    if let (Some(data), JsValue::Object(obj)) = (regexp::as_regexp(pattern), pattern) {
        return Ok((obj.cheap_clone(), data));
    }
    let source = match pattern {
        JsValue::Undefined => JsString::from(""),
        other => other.to_js_string()?,
    };
    let obj = regexp::create(call.realm()?, RegExpData::new(source.as_str(), "")?);
    let data = regexp::as_regexp(&JsValue::Object(obj.cheap_clone()))
        .ok_or_else(|| JsError::internal_error("RegExp object lost its expression"))?;
    Ok((obj, data))
}

fn match_(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    let (obj, data) = regexp_arg(call, &call.get_arg(0, argc))?;
    let realm = call.realm()?;
    if !data.global() {
        return Ok(match regexp::exec_raw(&obj, &data, &text)? {
            Some(m) => JsValue::Object(regexp::match_array(realm, &text, &m)),
            None => JsValue::Null,
        });
    }

    let s = text.as_str();
    let mut matches = Vec::new();
    let mut at = 0;
    while at <= s.len() {
        let Some(m) = data.find_at(s, at)? else {
            break;
        };
        matches.push(JsValue::from(s.get(m.start..m.end).unwrap_or("")));
        at = if m.end == m.start {
            regexp::next_boundary(s, m.end)
        } else {
            m.end
        };
    }
    obj.set_property(JsString::from("lastIndex"), JsValue::Number(0.0))?;
    if matches.is_empty() {
        return Ok(JsValue::Null);
    }
    Ok(JsValue::Object(realm.create_array(matches)))
}

fn search(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::Number(-1.0));
    }
    let (_, data) = regexp_arg(call, &call.arg(0))?;
    let found = data
        .find_at(text.as_str(), 0)?
        .map(|m| regexp::unit_offset(text.as_str(), m.start));
    Ok(JsValue::Number(found.map_or(-1.0, |i| i as f64)))
}

fn replace(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    if argc == 0 {
        return Ok(JsValue::String(text));
    }
    let pattern = call.arg(0);
    let replacement = call.get_arg(1, argc);
    let s = text.as_str();

    let mut matches = Vec::new();
    match regexp::as_regexp(&pattern) {
        Some(data) => {
            let mut at = 0;
            while at <= s.len() {
                let Some(m) = data.find_at(s, at)? else {
                    break;
                };
                at = if m.end == m.start {
                    regexp::next_boundary(s, m.end)
                } else {
                    m.end
                };
                matches.push(m);
                if !data.global() {
                    break;
                }
            }
            if data.global() {
                pattern.set_property(JsString::from("lastIndex"), JsValue::Number(0.0))?;
            }
        }
        None => {
            let needle = pattern.to_js_string()?;
            if let Some(start) = s.find(needle.as_str()) {
                let end = start + needle.len();
                matches.push(RegExpMatch {
                    start,
                    end,
                    groups: vec![Some((start, end))],
                });
            }
        }
    }

    let template = if replacement.is_callable() {
        None
    } else if replacement.is_undefined() {
        Some(JsString::from("undefined"))
    } else {
        Some(replacement.to_js_string()?)
    };

    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for m in &matches {
        out.push_str(s.get(last..m.start).unwrap_or(""));
        match &template {
            Some(template) => expand(&mut out, template.as_str(), s, m),
            None => {
                let mut args: Vec<JsValue> = (0..m.groups.len())
                    .map(|i| match m.group(s, i) {
                        Some(group) => JsValue::from(group),
                        None => JsValue::Undefined,
                    })
                    .collect();
                args.push(JsValue::Number(regexp::unit_offset(s, m.start) as f64));
                args.push(JsValue::String(text.cheap_clone()));
                let value = call.invoke(&replacement, JsValue::Undefined, &args)?;
                out.push_str(value.to_js_string()?.as_str());
            }
        }
        last = m.end;
    }
    out.push_str(s.get(last..).unwrap_or(""));
    Ok(JsValue::from(out))
}

/// Expand `$$ $& $` $' $n $nn` in a replacement string.
fn expand(out: &mut String, template: &str, subject: &str, m: &RegExpMatch) {
    let chars: Vec<char> = template.chars().collect();
    let captures = m.groups.len().saturating_sub(1);
    let mut i = 0;
    while let Some(&c) = chars.get(i) {
        i += 1;
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.get(i) {
            Some('$') => {
                out.push('$');
                i += 1;
            }
            Some('&') => {
                out.push_str(subject.get(m.start..m.end).unwrap_or(""));
                i += 1;
            }
            Some('`') => {
                out.push_str(subject.get(..m.start).unwrap_or(""));
                i += 1;
            }
            Some('\'') => {
                out.push_str(subject.get(m.end..).unwrap_or(""));
                i += 1;
            }
            Some(d) if d.is_ascii_digit() => {
                let first = d.to_digit(10).unwrap_or(0) as usize;
                let second = chars.get(i + 1).and_then(|c| c.to_digit(10));
                let (group, used) = match second {
                    Some(second) if (1..=captures).contains(&(first * 10 + second as usize)) => {
                        (first * 10 + second as usize, 2)
                    }
                    _ => (first, 1),
                };
                if (1..=captures).contains(&group) {
                    out.push_str(m.group(subject, group).unwrap_or(""));
                    i += used;
                } else {
                    out.push('$');
                }
            }
            _ => out.push('$'),
        }
    }
}

fn get_bytes(call: &Call, argc: usize) -> Result<JsValue, JsError> {
    let text = this_string(call)?;
    let encoding = match call.get_arg(0, argc) {
        JsValue::Undefined => JsString::from("utf-8"),
        other => other.to_js_string()?,
    };
    let bytes: Vec<JsValue> = match encoding.as_str().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => text.as_str().bytes().map(|b| JsValue::Number(f64::from(b))).collect(),
        "iso-8859-1" | "latin1" | "us-ascii" | "ascii" => text
            .to_utf16()
            .into_iter()
            .map(|unit| JsValue::Number(if unit > 0xff { f64::from(b'?') } else { f64::from(unit) }))
            .collect(),
        other => {
            return Err(JsError::range_error(format!("unsupported encoding `{}'", other)));
        }
    };
    Ok(JsValue::Object(call.realm()?.create_array(bytes)))
}
