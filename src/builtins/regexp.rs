//! RegExp built-in.
//!
//! Matching is backed by `fancy-regex` when the `regex` feature is on.
//! Without it, compiling an expression fails with a TypeError; String
//! methods given a plain string still match it literally.

use std::sync::Arc;

use crate::call::Call;
use crate::error::JsError;
use crate::object::{JsObject, ObjectKind, ObjectRef};
use crate::property::PropertyFlags;
use crate::realm::Realm;
use crate::string_dict;
use crate::value::{CheapClone, JsString, JsValue};

use super::{Builder, Intrinsic, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegExpOp {
    New = 1,
    Exec = 2,
    Test = 3,
    ToString = 4,
    Compile = 5,
}

/// A match, in byte offsets into the subject string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExpMatch {
    pub start: usize,
    pub end: usize,
    /// Capture groups, group 0 first
    pub groups: Vec<Option<(usize, usize)>>,
}

impl RegExpMatch {
    pub fn group<'a>(&self, text: &'a str, index: usize) -> Option<&'a str> {
        let (start, end) = (*self.groups.get(index)?)?;
        text.get(start..end)
    }
}

#[cfg(feature = "regex")]
struct Matcher(fancy_regex::Regex);

#[cfg(feature = "regex")]
impl Matcher {
    fn compile(source: &str, ignore_case: bool, multiline: bool) -> Result<Self, JsError> {
        let mut pattern = translate_pattern(source);
        let mut prefix = String::new();
        if ignore_case {
            prefix.push('i');
        }
        if multiline {
            prefix.push('m');
        }
        if !prefix.is_empty() {
            pattern = format!("(?{}){}", prefix, pattern);
        }
        fancy_regex::Regex::new(&pattern)
            .map(Matcher)
            .map_err(|e| invalid_pattern(source, e))
    }

    fn find_at(&self, text: &str, start: usize) -> Result<Option<RegExpMatch>, JsError> {
        let captures = self
            .0
            .captures_from_pos(text, start)
            .map_err(|e| invalid_pattern(self.0.as_str(), e))?;
        let Some(captures) = captures else {
            return Ok(None);
        };
        let Some(whole) = captures.get(0) else {
            return Ok(None);
        };
        Ok(Some(RegExpMatch {
            start: whole.start(),
            end: whole.end(),
            groups: captures
                .iter()
                .map(|m| m.map(|m| (m.start(), m.end())))
                .collect(),
        }))
    }
}

#[cfg(feature = "regex")]
fn invalid_pattern(source: &str, error: impl std::fmt::Display) -> JsError {
    JsError::thrown(JsValue::from(format!(
        "SyntaxError: invalid regular expression /{}/: {}",
        source, error
    )))
}

#[cfg(not(feature = "regex"))]
struct Matcher;

#[cfg(not(feature = "regex"))]
impl Matcher {
    fn compile(_source: &str, _ignore_case: bool, _multiline: bool) -> Result<Self, JsError> {
        Err(JsError::type_error("RegExp support is not enabled"))
    }

    fn find_at(&self, _text: &str, _start: usize) -> Result<Option<RegExpMatch>, JsError> {
        Ok(None)
    }
}

/// A compiled regular expression
pub struct RegExpData {
    source: JsString,
    global: bool,
    ignore_case: bool,
    multiline: bool,
    matcher: Matcher,
}

impl std::fmt::Debug for RegExpData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags())
    }
}

impl RegExpData {
    pub fn new(source: &str, flags: &str) -> Result<Self, JsError> {
        let mut global = false;
        let mut ignore_case = false;
        let mut multiline = false;
        for flag in flags.chars() {
            let slot = match flag {
                'g' => &mut global,
                'i' => &mut ignore_case,
                'm' => &mut multiline,
                _ => {
                    return Err(JsError::thrown(JsValue::from(format!(
                        "SyntaxError: invalid regular expression flag `{}'",
                        flag
                    ))));
                }
            };
            if *slot {
                return Err(JsError::thrown(JsValue::from(format!(
                    "SyntaxError: duplicate regular expression flag `{}'",
                    flag
                ))));
            }
            *slot = true;
        }
        let matcher = Matcher::compile(source, ignore_case, multiline)?;
        Ok(Self {
            source: JsString::from(source),
            global,
            ignore_case,
            multiline,
            matcher,
        })
    }

    pub fn source(&self) -> &JsString {
        &self.source
    }

    pub fn global(&self) -> bool {
        self.global
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn multiline(&self) -> bool {
        self.multiline
    }

    pub fn flags(&self) -> String {
        let mut flags = String::new();
        if self.global {
            flags.push('g');
        }
        if self.ignore_case {
            flags.push('i');
        }
        if self.multiline {
            flags.push('m');
        }
        flags
    }

    /// First match starting at or after byte offset `start`
    pub fn find_at(&self, text: &str, start: usize) -> Result<Option<RegExpMatch>, JsError> {
        if start > text.len() {
            return Ok(None);
        }
        self.matcher.find_at(text, start)
    }
}

/// Translate pattern syntax the two dialects disagree on: an unescaped `[`
/// inside a character class is literal in script regexps.
#[cfg(feature = "regex")]
fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars();
    let mut in_class = false;
    let mut class_start = false;
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(c);
            if let Some(next) = chars.next() {
                out.push(next);
            }
            class_start = false;
            continue;
        }
        if !in_class {
            if c == '[' {
                in_class = true;
                class_start = true;
            }
            out.push(c);
            continue;
        }
        match c {
            '^' if class_start => out.push(c),
            ']' if class_start => {
                out.push(c);
                class_start = false;
            }
            ']' => {
                in_class = false;
                out.push(c);
            }
            '[' => {
                out.push_str("\\[");
                class_start = false;
            }
            _ => {
                out.push(c);
                class_start = false;
            }
        }
    }
    out
}

/// Byte offset of UTF-16 position `units` in `text`, clamped to the end
pub(crate) fn byte_offset(text: &str, units: usize) -> usize {
    let mut count = 0;
    for (offset, c) in text.char_indices() {
        if count >= units {
            return offset;
        }
        count += c.len_utf16();
    }
    text.len()
}

/// UTF-16 position of byte offset `offset` in `text`
pub(crate) fn unit_offset(text: &str, offset: usize) -> usize {
    text.get(..offset)
        .map(|prefix| prefix.encode_utf16().count())
        .unwrap_or_else(|| text.encode_utf16().count())
}

/// Byte offset just past the character at `offset`
pub(crate) fn next_boundary(text: &str, offset: usize) -> usize {
    text.get(offset..)
        .and_then(|rest| rest.chars().next())
        .map(|c| offset + c.len_utf8())
        .unwrap_or(offset + 1)
}

pub(crate) fn init(b: &Builder) -> Intrinsic {
    let regexp = b.class("RegExp", 2, NativeOp::RegExp(RegExpOp::New), ObjectKind::Ordinary);
    let proto = &regexp.prototype;
    let op = NativeOp::RegExp;
    b.method(proto, "exec", 1, op(RegExpOp::Exec));
    b.method(proto, "test", 1, op(RegExpOp::Test));
    b.method(proto, "toString", 0, op(RegExpOp::ToString));
    b.method(proto, "compile", 2, op(RegExpOp::Compile));
    regexp
}

/// The compiled expression behind a RegExp object
pub(crate) fn as_regexp(value: &JsValue) -> Option<Arc<RegExpData>> {
    match value {
        JsValue::Object(obj) => match &obj.borrow().kind {
            ObjectKind::RegExp(data) => Some(Arc::clone(data)),
            _ => None,
        },
        _ => None,
    }
}

fn install(obj: &ObjectRef, data: &RegExpData) {
    let fixed = PropertyFlags::CONSTANT;
    obj.put(string_dict::intern("source"), JsValue::String(data.source.cheap_clone()), fixed);
    obj.put(string_dict::intern("global"), JsValue::Boolean(data.global), fixed);
    obj.put(string_dict::intern("ignoreCase"), JsValue::Boolean(data.ignore_case), fixed);
    obj.put(string_dict::intern("multiline"), JsValue::Boolean(data.multiline), fixed);
    obj.put(
        string_dict::intern("lastIndex"),
        JsValue::Number(0.0),
        PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
    );
}

/// A new RegExp object in `realm`
pub fn create(realm: &Realm, data: RegExpData) -> ObjectRef {
    let data = Arc::new(data);
    let obj = ObjectRef::new(JsObject::with_kind(
        "RegExp",
        Some(realm.regexp().prototype.cheap_clone()),
        ObjectKind::RegExp(Arc::clone(&data)),
    ));
    install(&obj, &data);
    obj
}

/// Pattern and flags from constructor-style arguments
fn compile_args(pattern: &JsValue, flags: &JsValue) -> Result<RegExpData, JsError> {
    if let Some(existing) = as_regexp(pattern) {
        if !flags.is_undefined() {
            return Err(JsError::type_error(
                "cannot supply flags when constructing one RegExp from another",
            ));
        }
        return RegExpData::new(existing.source.as_str(), &existing.flags());
    }
    let source = match pattern {
        JsValue::Undefined => string_dict::intern(""),
        other => other.to_js_string()?,
    };
    let flags = match flags {
        JsValue::Undefined => string_dict::intern(""),
        other => other.to_js_string()?,
    };
    RegExpData::new(source.as_str(), flags.as_str())
}

pub(crate) fn construct(call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let data = compile_args(&call.get_arg(0, argc), &call.get_arg(1, argc))?;
    Ok(JsValue::Object(create(call.realm()?, data)))
}

fn this_regexp(call: &Call, method: &str) -> Result<(ObjectRef, Arc<RegExpData>), JsError> {
    let this = call.this_value();
    match (as_regexp(&this), this) {
        (Some(data), JsValue::Object(obj)) => Ok((obj, data)),
        _ => Err(JsError::type_error(format!(
            "RegExp.prototype.{} called on incompatible object",
            method
        ))),
    }
}

/// `RegExp.prototype.exec` semantics: honors and updates `lastIndex` for
/// global expressions, and returns the match with its byte offsets.
pub(crate) fn exec_raw(
    obj: &ObjectRef,
    data: &RegExpData,
    text: &JsString,
) -> Result<Option<RegExpMatch>, JsError> {
    let start = if data.global {
        obj.get("lastIndex")?.to_integer()?
    } else {
        0.0
    };
    if start < 0.0 || start > text.utf16_len() as f64 {
        obj.set_property(string_dict::intern("lastIndex"), JsValue::Number(0.0))?;
        return Ok(None);
    }
    let byte_start = byte_offset(text.as_str(), start as usize);
    match data.find_at(text.as_str(), byte_start)? {
        Some(m) => {
            if data.global {
                let last = unit_offset(text.as_str(), m.end);
                obj.set_property(string_dict::intern("lastIndex"), JsValue::Number(last as f64))?;
            }
            Ok(Some(m))
        }
        None => {
            obj.set_property(string_dict::intern("lastIndex"), JsValue::Number(0.0))?;
            Ok(None)
        }
    }
}

/// The array `exec` and `match` return: the match and its groups, plus
/// `index` and `input`.
pub(crate) fn match_array(realm: &Realm, text: &JsString, m: &RegExpMatch) -> ObjectRef {
    let elements = (0..m.groups.len())
        .map(|i| match m.group(text.as_str(), i) {
            Some(group) => JsValue::from(group),
            None => JsValue::Undefined,
        })
        .collect();
    let array = realm.create_array(elements);
    array.put(
        string_dict::intern("index"),
        JsValue::Number(unit_offset(text.as_str(), m.start) as f64),
        PropertyFlags::EMPTY,
    );
    array.put(
        string_dict::intern("input"),
        JsValue::String(text.cheap_clone()),
        PropertyFlags::EMPTY,
    );
    array
}

pub(crate) fn call(op: RegExpOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    match op {
        RegExpOp::New => {
            let pattern = call.get_arg(0, argc);
            if as_regexp(&pattern).is_some() && call.get_arg(1, argc).is_undefined() {
                return Ok(pattern);
            }
            construct(call, argc)
        }
        RegExpOp::Exec => {
            let (obj, data) = this_regexp(call, "exec")?;
            let text = call.get_arg(0, argc).to_js_string()?;
            match exec_raw(&obj, &data, &text)? {
                Some(m) => Ok(JsValue::Object(match_array(call.realm()?, &text, &m))),
                None => Ok(JsValue::Null),
            }
        }
        RegExpOp::Test => {
            let (obj, data) = this_regexp(call, "test")?;
            let text = call.get_arg(0, argc).to_js_string()?;
            Ok(JsValue::Boolean(exec_raw(&obj, &data, &text)?.is_some()))
        }
        RegExpOp::ToString => {
            let (_, data) = this_regexp(call, "toString")?;
            Ok(JsValue::from(format!("/{}/{}", data.source, data.flags())))
        }
        RegExpOp::Compile => {
            let (obj, _) = this_regexp(call, "compile")?;
            let data = compile_args(&call.get_arg(0, argc), &call.get_arg(1, argc))?;
            install(&obj, &data);
            obj.borrow_mut().kind = ObjectKind::RegExp(Arc::new(data));
            Ok(JsValue::Object(obj))
        }
    }
}
