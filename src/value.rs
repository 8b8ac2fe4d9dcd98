//! Runtime value representation
//!
//! The core JsValue type, the shared string type, and the language-level
//! coercions and operators built on them.

use std::fmt;
use std::sync::Arc;

use crate::convert;
use crate::error::JsError;
use crate::object::ObjectRef;
use crate::realm::Realm;
use crate::string_dict;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This makes it explicit when a clone only bumps a reference count
/// (`JsString`, `ObjectRef`, `Arc<T>`) versus when it copies data.
pub trait CheapClone: Clone {
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Arc<T> {}

/// A runtime value
///
/// Closures and native functions are objects whose kind is a function;
/// see [`crate::object::ObjectKind`].
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(ObjectRef),
}

/// Preferred type for `ToPrimitive`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    Default,
    Number,
    String,
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// Check if this value is null or undefined
    pub fn is_null_or_undefined(&self) -> bool {
        matches!(self, JsValue::Null | JsValue::Undefined)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, JsValue::Object(_))
    }

    /// Check if this value can be invoked
    pub fn is_callable(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.is_callable(),
            _ => false,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the typeof result for this value
    pub fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Object(obj) => {
                if obj.is_callable() {
                    "function"
                } else {
                    "object"
                }
            }
        }
    }

    /// Convert to boolean (ToBoolean)
    pub fn to_boolean(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Boolean(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Object(_) => true,
        }
    }

    /// ToPrimitive: objects consult `valueOf`/`toString` in hint order
    pub fn to_primitive(&self, hint: Hint) -> Result<JsValue, JsError> {
        match self {
            JsValue::Object(obj) => obj.to_primitive(hint),
            other => Ok(other.clone()),
        }
    }

    /// Convert to number (ToNumber)
    pub fn to_number(&self) -> Result<f64, JsError> {
        Ok(match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Boolean(true) => 1.0,
            JsValue::Boolean(false) => 0.0,
            JsValue::Number(n) => *n,
            JsValue::String(s) => convert::string_to_number(s.as_str()),
            JsValue::Object(obj) => match obj.to_primitive(Hint::Number)? {
                JsValue::Object(_) => {
                    return Err(JsError::type_error("cannot convert object to number"));
                }
                prim => prim.to_number()?,
            },
        })
    }

    /// Convert to string (ToString)
    pub fn to_js_string(&self) -> Result<JsString, JsError> {
        Ok(match self {
            JsValue::Undefined => string_dict::intern("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(true) => JsString::from("true"),
            JsValue::Boolean(false) => JsString::from("false"),
            JsValue::Number(n) => number_to_js_string(*n),
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Object(obj) => match obj.to_primitive(Hint::String)? {
                JsValue::Object(_) => {
                    return Err(JsError::type_error("cannot convert object to string"));
                }
                prim => prim.to_js_string()?,
            },
        })
    }

    pub fn to_integer(&self) -> Result<f64, JsError> {
        Ok(convert::to_integer(self.to_number()?))
    }

    pub fn to_int32(&self) -> Result<i32, JsError> {
        Ok(convert::to_int32(self.to_number()?))
    }

    pub fn to_uint32(&self) -> Result<u32, JsError> {
        Ok(convert::to_uint32(self.to_number()?))
    }

    /// ToObject, wrapping primitives with the current realm's prototypes
    pub fn to_object(&self) -> Result<ObjectRef, JsError> {
        match self {
            JsValue::Object(obj) => Ok(obj.cheap_clone()),
            JsValue::Undefined | JsValue::Null => {
                Err(JsError::type_error(format!("{} has no properties", self.describe())))
            }
            primitive => Realm::current_or_err()?.wrap_primitive(primitive),
        }
    }

    /// The property name this value denotes
    pub fn to_property_key(&self) -> Result<JsString, JsError> {
        match self {
            JsValue::Number(n)
                if *n >= 0.0
                    && n.fract() == 0.0
                    && *n < string_dict::INDEX_CACHE_SIZE as f64 =>
            {
                Ok(string_dict::index_name(*n as u32))
            }
            other => other.to_js_string(),
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => ObjectRef::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Abstract equality (==), coercing across types
    pub fn loose_equals(&self, other: &JsValue) -> Result<bool, JsError> {
        match (self, other) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => Ok(true),
            (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => {
                Ok(false)
            }
            (JsValue::Number(_), JsValue::String(s)) => {
                Ok(self.strict_equals(&JsValue::Number(convert::string_to_number(s.as_str()))))
            }
            (JsValue::String(s), JsValue::Number(_)) => {
                Ok(JsValue::Number(convert::string_to_number(s.as_str())).strict_equals(other))
            }
            (JsValue::Boolean(b), _) => {
                JsValue::Number(if *b { 1.0 } else { 0.0 }).loose_equals(other)
            }
            (_, JsValue::Boolean(b)) => {
                self.loose_equals(&JsValue::Number(if *b { 1.0 } else { 0.0 }))
            }
            (JsValue::Object(_), JsValue::Number(_) | JsValue::String(_)) => {
                self.to_primitive(Hint::Default)?.loose_equals(other)
            }
            (JsValue::Number(_) | JsValue::String(_), JsValue::Object(_)) => {
                self.loose_equals(&other.to_primitive(Hint::Default)?)
            }
            _ => Ok(self.strict_equals(other)),
        }
    }

    /// The `+` operator
    pub fn add(&self, other: &JsValue) -> Result<JsValue, JsError> {
        let left = self.to_primitive(Hint::Default)?;
        let right = other.to_primitive(Hint::Default)?;
        if matches!(left, JsValue::String(_)) || matches!(right, JsValue::String(_)) {
            let left = left.to_js_string()?;
            let right = right.to_js_string()?;
            return Ok(JsValue::String(left + &right));
        }
        Ok(JsValue::Number(left.to_number()? + right.to_number()?))
    }

    /// Abstract relational comparison `self < other`.
    ///
    /// `None` means at least one operand was NaN.
    pub fn compare(&self, other: &JsValue) -> Result<Option<bool>, JsError> {
        let left = self.to_primitive(Hint::Number)?;
        let right = other.to_primitive(Hint::Number)?;
        if let (JsValue::String(a), JsValue::String(b)) = (&left, &right) {
            return Ok(Some(a.utf16_cmp(b) == std::cmp::Ordering::Less));
        }
        let a = left.to_number()?;
        let b = right.to_number()?;
        if a.is_nan() || b.is_nan() {
            return Ok(None);
        }
        Ok(Some(a < b))
    }

    pub fn less_than(&self, other: &JsValue) -> Result<bool, JsError> {
        Ok(self.compare(other)? == Some(true))
    }

    pub fn greater_than(&self, other: &JsValue) -> Result<bool, JsError> {
        Ok(other.compare(self)? == Some(true))
    }

    pub fn less_equal(&self, other: &JsValue) -> Result<bool, JsError> {
        Ok(other.compare(self)? == Some(false))
    }

    pub fn greater_equal(&self, other: &JsValue) -> Result<bool, JsError> {
        Ok(self.compare(other)? == Some(false))
    }

    /// Property lookup on any value. `None` is the "no such property" marker.
    pub fn get_property(&self, key: &str) -> Result<Option<JsValue>, JsError> {
        match self {
            JsValue::Object(obj) => obj.get_property(key),
            JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
                "{} has no properties",
                self.describe()
            ))),
            JsValue::String(s) => {
                if key == "length" {
                    return Ok(Some(JsValue::Number(s.utf16_len() as f64)));
                }
                if let Some(index) = convert::array_index(key) {
                    if let Some(unit) = s.char_at(index as usize) {
                        return Ok(Some(JsValue::String(unit)));
                    }
                }
                let realm = Realm::current_or_err()?;
                realm.intrinsics().string_prototype.get_property(key)
            }
            JsValue::Number(_) => {
                let realm = Realm::current_or_err()?;
                realm.intrinsics().number_prototype.get_property(key)
            }
            JsValue::Boolean(_) => {
                let realm = Realm::current_or_err()?;
                realm.intrinsics().boolean_prototype.get_property(key)
            }
        }
    }

    /// Like [`get_property`](Self::get_property) but a missing property reads as undefined
    pub fn get(&self, key: &str) -> Result<JsValue, JsError> {
        Ok(self.get_property(key)?.unwrap_or_default())
    }

    /// Property assignment. Writes to primitives are silently dropped.
    pub fn set_property(&self, key: JsString, value: JsValue) -> Result<(), JsError> {
        match self {
            JsValue::Object(obj) => obj.set_property(key, value),
            JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
                "{} has no properties",
                self.describe()
            ))),
            _ => Ok(()),
        }
    }

    /// Short description for error messages; never calls into script code.
    pub fn describe(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => convert::number_to_string(*n),
            JsValue::String(s) => s.to_string(),
            JsValue::Object(obj) => match obj.function_name() {
                Some(name) => name.to_string(),
                None => format!("[object {}]", obj.class_name()),
            },
        }
    }
}

fn number_to_js_string(n: f64) -> JsString {
    if n >= 0.0 && n.fract() == 0.0 && n < string_dict::INDEX_CACHE_SIZE as f64 {
        return string_dict::index_name(n as u32);
    }
    JsString::from(convert::number_to_string(n))
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<u32> for JsValue {
    fn from(n: u32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<usize> for JsValue {
    fn from(n: usize) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<ObjectRef> for JsValue {
    fn from(obj: ObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

impl From<()> for JsValue {
    fn from(_: ()) -> Self {
        JsValue::Undefined
    }
}

/// Reference-counted immutable string
///
/// Stored as UTF-8; operations that the language defines on UTF-16 code
/// units (`length`, `charAt`, `charCodeAt`, ordering) go through the
/// `utf16_*` helpers.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsString(Arc<str>);

impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_arc(&self) -> &Arc<str> {
        &self.0
    }

    pub fn ptr_eq(&self, other: &JsString) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Length in UTF-16 code units
    pub fn utf16_len(&self) -> usize {
        if self.0.is_ascii() {
            return self.0.len();
        }
        self.0.encode_utf16().count()
    }

    pub fn to_utf16(&self) -> Vec<u16> {
        self.0.encode_utf16().collect()
    }

    pub fn from_utf16(units: &[u16]) -> JsString {
        JsString::from(String::from_utf16_lossy(units))
    }

    /// Code unit at `index`, if in range
    pub fn code_unit_at(&self, index: usize) -> Option<u16> {
        if self.0.is_ascii() {
            return self.0.as_bytes().get(index).map(|b| *b as u16);
        }
        self.0.encode_utf16().nth(index)
    }

    /// One-unit string at `index`, if in range
    pub fn char_at(&self, index: usize) -> Option<JsString> {
        if self.0.is_ascii() {
            return self
                .0
                .get(index..index + 1)
                .map(JsString::from);
        }
        self.code_unit_at(index)
            .map(|unit| JsString::from_utf16(&[unit]))
    }

    /// Substring over UTF-16 code unit positions, clamped to the string
    pub fn utf16_slice(&self, start: usize, end: usize) -> JsString {
        let len = self.utf16_len();
        let end = end.min(len);
        let start = start.min(end);
        if self.0.is_ascii() {
            return JsString::from(self.0.get(start..end).unwrap_or(""));
        }
        let units = self.to_utf16();
        JsString::from_utf16(units.get(start..end).unwrap_or(&[]))
    }

    /// Code-unit order, as the relational operators define it
    pub fn utf16_cmp(&self, other: &JsString) -> std::cmp::Ordering {
        self.0.encode_utf16().cmp(other.0.encode_utf16())
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add<&str> for JsString {
    type Output = JsString;

    fn add(self, other: &str) -> JsString {
        let mut s = String::from(&*self.0);
        s.push_str(other);
        JsString::from(s)
    }
}

impl std::ops::Add<&JsString> for JsString {
    type Output = JsString;

    fn add(self, other: &JsString) -> JsString {
        let mut s = String::from(&*self.0);
        s.push_str(&other.0);
        JsString::from(s)
    }
}
