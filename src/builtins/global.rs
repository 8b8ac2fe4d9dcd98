//! Global functions and constants: `parseInt`, `escape`, `NaN`, ...
//!
//! They live on a holder object in the gold realm that every realm's
//! global object falls back to.

use crate::call::Call;
use crate::convert;
use crate::error::JsError;
use crate::object::{ObjectKind, ObjectRef};
use crate::value::{JsString, JsValue};

use super::{Builder, NativeOp};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalOp {
    ParseInt = 1,
    ParseFloat = 2,
    IsNaN = 3,
    IsFinite = 4,
    Escape = 5,
    Unescape = 6,
    EncodeUri = 7,
    DecodeUri = 8,
    EncodeUriComponent = 9,
    DecodeUriComponent = 10,
    Eval = 11,
}

pub(crate) fn init(b: &Builder) -> ObjectRef {
    let globals = b.object("Object", ObjectKind::Ordinary);
    b.constant(&globals, "NaN", JsValue::Number(f64::NAN));
    b.constant(&globals, "Infinity", JsValue::Number(f64::INFINITY));
    b.constant(&globals, "undefined", JsValue::Undefined);

    let op = NativeOp::Global;
    b.method(&globals, "parseInt", 2, op(GlobalOp::ParseInt));
    b.method(&globals, "parseFloat", 1, op(GlobalOp::ParseFloat));
    b.method(&globals, "isNaN", 1, op(GlobalOp::IsNaN));
    b.method(&globals, "isFinite", 1, op(GlobalOp::IsFinite));
    b.method(&globals, "escape", 1, op(GlobalOp::Escape));
    b.method(&globals, "unescape", 1, op(GlobalOp::Unescape));
    b.method(&globals, "encodeURI", 1, op(GlobalOp::EncodeUri));
    b.method(&globals, "decodeURI", 1, op(GlobalOp::DecodeUri));
    b.method(&globals, "encodeURIComponent", 1, op(GlobalOp::EncodeUriComponent));
    b.method(&globals, "decodeURIComponent", 1, op(GlobalOp::DecodeUriComponent));
    b.method(&globals, "eval", 1, op(GlobalOp::Eval));
    globals
}

pub(crate) fn call(op: GlobalOp, call: &mut Call, argc: usize) -> Result<JsValue, JsError> {
    let text = || call.arg_string(0, argc);
    match op {
        GlobalOp::ParseInt => {
            let input = text()?;
            let radix = call.arg_int32(1, argc)?;
            Ok(JsValue::Number(convert::parse_int(input.as_str(), radix)))
        }
        GlobalOp::ParseFloat => Ok(JsValue::Number(convert::parse_float(text()?.as_str()))),
        GlobalOp::IsNaN => Ok(JsValue::Boolean(call.arg_number(0, argc)?.is_nan())),
        GlobalOp::IsFinite => Ok(JsValue::Boolean(call.arg_number(0, argc)?.is_finite())),
        GlobalOp::Escape => Ok(JsValue::from(escape(&text()?))),
        GlobalOp::Unescape => Ok(JsValue::String(unescape(text()?.as_str()))),
        GlobalOp::EncodeUri => Ok(JsValue::from(encode_uri(&text()?, URI_RESERVED)?)),
        GlobalOp::EncodeUriComponent => Ok(JsValue::from(encode_uri(&text()?, "")?)),
        GlobalOp::DecodeUri => Ok(JsValue::from(decode_uri(text()?.as_str(), URI_RESERVED)?)),
        GlobalOp::DecodeUriComponent => Ok(JsValue::from(decode_uri(text()?.as_str(), "")?)),
        GlobalOp::Eval => Err(JsError::type_error("eval requires a script compiler")),
    }
}

const ESCAPE_SAFE: &str = "@*_+-./";

/// `escape`: Latin-1 units as `%XX`, the rest as `%uXXXX`
pub fn escape(text: &JsString) -> String {
    let mut out = String::with_capacity(text.len());
    for unit in text.to_utf16() {
        match char::from_u32(u32::from(unit)) {
            Some(c) if c.is_ascii_alphanumeric() || ESCAPE_SAFE.contains(c) => out.push(c),
            _ if unit < 256 => out.push_str(&format!("%{:02X}", unit)),
            _ => out.push_str(&format!("%u{:04X}", unit)),
        }
    }
    out
}

/// `unescape`: the inverse of [`escape`]; malformed escapes stay as-is.
pub fn unescape(text: &str) -> JsString {
    let units: Vec<u16> = text.encode_utf16().collect();
    let hex = |range: std::ops::Range<usize>| -> Option<u16> {
        let digits = units.get(range)?;
        let s = String::from_utf16(digits).ok()?;
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u16::from_str_radix(&s, 16).ok()
    };
    let mut out = Vec::with_capacity(units.len());
    let mut i = 0;
    while let Some(&unit) = units.get(i) {
        if unit == u16::from(b'%') {
            if units.get(i + 1) == Some(&u16::from(b'u')) {
                if let Some(decoded) = hex(i + 2..i + 6) {
                    out.push(decoded);
                    i += 6;
                    continue;
                }
            } else if let Some(decoded) = hex(i + 1..i + 3) {
                out.push(decoded);
                i += 3;
                continue;
            }
        }
        out.push(unit);
        i += 1;
    }
    JsString::from_utf16(&out)
}

const URI_UNRESERVED_MARKS: &str = "-_.!~*'()";
const URI_RESERVED: &str = ";/?:@&=+$,#";

fn uri_error(message: &str) -> JsError {
    JsError::thrown(JsValue::from(format!("URIError: {}", message)))
}

/// Percent-encode everything but unreserved characters and `keep`.
fn encode_uri(text: &JsString, keep: &str) -> Result<String, JsError> {
    let mut out = String::with_capacity(text.len());
    for decoded in char::decode_utf16(text.to_utf16()) {
        let c = decoded.map_err(|_| uri_error("lone surrogate in URI"))?;
        if c.is_ascii_alphanumeric() || URI_UNRESERVED_MARKS.contains(c) || keep.contains(c) {
            out.push(c);
            continue;
        }
        let mut buf = [0u8; 4];
        for byte in c.encode_utf8(&mut buf).bytes() {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    Ok(out)
}

/// Decode `%XX` UTF-8 sequences, leaving escapes of characters in `keep`
/// untouched.
fn decode_uri(text: &str, keep: &str) -> Result<String, JsError> {
    let bytes = text.as_bytes();
    let byte_at = |i: usize| -> Result<u8, JsError> {
        let pair = bytes.get(i + 1..i + 3).ok_or_else(|| uri_error("malformed URI sequence"))?;
        let pair = std::str::from_utf8(pair).map_err(|_| uri_error("malformed URI sequence"))?;
        u8::from_str_radix(pair, 16).map_err(|_| uri_error("malformed URI sequence"))
    };

    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes.get(i) != Some(&b'%') {
            let rest = text.get(i..).unwrap_or("");
            let Some(c) = rest.chars().next() else {
                break;
            };
            out.push(c);
            i += c.len_utf8();
            continue;
        }

        let lead = byte_at(i)?;
        let width = match lead {
            0x00..=0x7f => 1,
            0xc0..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf7 => 4,
            _ => return Err(uri_error("malformed URI sequence")),
        };
        if width == 1 {
            let c = char::from(lead);
            if keep.contains(c) {
                out.push_str(text.get(i..i + 3).unwrap_or(""));
            } else {
                out.push(c);
            }
            i += 3;
            continue;
        }

        let mut sequence = vec![lead];
        for k in 1..width {
            let at = i + 3 * k;
            if bytes.get(at) != Some(&b'%') {
                return Err(uri_error("malformed URI sequence"));
            }
            sequence.push(byte_at(at)?);
        }
        let decoded =
            std::str::from_utf8(&sequence).map_err(|_| uri_error("malformed URI sequence"))?;
        out.push_str(decoded);
        i += 3 * width;
    }
    Ok(out)
}
