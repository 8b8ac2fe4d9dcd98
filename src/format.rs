//! C-style `printf` formatting.
//!
//! Floating-point conversions work on a decimal digit buffer taken from
//! the shortest round-trip representation of the number, so rounding
//! happens on the digits a reader sees: the digit just past the cut is
//! rounded half-up, with the carry propagated by hand. `0.005` printed
//! with `%.2f` gives `0.01`.

use crate::convert;
use crate::error::JsError;
use crate::value::JsValue;

/// A finite non-negative number as `0.d1d2d3... * 10^exp`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Digits {
    digits: Vec<u8>,
    exp: i32,
}

impl Digits {
    fn new(value: f64) -> Self {
        let value = value.abs();
        if value == 0.0 {
            return Digits {
                digits: Vec::new(),
                exp: 1,
            };
        }
        let (digits, exp) = convert::decimal_digits(value);
        let mut d = Digits { digits, exp };
        d.trim();
        d
    }

    fn trim(&mut self) {
        while self.digits.last() == Some(&0) {
            self.digits.pop();
        }
    }

    fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    fn digit(&self, index: i32) -> char {
        if index < 0 {
            return '0';
        }
        match self.digits.get(index as usize) {
            Some(d) => (b'0' + d) as char,
            None => '0',
        }
    }

    /// Keep `position` leading digits, rounding half-up on the next one.
    fn round_at(&mut self, position: i32) {
        if position < 0 {
            self.digits.clear();
            return;
        }
        let cut = position as usize;
        let Some(&next) = self.digits.get(cut) else {
            return;
        };
        self.digits.truncate(cut);
        if next >= 5 {
            loop {
                match self.digits.last().copied() {
                    Some(9) => {
                        self.digits.pop();
                    }
                    Some(_) => {
                        if let Some(last) = self.digits.last_mut() {
                            *last += 1;
                        }
                        break;
                    }
                    None => {
                        self.digits.push(1);
                        self.exp += 1;
                        break;
                    }
                }
            }
        }
        self.trim();
    }

    /// Decimal exponent of the leading digit
    fn exponent(&self) -> i32 {
        if self.is_zero() { 0 } else { self.exp - 1 }
    }

    fn render_fixed(&self, precision: usize, point: bool) -> String {
        let mut out = String::new();
        if self.exp <= 0 || self.is_zero() {
            out.push('0');
        } else {
            for i in 0..self.exp {
                out.push(self.digit(i));
            }
        }
        if precision > 0 || point {
            out.push('.');
        }
        let base = if self.is_zero() { 1 } else { self.exp };
        for k in 0..precision {
            out.push(self.digit(base + k as i32));
        }
        out
    }

    fn render_exponential(&self, precision: usize, point: bool, marker: char, min_exp: usize) -> String {
        let mut out = String::new();
        out.push(self.digit(0));
        if precision > 0 || point {
            out.push('.');
        }
        for k in 1..=precision {
            out.push(self.digit(k as i32));
        }
        let exponent = self.exponent();
        out.push(marker);
        out.push(if exponent < 0 { '-' } else { '+' });
        let magnitude = exponent.unsigned_abs().to_string();
        for _ in magnitude.len()..min_exp {
            out.push('0');
        }
        out.push_str(&magnitude);
        out
    }
}

/// Fixed notation with `precision` fraction digits, no sign
fn fixed(value: f64, precision: usize, point: bool) -> String {
    let mut d = Digits::new(value);
    d.round_at(d.exp + precision as i32);
    d.render_fixed(precision, point)
}

/// Exponential notation with `precision` fraction digits, no sign
fn exponential(value: f64, precision: usize, point: bool, marker: char, min_exp: usize) -> String {
    let mut d = Digits::new(value);
    d.round_at(precision as i32 + 1);
    d.render_exponential(precision, point, marker, min_exp)
}

/// `%g`: the shorter of fixed and exponential for `precision` significant digits
fn general(value: f64, precision: usize, alt: bool, upper: bool) -> String {
    let precision = precision.max(1);
    let mut d = Digits::new(value);
    d.round_at(precision as i32);
    let x = d.exponent();
    let marker = if upper { 'E' } else { 'e' };
    let text = if (precision as i32) > x && x >= -4 {
        let fraction = (precision as i32 - 1 - x).max(0) as usize;
        d.render_fixed(fraction, alt)
    } else {
        d.render_exponential(precision - 1, alt, marker, 2)
    };
    if alt {
        return text;
    }
    strip_fraction_zeros(&text)
}

fn strip_fraction_zeros(text: &str) -> String {
    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(at) => text.split_at(at),
        None => (text, ""),
    };
    if !mantissa.contains('.') {
        return text.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{}{}", trimmed, exponent)
}

/// `Number.prototype.toFixed`
pub fn to_fixed(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.abs() >= 1e21 || value.is_infinite() {
        return convert::number_to_string(value);
    }
    let body = fixed(value, digits, false);
    if value < 0.0 && body.bytes().any(|b| b != b'0' && b != b'.') {
        format!("-{}", body)
    } else {
        body
    }
}

/// `Number.prototype.toExponential`; `None` uses as many digits as needed.
pub fn to_exponential(value: f64, digits: Option<usize>) -> String {
    if !value.is_finite() {
        return convert::number_to_string(value);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let digits = digits.unwrap_or_else(|| Digits::new(value).digits.len().saturating_sub(1));
    format!("{}{}", sign, exponential(value, digits, false, 'e', 1))
}

/// `Number.prototype.toPrecision`
pub fn to_precision(value: f64, precision: usize) -> String {
    if !value.is_finite() {
        return convert::number_to_string(value);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let mut d = Digits::new(value);
    d.round_at(precision as i32);
    let e = d.exponent();
    let body = if e < -6 || e >= precision as i32 {
        d.render_exponential(precision - 1, false, 'e', 1)
    } else {
        d.render_fixed((precision as i32 - 1 - e).max(0) as usize, false)
    };
    format!("{}{}", sign, body)
}

#[derive(Debug, Default, Clone, Copy)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    alt: bool,
    zero: bool,
    width: usize,
    precision: Option<usize>,
}

impl Spec {
    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }

    /// Pad `sign + prefix + body` to the field width.
    fn pad(&self, out: &mut String, sign: &str, prefix: &str, body: &str, zero_ok: bool) {
        let len = sign.len() + prefix.len() + body.chars().count();
        let fill = self.width.saturating_sub(len);
        if self.left {
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(body);
            out.extend(std::iter::repeat_n(' ', fill));
        } else if self.zero && zero_ok {
            out.push_str(sign);
            out.push_str(prefix);
            out.extend(std::iter::repeat_n('0', fill));
            out.push_str(body);
        } else {
            out.extend(std::iter::repeat_n(' ', fill));
            out.push_str(sign);
            out.push_str(prefix);
            out.push_str(body);
        }
    }
}

struct Args<'a> {
    values: &'a [JsValue],
    next: usize,
}

impl Args<'_> {
    fn next(&mut self) -> JsValue {
        let value = self.values.get(self.next).cloned().unwrap_or_default();
        self.next += 1;
        value
    }
}

/// Format `args` according to `format`.
///
/// Supports `%d %i %o %x %X %e %E %f %g %G %c %s %%` with the flags
/// `- + space # 0`, a width and a precision (either may be `*`).
/// Missing arguments format as undefined.
pub fn sprintf(format: &str, args: &[JsValue]) -> Result<String, JsError> {
    let mut out = String::with_capacity(format.len() + 16);
    let mut args = Args {
        values: args,
        next: 0,
    };
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let mut spec = Spec::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => spec.left = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '#' => spec.alt = true,
                '0' => spec.zero = true,
                _ => break,
            }
            chars.next();
        }

        if chars.peek() == Some(&'*') {
            chars.next();
            let width = args.next().to_int32()?;
            if width < 0 {
                spec.left = true;
            }
            spec.width = width.unsigned_abs() as usize;
        } else {
            spec.width = read_number(&mut chars);
        }

        if chars.peek() == Some(&'.') {
            chars.next();
            if chars.peek() == Some(&'*') {
                chars.next();
                let precision = args.next().to_int32()?;
                spec.precision = usize::try_from(precision).ok();
            } else {
                spec.precision = Some(read_number(&mut chars));
            }
        }

        if spec.width > MAX_FIELD || spec.precision.is_some_and(|p| p > MAX_FIELD) {
            return Err(JsError::range_error("printf field width or precision too large"));
        }

        // length modifiers are accepted and ignored
        while matches!(chars.peek(), Some('l' | 'h' | 'L')) {
            chars.next();
        }

        let Some(conversion) = chars.next() else {
            out.push('%');
            break;
        };
        match conversion {
            '%' => out.push('%'),
            'd' | 'i' | 'o' | 'x' | 'X' => {
                format_integer(&mut out, &spec, conversion, args.next().to_number()?)
            }
            'e' | 'E' | 'f' | 'g' | 'G' => {
                format_float(&mut out, &spec, conversion, args.next().to_number()?)
            }
            'c' => {
                let body = match args.next() {
                    JsValue::String(s) => s.char_at(0).map(|c| c.to_string()).unwrap_or_default(),
                    other => {
                        let unit = convert::to_uint16(other.to_number()?);
                        String::from_utf16_lossy(&[unit])
                    }
                };
                spec.pad(&mut out, "", "", &body, false);
            }
            's' => {
                let text = args.next().to_js_string()?;
                let body: String = match spec.precision {
                    Some(limit) => text.as_str().chars().take(limit).collect(),
                    None => text.to_string(),
                };
                spec.pad(&mut out, "", "", &body, false);
            }
            other => {
                out.push('%');
                out.push(other);
            }
        }
    }
    Ok(out)
}

/// Largest width or precision a directive may request
const MAX_FIELD: usize = 1 << 16;

fn read_number(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> usize {
    let mut n: usize = 0;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = n.saturating_mul(10).saturating_add(d as usize);
        chars.next();
    }
    n
}

fn format_non_finite(out: &mut String, spec: &Spec, value: f64) {
    let body = if value.is_nan() { "NaN" } else { "Infinity" };
    let sign = spec.sign(value < 0.0 && !value.is_nan());
    spec.pad(out, sign, "", body, false);
}

fn format_integer(out: &mut String, spec: &Spec, conversion: char, value: f64) {
    if !value.is_finite() {
        format_non_finite(out, spec, value);
        return;
    }
    let n = value.trunc() as i64;
    let negative = n < 0 && matches!(conversion, 'd' | 'i');
    let mut body = match conversion {
        'o' => format!("{:o}", n as u64),
        'x' => format!("{:x}", n as u64),
        'X' => format!("{:X}", n as u64),
        _ => n.unsigned_abs().to_string(),
    };
    if let Some(min) = spec.precision {
        if body.len() < min {
            body = format!("{}{}", "0".repeat(min - body.len()), body);
        }
    }
    let prefix = match conversion {
        'o' if spec.alt && !body.starts_with('0') => "0",
        'x' if spec.alt && n != 0 => "0x",
        'X' if spec.alt && n != 0 => "0X",
        _ => "",
    };
    let sign = if matches!(conversion, 'd' | 'i') {
        spec.sign(negative)
    } else {
        ""
    };
    spec.pad(out, sign, prefix, &body, spec.precision.is_none());
}

fn format_float(out: &mut String, spec: &Spec, conversion: char, value: f64) {
    if !value.is_finite() {
        format_non_finite(out, spec, value);
        return;
    }
    let precision = spec.precision.unwrap_or(6);
    let body = match conversion {
        'f' => fixed(value, precision, spec.alt),
        'e' => exponential(value, precision, spec.alt, 'e', 2),
        'E' => exponential(value, precision, spec.alt, 'E', 2),
        'G' => general(value, precision, spec.alt, true),
        _ => general(value, precision, spec.alt, false),
    };
    let negative = value.is_sign_negative() && value != 0.0;
    spec.pad(out, spec.sign(negative), "", &body, true);
}
