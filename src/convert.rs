//! Number <-> string conversions and integer coercions.
//!
//! These are the language-level algorithms behind `ToNumber` on strings,
//! `ToString` on numbers, `parseInt`/`parseFloat`, and the 32-bit integer
//! reductions. The float digit decomposition is shared with the printf
//! engine in [`crate::format`].

/// Whitespace accepted around numeric literals and by the scanners
pub fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{FEFF}'
}

fn trim_js(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

/// Shortest round-trip decimal digits of a finite, non-zero `|n|`.
///
/// Returns `(digits, exponent)` such that `|n| = 0.d1d2d3... * 10^exponent`.
pub(crate) fn decimal_digits(n: f64) -> (Vec<u8>, i32) {
    let text = format!("{:e}", n.abs());
    let (mantissa, exp) = text.split_once('e').unwrap_or((text.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();
    (digits, exp + 1)
}

/// `Number::toString` with radix 10
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }
    let (digits, point) = decimal_digits(n);
    let k = digits.len() as i32;
    let push_digits = |out: &mut String, ds: &[u8]| {
        for d in ds {
            out.push(char::from(b'0' + d));
        }
    };
    if k <= point && point <= 21 {
        push_digits(&mut out, &digits);
        for _ in 0..(point - k) {
            out.push('0');
        }
    } else if 0 < point && point <= 21 {
        let (int_part, frac_part) = digits.split_at(point as usize);
        push_digits(&mut out, int_part);
        out.push('.');
        push_digits(&mut out, frac_part);
    } else if -6 < point && point <= 0 {
        out.push_str("0.");
        for _ in 0..(-point) {
            out.push('0');
        }
        push_digits(&mut out, &digits);
    } else {
        let exp = point - 1;
        let (first, rest) = digits.split_at(1);
        push_digits(&mut out, first);
        if !rest.is_empty() {
            out.push('.');
            push_digits(&mut out, rest);
        }
        out.push('e');
        out.push(if exp >= 0 { '+' } else { '-' });
        out.push_str(&exp.abs().to_string());
    }
    out
}

/// `Number.prototype.toString(radix)` for radix other than 10
pub fn number_to_radix_string(n: f64, radix: u32) -> String {
    if radix == 10 || !(2..=36).contains(&radix) || !n.is_finite() {
        return number_to_string(n);
    }
    let negative = n < 0.0;
    let n = n.abs();
    let mut int_part = n.trunc();
    let mut frac = n - int_part;
    let radix_f = radix as f64;

    let mut int_digits = Vec::new();
    if int_part == 0.0 {
        int_digits.push('0');
    }
    while int_part >= 1.0 {
        let digit = (int_part % radix_f) as u32;
        int_digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        int_part = (int_part / radix_f).trunc();
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.extend(int_digits.iter().rev());
    if frac > 0.0 {
        out.push('.');
        let mut count = 0;
        while frac > 0.0 && count < 52 {
            frac *= radix_f;
            let digit = frac.trunc() as u32;
            out.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            frac -= digit as f64;
            count += 1;
        }
    }
    out
}

/// `ToNumber` applied to a string
///
/// Accepts surrounding whitespace, `Infinity` with an optional sign,
/// unsigned hex literals, and signed decimal literals with optional
/// fraction and exponent. The empty string is 0; anything else is NaN.
pub fn string_to_number(s: &str) -> f64 {
    let s = trim_js(s);
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return f64::NAN;
        }
        return hex
            .chars()
            .filter_map(|c| c.to_digit(16))
            .fold(0.0, |acc, d| acc * 16.0 + d as f64);
    }
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, s.get(1..).unwrap_or("")),
        Some(b'+') => (false, s.get(1..).unwrap_or("")),
        _ => (false, s),
    };
    if body == "Infinity" {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    match scan_decimal(body) {
        Some(end) if end == body.len() => {
            let value = body.parse::<f64>().unwrap_or(f64::NAN);
            if negative { -value } else { value }
        }
        _ => f64::NAN,
    }
}

/// Length of the longest decimal literal prefix of `s` (no sign), if any.
fn scan_decimal(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut digits = 0;
    while bytes.get(i).is_some_and(u8::is_ascii_digit) {
        i += 1;
        digits += 1;
    }
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return None;
    }
    let mantissa_end = i;
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while bytes.get(j).is_some_and(u8::is_ascii_digit) {
            j += 1;
        }
        if j > exp_start {
            return Some(j);
        }
    }
    Some(mantissa_end)
}

/// The `parseInt` scanner: stops at the first character that is not a
/// digit in the effective radix.
pub fn parse_int(input: &str, radix: i32) -> f64 {
    let s = input.trim_start_matches(is_js_whitespace);
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, s.get(1..).unwrap_or("")),
        Some(b'+') => (false, s.get(1..).unwrap_or("")),
        _ => (false, s),
    };

    let mut radix = radix;
    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return f64::NAN;
        }
        if radix != 16 {
            strip_prefix = false;
        }
    } else {
        radix = 10;
    }

    let mut s = s;
    if strip_prefix {
        if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            s = rest;
            radix = 16;
        }
    }

    let end = s
        .char_indices()
        .find(|(_, c)| c.to_digit(radix as u32).is_none())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    let digits = s.get(..end).unwrap_or("");
    if digits.is_empty() {
        return f64::NAN;
    }

    let value = if radix == 10 {
        digits.parse::<f64>().unwrap_or(f64::NAN)
    } else {
        digits
            .chars()
            .filter_map(|c| c.to_digit(radix as u32))
            .fold(0.0, |acc, d| acc * radix as f64 + d as f64)
    };
    if negative { -value } else { value }
}

/// The `parseFloat` scanner: longest valid decimal prefix, or `Infinity`.
pub fn parse_float(input: &str) -> f64 {
    let s = input.trim_start_matches(is_js_whitespace);
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, s.get(1..).unwrap_or("")),
        Some(b'+') => (false, s.get(1..).unwrap_or("")),
        _ => (false, s),
    };
    let value = if body.starts_with("Infinity") {
        f64::INFINITY
    } else {
        match scan_decimal(body) {
            Some(end) => body
                .get(..end)
                .and_then(|lit| lit.parse::<f64>().ok())
                .unwrap_or(f64::NAN),
            None => return f64::NAN,
        }
    };
    if negative { -value } else { value }
}

/// `ToInteger`
pub fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else if n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

/// `ToInt32`: truncate, reduce modulo 2^32, reinterpret as signed
pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// `ToUint32`
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// `ToUint16`
pub fn to_uint16(n: f64) -> u16 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(65_536.0) as u16
}

/// Canonical array index for a property name, if it is one
pub fn array_index(key: &str) -> Option<u32> {
    let bytes = key.as_bytes();
    match bytes {
        [] => None,
        [b'0'] => Some(0),
        [b'0', ..] => None,
        _ if bytes.iter().all(u8::is_ascii_digit) => match key.parse::<u64>() {
            Ok(v) if v < u32::MAX as u64 => Some(v as u32),
            _ => None,
        },
        _ => None,
    }
}
