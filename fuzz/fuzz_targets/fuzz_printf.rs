#![no_main]

use escore::{JsString, JsValue, sprintf};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 10_000 {
        return;
    }

    // Format string first, then a mix of numeric and string arguments
    let (format, rest) = text.split_once('\0').unwrap_or((text, ""));
    let args: Vec<JsValue> = rest
        .split('\0')
        .map(|arg| match arg.parse::<f64>() {
            Ok(n) => JsValue::Number(n),
            Err(_) => JsValue::String(JsString::from(arg)),
        })
        .collect();

    // Must never panic; range errors for huge widths are fine
    let _ = sprintf(format, &args);
});
