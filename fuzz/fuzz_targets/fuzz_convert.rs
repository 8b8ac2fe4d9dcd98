#![no_main]

use escore::convert::{number_to_radix_string, number_to_string, parse_float, parse_int, string_to_number};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 10_000 {
        return;
    }

    let n = string_to_number(text);
    let printed = number_to_string(n);
    if n.is_finite() {
        assert_eq!(string_to_number(&printed), n, "{:?} -> {}", text, printed);
    }
    for radix in [2u32, 8, 16, 36] {
        let _ = number_to_radix_string(n, radix);
        let _ = parse_int(text, radix as i32);
    }
    let _ = parse_int(text, 0);
    let _ = parse_float(text);
});
