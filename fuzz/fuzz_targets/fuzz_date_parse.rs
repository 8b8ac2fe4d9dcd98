#![no_main]

use escore::builtins::date::{parse, time_clip};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 1_000 {
        return;
    }

    // Anything accepted must already be a clipped time value
    let t = parse(text);
    if !t.is_nan() {
        assert_eq!(time_clip(t), t, "{:?}", text);
    }
});
