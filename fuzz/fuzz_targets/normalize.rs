#![no_main]

use libfuzzer_sys::fuzz_target;
use stylechain::selector::{ArgumentCapture, normalize_with};

fuzz_target!(|data: &[u8]| {
    let Ok(selector) = std::str::from_utf8(data) else {
        return;
    };
    for capture in [ArgumentCapture::Balanced, ArgumentCapture::FirstClose] {
        let once = normalize_with(selector, capture);
        let twice = normalize_with(&once.selector, capture);
        assert_eq!(once.selector, twice.selector);
        assert!(!twice.changed);
        assert!(!once.selector.contains("/deep/"));
    }
});
