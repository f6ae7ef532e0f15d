#![no_main]

use libfuzzer_sys::fuzz_target;
use stylechain::compose::StyleLanguage;
use stylechain::parse::rules::scan_rules;
use stylechain::parse::sfc::style_blocks;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for language in [StyleLanguage::Css, StyleLanguage::Less] {
        for rule in scan_rules(text, language) {
            assert!(rule.start <= rule.end && rule.end <= text.len());
            assert_eq!(&text[rule.start..rule.end], rule.selector);
        }
    }
    for block in style_blocks(text) {
        let _ = block.content(text);
    }
});
