#![no_main]

use libfuzzer_sys::fuzz_target;
use xbps_core::Plist;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(parsed) = Plist::from_xml(s) {
            // A successfully parsed document must round-trip through
            // its own encoder without losing information.
            let rendered = parsed.to_xml();
            let reparsed = Plist::from_xml(&rendered).expect("re-encoded plist must re-parse");
            assert_eq!(parsed, reparsed);
        }
    }
});
