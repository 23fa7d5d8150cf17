#![no_main]

use libfuzzer_sys::fuzz_target;
use xbps_core::version::Pkgver;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(parsed) = Pkgver::parse(s) {
            // A successfully parsed pkgver must render back to something
            // that parses again to the same identity.
            let rendered = parsed.render();
            let reparsed = Pkgver::parse(&rendered).expect("rendered pkgver must re-parse");
            assert_eq!(parsed, reparsed);
        }
    }
});
