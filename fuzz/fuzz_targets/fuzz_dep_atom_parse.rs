#![no_main]

use libfuzzer_sys::fuzz_target;
use xbps_core::version::{match_pattern, DepAtom};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Some(atom) = DepAtom::parse(s) {
            // Parsing must never panic on the rendered form either, and
            // matching against an arbitrary candidate pkgver must not
            // panic regardless of what the atom looks like.
            let rendered = atom.render();
            let _ = DepAtom::parse(&rendered);
            let _ = match_pattern("glibc-2.39_2", s);
        }
    }
});
