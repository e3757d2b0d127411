//! Fuzz target for the listfile parser
//!
//! Looks for panics and hangs on malformed bracket arguments, unbalanced
//! parentheses and unterminated quotes.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=300

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() > 1_000_000 {
            return;
        }

        let _ = listkit::parse(input, "/fuzz/CMakeLists.txt");
    }
});
