//! Fuzz target for script execution
//!
//! Runs arbitrary text in script mode under tight limits. Self-referencing
//! variables, runaway recursion and endless loops must all end in a
//! reported error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use listkit::{ExecutionLimits, Listkit};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() > 64 * 1024 {
            return;
        }

        let limits = ExecutionLimits::new()
            .max_call_depth(16)
            .max_loop_iterations(1_000)
            .max_expansion_depth(8);
        let listkit = Listkit::builder().limits(limits).build();
        let _ = listkit.run_str(input);
    }
});
