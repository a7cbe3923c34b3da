#![no_main]

use intensidad::transform::TransformPipeline;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Convert arbitrary bytes to UTF-8 string (lossy conversion)
    if let Ok(input) = std::str::from_utf8(data) {
        // Attempt to parse the transform specification
        // This should not panic regardless of input
        let _ = TransformPipeline::parse(input);
    }
});
