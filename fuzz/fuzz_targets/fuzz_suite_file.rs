#![no_main]

use libfuzzer_sys::fuzz_target;

use brr_suite::SuiteSample;

fuzz_target!(|data: &[u8]| {
    if let Ok(sample) = SuiteSample::from_bytes(data) {
        // Parsing normalizes (name sanitization, reserved bytes, pitch),
        // so serialize-then-reparse must be a fixed point
        let bytes = sample.to_bytes().unwrap();
        let reparsed = SuiteSample::from_bytes(&bytes).unwrap();
        assert_eq!(reparsed, sample);
    }
});
