#![no_main]

use libfuzzer_sys::fuzz_target;

use brr_suite::{decode, BrrSample, BYTES_PER_BRR_BLOCK};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    let pitch = u16::from_le_bytes([data[0], data[1]]);
    let loop_block = i32::from(data[2] as i8);

    let brr_data = &data[3..];
    let brr_data = &brr_data[..brr_data.len() - brr_data.len() % BYTES_PER_BRR_BLOCK];

    let sample = match BrrSample::from_bytes(brr_data, loop_block) {
        Ok(s) => s,
        Err(_) => return,
    };

    // Decoding never panics, whatever the block contents
    let out = decode(&sample, pitch, 0.25);
    assert!(!out.is_empty());
});
