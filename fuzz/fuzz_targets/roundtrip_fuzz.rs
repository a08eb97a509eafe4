#![no_main]
use libfuzzer_sys::fuzz_target;
use rsdelta::{SignatureOptions, engine};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }

    // First two bytes pick the block and strong lengths. Short strong sums
    // can collide, so keep at least 8 bytes.
    let block_len = usize::from(data[0]) + 1;
    let strong_len = usize::from(data[1] % 9) + 8;
    let payload = &data[2..];
    let split = payload.len() / 2;
    let (basis, new) = payload.split_at(split);

    let opts = SignatureOptions::new(block_len, strong_len).unwrap();
    let sig = engine::load_signature(&engine::signature(basis, opts).unwrap()).unwrap();
    let delta = engine::delta(&sig, new).unwrap();
    let rebuilt = engine::patch(basis, &delta).unwrap();
    assert_eq!(rebuilt, new);
});
