#![no_main]
use libfuzzer_sys::fuzz_target;
use rsdelta::engine;

fuzz_target!(|data: &[u8]| {
    // A signature that loads must be usable for a delta.
    if let Ok(sig) = engine::load_signature(data) {
        let _ = engine::delta(&sig, data);
    }
});
