#![no_main]
use libfuzzer_sys::fuzz_target;
use rsdelta::engine;
use rsdelta::format::InstructionIter;

fuzz_target!(|data: &[u8]| {
    // Arbitrary deltas must only ever produce errors, never panics.
    let _ = engine::patch(&[], data);

    if data.len() >= 2 {
        let split = data.len() / 2;
        let (basis, delta) = data.split_at(split);
        let _ = engine::patch(basis, delta);
        if let Ok(iter) = InstructionIter::new(delta) {
            for inst in iter {
                if inst.is_err() {
                    break;
                }
            }
        }
    }
});
