#![no_main]

use libfuzzer_sys::fuzz_target;

use golix::AsymPayload;

fuzz_target!(|data: &[u8]| {
    // The cascade over decrypted payloads must fail closed on garbage, never
    // panic.
    let _ = AsymPayload::unpack(data);
});
