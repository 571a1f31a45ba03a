#![no_main]

use libfuzzer_sys::fuzz_target;

use golix::record::{Garq, Gdxx, Geoc, Gidc, Gobd, Gobs};

fuzz_target!(|data: &[u8]| {
    // Fuzz every container decoder: arbitrary bytes must parse or error,
    // never panic.
    let _ = Gidc::unpack(data);
    let _ = Geoc::unpack(data);
    let _ = Gobs::unpack(data);
    let _ = Gobd::unpack(data);
    let _ = Gdxx::unpack(data);
    let _ = Garq::unpack(data);
});
