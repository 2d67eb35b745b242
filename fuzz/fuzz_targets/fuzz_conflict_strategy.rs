#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Fuzz ConflictStrategy deserialization from a bare TOML string value.
        let _ = toml::from_str::<rsync_sync::ConflictStrategy>(content);
    }
});
