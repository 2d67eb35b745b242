#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Fuzz the manifest wire format parser - this should never panic,
        // only ever return Ok or a SyncError.
        let _ = rsync_sync::Manifest::parse(content);
    }
});
