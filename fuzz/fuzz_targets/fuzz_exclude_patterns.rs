#![no_main]

use libfuzzer_sys::fuzz_target;
use rsync_sync::exclude::ExcludeSet;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        // Fuzz gitignore-style exclude pattern compilation and matching -
        // malformed patterns must surface as an error, never a panic.
        let patterns: Vec<String> = content.lines().map(str::to_string).collect();
        if let Ok(set) = ExcludeSet::build(&patterns) {
            let path = Path::new(content);
            let _ = set.is_excluded(path, false);
            let _ = set.is_excluded(path, true);
        }
    }
});
