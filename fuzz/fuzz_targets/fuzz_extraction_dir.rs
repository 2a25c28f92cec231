//! Fuzz target for tarball extraction-directory naming.
//!
//! Goal: naming never panics, and any accepted name maps to a sibling path with a
//! real file name.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_extraction_dir
//! ```

#![no_main]

use camino::Utf8Path;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|name: &str| {
    let path = Utf8Path::new("/var/tmp/imagecert").join(name);
    if let Ok(dir) = imagecert_image::tarball::extraction_dir(&path) {
        assert_eq!(dir.parent(), path.parent());
        let stem = dir.file_name().unwrap_or_default();
        assert!(!stem.is_empty());
        assert!(stem.len() < path.file_name().unwrap_or_default().len());
    }
});
