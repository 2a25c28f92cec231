//! Fuzz target for decoding the sandbox worker's environment.
//!
//! Goal: decoding never panics; a decoded request always has a non-empty check
//! name and image, and `mounted` is set only by the exact value `true`.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_worker_request
//! ```

#![no_main]

use arbitrary::Arbitrary;
use imagecert_sandbox::WorkerRequest;
use imagecert_types::ids;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Env {
    in_sandbox: Option<String>,
    check_name: Option<String>,
    image: Option<String>,
    mounted: Option<String>,
}

impl Env {
    fn get(&self, key: &str) -> Option<String> {
        match key {
            k if k == ids::ENV_IN_SANDBOX => self.in_sandbox.clone(),
            k if k == ids::ENV_CHECK_NAME => self.check_name.clone(),
            k if k == ids::ENV_IMAGE => self.image.clone(),
            k if k == ids::ENV_MOUNTED => self.mounted.clone(),
            _ => None,
        }
    }
}

fuzz_target!(|env: Env| {
    if let Ok(request) = WorkerRequest::from_lookup(|key| env.get(key)) {
        assert!(env.in_sandbox.is_some());
        assert!(!request.check_name.is_empty());
        assert!(!request.image.is_empty());
        assert_eq!(request.mounted, env.mounted.as_deref() == Some(ids::MOUNTED_TRUE));
    }
});
