//! Fuzz target for request path resolution
//!
//! Whatever the request path, the resolved filesystem path must stay under
//! the route root.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oxserve_http::resolve_path;
use std::path::Path;

const ROOT: &str = "/srv/apps/site";

fuzz_target!(|request_path: &str| {
    let root = Path::new(ROOT);
    let resolved = resolve_path(root, request_path);
    assert!(
        resolved.starts_with(root),
        "{request_path:?} escaped to {}",
        resolved.display()
    );
});
