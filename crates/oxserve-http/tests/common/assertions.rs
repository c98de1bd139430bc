//! Custom assertions for HTTP integration tests.

use reqwest::{Response, StatusCode};

/// Assert a `302` to `location`.
pub fn assert_redirect(resp: &Response, location: &str) {
    assert_eq!(
        resp.status(),
        StatusCode::FOUND,
        "Expected redirect to {location}, got {}",
        resp.status()
    );
    assert_eq!(header(resp, "location"), Some(location));
}

/// Assert a status code with context.
pub fn assert_status(resp: &Response, expected: StatusCode, context: &str) {
    assert_eq!(
        resp.status(),
        expected,
        "{context}: expected status {expected}, got {}",
        resp.status()
    );
}

/// A header value as text.
pub fn header<'a>(resp: &'a Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Parse `Content-Range: bytes a-b/len`.
pub fn content_range(resp: &Response) -> (u64, u64, u64) {
    let value = header(resp, "content-range").expect("Missing Content-Range header");
    let rest = value.strip_prefix("bytes ").expect("Content-Range unit");
    let (span, total) = rest.split_once('/').expect("Content-Range total");
    let (start, end) = span.split_once('-').expect("Content-Range span");
    (
        start.parse().unwrap(),
        end.parse().unwrap(),
        total.parse().unwrap(),
    )
}

/// Decode a Brotli body.
pub fn decompress_brotli(bytes: &[u8]) -> Vec<u8> {
    use std::io::Read;
    let mut out = Vec::new();
    brotli::Decompressor::new(bytes, 4096)
        .read_to_end(&mut out)
        .expect("Failed to decode Brotli body");
    out
}
