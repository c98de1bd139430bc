//! Test data generators for cache integration tests.

use rand::Rng;

/// Generate random bytes of specified size.
pub fn random_bytes(size: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    (0..size).map(|_| rng.random()).collect()
}

/// Repetitive stylesheet text that compresses well.
pub fn stylesheet(rules: usize) -> String {
    (0..rules)
        .map(|i| format!(".rule-{i} {{\n    color: red;\n    margin: {i}px;\n}}\n"))
        .collect()
}

/// Pretty-printed JSON with a comment, as an editor would save it.
pub fn commented_json() -> &'static str {
    "{\n  // build metadata\n  \"name\": \"demo\",\n  \"version\": 3,\n}\n"
}

/// Minimal valid PNG header bytes.
pub fn png_header() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01".to_vec()
}
