//! Test data generators for HTTP integration tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Size of the generated media clip.
pub const CLIP_SIZE: usize = 5000;

/// Deterministic pseudo-random bytes.
pub fn random_bytes(size: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size).map(|_| rng.random()).collect()
}

/// An MP4-looking clip of exactly `size` bytes.
pub fn media_clip(size: usize) -> Vec<u8> {
    let mut clip = b"\x00\x00\x00\x18ftypmp42".to_vec();
    clip.extend(random_bytes(size.saturating_sub(clip.len()), 7));
    clip.truncate(size);
    clip
}

/// A stylesheet large enough to compress well.
pub fn stylesheet(rules: usize) -> String {
    (0..rules)
        .map(|i| format!(".rule-{i} {{\n  margin: {i}px;\n  color: #{:06x};\n}}\n", i * 4099))
        .collect()
}

/// A minimal ICO header followed by filler.
pub fn icon_bytes() -> Vec<u8> {
    let mut icon = vec![0x00, 0x00, 0x01, 0x00, 0x01, 0x00];
    icon.extend(random_bytes(64, 11));
    icon
}
