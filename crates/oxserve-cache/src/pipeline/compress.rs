//! Brotli compressor.

use std::io::{self, Write};

use super::Compressor;

/// Default Brotli quality (0-11).
pub const DEFAULT_BROTLI_QUALITY: u32 = 4;

/// Default Brotli window size (log2).
pub const DEFAULT_BROTLI_WINDOW: u32 = 22;

const BUFFER_SIZE: usize = 4096;

/// Brotli compressor with configurable quality and window.
#[derive(Debug, Clone, Copy)]
pub struct BrotliCompressor {
    quality: u32,
    lgwin: u32,
}

impl BrotliCompressor {
    /// Create a compressor. `quality` is clamped to 0..=11 and `lgwin` to
    /// 10..=24.
    pub fn new(quality: u32, lgwin: u32) -> Self {
        Self {
            quality: quality.min(11),
            lgwin: lgwin.clamp(10, 24),
        }
    }

    /// Configured quality.
    pub fn quality(&self) -> u32 {
        self.quality
    }
}

impl Default for BrotliCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_BROTLI_QUALITY, DEFAULT_BROTLI_WINDOW)
    }
}

impl Compressor for BrotliCompressor {
    fn compress(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut writer =
            brotli::CompressorWriter::new(Vec::with_capacity(bytes.len() / 2), BUFFER_SIZE, self.quality, self.lgwin);
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(writer.into_inner())
    }
}
