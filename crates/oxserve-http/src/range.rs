//! `Range` header parsing for partial delivery.
//!
//! Only a single `bytes` range is supported. Every rejection maps to
//! `416 Range Not Satisfiable`.

use thiserror::Error;

/// Range served when a partial response is chosen but the client sent no
/// `Range` header.
pub const DEFAULT_RANGE: &str = "bytes=0-1023";

/// Default cap on an open-ended range (`bytes=N-`).
pub const DEFAULT_CHUNK_CAP: u64 = 2 * 1024 * 1024;

/// An inclusive byte range within the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset (inclusive).
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false: a range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` value for content of `total` bytes.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }
}

/// Why a `Range` header was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Unit other than `bytes`.
    #[error("unsupported range unit: {0}")]
    UnsupportedUnit(String),

    /// More than one range requested.
    #[error("multiple ranges are not supported")]
    MultipleRanges,

    /// Syntax error.
    #[error("malformed range: {0}")]
    Malformed(String),

    /// Start beyond the content, or an empty suffix.
    #[error("range not satisfiable for length {0}")]
    Unsatisfiable(u64),
}

/// Parse `header` (or [`DEFAULT_RANGE`] when absent) against content of
/// `len` bytes.
///
/// An explicit end past the content is clamped to the last byte. An open
/// end is clamped to `start + chunk_cap - 1`. `bytes=-N` selects the last
/// `N` bytes.
pub fn parse_range(header: Option<&str>, len: u64, chunk_cap: u64) -> Result<ByteRange, RangeError> {
    let header = header.unwrap_or(DEFAULT_RANGE).trim();

    let (unit, spec) = header
        .split_once('=')
        .ok_or_else(|| RangeError::Malformed(header.to_string()))?;
    let unit = unit.trim();
    if !unit.eq_ignore_ascii_case("bytes") {
        return Err(RangeError::UnsupportedUnit(unit.to_string()));
    }

    let spec = spec.trim();
    if spec.contains(',') {
        return Err(RangeError::MultipleRanges);
    }

    let (start, end) = spec
        .split_once('-')
        .ok_or_else(|| RangeError::Malformed(spec.to_string()))?;
    let (start, end) = (start.trim(), end.trim());

    if len == 0 {
        return Err(RangeError::Unsatisfiable(len));
    }
    let last = len - 1;

    if start.is_empty() {
        let suffix = parse_offset(end)?;
        if suffix == 0 {
            return Err(RangeError::Unsatisfiable(len));
        }
        return Ok(ByteRange {
            start: len.saturating_sub(suffix),
            end: last,
        });
    }

    let start = parse_offset(start)?;
    if start > last {
        return Err(RangeError::Unsatisfiable(len));
    }

    let end = if end.is_empty() {
        start.saturating_add(chunk_cap.max(1) - 1).min(last)
    } else {
        let end = parse_offset(end)?;
        if end < start {
            return Err(RangeError::Malformed(spec.to_string()));
        }
        end.min(last)
    };

    Ok(ByteRange { start, end })
}

fn parse_offset(text: &str) -> Result<u64, RangeError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::Malformed(text.to_string()));
    }
    text.parse()
        .map_err(|_| RangeError::Malformed(text.to_string()))
}
