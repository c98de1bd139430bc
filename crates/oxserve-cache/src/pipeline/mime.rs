//! Default MIME detection: magic numbers, then extension, then a text check.

use super::MimeDetector;

/// Signature table: (offset, magic bytes, MIME type).
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, b"\x89PNG\r\n\x1a\n", "image/png"),
    (0, b"\xff\xd8\xff", "image/jpeg"),
    (0, b"GIF87a", "image/gif"),
    (0, b"GIF89a", "image/gif"),
    (0, b"\x00\x00\x01\x00", "image/x-icon"),
    (0, b"%PDF-", "application/pdf"),
    (0, b"PK\x03\x04", "application/zip"),
    (0, b"\x1f\x8b", "application/gzip"),
    (0, b"wOFF", "font/woff"),
    (0, b"wOF2", "font/woff2"),
    (0, b"ID3", "audio/mpeg"),
    (0, b"OggS", "audio/ogg"),
    (0, b"fLaC", "audio/flac"),
    (0, b"\x1a\x45\xdf\xa3", "video/webm"),
];

/// Extensions `mime_guess` does not know or gets wrong for web content.
const EXTENSION_FIXUPS: &[(&str, &str)] = &[
    ("jsonc", "application/json"),
    ("webmanifest", "application/manifest+json"),
    ("mjs", "text/javascript"),
];

/// Magic-number sniffer with extension and UTF-8 fallbacks.
///
/// Binary signatures win over the extension; everything else falls back to
/// the extension, then `text/plain` for valid UTF-8, then
/// `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SniffingDetector;

impl SniffingDetector {
    fn sniff(bytes: &[u8]) -> Option<&'static str> {
        for (offset, magic, mime) in SIGNATURES {
            if bytes.len() >= offset + magic.len() && &bytes[*offset..offset + magic.len()] == *magic {
                return Some(*mime);
            }
        }

        // RIFF containers carry the format at offset 8.
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" {
            match &bytes[8..12] {
                b"WEBP" => return Some("image/webp"),
                b"WAVE" => return Some("audio/wav"),
                _ => {}
            }
        }

        // ISO base media: `ftyp` box at offset 4, brand at offset 8.
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            return Some(match &bytes[8..12] {
                b"M4A " => "audio/mp4",
                b"qt  " => "video/quicktime",
                _ => "video/mp4",
            });
        }

        None
    }

    fn from_extension(extension: &str) -> Option<String> {
        let lower = extension.to_ascii_lowercase();
        if let Some((_, mime)) = EXTENSION_FIXUPS.iter().find(|(ext, _)| *ext == lower) {
            return Some((*mime).to_string());
        }
        mime_guess::from_ext(&lower)
            .first()
            .map(|mime| mime.essence_str().to_string())
    }
}

impl MimeDetector for SniffingDetector {
    fn detect(&self, bytes: &[u8], extension_hint: Option<&str>) -> String {
        if let Some(mime) = Self::sniff(bytes) {
            return mime.to_string();
        }
        if let Some(mime) = extension_hint.and_then(Self::from_extension) {
            return mime;
        }
        if std::str::from_utf8(bytes).is_ok() {
            "text/plain".to_string()
        } else {
            "application/octet-stream".to_string()
        }
    }
}
