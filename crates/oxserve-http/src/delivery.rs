//! Delivery policy: streaming vs. whole body, encoding and caching.
//!
//! Everything here is a pure function of request headers, query flags and
//! record metadata, so the heuristics can be tested without a server.

use hyper::HeaderMap;
use hyper::header::{ACCEPT, ACCEPT_ENCODING, IF_NONE_MATCH, RANGE};

use crate::query::QueryFlags;

/// How the body is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// `206` slices of the uncompressed content.
    Stream,
    /// One `200` response, compressed when possible.
    Whole,
}

/// Outcome of [`classify_delivery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Streaming or whole body.
    pub mode: DeliveryMode,
    /// The request looks like a bulk download.
    pub download: bool,
}

/// Whether the MIME type is audio or video.
pub fn is_streamable_media(mime: &str) -> bool {
    mime.starts_with("audio/") || mime.starts_with("video/")
}

/// Decide how to deliver a file.
///
/// A request is a download when it sends `Accept: */*`, no `partial` flag
/// and no `Range` header; download clients get the whole object. Otherwise
/// audio and video stream unless `partial=0`, and anything streams with
/// `partial=1`.
pub fn classify_delivery(headers: &HeaderMap, flags: &QueryFlags, mime: &str) -> Delivery {
    let accept_any = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "*/*");
    let download = accept_any && flags.partial.is_none() && !headers.contains_key(RANGE);

    let wants_stream =
        (is_streamable_media(mime) && flags.partial != Some(false)) || flags.partial == Some(true);

    let mode = if wants_stream && !download {
        DeliveryMode::Stream
    } else {
        DeliveryMode::Whole
    };

    Delivery { mode, download }
}

/// Whether the client accepts Brotli.
///
/// A missing `Accept-Encoding` header counts as acceptance. An explicit
/// header must list `br` (or `*`) without `q=0`.
pub fn accepts_brotli(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(ACCEPT_ENCODING) else {
        return true;
    };
    let Ok(value) = value.to_str() else {
        return false;
    };

    value.split(',').any(|item| {
        let mut parts = item.split(';');
        let coding = parts.next().unwrap_or("").trim();
        if !(coding.eq_ignore_ascii_case("br") || coding == "*") {
            return false;
        }
        !parts.any(|param| {
            let param = param.trim();
            param
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        })
    })
}

/// Whether `If-None-Match` matches `hash`.
///
/// Accepts the bare hash, the quoted form, weak validators and lists.
pub fn if_none_match(headers: &HeaderMap, hash: &str) -> bool {
    let Some(value) = headers.get(IF_NONE_MATCH).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value.split(',').any(|tag| {
        let tag = tag.trim();
        if tag == "*" {
            return true;
        }
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        let tag = tag
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(tag);
        tag == hash
    })
}

/// Per-MIME max-age table, matched by substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheTimes {
    entries: Vec<(String, u64)>,
}

impl CacheTimes {
    /// Build from `(mime substring, minutes)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut entries: Vec<(String, u64)> =
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        // Longest substring first, so the most specific rule wins.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// Max-age in seconds for `mime`, if configured.
    pub fn max_age_secs(&self, mime: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(needle, _)| mime.contains(needle.as_str()))
            .map(|(_, minutes)| minutes.saturating_mul(60))
    }
}

/// Caching directive for a whole-body response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachePolicy {
    /// `Cache-Control: no-store`.
    NoStore,
    /// `Cache-Control` and `CDN-Cache-Control: public, max-age=N`.
    MaxAge(u64),
    /// No caching headers.
    Unspecified,
}

impl CachePolicy {
    /// Header value, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            CachePolicy::NoStore => Some("no-store".to_string()),
            CachePolicy::MaxAge(secs) => Some(format!("public, max-age={secs}")),
            CachePolicy::Unspecified => None,
        }
    }
}

/// Pick the caching directive for a whole-body response.
///
/// Downloads and content over `uncacheable_size` bytes are never cacheable.
pub fn cache_policy(
    download: bool,
    content_len: u64,
    uncacheable_size: u64,
    mime: &str,
    times: &CacheTimes,
) -> CachePolicy {
    if download || content_len > uncacheable_size {
        return CachePolicy::NoStore;
    }
    times
        .max_age_secs(mime)
        .map_or(CachePolicy::Unspecified, CachePolicy::MaxAge)
}
