//! File delivery: conditional GET, partial content and whole bodies.

use hyper::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_RANGE, CONTENT_TYPE, ETAG, HeaderMap,
    HeaderName, HeaderValue, RANGE, VARY,
};
use hyper::{Response, StatusCode};
use oxserve_cache::FileRecord;
use tracing::debug;

use crate::delivery::{
    CachePolicy, CacheTimes, DeliveryMode, accepts_brotli, cache_policy, classify_delivery, if_none_match,
};
use crate::query::QueryFlags;
use crate::range::{ByteRange, DEFAULT_CHUNK_CAP, parse_range};
use crate::response::{Body, empty, set_header, with_body};

/// Content above this size is never marked cacheable.
pub const DEFAULT_UNCACHEABLE_SIZE: u64 = 10 * 1024 * 1024;

/// `CDN-Cache-Control`, mirrored from `Cache-Control` when cacheable.
pub const CDN_CACHE_CONTROL: &str = "cdn-cache-control";

/// Tunables for file delivery.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Whole bodies over this many bytes get `no-store`.
    pub uncacheable_size: u64,
    /// Cap on an open-ended range.
    pub stream_chunk_cap: u64,
    /// Per-MIME max-age table.
    pub cache_times: CacheTimes,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            uncacheable_size: DEFAULT_UNCACHEABLE_SIZE,
            stream_chunk_cap: DEFAULT_CHUNK_CAP,
            cache_times: CacheTimes::default(),
        }
    }
}

/// Build the response for `record`.
///
/// The `ETag` is always sent. A matching `If-None-Match` short-circuits to
/// `304`. Partial responses slice the uncompressed content and are never
/// cacheable; whole responses prefer the Brotli representation.
pub fn deliver_file(
    record: &FileRecord,
    headers: &HeaderMap,
    flags: &QueryFlags,
    config: &DeliveryConfig,
) -> Response<Body> {
    let etag = format!("\"{}\"", record.hash);

    if if_none_match(headers, &record.hash) {
        let mut response = empty(StatusCode::NOT_MODIFIED);
        set_header(&mut response, ETAG, &etag);
        return response;
    }

    let delivery = classify_delivery(headers, flags, &record.mime_type);
    let total = record.len() as u64;

    let mut response = if delivery.mode == DeliveryMode::Stream && total > 0 {
        deliver_partial(record, headers, total, config)
    } else {
        deliver_whole(record, headers, delivery.download, total, config)
    };

    set_header(&mut response, ETAG, &etag);
    response
}

fn deliver_partial(
    record: &FileRecord,
    headers: &HeaderMap,
    total: u64,
    config: &DeliveryConfig,
) -> Response<Body> {
    let range_header = match headers.get(RANGE).map(HeaderValue::to_str) {
        None => None,
        Some(Ok(value)) => Some(value),
        Some(Err(_)) => return range_not_satisfiable(total),
    };

    let range = match parse_range(range_header, total, config.stream_chunk_cap) {
        Ok(range) => range,
        Err(e) => {
            debug!(range = ?range_header, error = %e, "Rejecting range");
            return range_not_satisfiable(total);
        }
    };

    let Some(body) = slice(record, range) else {
        return range_not_satisfiable(total);
    };

    let mut response = with_body(StatusCode::PARTIAL_CONTENT, body);
    set_header(&mut response, CONTENT_TYPE, &record.mime_type);
    set_header(&mut response, CONTENT_RANGE, &range.content_range(total));
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
        .headers_mut()
        .insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response
}

fn slice(record: &FileRecord, range: ByteRange) -> Option<bytes::Bytes> {
    let start = usize::try_from(range.start).ok()?;
    let end = usize::try_from(range.end).ok()?;
    (end < record.content.len()).then(|| record.content.slice(start..=end))
}

fn range_not_satisfiable(total: u64) -> Response<Body> {
    let mut response = empty(StatusCode::RANGE_NOT_SATISFIABLE);
    set_header(&mut response, CONTENT_RANGE, &format!("bytes */{total}"));
    response
}

fn deliver_whole(
    record: &FileRecord,
    headers: &HeaderMap,
    download: bool,
    total: u64,
    config: &DeliveryConfig,
) -> Response<Body> {
    let compressed = record.compressed_content();
    let send_compressed = compressed.is_some() && accepts_brotli(headers);

    let body = match compressed {
        Some(bytes) if send_compressed => bytes.clone(),
        _ => record.content.clone(),
    };

    let mut response = with_body(StatusCode::OK, body);
    set_header(&mut response, CONTENT_TYPE, &record.mime_type);

    let response_headers = response.headers_mut();
    if send_compressed {
        response_headers.insert(CONTENT_ENCODING, HeaderValue::from_static("br"));
    }
    if compressed.is_some() {
        response_headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
    }
    response_headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));

    let policy = cache_policy(
        download,
        total,
        config.uncacheable_size,
        &record.mime_type,
        &config.cache_times,
    );
    if let Some(value) = policy.header_value() {
        set_header(&mut response, CACHE_CONTROL, &value);
        if matches!(policy, CachePolicy::MaxAge(_)) {
            set_header(
                &mut response,
                HeaderName::from_static(CDN_CACHE_CONTROL),
                &value,
            );
        }
    }

    response
}
