//! File delivery tests against a live server.
//!
//! Covers conditional GET, Brotli negotiation, range streaming, download
//! detection and caching headers.

mod common;

use common::{
    CLIP_SIZE, TestServer, assert_status, content_range, decompress_brotli, header, media_clip,
};
use oxserve_http::{CacheTimes, HttpConfig};
use reqwest::StatusCode;

// ============================================================================
// ETag / Conditional GET
// ============================================================================

#[tokio::test]
async fn test_etag_is_content_hash() {
    let server = TestServer::start().await;
    let record = server
        .cache()
        .get_file(&server.path("docs/guide.txt"))
        .unwrap();

    let resp = server.get("/apps/docs/guide.txt").await;
    assert_status(&resp, StatusCode::OK, "GET guide");
    assert_eq!(header(&resp, "etag"), Some(format!("\"{}\"", record.hash).as_str()));
}

#[tokio::test]
async fn test_if_none_match_returns_304() {
    let server = TestServer::start().await;
    let resp = server.get("/apps/docs/guide.txt").await;
    let etag = header(&resp, "etag").unwrap().to_string();

    let resp = server
        .get_with("/apps/docs/guide.txt", &[("if-none-match", &etag)])
        .await;
    assert_status(&resp, StatusCode::NOT_MODIFIED, "conditional GET");
    assert!(resp.bytes().await.unwrap().is_empty());

    let bare = etag.trim_matches('"').to_string();
    let resp = server
        .get_with("/apps/docs/guide.txt", &[("if-none-match", &bare)])
        .await;
    assert_status(&resp, StatusCode::NOT_MODIFIED, "bare validator");
}

#[tokio::test]
async fn test_etag_changes_after_update() {
    let server = TestServer::start().await;
    let before = server.get("/apps/docs/guide.txt").await;
    let old_etag = header(&before, "etag").unwrap().to_string();

    server.write("docs/guide.txt", b"a new guide\n").await;

    let resp = server
        .get_with("/apps/docs/guide.txt", &[("if-none-match", &old_etag)])
        .await;
    assert_status(&resp, StatusCode::OK, "stale validator");
    assert_ne!(header(&resp, "etag"), Some(old_etag.as_str()));
}

// ============================================================================
// Encoding
// ============================================================================

#[tokio::test]
async fn test_compressed_by_default() {
    let server = TestServer::start().await;
    let record = server
        .cache()
        .get_file(&server.path("site/css/app.css"))
        .unwrap();

    let resp = server.get("/apps/site/css/app.css").await;
    assert_status(&resp, StatusCode::OK, "GET css");
    assert_eq!(header(&resp, "content-encoding"), Some("br"));
    assert_eq!(header(&resp, "vary"), Some("Accept-Encoding"));
    assert_eq!(header(&resp, "content-type"), Some("text/css"));

    let body = resp.bytes().await.unwrap();
    assert!(body.len() < record.len());
    assert_eq!(decompress_brotli(&body), record.content.as_ref());
}

#[tokio::test]
async fn test_explicit_accept_encoding_without_br_gets_raw() {
    let server = TestServer::start().await;
    let resp = server
        .get_with("/apps/docs/guide.txt", &[("accept-encoding", "gzip")])
        .await;
    assert!(header(&resp, "content-encoding").is_none());
    assert_eq!(resp.text().await.unwrap(), "plain text guide\n");
}

#[tokio::test]
async fn test_binary_is_never_compressed() {
    let server = TestServer::start().await;
    let resp = server.get("/favicon.ico").await;
    assert_status(&resp, StatusCode::OK, "favicon");
    assert!(header(&resp, "content-encoding").is_none());
    assert!(header(&resp, "vary").is_none());
}

// ============================================================================
// Range Streaming
// ============================================================================

#[tokio::test]
async fn test_media_without_range_gets_first_kilobyte() {
    let server = TestServer::start().await;
    let resp = server.get("/apps/site/media/clip.mp4").await;

    assert_status(&resp, StatusCode::PARTIAL_CONTENT, "default range");
    assert_eq!(content_range(&resp), (0, 1023, CLIP_SIZE as u64));
    assert_eq!(header(&resp, "cache-control"), Some("no-store"));
    assert_eq!(header(&resp, "accept-ranges"), Some("bytes"));
    assert_eq!(resp.bytes().await.unwrap().len(), 1024);
}

#[tokio::test]
async fn test_ranges_reconstruct_content() {
    let server = TestServer::start().await;
    let expected = media_clip(CLIP_SIZE);

    let mut rebuilt = Vec::new();
    let mut start = 0;
    while start < CLIP_SIZE {
        let end = (start + 1499).min(CLIP_SIZE - 1);
        let resp = server
            .get_range("/apps/site/media/clip.mp4", &format!("bytes={start}-{end}"))
            .await;
        assert_status(&resp, StatusCode::PARTIAL_CONTENT, "chunk");
        assert_eq!(content_range(&resp), (start as u64, end as u64, CLIP_SIZE as u64));
        assert!(header(&resp, "content-encoding").is_none());
        rebuilt.extend_from_slice(&resp.bytes().await.unwrap());
        start = end + 1;
    }
    assert_eq!(rebuilt, expected);
}

#[tokio::test]
async fn test_suffix_and_clamped_ranges() {
    let server = TestServer::start().await;
    let expected = media_clip(CLIP_SIZE);

    let resp = server.get_range("/apps/site/media/clip.mp4", "bytes=-100").await;
    assert_eq!(content_range(&resp), (4900, 4999, 5000));
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &expected[4900..]);

    let resp = server
        .get_range("/apps/site/media/clip.mp4", "bytes=4000-99999")
        .await;
    assert_eq!(content_range(&resp), (4000, 4999, 5000));
}

#[tokio::test]
async fn test_open_range_is_capped() {
    let server = TestServer::with_http(HttpConfig {
        stream_chunk_cap: 1000,
        ..HttpConfig::default()
    })
    .await;

    let resp = server.get_range("/apps/site/media/clip.mp4", "bytes=0-").await;
    assert_status(&resp, StatusCode::PARTIAL_CONTENT, "open range");
    assert_eq!(content_range(&resp), (0, 999, 5000));
    assert_eq!(resp.bytes().await.unwrap().len(), 1000);
}

#[tokio::test]
async fn test_unsatisfiable_ranges() {
    let server = TestServer::start().await;
    for range in ["items=0-10", "bytes=0-10,20-30", "bytes=9000-", "bytes=abc"] {
        let resp = server.get_range("/apps/site/media/clip.mp4", range).await;
        assert_status(&resp, StatusCode::RANGE_NOT_SATISFIABLE, range);
        assert_eq!(header(&resp, "content-range"), Some("bytes */5000"));
    }
}

#[tokio::test]
async fn test_partial_flag_overrides_mime() {
    let server = TestServer::start().await;

    let resp = server
        .get_range("/apps/docs/guide.txt?partial=1", "bytes=0-4")
        .await;
    assert_status(&resp, StatusCode::PARTIAL_CONTENT, "partial=1 on text");
    assert_eq!(resp.text().await.unwrap(), "plain");

    let resp = server.get("/apps/site/media/clip.mp4?partial=0").await;
    assert_status(&resp, StatusCode::OK, "partial=0 on media");
    assert_eq!(resp.bytes().await.unwrap().len(), CLIP_SIZE);
}

#[tokio::test]
async fn test_range_ignored_on_whole_delivery() {
    let server = TestServer::start().await;
    let resp = server
        .get_with(
            "/apps/docs/guide.txt",
            &[("range", "bytes=0-4"), ("accept-encoding", "identity")],
        )
        .await;
    assert_status(&resp, StatusCode::OK, "range on text");
    assert_eq!(resp.text().await.unwrap(), "plain text guide\n");
}

// ============================================================================
// Downloads and Caching Headers
// ============================================================================

#[tokio::test]
async fn test_accept_any_is_download() {
    let server = TestServer::start().await;
    let resp = server
        .get_with("/apps/site/media/clip.mp4", &[("accept", "*/*")])
        .await;
    assert_status(&resp, StatusCode::OK, "download");
    assert_eq!(header(&resp, "cache-control"), Some("no-store"));
    assert_eq!(resp.bytes().await.unwrap().len(), CLIP_SIZE);
}

#[tokio::test]
async fn test_manual_cache_time_sets_both_headers() {
    let server = TestServer::with_http(HttpConfig {
        mime_manual_cache_time: CacheTimes::new([("text/css", 60), ("text", 1)]),
        ..HttpConfig::default()
    })
    .await;

    let resp = server.get("/apps/site/css/app.css").await;
    assert_eq!(header(&resp, "cache-control"), Some("public, max-age=3600"));
    assert_eq!(header(&resp, "cdn-cache-control"), Some("public, max-age=3600"));

    let resp = server.get("/apps/docs/guide.txt").await;
    assert_eq!(header(&resp, "cache-control"), Some("public, max-age=60"));

    let resp = server.get("/favicon.ico").await;
    assert!(header(&resp, "cache-control").is_none());
}

#[tokio::test]
async fn test_oversized_content_is_no_store() {
    let server = TestServer::with_http(HttpConfig {
        uncacheable_size: 10,
        mime_manual_cache_time: CacheTimes::new([("text", 1)]),
        ..HttpConfig::default()
    })
    .await;

    let resp = server.get("/apps/site/css/app.css").await;
    assert_eq!(header(&resp, "cache-control"), Some("no-store"));
    assert!(header(&resp, "cdn-cache-control").is_none());
}

// ============================================================================
// Methods
// ============================================================================

#[tokio::test]
async fn test_head_has_headers_without_body() {
    let server = TestServer::start().await;
    let get = server.get("/apps/site/css/app.css").await;
    let get_len = header(&get, "content-length").unwrap().to_string();

    let resp = server
        .client()
        .head(server.url("/apps/site/css/app.css"))
        .send()
        .await
        .unwrap();
    assert_status(&resp, StatusCode::OK, "HEAD");
    assert_eq!(header(&resp, "content-length"), Some(get_len.as_str()));
    assert_eq!(header(&resp, "etag"), header(&get, "etag"));
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_other_methods_rejected() {
    let server = TestServer::start().await;
    let resp = server
        .client()
        .post(server.url("/apps/docs/guide.txt"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_status(&resp, StatusCode::METHOD_NOT_ALLOWED, "POST");
    assert_eq!(header(&resp, "allow"), Some("GET, HEAD"));
}

#[tokio::test]
async fn test_favicon_serves_default_app_icon() {
    let server = TestServer::start().await;
    let record = server
        .cache()
        .get_file(&server.path("site/app.icon"))
        .unwrap();

    let resp = server.get("/favicon.ico").await;
    assert_status(&resp, StatusCode::OK, "favicon");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), record.content.as_ref());
    server.shutdown().await;
}
