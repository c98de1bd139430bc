//! Response construction helpers.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{ALLOW, CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue, LOCATION};
use hyper::{Response, StatusCode};
use tracing::warn;

/// Response body type used throughout the server.
pub type Body = Full<Bytes>;

/// Empty response with `status`.
pub fn empty(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Response with `status`, a body and its `Content-Length`.
pub fn with_body(status: StatusCode, body: Bytes) -> Response<Body> {
    let len = body.len();
    let mut response = Response::new(Body::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
    response
}

/// `200` HTML page.
pub fn html(page: String) -> Response<Body> {
    let mut response = with_body(StatusCode::OK, Bytes::from(page));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// `302` to `location`.
pub fn redirect(location: &str) -> Response<Body> {
    match HeaderValue::from_str(location) {
        Ok(value) => {
            let mut response = empty(StatusCode::FOUND);
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => {
            warn!(location, "Redirect target is not a valid header value");
            empty(StatusCode::BAD_REQUEST)
        }
    }
}

/// `405` listing the supported methods.
pub fn method_not_allowed() -> Response<Body> {
    let mut response = empty(StatusCode::METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

/// Insert a header from a string, skipping values that are not valid
/// header text.
pub fn set_header(response: &mut Response<Body>, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            response.headers_mut().insert(name, value);
        }
        Err(_) => warn!(header = %name, value, "Skipping invalid header value"),
    }
}

/// Drop the body but keep every header, for `HEAD`.
pub fn strip_body(response: Response<Body>) -> Response<Body> {
    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::new(Bytes::new()))
}
