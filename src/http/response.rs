//! Response handling and transformation.
//!
//! # Responsibilities
//! - Hold a buffered origin response as an owned value
//! - Strip hop-by-hop headers before the response reaches the client
//! - Build the edge's own responses (acks, metrics, generic errors)
//!
//! # Design Decisions
//! - Origin bodies are read exactly once into `Bytes`; anything that needs
//!   to inspect and forward a body builds a new `UpstreamResponse`
//! - `Content-Length` is always recomputed from the final body

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Headers that describe a single hop and never cross the edge.
pub const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::PROXY_AUTHORIZATION,
];

/// Remove hop-by-hop headers, including `keep-alive` and `proxy-connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// A fully buffered response from an origin.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// The `Location` header, if present and readable.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut headers = self.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = headers;
        response
    }
}

/// Generic 500 returned whenever a request cannot be served.
pub fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [
            (header::CONTENT_TYPE, "text/plain"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        "Internal Server Error",
    )
        .into_response()
}

/// JSON acknowledgement produced by the edge itself.
pub fn json_ack(body: String, max_age_secs: u64, cache_status: &'static str) -> Response {
    let cache_control = HeaderValue::from_str(&format!("public, max-age={max_age_secs}"))
        .unwrap_or_else(|_| HeaderValue::from_static("no-cache"));
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CACHE_CONTROL, cache_control),
            (X_CACHE, HeaderValue::from_static(cache_status)),
        ],
        body,
    )
        .into_response()
}

/// Marks whether a response was served from an edge cache.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_into_response_strips_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("999"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let response = UpstreamResponse::new(StatusCode::OK, headers, "hello").into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::CONNECTION).is_none());
        assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
        assert!(response.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(response.headers().get("keep-alive").is_none());
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 2);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[test]
    fn test_internal_error_is_not_cacheable() {
        let response = internal_error();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_json_ack_headers() {
        let response = json_ack("{}".into(), 60, "HIT");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=60");
        assert_eq!(response.headers()["x-cache"], "HIT");
    }
}
