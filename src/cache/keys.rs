//! Typed cache keys.
//!
//! Each cache has its own keyspace so a key built for one cache can never
//! be used to read another.

use axum::http::{HeaderMap, Method};

/// Collect acknowledgements: method, path and a client fingerprint
/// (the `User-Agent`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectKey {
    method: Method,
    path: String,
    fingerprint: String,
}

impl CollectKey {
    pub fn new(method: &Method, path: &str, headers: &HeaderMap) -> Self {
        Self {
            method: method.clone(),
            path: path.to_string(),
            fingerprint: header_or_empty(headers, "user-agent"),
        }
    }
}

/// Beacon acknowledgements: method and path only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BeaconKey {
    method: Method,
    path: String,
}

impl BeaconKey {
    pub fn new(method: &Method, path: &str) -> Self {
        Self {
            method: method.clone(),
            path: path.to_string(),
        }
    }
}

/// Full responses: method, client host, path and `Accept`. Bodies are
/// rewritten for the client host, and an HTML page and a JSON rendering of
/// the same path never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseKey {
    method: Method,
    host: String,
    path: String,
    accept: String,
}

impl ResponseKey {
    pub fn new(method: &Method, host: &str, path: &str, headers: &HeaderMap) -> Self {
        Self {
            method: method.clone(),
            host: host.to_ascii_lowercase(),
            path: path.to_string(),
            accept: header_or_empty(headers, "accept"),
        }
    }
}

fn header_or_empty(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_response_key_varies_by_accept() {
        let mut html = HeaderMap::new();
        html.insert("accept", HeaderValue::from_static("text/html"));
        let mut json = HeaderMap::new();
        json.insert("accept", HeaderValue::from_static("application/json"));

        let a = ResponseKey::new(&Method::GET, "www.example.com", "/collections/keyboards", &html);
        let b = ResponseKey::new(&Method::GET, "www.example.com", "/collections/keyboards", &json);
        let c = ResponseKey::new(&Method::GET, "WWW.example.com", "/collections/keyboards", &html);
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_response_key_varies_by_host() {
        let headers = HeaderMap::new();
        let a = ResponseKey::new(&Method::GET, "www.example.com", "/pages/about", &headers);
        let b = ResponseKey::new(&Method::GET, "shop.example.org", "/pages/about", &headers);
        assert_ne!(a, b);
    }

    #[test]
    fn test_collect_key_missing_user_agent() {
        let key = CollectKey::new(&Method::POST, "/api/collect", &HeaderMap::new());
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static(""));
        assert_eq!(key, CollectKey::new(&Method::POST, "/api/collect", &headers));
    }
}
