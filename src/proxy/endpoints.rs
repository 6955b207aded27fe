//! Endpoints answered by the edge itself.
//!
//! Telemetry beacons and analytics collection posts are acknowledged from
//! short-lived caches instead of reaching an origin. The performance path
//! returns the metrics snapshot.

use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::cache::{BeaconKey, CacheSet, CacheSizes, Clock, CollectKey};
use crate::config::{CacheConfig, EndpointsConfig};
use crate::http::request::InboundRequest;
use crate::http::response::json_ack;
use crate::observability::metrics::record_cache_event;
use crate::observability::MetricsSnapshot;

/// A locally produced acknowledgement.
pub struct Ack {
    pub response: Response,
    pub hit: bool,
}

/// Body of the performance endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
    pub cache_sizes: CacheSizes,
    pub cached_routes: usize,
}

#[derive(Debug, Clone)]
pub struct AckEndpoints {
    config: EndpointsConfig,
    beacon_ttl_secs: u64,
    collect_ttl_secs: u64,
}

impl AckEndpoints {
    pub fn new(config: &EndpointsConfig, caches: &CacheConfig) -> Self {
        Self {
            config: config.clone(),
            beacon_ttl_secs: caches.beacon_ttl_secs,
            collect_ttl_secs: caches.collect_ttl_secs,
        }
    }

    pub fn is_metrics_path(&self, path: &str) -> bool {
        path == self.config.metrics_path
    }

    pub fn is_beacon(&self, path: &str) -> bool {
        path.starts_with(&self.config.beacon_prefix)
    }

    pub fn is_collect(&self, path: &str) -> bool {
        path.starts_with(&self.config.collect_prefix)
    }

    /// Answer a beacon from the cache, or synthesise one for a POST.
    /// Other methods fall through to normal dispatch.
    pub fn beacon(&self, caches: &CacheSet, request: &InboundRequest, clock: &dyn Clock) -> Option<Ack> {
        let key = BeaconKey::new(&request.method, request.path());
        if let Some(body) = caches.beacon.get(&key) {
            record_cache_event("beacon", "hit");
            return Some(Ack {
                response: json_ack(body, self.beacon_ttl_secs, "HIT"),
                hit: true,
            });
        }
        record_cache_event("beacon", "miss");

        if request.method != Method::POST {
            return None;
        }
        let body = json!({
            "status": "ok",
            "cached": true,
            "timestamp": clock.now_millis(),
        })
        .to_string();
        caches.beacon.insert(key, body.clone());
        tracing::debug!(path = %request.path(), "Beacon acknowledged locally");

        Some(Ack {
            response: json_ack(body, self.beacon_ttl_secs, "MISS"),
            hit: false,
        })
    }

    /// Answer a collect post from the cache, or synthesise one for a small
    /// POST body. Large bodies and other methods fall through.
    pub fn collect(&self, caches: &CacheSet, request: &InboundRequest) -> Option<Ack> {
        let key = CollectKey::new(&request.method, request.path(), &request.headers);
        if let Some(body) = caches.collect.get(&key) {
            record_cache_event("collect", "hit");
            return Some(Ack {
                response: json_ack(body, self.collect_ttl_secs, "HIT"),
                hit: true,
            });
        }
        record_cache_event("collect", "miss");

        if request.method != Method::POST || request.body.len() >= self.config.collect_max_body {
            return None;
        }
        let body = json!({ "status": "success", "cached": true }).to_string();
        caches.collect.insert(key, body.clone());

        Some(Ack {
            response: json_ack(body, self.collect_ttl_secs, "MISS"),
            hit: false,
        })
    }
}

/// JSON response of the performance endpoint.
pub fn performance_response(report: PerformanceReport) -> Response {
    Json(report).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use axum::http::HeaderMap;
    use std::sync::Arc;

    fn setup() -> (AckEndpoints, CacheSet, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let caches = CacheSet::from_config(&CacheConfig::default(), clock.clone());
        let acks = AckEndpoints::new(&EndpointsConfig::default(), &CacheConfig::default());
        (acks, caches, clock)
    }

    fn request(method: Method, path: &str, body: &'static [u8]) -> InboundRequest {
        InboundRequest::new(method, path.parse().unwrap(), HeaderMap::new(), body)
    }

    #[test]
    fn test_beacon_miss_then_hit() {
        let (acks, caches, clock) = setup();
        let req = request(Method::POST, "/.well-known/shopify/monorail/v1/produce", b"{}");
        assert!(acks.is_beacon(req.path()));

        let first = acks.beacon(&caches, &req, clock.as_ref()).unwrap();
        assert!(!first.hit);
        assert_eq!(first.response.headers()["x-cache"], "MISS");

        let second = acks.beacon(&caches, &req, clock.as_ref()).unwrap();
        assert!(second.hit);
        assert_eq!(second.response.headers()["cache-control"], "public, max-age=60");
    }

    #[test]
    fn test_beacon_get_falls_through() {
        let (acks, caches, clock) = setup();
        let req = request(Method::GET, "/.well-known/shopify/monorail/v1/produce", b"");
        assert!(acks.beacon(&caches, &req, clock.as_ref()).is_none());
    }

    #[test]
    fn test_collect_body_limit() {
        let (acks, caches, _clock) = setup();
        let small = request(Method::POST, "/api/collect", b"{\"e\":1}");
        assert!(acks.collect(&caches, &small).is_some());

        static LARGE: [u8; 1000] = [b'x'; 1000];
        let large = request(Method::POST, "/api/collect/events", &LARGE);
        assert!(acks.collect(&caches, &large).is_none());
    }

    #[test]
    fn test_collect_expires() {
        let (acks, caches, clock) = setup();
        let req = request(Method::POST, "/api/collect", b"{}");
        acks.collect(&caches, &req).unwrap();
        clock.advance(std::time::Duration::from_secs(300));
        assert!(!acks.collect(&caches, &req).unwrap().hit);
    }
}
