//! Route classification.
//!
//! # Responsibilities
//! - Decide whether a request belongs to the headless origin
//! - Memoize path decisions so repeated paths skip the matchers
//! - Report how long matching took
//!
//! # Design Decisions
//! - The override header is checked before the path cache and never cached
//! - Layers are evaluated exact → prefix → structural; first match wins
//! - "No match" is cached too, so the primary origin is as cheap as headless

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderName};

use crate::cache::{Clock, TtlCache};
use crate::config::RoutesConfig;
use crate::error::SetupError;
use crate::routing::matcher::{MatchLayer, RouteMatcher};

/// Why a request was classified the way it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyReason {
    /// The override header was present with the affirmative value.
    Override,
    /// A routing layer matched the path.
    Layer(MatchLayer),
    /// Nothing matched; the primary origin serves it.
    Default,
}

/// Result of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_headless: bool,
    pub reason: ClassifyReason,
    /// The path decision came from the path cache.
    pub cached: bool,
    pub match_time: Duration,
}

/// Maps a request to the headless or primary origin.
#[derive(Debug)]
pub struct RouteClassifier {
    layers: Vec<RouteMatcher>,
    override_header: HeaderName,
    override_value: String,
    path_cache: TtlCache<String, Option<MatchLayer>>,
}

impl RouteClassifier {
    /// Compile the routing rules. Empty layers are skipped.
    pub fn from_config(config: &RoutesConfig, clock: Arc<dyn Clock>) -> Result<Self, SetupError> {
        let override_header = HeaderName::from_bytes(config.override_header.as_bytes())
            .map_err(|_| SetupError::InvalidHeader(config.override_header.clone()))?;

        let layers = vec![
            RouteMatcher::exact(config.exact.iter().cloned()),
            RouteMatcher::prefix(config.prefixes.iter().cloned()),
            RouteMatcher::structural(&config.patterns)?,
        ]
        .into_iter()
        .filter(|m| !m.is_empty())
        .collect();

        Ok(Self::new(
            layers,
            override_header,
            config.override_value.clone(),
            config.cache_capacity,
            clock,
        ))
    }

    pub fn new(
        layers: Vec<RouteMatcher>,
        override_header: HeaderName,
        override_value: String,
        cache_capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            layers,
            override_header,
            override_value,
            path_cache: TtlCache::new("routes", None, Some(cache_capacity), clock),
        }
    }

    /// Classify a request by its override header and path.
    pub fn classify(&self, path: &str, headers: &HeaderMap) -> Classification {
        let start = Instant::now();

        if self.is_forced(headers) {
            return Classification {
                is_headless: true,
                reason: ClassifyReason::Override,
                cached: false,
                match_time: start.elapsed(),
            };
        }

        let (layer, cached) = match self.path_cache.get(&path.to_string()) {
            Some(layer) => (layer, true),
            None => {
                let layer = self.classify_path(path);
                self.path_cache.insert(path.to_string(), layer);
                (layer, false)
            }
        };

        Classification {
            is_headless: layer.is_some(),
            reason: layer.map_or(ClassifyReason::Default, ClassifyReason::Layer),
            cached,
            match_time: start.elapsed(),
        }
    }

    /// The override header is present with the affirmative value.
    pub fn is_forced(&self, headers: &HeaderMap) -> bool {
        headers
            .get(&self.override_header)
            .is_some_and(|v| v.as_bytes() == self.override_value.as_bytes())
    }

    /// Evaluate the layers without touching the cache.
    pub fn classify_path(&self, path: &str) -> Option<MatchLayer> {
        self.layers
            .iter()
            .find(|m| m.matches(path))
            .map(RouteMatcher::layer)
    }

    /// Number of memoized paths.
    pub fn cached_paths(&self) -> usize {
        self.path_cache.len()
    }

    /// Trim the path cache if it grew past its ceiling.
    pub fn trim_cache(&self) -> usize {
        self.path_cache.evict_if_over_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SystemClock;
    use axum::http::HeaderValue;

    fn classifier() -> RouteClassifier {
        RouteClassifier::from_config(&RoutesConfig::default(), Arc::new(SystemClock)).unwrap()
    }

    #[test]
    fn test_layers() {
        let c = classifier();
        assert_eq!(c.classify_path("/collections/keyboards"), Some(MatchLayer::Exact));
        assert_eq!(
            c.classify_path("/collections/in-stock-keyboards/page-2"),
            Some(MatchLayer::Prefix)
        );
        assert_eq!(
            c.classify_path("/products/k2-pro/reviews"),
            Some(MatchLayer::Structural)
        );
        assert_eq!(c.classify_path("/products/k2-pro"), None);
        assert_eq!(c.classify_path("/account/orders"), Some(MatchLayer::Prefix));
    }

    #[test]
    fn test_exact_wins_over_later_layers() {
        // "/api/collect" is exact; "/api/collect/x" is prefix and pattern
        let c = classifier();
        assert_eq!(c.classify_path("/api/collect"), Some(MatchLayer::Exact));
        assert_eq!(c.classify_path("/api/collect/x"), Some(MatchLayer::Prefix));
    }

    #[test]
    fn test_second_lookup_is_cached() {
        let c = classifier();
        let headers = HeaderMap::new();

        let first = c.classify("/collections/keyboards", &headers);
        assert!(first.is_headless);
        assert!(!first.cached);

        let second = c.classify("/collections/keyboards", &headers);
        assert!(second.cached);
        assert_eq!(second.reason, ClassifyReason::Layer(MatchLayer::Exact));

        // Primary decisions are cached too
        assert!(!c.classify("/pages/about", &headers).is_headless);
        assert!(c.classify("/pages/about", &headers).cached);
        assert_eq!(c.cached_paths(), 2);
    }

    #[test]
    fn test_override_header() {
        let c = classifier();
        let mut headers = HeaderMap::new();
        headers.insert("x-headless-request", HeaderValue::from_static("1"));

        let result = c.classify("/pages/about", &headers);
        assert!(result.is_headless);
        assert_eq!(result.reason, ClassifyReason::Override);
        assert_eq!(c.cached_paths(), 0);

        headers.insert("x-headless-request", HeaderValue::from_static("0"));
        assert!(!c.is_forced(&headers));
        assert!(!c.classify("/pages/about", &headers).is_headless);
    }

    #[test]
    fn test_path_cache_is_bounded() {
        let c = RouteClassifier::new(
            vec![RouteMatcher::exact(["/a"])],
            HeaderName::from_static("x-headless-request"),
            "1".to_string(),
            4,
            Arc::new(SystemClock),
        );
        for i in 0..5 {
            c.classify(&format!("/p{i}"), &HeaderMap::new());
        }
        assert_eq!(c.cached_paths(), 3);
    }
}
