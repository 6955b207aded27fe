//! The cache instances owned by a dispatcher.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::clock::Clock;
use crate::cache::keys::{BeaconKey, CollectKey, ResponseKey};
use crate::cache::ttl::TtlCache;
use crate::config::CacheConfig;
use crate::http::response::UpstreamResponse;
use crate::proxy::origin::OriginLabel;

/// A full upstream response kept for replay, with the origin that produced it.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub origin: OriginLabel,
    pub response: UpstreamResponse,
}

/// Entries removed by one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired: usize,
    pub evicted: usize,
}

/// Current entry counts, reported alongside the metrics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSizes {
    pub collect: usize,
    pub beacon: usize,
    pub responses: usize,
}

/// Collect acks, beacon acks and full responses.
#[derive(Debug)]
pub struct CacheSet {
    pub collect: TtlCache<CollectKey, String>,
    pub beacon: TtlCache<BeaconKey, String>,
    pub responses: TtlCache<ResponseKey, CachedResponse>,
}

impl CacheSet {
    pub fn from_config(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            collect: TtlCache::new(
                "collect",
                Some(Duration::from_secs(config.collect_ttl_secs)),
                Some(config.collect_capacity),
                clock.clone(),
            ),
            beacon: TtlCache::new(
                "beacon",
                Some(Duration::from_secs(config.beacon_ttl_secs)),
                Some(config.beacon_capacity),
                clock.clone(),
            ),
            responses: TtlCache::new(
                "responses",
                Some(Duration::from_secs(config.response_ttl_secs)),
                Some(config.response_capacity),
                clock,
            ),
        }
    }

    /// Prune expired entries from every cache, then trim any that are over
    /// capacity. One bounded sweep per cache.
    pub fn maintain(&self) -> MaintenanceReport {
        let expired = self.collect.prune_expired()
            + self.beacon.prune_expired()
            + self.responses.prune_expired();
        let evicted = self.collect.evict_if_over_capacity()
            + self.beacon.evict_if_over_capacity()
            + self.responses.evict_if_over_capacity();

        if expired > 0 || evicted > 0 {
            tracing::debug!(expired, evicted, "Cache maintenance");
        }
        MaintenanceReport { expired, evicted }
    }

    pub fn sizes(&self) -> CacheSizes {
        CacheSizes {
            collect: self.collect.len(),
            beacon: self.beacon.len(),
            responses: self.responses.len(),
        }
    }
}
