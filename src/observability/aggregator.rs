//! In-process request statistics.
//!
//! Counters plus a ring of the most recent response times. Percentiles,
//! averages and the cache hit rate are derived when a snapshot is taken.
//! Process-wide and volatile: everything resets on restart.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::proxy::origin::OriginLabel;

/// Response time samples kept for percentiles.
pub const SAMPLE_WINDOW: usize = 1000;

/// What kind of request was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Forwarded to (or replayed from the cache of) an origin.
    Proxied,
    /// Answered from the collect acknowledgement cache.
    Collect,
    /// Answered from the beacon acknowledgement cache.
    Beacon,
}

/// One finished request.
#[derive(Debug, Clone, Copy)]
pub struct RequestRecord {
    pub duration: Duration,
    pub kind: RequestKind,
    pub origin: OriginLabel,
    /// Served or classified from a cache rather than computed.
    pub cache_hit: bool,
    pub bypass: bool,
    pub response_cache_hit: bool,
    pub match_time: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    total_requests: u64,
    cache_hits: u64,
    cache_misses: u64,
    errors: u64,
    headless_routes: u64,
    primary_routes: u64,
    bypass_routes: u64,
    collect_requests: u64,
    beacon_requests: u64,
    response_cache_hits: u64,
    response_time_sum_ms: f64,
    route_match_sum_ms: f64,
    samples: VecDeque<f64>,
}

/// Derived view of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors: u64,
    pub headless_routes: u64,
    pub primary_routes: u64,
    pub bypass_routes: u64,
    pub collect_requests: u64,
    pub beacon_requests: u64,
    pub response_cache_hits: u64,
    pub avg_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub p99_response_time_ms: f64,
    /// Percentage, two decimals.
    pub cache_hit_rate: f64,
    pub avg_route_match_time_ms: f64,
}

#[derive(Debug, Default)]
pub struct MetricsAggregator {
    inner: Mutex<Counters>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, record: RequestRecord) {
        let duration_ms = record.duration.as_secs_f64() * 1000.0;
        let mut c = self.lock();

        c.total_requests += 1;
        c.response_time_sum_ms += duration_ms;
        c.route_match_sum_ms += record.match_time.as_secs_f64() * 1000.0;

        if record.cache_hit {
            c.cache_hits += 1;
        } else {
            c.cache_misses += 1;
        }
        match record.origin {
            OriginLabel::Headless => c.headless_routes += 1,
            OriginLabel::Primary => c.primary_routes += 1,
        }
        if record.bypass {
            c.bypass_routes += 1;
        }
        match record.kind {
            RequestKind::Collect => c.collect_requests += 1,
            RequestKind::Beacon => c.beacon_requests += 1,
            RequestKind::Proxied => {}
        }
        if record.response_cache_hit {
            c.response_cache_hits += 1;
        }

        c.samples.push_back(duration_ms);
        if c.samples.len() > SAMPLE_WINDOW {
            c.samples.pop_front();
        }
    }

    pub fn record_error(&self) {
        self.lock().errors += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = self.lock();
        let mut sorted: Vec<f64> = c.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        let lookups = c.cache_hits + c.cache_misses;
        let per_request = |sum: f64| {
            if c.total_requests == 0 {
                0.0
            } else {
                round2(sum / c.total_requests as f64)
            }
        };

        MetricsSnapshot {
            total_requests: c.total_requests,
            cache_hits: c.cache_hits,
            cache_misses: c.cache_misses,
            errors: c.errors,
            headless_routes: c.headless_routes,
            primary_routes: c.primary_routes,
            bypass_routes: c.bypass_routes,
            collect_requests: c.collect_requests,
            beacon_requests: c.beacon_requests,
            response_cache_hits: c.response_cache_hits,
            avg_response_time_ms: per_request(c.response_time_sum_ms),
            p95_response_time_ms: round2(percentile(&sorted, 95.0)),
            p99_response_time_ms: round2(percentile(&sorted, 99.0)),
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                round2(c.cache_hits as f64 / lookups as f64 * 100.0)
            },
            avg_route_match_time_ms: per_request(c.route_match_sum_ms),
        }
    }
}

/// Nearest-rank percentile over sorted samples; 0 when empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
