//! Request dispatch.
//!
//! # Responsibilities
//! - Answer operational endpoints (performance, beacon and collect acks)
//! - Decide the origin: alias → bypass → response cache → classifier
//! - Forward, rewrite, populate the response cache
//! - Record metrics for every request, including failed ones
//!
//! # Design Decisions
//! - Alias resolution runs before bypass; an aliased path always goes to
//!   the primary origin, so bypass stays absolute
//! - Only GET requests classified by the route classifier touch the
//!   response cache; aliased, bypassed and override traffic is never cached
//! - Rewrite failures fall back to the origin response unmodified

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::cache::{CacheSet, CachedResponse, Clock, ResponseKey};
use crate::config::EdgeConfig;
use crate::error::{ProxyError, SetupError};
use crate::http::request::InboundRequest;
use crate::http::response::{strip_hop_by_hop, UpstreamResponse, X_CACHE};
use crate::observability::aggregator::{MetricsAggregator, RequestKind, RequestRecord};
use crate::observability::metrics;
use crate::proxy::endpoints::{performance_response, Ack, AckEndpoints, PerformanceReport};
use crate::proxy::origin::{OriginLabel, Origins};
use crate::proxy::upstream::{OutboundRequest, Upstream};
use crate::rewrite::{ResponseRewriter, RewriteContext, RewriteMode};
use crate::routing::{BypassClassifier, BypassReason, RouteClassifier};

/// Where a request goes and how its response is treated.
#[derive(Debug)]
struct Plan {
    origin: OriginLabel,
    forward_path: String,
    bypass: Option<BypassReason>,
    route_cached: bool,
    match_time: Duration,
    cache_key: Option<ResponseKey>,
    ctx: RewriteContext,
}

/// The request pipeline shared by every connection.
pub struct Dispatcher {
    origins: Origins,
    classifier: RouteClassifier,
    bypass: BypassClassifier,
    rewriter: ResponseRewriter,
    acks: AckEndpoints,
    caches: CacheSet,
    metrics: Arc<MetricsAggregator>,
    upstream: Arc<dyn Upstream>,
    clock: Arc<dyn Clock>,
    public_host: String,
    prune_interval: u64,
    request_count: AtomicU64,
}

impl Dispatcher {
    pub fn from_config(
        config: &EdgeConfig,
        upstream: Arc<dyn Upstream>,
        metrics: Arc<MetricsAggregator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SetupError> {
        let origins = Origins::from_config(&config.origins)?;
        Ok(Self {
            classifier: RouteClassifier::from_config(&config.routes, clock.clone())?,
            bypass: BypassClassifier::from_config(&config.bypass),
            rewriter: ResponseRewriter::from_config(&origins, &config.aliases)?,
            acks: AckEndpoints::new(&config.endpoints, &config.caches),
            caches: CacheSet::from_config(&config.caches, clock.clone()),
            origins,
            metrics,
            upstream,
            clock,
            public_host: config.listener.public_host.clone(),
            prune_interval: config.caches.prune_interval.max(1),
            request_count: AtomicU64::new(0),
        })
    }

    pub fn metrics(&self) -> &MetricsAggregator {
        &self.metrics
    }

    pub fn caches(&self) -> &CacheSet {
        &self.caches
    }

    /// Handle one request. Never fails: errors become the generic 500.
    pub async fn handle(&self, request: InboundRequest) -> Response {
        let start = Instant::now();
        self.tick();

        let path = request.path();
        if self.acks.is_metrics_path(path) {
            return performance_response(self.report());
        }
        if self.acks.is_beacon(path) {
            if let Some(ack) = self.acks.beacon(&self.caches, &request, self.clock.as_ref()) {
                return self.finish_ack(&request, ack, RequestKind::Beacon, start);
            }
        }
        if self.acks.is_collect(path) {
            if let Some(ack) = self.acks.collect(&self.caches, &request) {
                return self.finish_ack(&request, ack, RequestKind::Collect, start);
            }
        }

        let (client_host, original_url) = match self.client_url(&request) {
            Ok(target) => target,
            Err(e) => return self.fail(&request, None, e, start),
        };

        let plan = match self.fixed_plan(&request, &client_host, &original_url) {
            Some(plan) => plan,
            None => {
                // Override requests never read or populate the response cache
                let replayable =
                    request.method == Method::GET && !self.classifier.is_forced(&request.headers);
                let cache_key = replayable.then(|| {
                    let target = request.uri.path_and_query().map_or(path, |pq| pq.as_str());
                    ResponseKey::new(&request.method, &client_host, target, &request.headers)
                });
                if let Some(key) = &cache_key {
                    if let Some(cached) = self.caches.responses.get(key) {
                        return self.replay(&request, cached, start);
                    }
                    metrics::record_cache_event("responses", "miss");
                }
                self.classified_plan(&request, client_host, original_url, cache_key)
            }
        };

        match self.forward(&request, &plan).await {
            Ok(response) => {
                let response = self.rewrite(response, &plan);
                if let Some(key) = plan.cache_key.clone() {
                    self.store(key, plan.origin, &response);
                }
                self.record(
                    &request,
                    RequestRecord {
                        duration: start.elapsed(),
                        kind: RequestKind::Proxied,
                        origin: plan.origin,
                        cache_hit: plan.route_cached,
                        bypass: plan.bypass.is_some(),
                        response_cache_hit: false,
                        match_time: plan.match_time,
                    },
                    response.status.as_u16(),
                    start,
                );
                response.into_response()
            }
            Err(e) => {
                metrics::record_upstream_error(plan.origin.as_str());
                self.fail(&request, Some(&plan), e, start)
            }
        }
    }

    /// Count the request; every Nth one runs cache maintenance and logs
    /// a performance report.
    fn tick(&self) {
        let count = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.prune_interval != 0 {
            return;
        }

        let maintenance = self.caches.maintain();
        let trimmed_routes = self.classifier.trim_cache();
        let report = self.report();
        tracing::info!(
            requests = count,
            total_requests = report.metrics.total_requests,
            avg_response_time_ms = report.metrics.avg_response_time_ms,
            p95_response_time_ms = report.metrics.p95_response_time_ms,
            cache_hit_rate = report.metrics.cache_hit_rate,
            avg_route_match_time_ms = report.metrics.avg_route_match_time_ms,
            collect_requests = report.metrics.collect_requests,
            beacon_requests = report.metrics.beacon_requests,
            response_cache_hits = report.metrics.response_cache_hits,
            headless_routes = report.metrics.headless_routes,
            primary_routes = report.metrics.primary_routes,
            errors = report.metrics.errors,
            expired = maintenance.expired,
            evicted = maintenance.evicted + trimmed_routes,
            "Performance report"
        );
    }

    pub fn report(&self) -> PerformanceReport {
        PerformanceReport {
            metrics: self.metrics.snapshot(),
            cache_sizes: self.caches.sizes(),
            cached_routes: self.classifier.cached_paths(),
        }
    }

    fn client_url(&self, request: &InboundRequest) -> Result<(String, Url), ProxyError> {
        let client_host = request.client_host(&self.public_host);
        let url = request
            .client_url(&client_host)
            .map_err(|e| ProxyError::InvalidRequest(format!("host '{client_host}': {e}")))?;
        Ok((client_host, url))
    }

    /// Aliased and bypassed requests: always the primary origin, never cached.
    fn fixed_plan(&self, request: &InboundRequest, client_host: &str, original_url: &Url) -> Option<Plan> {
        let path = request.path();
        let (forward_path, mode, bypass) = if let Some(canonical) = self.rewriter.resolve_alias(path) {
            tracing::debug!(request_id = %request.request_id(), from = %path, to = %canonical, "Alias path");
            (canonical, RewriteMode::Alias, None)
        } else {
            let reason = self.bypass.evaluate(original_url)?;
            let mode = if self.bypass.is_password_related(original_url) {
                RewriteMode::Password
            } else {
                RewriteMode::Routed
            };
            tracing::debug!(request_id = %request.request_id(), path = %path, reason = reason.as_str(), "Bypass");
            (path.to_string(), mode, Some(reason))
        };

        Some(Plan {
            origin: OriginLabel::Primary,
            forward_path,
            bypass,
            route_cached: false,
            match_time: Duration::ZERO,
            cache_key: None,
            ctx: RewriteContext {
                original_url: original_url.clone(),
                client_host: client_host.to_string(),
                origin: OriginLabel::Primary,
                is_bypass: bypass.is_some(),
                is_headless: false,
                mode,
            },
        })
    }

    fn classified_plan(
        &self,
        request: &InboundRequest,
        client_host: String,
        original_url: Url,
        cache_key: Option<ResponseKey>,
    ) -> Plan {
        let classification = self.classifier.classify(request.path(), &request.headers);
        let origin = if classification.is_headless {
            OriginLabel::Headless
        } else {
            OriginLabel::Primary
        };

        Plan {
            origin,
            forward_path: request.path().to_string(),
            bypass: None,
            route_cached: classification.cached,
            match_time: classification.match_time,
            cache_key,
            ctx: RewriteContext {
                original_url,
                client_host,
                origin,
                is_bypass: false,
                is_headless: classification.is_headless,
                mode: RewriteMode::Routed,
            },
        }
    }

    fn replay(&self, request: &InboundRequest, cached: CachedResponse, start: Instant) -> Response {
        metrics::record_cache_event("responses", "hit");
        tracing::debug!(request_id = %request.request_id(), path = %request.path(), "Response cache hit");
        self.record(
            request,
            RequestRecord {
                duration: start.elapsed(),
                kind: RequestKind::Proxied,
                origin: cached.origin,
                cache_hit: true,
                bypass: false,
                response_cache_hit: true,
                match_time: Duration::ZERO,
            },
            cached.response.status.as_u16(),
            start,
        );
        let mut response = cached.response.into_response();
        response.headers_mut().insert(X_CACHE, HeaderValue::from_static("HIT"));
        response
    }

    async fn forward(&self, request: &InboundRequest, plan: &Plan) -> Result<UpstreamResponse, ProxyError> {
        let origin = self.origins.get(plan.origin);

        let mut headers = request.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::CONTENT_LENGTH);
        let host = HeaderValue::from_str(&origin.host)
            .map_err(|e| ProxyError::InvalidRequest(format!("origin host '{}': {e}", origin.host)))?;
        headers.insert(header::HOST, host);

        let outbound = OutboundRequest {
            origin: plan.origin,
            method: request.method.clone(),
            url: origin.target_url(&plan.forward_path, request.query()),
            headers,
            body: request.body.clone(),
        };

        tracing::debug!(
            request_id = %request.request_id(),
            origin = %plan.origin,
            url = %outbound.url,
            "Forwarding"
        );
        Ok(self.upstream.send(outbound).await?)
    }

    fn rewrite(&self, response: UpstreamResponse, plan: &Plan) -> UpstreamResponse {
        let ctx = &plan.ctx;
        if ctx.is_bypass && ctx.mode != RewriteMode::Password {
            return response;
        }
        let needed = ctx.mode != RewriteMode::Routed
            || ctx.origin == OriginLabel::Primary
            || (response.is_redirect() && response.headers.contains_key(header::LOCATION));
        if !needed {
            return response;
        }

        match self.rewriter.rewrite(&response, &plan.ctx) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                tracing::warn!(
                    url = %plan.ctx.original_url,
                    mode = plan.ctx.mode.as_str(),
                    error = %e,
                    "Rewrite failed, returning origin response"
                );
                metrics::record_rewrite_failure(plan.ctx.mode.as_str());
                response
            }
        }
    }

    fn store(&self, key: ResponseKey, origin: OriginLabel, response: &UpstreamResponse) {
        if !response.status.is_success() {
            return;
        }
        if !is_cacheable(&response.headers) {
            tracing::debug!(origin = %origin, "Response not cacheable, skipping store");
            return;
        }
        self.caches.responses.insert(
            key,
            CachedResponse {
                origin,
                response: response.clone(),
            },
        );
        metrics::record_cache_event("responses", "store");
    }

    fn record(&self, request: &InboundRequest, record: RequestRecord, status: u16, start: Instant) {
        metrics::record_request(request.method.as_str(), status, record.origin.as_str(), start);
        self.metrics.record(record);
    }

    fn finish_ack(&self, request: &InboundRequest, ack: Ack, kind: RequestKind, start: Instant) -> Response {
        let origin = match kind {
            RequestKind::Collect => OriginLabel::Headless,
            _ => OriginLabel::Primary,
        };
        self.record(
            request,
            RequestRecord {
                duration: start.elapsed(),
                kind,
                origin,
                cache_hit: true,
                bypass: false,
                response_cache_hit: false,
                match_time: Duration::ZERO,
            },
            ack.response.status().as_u16(),
            start,
        );
        tracing::debug!(request_id = %request.request_id(), path = %request.path(), hit = ack.hit, "Acknowledged locally");
        ack.response
    }

    /// Failed requests still count towards totals and latency.
    fn fail(&self, request: &InboundRequest, plan: Option<&Plan>, error: ProxyError, start: Instant) -> Response {
        let origin = plan.map_or(OriginLabel::Primary, |p| p.origin);
        tracing::error!(
            request_id = %request.request_id(),
            method = %request.method,
            path = %request.path(),
            origin = %origin,
            kind = error.kind(),
            error = %error,
            "Request failed"
        );
        self.metrics.record_error();
        self.record(
            request,
            RequestRecord {
                duration: start.elapsed(),
                kind: RequestKind::Proxied,
                origin,
                cache_hit: plan.is_some_and(|p| p.route_cached),
                bypass: plan.is_some_and(|p| p.bypass.is_some()),
                response_cache_hit: false,
                match_time: plan.map_or(Duration::ZERO, |p| p.match_time),
            },
            500,
            start,
        );
        error.into_response()
    }
}

/// A 2xx response may be replayed unless it sets cookies or forbids
/// shared caching.
fn is_cacheable(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::SET_COOKIE) {
        return false;
    }
    !headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|d| d.trim().to_ascii_lowercase())
        .any(|d| d == "no-store" || d == "private" || d.starts_with("private="))
}
