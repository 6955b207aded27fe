//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all edge handler
//! - Configure HTTP/1.1 and HTTP/2 support
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Bound in-flight requests with a semaphore
//! - Hand buffered requests to the dispatcher

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::SystemClock;
use crate::config::EdgeConfig;
use crate::error::SetupError;
use crate::http::request::InboundRequest;
use crate::http::response::internal_error;
use crate::observability::MetricsAggregator;
use crate::proxy::dispatcher::Dispatcher;
use crate::proxy::upstream::HttpUpstream;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub in_flight: Arc<Semaphore>,
    pub max_body_size: usize,
}

/// HTTP server for the edge.
pub struct HttpServer {
    router: Router,
    config: EdgeConfig,
}

impl HttpServer {
    /// Create a new HTTP server forwarding to real origins.
    pub fn new(config: EdgeConfig) -> Result<Self, SetupError> {
        let upstream = Arc::new(HttpUpstream::new(&config.timeouts)?);
        let dispatcher = Dispatcher::from_config(
            &config,
            upstream,
            Arc::new(MetricsAggregator::new()),
            Arc::new(SystemClock),
        )?;
        Ok(Self::with_dispatcher(config, Arc::new(dispatcher)))
    }

    /// Create a server around an existing dispatcher.
    pub fn with_dispatcher(config: EdgeConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let state = AppState {
            dispatcher,
            in_flight: Arc::new(Semaphore::new(config.listener.max_connections)),
            max_body_size: config.security.max_body_size,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &EdgeConfig, state: AppState) -> Router {
        let max_body_size = state.max_body_size;
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    // Body limit outside the timeout: the timeout layer needs a
                    // `Default` response body, which the limit wrapper lacks
                    .layer(RequestBodyLimitLayer::new(max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The router, for serving with a custom listener or in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = self.config.listener.max_connections,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }
}

/// Catch-all handler: buffer the request and dispatch it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let Ok(_permit) = state.in_flight.acquire().await else {
        return internal_error();
    };

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Request body rejected");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    state
        .dispatcher
        .handle(InboundRequest::from_parts(parts, body))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::http::response::UpstreamResponse;
    use crate::proxy::upstream::{OutboundRequest, Upstream, UpstreamError};
    use async_trait::async_trait;
    use axum::http::HeaderMap;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl Upstream for Echo {
        async fn send(&self, request: OutboundRequest) -> Result<UpstreamResponse, UpstreamError> {
            Ok(UpstreamResponse::new(
                StatusCode::OK,
                HeaderMap::new(),
                request.url.path().to_string(),
            ))
        }
    }

    fn server(config: EdgeConfig) -> HttpServer {
        let dispatcher = Dispatcher::from_config(
            &config,
            Arc::new(Echo),
            Arc::new(MetricsAggregator::new()),
            Arc::new(ManualClock::new(0)),
        )
        .unwrap();
        HttpServer::with_dispatcher(config, Arc::new(dispatcher))
    }

    #[tokio::test]
    async fn test_request_id_is_set() {
        let response = server(EdgeConfig::default())
            .router()
            .oneshot(Request::get("/pages/about").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let mut config = EdgeConfig::default();
        config.security.max_body_size = 16;
        let response = server(config)
            .router()
            .oneshot(
                Request::post("/pages/contact")
                    .body(Body::from(vec![b'x'; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_body_within_limit_reaches_dispatcher() {
        let mut config = EdgeConfig::default();
        config.security.max_body_size = 64;
        let response = server(config)
            .router()
            .oneshot(
                Request::post("/pages/contact")
                    .header("content-length", "16")
                    .body(Body::from(vec![b'x'; 16]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"/pages/contact");
    }
}
