//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health, resource, readiness and metrics routes
//! - Wire up middleware (tracing, timeout, request ID, headers, CORS, metrics)
//! - Serve on an already bound listener until shutdown
//!
//! The server starts accepting as soon as `run` is called, before the
//! service is ready. It shares nothing with the readiness machinery except
//! the read-only "started" listener used by `/sd/ready`.

use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::health::handlers::{health_check, readiness_check};
use crate::health::resources::{cpu_check, disk_check, ram_check};
use crate::http::middleware::{track_metrics, with_cors, with_response_headers};
use crate::http::request::with_request_id;
use crate::lifecycle::shutdown::triggered;
use crate::lifecycle::signal::SignalListener;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub started: SignalListener,
}

/// HTTP server for the service; the request acceptor.
pub struct HttpServer {
    router: Router,
    config: Arc<ServiceConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(
        config: Arc<ServiceConfig>,
        started: SignalListener,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let state = AppState {
            config: config.clone(),
            started,
        };
        let router = Self::build_router(&config, state, metrics);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &ServiceConfig,
        state: AppState,
        metrics: Option<PrometheusHandle>,
    ) -> Router {
        let mut router = Router::new()
            .route("/sd/health", get(health_check))
            .route("/sd/ready", get(readiness_check))
            .route("/sd/disk", get(disk_check))
            .route("/sd/cpu", get(cpu_check))
            .route("/sd/ram", get(ram_check));
        if let Some(handle) = metrics {
            router = router.route(
                "/metrics",
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        let router = router
            .with_state(state)
            .layer(middleware::from_fn(track_metrics));
        let router = with_response_headers(with_cors(router))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http());
        with_request_id(router)
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The router, for serving without a listener (e.g. `oneshot` in tests).
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. In-flight requests are drained before returning.
    pub async fn run(self, listener: TcpListener, shutdown: SignalListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(triggered(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::signal::Signal;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn router(started: &Signal) -> Router {
        HttpServer::new(Arc::new(ServiceConfig::default()), started.listener(), None).into_router()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get_request(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_route_sets_headers() {
        let started = Signal::new();
        let response = router(&started).oneshot(get_request("/sd/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(headers["cache-control"].to_str().unwrap().contains("no-store"));
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let started = Signal::new();
        let request = Request::builder()
            .uri("/sd/health")
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        let response = router(&started).oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_ready_route_follows_started_signal() {
        let started = Signal::new();
        let app = router(&started);

        let before = app.clone().oneshot(get_request("/sd/ready")).await.unwrap();
        assert_eq!(before.status(), StatusCode::SERVICE_UNAVAILABLE);

        started.close();
        let after = app.oneshot(get_request("/sd/ready")).await.unwrap();
        assert_eq!(after.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_route_absent_without_recorder() {
        let started = Signal::new();
        let response = router(&started).oneshot(get_request("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_metrics_route_renders_recorder() {
        let started = Signal::new();
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let app = HttpServer::new(Arc::new(ServiceConfig::default()), started.listener(), Some(handle))
            .into_router();

        let response = app.oneshot(get_request("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_resource_routes_report_verdict() {
        let started = Signal::new();
        let app = router(&started);

        for path in ["/sd/disk", "/sd/cpu", "/sd/ram"] {
            let response = app.clone().oneshot(get_request(path)).await.unwrap();
            let status = response.status();
            let body = body_text(response).await;

            let expected = match status {
                StatusCode::OK => "OK - ",
                StatusCode::TOO_MANY_REQUESTS => "WARNING - ",
                StatusCode::INTERNAL_SERVER_ERROR => "CRITICAL - ",
                other => panic!("{path}: unexpected status {other}"),
            };
            assert!(body.starts_with(expected), "{path}: {body}");
        }
    }

    #[tokio::test]
    async fn test_preflight_is_answered() {
        let started = Signal::new();
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/sd/health")
            .header("origin", "http://dashboard.local")
            .header("access-control-request-method", "PUT")
            .header("access-control-request-headers", "authorization")
            .body(Body::empty())
            .unwrap();
        let response = router(&started).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("PUT") && methods.contains("PATCH"));
        let allowed = headers["access-control-allow-headers"].to_str().unwrap();
        assert!(allowed.contains("authorization"));
        assert!(headers["cache-control"].to_str().unwrap().contains("no-store"));
    }
}
