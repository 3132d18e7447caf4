//! Response header and metrics middleware.
//!
//! # Responsibilities
//! - Disable client caching of every response
//! - Add browser security headers
//! - Answer CORS preflight requests
//! - Record per-request metrics

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
    Router,
};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::http::request::request_id;
use crate::observability::metrics;

const NO_CACHE: &str = "no-cache, no-store, max-age=0, must-revalidate";
const EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Add no-cache and security headers to every response.
pub fn with_response_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static(EXPIRES),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ))
}

/// Answer `OPTIONS` preflight requests from any origin.
pub fn with_cors<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::ORIGIN,
                header::CONTENT_TYPE,
                header::ACCEPT,
            ]),
    )
}

/// Record request count and latency.
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let id = request_id(request.headers()).to_string();

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::debug!(
        request_id = %id,
        method = %method,
        path = %path,
        status,
        "Request served"
    );
    metrics::record_request(&method, status, start);
    response
}
