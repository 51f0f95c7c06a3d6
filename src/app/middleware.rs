//! Request middleware applied to every route.
//!
//! Layer order, outermost first: request logging, version header, panic
//! recovery. Logging therefore observes the final status, including the
//! `500` produced for a recovered panic.

use std::{net::SocketAddr, time::Instant};

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    metrics::{self, StatusClass},
    panic::catch_panic,
};

/// Response header carrying the crate version.
pub const VERSION_HEADER: HeaderName = HeaderName::from_static("marathon-version");

/// Add [`VERSION_HEADER`] to every response.
pub async fn version_header(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(VERSION_HEADER, HeaderValue::from_static(crate::VERSION));
    response
}

/// Convert a panicking handler into `500 Internal Server Error`.
pub async fn recover(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    match catch_panic(next.run(req)).await {
        Ok(response) => response,
        Err(panic_msg) => {
            metrics::inc_handler_panics();
            // Emit via both `log` and `tracing` for tests that capture either.
            log::error!("request handler panicked: panic={panic_msg}, method={method}, path={path}");
            tracing::error!(panic = %panic_msg, %method, path, "request handler panicked");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Log every request once its response is ready.
///
/// Each record carries the request line, status, latency, client ip and the
/// response headers. Client errors log at warn, server errors at error,
/// everything else at info.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let query = req.uri().query().unwrap_or_default().to_owned();
    let ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default();
    let started = Instant::now();

    let response = next.run(req).await;

    let latency = started.elapsed();
    let status = response.status().as_u16();
    let class = StatusClass::of(status);
    let headers = response.headers();
    metrics::inc_requests(class);
    match class {
        StatusClass::ClientError => tracing::warn!(
            source = "request", %method, path, query, status, ?latency, ip, ?headers,
            "Request failed."
        ),
        StatusClass::ServerError => tracing::error!(
            source = "request", %method, path, query, status, ?latency, ip, ?headers,
            "Response failed."
        ),
        StatusClass::Success => tracing::info!(
            source = "request", %method, path, query, status, ?latency, ip, ?headers,
            "Request successful."
        ),
    }
    response
}
