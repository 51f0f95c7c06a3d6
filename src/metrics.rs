//! Metric helpers for `marathon`.
//!
//! This module defines metric names and thin helpers over the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking handled HTTP requests.
pub const REQUESTS_TOTAL: &str = "marathon_http_requests_total";
/// Name of the counter tracking panics caught in request handlers.
pub const HANDLER_PANICS: &str = "marathon_http_panics_total";
/// Name of the gauge tracking running listeners.
pub const SERVERS_ACTIVE: &str = "marathon_servers_active";

/// Coarse classification of a response status used as a metric label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// `1xx`–`3xx`.
    Success,
    /// `4xx`.
    ClientError,
    /// `5xx`.
    ServerError,
}

impl StatusClass {
    /// Classify a numeric HTTP status code.
    #[must_use]
    pub fn of(status: u16) -> Self {
        match status {
            400..=499 => StatusClass::ClientError,
            500..=u16::MAX => StatusClass::ServerError,
            _ => StatusClass::Success,
        }
    }

    /// Label value used when recording metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StatusClass::Success => "success",
            StatusClass::ClientError => "client_error",
            StatusClass::ServerError => "server_error",
        }
    }
}

/// Record a handled request.
pub fn inc_requests(class: StatusClass) {
    #[cfg(feature = "metrics")]
    counter!(REQUESTS_TOTAL, "status" => class.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = class;
}

/// Record a panic caught while handling a request.
pub fn inc_handler_panics() {
    #[cfg(feature = "metrics")]
    counter!(HANDLER_PANICS).increment(1);
}

/// Increment the running listeners gauge.
pub fn inc_servers() {
    #[cfg(feature = "metrics")]
    gauge!(SERVERS_ACTIVE).increment(1.0);
}

/// Decrement the running listeners gauge.
pub fn dec_servers() {
    #[cfg(feature = "metrics")]
    gauge!(SERVERS_ACTIVE).decrement(1.0);
}
