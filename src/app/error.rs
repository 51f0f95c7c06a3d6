//! Errors raised while starting the application.

use std::io;

use thiserror::Error;

use crate::server::ServerError;

/// Errors returned by [`MarathonApp::listen`](super::MarathonApp::listen) and
/// [`MarathonApp::run`](super::MarathonApp::run).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    /// The configured host does not resolve to a socket address.
    #[error("cannot resolve listen address {host}:{port}")]
    InvalidAddress {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },
    /// The listener could not be started.
    #[error(transparent)]
    Server(#[from] ServerError),
}
