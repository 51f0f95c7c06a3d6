//! Errors raised by listener operations.

use std::io;

use thiserror::Error;

/// Errors that may occur while starting a listener.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// Binding or inspecting the listening socket failed.
    #[error("bind error: {0}")]
    Bind(#[source] io::Error),
    /// The serving task ended before it signalled readiness.
    #[error("server stopped before becoming ready")]
    NotReady,
}
