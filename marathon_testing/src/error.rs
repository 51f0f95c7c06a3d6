//! Errors raised while bootstrapping a test case.

use marathon::{AppError, ConfigError};
use thiserror::Error;

/// Failure modes of [`AppFixture::setup`](crate::AppFixture::setup).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FixtureError {
    /// Every port above the base has been handed out.
    #[error("no ports left after {last}")]
    PortsExhausted { last: u16 },
    /// The listener backing the test agent could not be started.
    #[error("failed to start test agent: {0}")]
    Agent(#[source] AppError),
    /// The application's startup routine rejected.
    #[error("application startup failed: {0}")]
    Startup(#[source] AppError),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// The test configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
