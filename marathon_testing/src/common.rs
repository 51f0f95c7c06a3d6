//! Assertion helpers and configuration shared by the test suites.

use std::path::PathBuf;

use marathon::{Config, ConfigError};
use reqwest::{Response, StatusCode};
use rstest::fixture;

/// Configuration environment loaded by the test fixtures.
pub const TEST_ENVIRONMENT: &str = "test";

/// Shared result type for integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Directory holding the repository's configuration files.
#[must_use]
pub fn config_dir() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../config") }

/// Load the `test` environment configuration.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the configuration files are invalid.
pub fn load_test_config() -> Result<Config, ConfigError> {
    Config::load(config_dir(), TEST_ENVIRONMENT)
}

/// Fixture yielding the `test` environment configuration.
///
/// # Panics
///
/// Panics if the configuration cannot be loaded.
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn test_config() -> Config { load_test_config().expect("failed to load test configuration") }

/// Assert that `response` has status `expected`.
///
/// # Panics
///
/// Panics when the status differs.
#[track_caller]
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "unexpected status for {}",
        response.url()
    );
}

/// Assert that header `name` is present on `response` with value `expected`.
///
/// # Panics
///
/// Panics when the header is missing or holds another value.
#[track_caller]
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    let actual = response.headers().get(name).map(|v| v.to_str());
    match actual {
        Some(Ok(value)) => assert_eq!(value, expected, "unexpected value for header {name}"),
        Some(Err(_)) => panic!("header {name} is not valid UTF-8"),
        None => panic!("header {name} missing from response to {}", response.url()),
    }
}

/// Consume `response` and assert its body equals `expected`.
///
/// # Panics
///
/// Panics when the body cannot be read or differs.
pub async fn assert_text(response: Response, expected: &str) {
    let url = response.url().clone();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| panic!("failed to read body from {url}: {e}"));
    assert_eq!(body, expected, "unexpected body from {url}");
}
