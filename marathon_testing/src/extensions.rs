//! Support for the extensions test suite.
//!
//! Extension tests share the assertion helpers of the API suite but never
//! bootstrap the application; they only need the loaded configuration.

use marathon::Config;
use rstest::fixture;

pub use crate::common::{TestResult, assert_header, assert_status, assert_text, load_test_config};

/// Fixture yielding the `test` configuration without starting the app.
///
/// # Panics
///
/// Panics if the configuration cannot be loaded.
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn extension_config() -> Config { crate::common::test_config() }
