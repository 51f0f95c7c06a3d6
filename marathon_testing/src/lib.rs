//! Test support for the `marathon` HTTP API.
//!
//! [`AppFixture`] bootstraps the application once per test scope and hands
//! each case a fresh [`TestAgent`] on its own port:
//!
//! ```rust,no_run
//! use marathon_testing::{AppFixture, TestResult, assert_text, load_test_config};
//!
//! # async fn example() -> TestResult {
//! let mut fixture = AppFixture::new(load_test_config()?);
//! let ctx = fixture.setup().await?;
//! let response = ctx.request.get("/healthcheck").send().await?;
//! assert_text(response, "WORKING").await;
//! ctx.finish().await;
//! fixture.teardown().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod common;
mod error;
pub mod extensions;
pub mod fixture;
pub mod logging;
pub mod ports;

pub use agent::TestAgent;
pub use common::{
    TEST_ENVIRONMENT,
    TestResult,
    assert_header,
    assert_status,
    assert_text,
    config_dir,
    load_test_config,
    test_config,
};
pub use error::FixtureError;
pub use fixture::{AppFixture, TestContext, app_fixture};
pub use logging::{LogCapture, logger};
pub use ports::{DEFAULT_BASE_PORT, PortAllocator};
pub use reqwest::{Method, Response, StatusCode};
