//! Per-test bootstrap of the marathon application.
//!
//! An [`AppFixture`] plays the role of a test file's shared scope. Every
//! call to [`AppFixture::setup`] prepares one test case:
//!
//! 1. allocate the next port,
//! 2. write it to the shared configuration,
//! 3. build the application if this fixture has not built one yet,
//! 4. attach a fresh [`TestAgent`] on its own ephemeral listener,
//! 5. await [`MarathonApp::run`], which listens on the allocated port.
//!
//! Listeners opened along the way are recorded and released by
//! [`AppFixture::teardown`], or signalled to stop when the fixture drops.

use std::{fmt, sync::Arc};

use marathon::{Config, MarathonApp, ServerHandle, SharedConfig};
use rstest::fixture;
use tracing::debug;

use crate::{FixtureError, PortAllocator, TestAgent, common::test_config, ports::DEFAULT_BASE_PORT};

type AppBuilder = Box<dyn Fn(SharedConfig) -> MarathonApp + Send + Sync>;

/// Shared scope for a sequence of test cases.
pub struct AppFixture {
    ports: PortAllocator,
    config: SharedConfig,
    build: AppBuilder,
    app: Option<Arc<MarathonApp>>,
    constructions: usize,
    servers: Vec<ServerHandle>,
}

/// State handed to a single test case.
#[derive(Debug)]
pub struct TestContext {
    /// The fixture's application instance, shared by every case.
    pub app: Arc<MarathonApp>,
    /// Agent bound to a listener created for this case only.
    pub request: TestAgent,
    /// Listener opened by this case's call to [`MarathonApp::run`].
    pub server: ServerHandle,
    /// Port allocated to this case.
    pub port: u16,
}

impl TestContext {
    /// Discard the agent and stop the listener started for this case.
    pub async fn finish(self) {
        self.request.close().await;
        self.server.shutdown().await;
    }
}

impl AppFixture {
    /// Create a fixture allocating ports above [`DEFAULT_BASE_PORT`].
    #[must_use]
    pub fn new(config: Config) -> Self { Self::with_base_port(config, DEFAULT_BASE_PORT) }

    /// Create a fixture allocating ports above `base`.
    #[must_use]
    pub fn with_base_port(config: Config, base: u16) -> Self {
        Self {
            ports: PortAllocator::new(base),
            config: SharedConfig::new(config),
            build: Box::new(MarathonApp::new),
            app: None,
            constructions: 0,
            servers: Vec::new(),
        }
    }

    /// Use `build` to construct the application instead of
    /// [`MarathonApp::new`].
    #[must_use]
    pub fn with_app_builder<F>(mut self, build: F) -> Self
    where
        F: Fn(SharedConfig) -> MarathonApp + Send + Sync + 'static,
    {
        self.build = Box::new(build);
        self
    }

    /// Prepare the next test case.
    ///
    /// Listeners already closed by earlier cases are dropped from the
    /// fixture's records first. The port is consumed and the application is built even when a later
    /// step fails, so a retry after a failure moves on to a fresh port.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::PortsExhausted`] when no port is left,
    /// [`FixtureError::Agent`] or [`FixtureError::Client`] if the agent cannot
    /// be attached, and [`FixtureError::Startup`] if
    /// [`MarathonApp::run`] rejects.
    pub async fn setup(&mut self) -> Result<TestContext, FixtureError> {
        self.servers.retain(|server| !server.is_closed());
        let port = self.ports.allocate()?;
        self.config.set_port(port);
        let app = self.app_or_build();

        let request = TestAgent::start(&app).await?;
        self.servers.push(request.server().clone());

        let server = app.run().await.map_err(FixtureError::Startup)?;
        self.servers.push(server.clone());

        debug!(port, agent = %request.addr(), "test case ready");
        Ok(TestContext {
            app,
            request,
            server,
            port,
        })
    }

    fn app_or_build(&mut self) -> Arc<MarathonApp> {
        let app = self.app.get_or_insert_with(|| {
            self.constructions += 1;
            Arc::new((self.build)(self.config.clone()))
        });
        Arc::clone(app)
    }

    /// Stop every listener opened by this fixture and wait for each to be
    /// released.
    pub async fn teardown(&mut self) {
        for server in self.servers.drain(..) {
            server.shutdown().await;
        }
    }

    /// The memoized application, once a case has been set up.
    #[must_use]
    pub fn app(&self) -> Option<&Arc<MarathonApp>> { self.app.as_ref() }

    /// Configuration shared with the application.
    #[must_use]
    pub fn config(&self) -> &SharedConfig { &self.config }

    /// Number of times the application has been constructed.
    #[must_use]
    pub fn constructions(&self) -> usize { self.constructions }

    /// Port allocated to the most recent case, or the base port.
    #[must_use]
    pub fn last_port(&self) -> u16 { self.ports.last() }

    /// Number of recorded listeners not yet told to stop.
    #[must_use]
    pub fn open_listeners(&self) -> usize {
        self.servers.iter().filter(|s| !s.is_closed()).count()
    }

    /// Number of listeners currently recorded, closed or not.
    ///
    /// Closed listeners are forgotten at the start of the next
    /// [`AppFixture::setup`].
    #[must_use]
    pub fn tracked_listeners(&self) -> usize { self.servers.len() }
}

impl fmt::Debug for AppFixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppFixture")
            .field("ports", &self.ports)
            .field("config", &self.config)
            .field("app", &self.app)
            .field("constructions", &self.constructions)
            .field("servers", &self.servers)
            .finish_non_exhaustive()
    }
}

impl Drop for AppFixture {
    fn drop(&mut self) {
        for server in &self.servers {
            server.close();
        }
    }
}

/// Fixture bootstrapping from the `test` configuration environment.
#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn app_fixture(test_config: Config) -> AppFixture { AppFixture::new(test_config) }
