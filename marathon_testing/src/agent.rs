//! HTTP test agent bound to a dedicated listener.

use std::net::{Ipv4Addr, SocketAddr};

use marathon::{MarathonApp, ServerHandle};
use reqwest::{Client, Method, RequestBuilder};

use crate::FixtureError;

/// Issues requests against one listener of the application under test.
///
/// Each agent owns its listener; [`TestAgent::close`] releases it.
#[derive(Debug)]
pub struct TestAgent {
    client: Client,
    server: ServerHandle,
}

impl TestAgent {
    /// Serve `app` on a fresh ephemeral localhost port and attach an agent.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Agent`] if the listener cannot be started and
    /// [`FixtureError::Client`] if the HTTP client cannot be built.
    pub async fn start(app: &MarathonApp) -> Result<Self, FixtureError> {
        let server = app
            .listen(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0))
            .await
            .map_err(FixtureError::Agent)?;
        match Self::attach(server.clone()) {
            Ok(agent) => Ok(agent),
            Err(e) => {
                server.close();
                Err(e)
            }
        }
    }

    /// Attach an agent to an already running listener.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Client`] if the HTTP client cannot be built.
    pub fn attach(server: ServerHandle) -> Result<Self, FixtureError> {
        // Requests target localhost only; system proxies must not intercept them.
        let client = Client::builder().no_proxy().build()?;
        Ok(Self { client, server })
    }

    /// Address of the listener this agent talks to.
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.server.local_addr() }

    /// Listener backing this agent.
    #[must_use]
    pub fn server(&self) -> &ServerHandle { &self.server }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String { format!("http://{}{path}", self.addr()) }

    /// Start building a request with an arbitrary method.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Start building a `GET` request.
    pub fn get(&self, path: &str) -> RequestBuilder { self.request(Method::GET, path) }

    /// Start building a `POST` request.
    pub fn post(&self, path: &str) -> RequestBuilder { self.request(Method::POST, path) }

    /// Start building a `PUT` request.
    pub fn put(&self, path: &str) -> RequestBuilder { self.request(Method::PUT, path) }

    /// Start building a `DELETE` request.
    pub fn delete(&self, path: &str) -> RequestBuilder { self.request(Method::DELETE, path) }

    /// Start building a `HEAD` request.
    pub fn head(&self, path: &str) -> RequestBuilder { self.request(Method::HEAD, path) }

    /// Drop pooled connections and shut the listener down.
    pub async fn close(self) {
        let Self { client, server } = self;
        drop(client);
        server.shutdown().await;
    }
}
