//! The marathon HTTP application.
//!
//! [`MarathonApp`] owns the route table and a [`SharedConfig`] handle. It can
//! be served any number of times: [`MarathonApp::listen`] serves it on an
//! explicit address, [`MarathonApp::run`] on the address currently held in the
//! configuration.

use std::{io, net::SocketAddr};

use axum::{Router, middleware::from_fn};
use tokio::net::lookup_host;
use tracing::info;

use crate::{
    config::SharedConfig,
    server::{self, ServerHandle},
};

mod error;
pub mod middleware;
mod routes;

pub use error::AppError;
pub use middleware::VERSION_HEADER;

#[cfg(test)]
mod tests;

/// State handed to route handlers.
#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub(crate) config: SharedConfig,
}

/// The marathon API application.
#[derive(Debug, Clone)]
pub struct MarathonApp {
    config: SharedConfig,
    routes: Router,
}

impl MarathonApp {
    /// Build the application around `config`.
    ///
    /// The configuration is read when the application listens and when
    /// requests are handled, never copied here.
    #[must_use]
    pub fn new(config: SharedConfig) -> Self {
        let routes = routes::routes().with_state(AppState {
            config: config.clone(),
        });
        Self { config, routes }
    }

    /// Mount additional routes alongside the built-in ones.
    ///
    /// # Panics
    ///
    /// Panics if a route in `extra` overlaps an existing route, as
    /// [`Router::merge`] does.
    #[must_use]
    pub fn with_routes(mut self, extra: Router) -> Self {
        self.routes = self.routes.merge(extra);
        self
    }

    /// Configuration handle shared with this application.
    #[must_use]
    pub fn config(&self) -> &SharedConfig { &self.config }

    /// The complete service: every route wrapped in the request middleware.
    #[must_use]
    pub fn router(&self) -> Router {
        self.routes
            .clone()
            .layer(from_fn(middleware::recover))
            .layer(from_fn(middleware::version_header))
            .layer(from_fn(middleware::log_request))
    }

    /// Serve the application on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Server`] if the address cannot be bound.
    pub async fn listen(&self, addr: SocketAddr) -> Result<ServerHandle, AppError> {
        let listener = server::bind(addr).await?;
        Ok(server::serve(listener, self.router()).await?)
    }

    /// Start the application on the configured `app.host` and `app.port`.
    ///
    /// Resolves once the listener accepts connections. Every call opens a new
    /// listener; the caller owns the returned handle and decides when to
    /// close it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidAddress`] if the configured host does not
    /// resolve and [`AppError::Server`] if binding fails.
    pub async fn run(&self) -> Result<ServerHandle, AppError> {
        let addr = self.configured_addr().await?;
        let handle = self.listen(addr).await?;
        info!(addr = %handle.local_addr(), "marathon listening");
        Ok(handle)
    }

    async fn configured_addr(&self) -> Result<SocketAddr, AppError> {
        let (host, port) = {
            let config = self.config.read();
            (config.app.host.clone(), config.app.port)
        };
        let resolved = lookup_host((host.as_str(), port)).await.and_then(|mut addrs| {
            addrs
                .next()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses resolved"))
        });
        resolved.map_err(|source| AppError::InvalidAddress { host, port, source })
    }
}
