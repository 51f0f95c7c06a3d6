//! Listener lifecycle for the HTTP API.
//!
//! [`serve`] drives an axum [`Router`] on an already bound listener from a
//! tracked background task and returns once that task has signalled
//! readiness. The returned [`ServerHandle`] owns the shutdown token; closing
//! it stops accepting connections and lets in-flight requests finish.

use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use log::warn;
use tokio::{net::TcpListener, sync::oneshot};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error};

use crate::metrics;

pub mod error;
pub use error::ServerError;


/// Bind a listener on `addr`.
///
/// Port `0` requests an ephemeral port; use [`TcpListener::local_addr`] or
/// [`ServerHandle::local_addr`] to discover it.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr).await.map_err(ServerError::Bind)
}

/// Serve `router` on `listener` until the returned handle is closed.
///
/// Resolves once the serving task is running. Each request carries the
/// peer address as [`axum::extract::ConnectInfo`].
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the listener has no local address and
/// [`ServerError::NotReady`] if the serving task stopped before signalling
/// readiness.
pub async fn serve(listener: TcpListener, router: Router) -> Result<ServerHandle, ServerError> {
    let local_addr = listener.local_addr().map_err(ServerError::Bind)?;
    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();
    let (ready_tx, ready_rx) = oneshot::channel();

    let token = shutdown.clone();
    tracker.spawn(async move {
        metrics::inc_servers();
        if ready_tx.send(()).is_err() {
            warn!("Failed to send readiness signal: receiver dropped");
        }
        let result = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(token.cancelled_owned())
        .await;
        metrics::dec_servers();
        match result {
            Ok(()) => debug!(%local_addr, "server stopped"),
            Err(e) => error!(%local_addr, error = %e, "server terminated"),
        }
    });
    tracker.close();

    if ready_rx.await.is_err() {
        shutdown.cancel();
        return Err(ServerError::NotReady);
    }

    Ok(ServerHandle {
        inner: Arc::new(Inner {
            local_addr,
            shutdown,
            tracker,
        }),
    })
}

/// Handle to a running listener.
///
/// Clones refer to the same listener; closing any clone closes it for all.
#[derive(Debug, Clone)]
pub struct ServerHandle {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl ServerHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr { self.inner.local_addr }

    /// Signal shutdown without waiting for the listener to stop.
    pub fn close(&self) { self.inner.shutdown.cancel(); }

    /// Returns `true` once shutdown has been signalled.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.inner.shutdown.is_cancelled() }

    /// Signal shutdown and wait until the serving task has finished and the
    /// listening socket is released.
    pub async fn shutdown(&self) {
        self.close();
        self.inner.tracker.wait().await;
    }

    /// Returns `true` if both handles refer to the same listener.
    #[must_use]
    pub fn same_listener(&self, other: &Self) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }
}
