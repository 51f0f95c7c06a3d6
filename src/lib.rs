#![doc(html_root_url = "https://docs.rs/marathon/latest")]
//! Public API for the `marathon` service.
//!
//! The crate exposes the HTTP application ([`MarathonApp`]), its layered
//! YAML configuration and the listener lifecycle used to serve it. Test
//! support lives in the companion `marathon_testing` crate.

pub mod app;
pub mod config;
pub mod metrics;
pub mod panic;
pub mod server;

pub use app::{AppError, MarathonApp};
pub use config::{Config, ConfigError, SharedConfig};
pub use server::{ServerError, ServerHandle};

/// Crate version reported in the `marathon-version` response header.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
