//! `marathon` binary: load configuration and serve the HTTP API.

mod cli;

use std::error::Error;

use clap::Parser;
use marathon::{Config, MarathonApp, SharedConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("marathon {}", marathon::VERSION);
            Ok(())
        }
        Command::Start { host, port } => {
            let env = cli.env.unwrap_or_else(Config::environment);
            let mut config = Config::load(&cli.config_dir, &env)?;
            if let Some(host) = host {
                config.app.host = host;
            }
            if let Some(port) = port {
                config.app.port = port;
            }
            start(config).await
        }
    }
}

async fn start(config: Config) -> Result<(), Box<dyn Error>> {
    // Applications embedding the library install their own subscriber.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    install_exporter(&config)?;

    let app = MarathonApp::new(SharedConfig::new(config));
    let handle = app.run().await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    handle.shutdown().await;
    Ok(())
}

#[cfg(feature = "metrics")]
fn install_exporter(config: &Config) -> Result<(), Box<dyn Error>> {
    if let Some(addr) = config.metrics.listen {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "prometheus exporter listening");
    }
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_exporter(config: &Config) -> Result<(), Box<dyn Error>> {
    if config.metrics.listen.is_some() {
        tracing::warn!("metrics.listen is set but the metrics feature is disabled");
    }
    Ok(())
}
