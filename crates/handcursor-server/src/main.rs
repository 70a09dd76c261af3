//! Handcursor server binary
//!
//! Serves interaction events on `ws://<host>:<port><path>`.

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use handcursor_server::{ListenerConfig, Service, ServiceConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Hand-tracking interaction service.
#[derive(Debug, Parser)]
#[command(name = "handcursor-server", version, about)]
struct Args {
    /// Interface to listen on.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// WebSocket port.
    #[arg(long, default_value_t = handcursor_proto::DEFAULT_PORT)]
    port: u16,

    /// Request path clients connect on.
    #[arg(long, default_value = handcursor_proto::DEFAULT_PATH)]
    path: String,

    /// Configuration base directory.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// JSON-lines frame recording to play as the sensor.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Do not watch the configuration directory for changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ServiceConfig {
        listener: ListenerConfig { host: args.host, port: args.port, path: args.path },
        config_dir: args.config_dir,
        replay: args.replay,
        no_watch: args.no_watch,
    };

    let service = match Service::start(config).await {
        Ok(service) => service,
        Err(error) => {
            error!(%error, "failed to start");
            return ExitCode::FAILURE;
        },
    };
    info!(addr = %service.local_addr(), "handcursor server running");

    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "cannot listen for shutdown signal");
    }
    info!("shutting down");

    match tokio::task::spawn_blocking(move || service.shutdown()).await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(error)) => {
            error!(%error, "unclean shutdown");
            ExitCode::FAILURE
        },
        Err(error) => {
            error!(%error, "shutdown task failed");
            ExitCode::FAILURE
        },
    }
}
