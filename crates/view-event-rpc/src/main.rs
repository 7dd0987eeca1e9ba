//! view-event RPC server - reference host for the route observer.
//!
//! Runs an in-process host with the observer installed and exposes it over
//! HTTP JSON-RPC (`/rpc`) and a websocket command API (`/ws`).

mod handler;
mod server;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use view_event::{LocalHost, ObserverConfig, RouteObserver, ViewLoader};

#[derive(Parser, Debug)]
#[command(name = "view-event-rpc")]
#[command(about = "Reference host server for the view-event route observer")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Observer configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of view definition files registered at startup
    #[arg(long)]
    views_dir: Option<PathBuf>,

    /// Name of this host instance
    #[arg(long, default_value = "Home")]
    location_name: String,

    /// Externally reachable base URL of this host instance
    #[arg(long)]
    base_url: Option<String>,

    /// Secret issued to this host for signing route payloads
    #[arg(long, env = "VIEW_EVENT_SIGNING_SECRET", hide_env_values = true)]
    signing_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting view-event RPC server");

    let config = match &args.config {
        Some(path) => {
            info!("Loading observer config from {}", path.display());
            ObserverConfig::load(path)?
        }
        None => ObserverConfig::default(),
    };

    let mut host = LocalHost::new().with_location_name(args.location_name);
    if let Some(base_url) = args.base_url {
        host = host.with_base_url(base_url);
    }
    if let Some(secret) = args.signing_secret {
        host = host.with_signing_secret(secret.into_bytes());
    }
    let host = Arc::new(host);

    // Views present at startup are already installed when the observer
    // arrives and are picked up by its scan of the route table.
    if let Some(dir) = &args.views_dir {
        let views = ViewLoader::new(dir)?.load_all()?;
        for view in &views {
            host.register_view(view);
        }
        info!("Registered {} views from {}", views.len(), dir.display());
    }

    let observer = RouteObserver::install(&host, config)?;
    info!("{} routes buffered at startup", observer.buffered_routes().len());

    let addr = server::start_server(host, observer, &args.host, args.port).await?;

    // Print port for the launching process to read (intentional stdout)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
