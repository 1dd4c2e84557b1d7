//! Twocold Service - HTTP control API for ScreenMate air conditioners.
//!
//! Run with: `cargo run -p twocold-service`

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use twocold_service::{AppState, Config, app, config::default_config_path};

/// Twocold Service - HTTP control API for ScreenMate air conditioners.
#[derive(Parser, Debug)]
#[command(name = "twocold-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Device registry path (overrides config).
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Write the effective configuration to the config path and exit.
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("twocold_service=info".parse()?)
                .add_directive("twocold_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(store) = args.store {
        config.storage.path = store;
    }
    config.validate()?;

    if args.write_config {
        let path = args.config.unwrap_or_else(default_config_path);
        config.save(&path)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    info!("Using device registry at {:?}", config.storage.path);
    info!("Portal at {}", config.portal.base_url);

    let addr: SocketAddr = config.server.bind.parse()?;
    let state = AppState::from_config(config)?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
