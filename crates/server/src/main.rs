//! Backlot server binary.

use anyhow::{Context, Result};
use backlot_core::config::AppConfig;
use backlot_server::{AppState, ExpiryScheduler, create_router};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Backlot - chunked media upload intake service
#[derive(Parser, Debug)]
#[command(name = "backlotd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "BACKLOT_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Backlot v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration. The file is optional; every setting has a default
    // and env vars can provide or override everything.
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("BACKLOT_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize session store
    let sessions = backlot_sessions::from_config(&config.sessions)
        .await
        .context("failed to initialize session store")?;
    tracing::info!("Session store initialized");

    // Initialize asset store
    let assets = backlot_assets::from_config(&config.assets)
        .await
        .context("failed to initialize asset store")?;
    tracing::info!("Asset store initialized");

    // Spawn the expiry scheduler; the sweep also reclaims sessions left over
    // from a previous process instance.
    let (scheduler, expiry) = ExpiryScheduler::new(sessions.clone(), &config.server);
    let _expiry_handle = scheduler.spawn();
    tracing::info!("Expiry scheduler spawned");

    // Create application state and router
    let state = AppState::new(config.clone(), sessions, assets, expiry);
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
