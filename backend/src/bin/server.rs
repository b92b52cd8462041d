//! Prayer-time HTTP server binary.
//!
//! Loads `salah.toml` (if present) plus environment overrides, builds the
//! schedule source and reminder scheduler, and serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! # Local engine, default location (Mecca, Umm al-Qura)
//! cargo run --bin salah-server
//!
//! # Aladhan API as the schedule source (needs `[remote] enabled = true`)
//! cargo run --bin salah-server --features "http-server,remote-source"
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `SALAH_LATITUDE`, `SALAH_LONGITUDE`, `SALAH_UTC_OFFSET_MINUTES`: default location
//! - `SALAH_METHOD`, `SALAH_ASR`, `SALAH_FALLBACK`: calculation settings
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use salah::config::AppConfig;
use salah::http::{create_router, AppState};
use salah::scheduler::LoggingDispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting prayer-time server");

    let config = AppConfig::load()?;
    let state = AppState::from_config(&config, Arc::new(LoggingDispatcher::new()))?;
    let state = with_remote_source(state, &config)?;
    info!(
        "Default location {}, method {}, source {}",
        state.default_coordinate,
        state.default_method,
        state.source.name()
    );

    let app = create_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(feature = "remote-source")]
fn with_remote_source(mut state: AppState, config: &AppConfig) -> anyhow::Result<AppState> {
    if config.remote.enabled {
        let source = salah::services::AladhanSource::new(
            config.remote.base_url.clone(),
            std::time::Duration::from_secs(config.remote.timeout_secs),
            config.calculation.asr,
        )?;
        info!("Using Aladhan API at {}", config.remote.base_url);
        state.source = Arc::new(source);
    }
    Ok(state)
}

#[cfg(not(feature = "remote-source"))]
fn with_remote_source(state: AppState, config: &AppConfig) -> anyhow::Result<AppState> {
    if config.remote.enabled {
        tracing::warn!("remote.enabled is set but the remote-source feature is off; using the local engine");
    }
    Ok(state)
}
