use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nightcourt_common::ServerConfig;
use nightcourt_engine::GameRegistry;
use nightcourt_server::routes::{self, AppState};

#[derive(Parser)]
#[command(name = "nightcourt-server", about = "WebSocket backend for the mafia party game")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = ServerConfig::default().port)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value_t = ServerConfig::default().host)]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
    };

    let state = AppState {
        registry: Arc::new(GameRegistry::new()),
        started_at: Instant::now(),
    };
    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
