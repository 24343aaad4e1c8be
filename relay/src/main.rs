//! Keyforge license verification and release delivery server.
//!
//! Serves two routes:
//! 1. `GET /v1/teams/{team_id}/download` — verify a license and stream the
//!    session-encrypted release binary
//! 2. `GET /v1/health` — liveness probe
//!
//! Usage:
//!   keyforge-server --port 8080 --fixture world.json
//!
//! The fixture seeds the in-memory stores; without persistent storage the
//! server forgets everything on restart.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use keyforge_server::{build_router, fixture::Fixture};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "keyforge-server")]
#[command(about = "License verification and release delivery server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Path to the JSON fixture seeding teams, licenses, and releases
    #[arg(short, long)]
    fixture: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Keyforge server starting...");
    let state = Fixture::from_path(&args.fixture)
        .context("loading fixture")?
        .build()
        .await
        .context("seeding stores from fixture")?;

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server failed")?;

    Ok(())
}
