//! Signal Server — public UDP rendezvous point for peer contact frames.
//!
//! Usage: `signal-server <bind_address> <port>`

mod config;
mod error;
mod registry;
mod server;

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use config::Args;
use server::SignalServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level: Level = args.log_level.parse().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string())),
        )
        .init();

    info!(
        bind_address = %args.bind_address,
        port = args.port,
        "starting signal server"
    );

    let server = SignalServer::bind(&args.bind_address, args.port)
        .await
        .with_context(|| format!("binding to {}:{}", args.bind_address, args.port))?;

    server.run().await.context("signal server stopped unexpectedly")
}
