//! The `alttext serve` command.

use alttext_core::{AltTextGenerator, Compressor, Config};
use anyhow::Context;
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::server::{self, AppState};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on (overrides `server.bind`)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Execute the serve command.
pub async fn execute(args: ServeArgs, config: Config) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address: {bind}"))?;

    let generator = AltTextGenerator::from_config(&config)?;
    tracing::info!(
        providers = ?generator.providers(),
        completion = generator.completion_provider(),
        "Alt text generator ready"
    );
    if !generator.completion_available().await {
        tracing::warn!(
            "Completion provider '{}' is not reachable; requests will fail until it is",
            generator.completion_provider()
        );
    }

    let state = AppState {
        generator: Arc::new(generator),
        compressor: Arc::new(Compressor::new(
            config.compression.clone(),
            config.limits.decode_timeout_ms,
        )),
        max_upload_mb: config.limits.max_upload_mb,
    };
    let body_limit = usize::try_from(config.server.body_limit_mb.saturating_mul(1024 * 1024))
        .unwrap_or(usize::MAX);

    server::start_server(addr, state, body_limit).await
}
