// Copyright 2026 The Relay Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use relay::config::{self, ConfigSource, FileSource, ProcessEnv, StringSource};
use relay::server::{self, AppState};
use relay::upstream::{AssistantsClient, ReqwestTransport};
use tracing_subscriber::EnvFilter;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "relay", about = "Assistant run relay with normalized event streaming")]
struct Cli {
    /// Path to an optional relay.yaml settings file
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST), env = "RELAY_HOST")]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 3000, env = "RELAY_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let source: Box<dyn ConfigSource> = match &cli.config {
        Some(path) => Box::new(FileSource { path: path.clone() }),
        None => Box::new(StringSource {
            content: String::new(),
        }),
    };
    let config = match config::load_config(source.as_ref(), &ProcessEnv) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        base_url = %config.upstream.base_url,
        beta = %config.upstream.beta,
        timeout_ms = ?config.upstream.timeout_ms,
        api_key_var = %config.credentials.api_key_var,
        "config loaded"
    );

    let transport = Arc::new(ReqwestTransport::new(reqwest::Client::new()));
    let client = AssistantsClient::new(transport, config.upstream.clone());
    let app = server::build_router(AppState {
        config,
        client: Arc::new(client),
        env: Arc::new(ProcessEnv),
    });

    let addr = SocketAddr::new(cli.host, cli.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "relay listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        std::process::exit(1);
    }
}
