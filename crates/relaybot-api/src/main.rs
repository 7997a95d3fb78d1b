//! Relaybot entry point.
//!
//! Binary name: `relaybot`
//!
//! Parses CLI arguments, loads the YAML configuration, wires the
//! conversation store, completion engine, and delivery dispatcher into an
//! orchestrator, then serves the inbound event endpoint until Ctrl+C.

mod http;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use relaybot_core::conversation::ConversationStore;
use relaybot_core::delivery::DeliveryDispatcher;
use relaybot_core::engine::CompletionEngine;
use relaybot_core::orchestrator::Orchestrator;
use relaybot_infra::config::load_config;
use relaybot_infra::delivery::WebhookTransport;
use relaybot_infra::llm::build_backend;

use state::AppState;

/// Wait applied to in-flight turns at shutdown before giving up on them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "relaybot", about = "Messaging platform to LLM relay")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "RELAYBOT_CONFIG")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,relaybot=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let config = load_config(&cli.config).await?;

    let store = Arc::new(ConversationStore::new(config.system_prompt()));
    let backend = build_backend(&config.provider, Vec::new())?;
    let engine = CompletionEngine::new(
        store.clone(),
        backend,
        config.provider.tokens,
        config.provider.model.clone(),
        config.provider.temperature,
    );
    let transport = WebhookTransport::new(config.platform.webhook_url.clone());
    let dispatcher = DeliveryDispatcher::new(transport, config.platform.chunk_limit);
    let orchestrator = Arc::new(Orchestrator::new(
        store,
        engine,
        dispatcher,
        config.platform.destination.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.platform.bind_addr).await?;
    tracing::info!(addr = %config.platform.bind_addr, bot = %config.bot.name, "listening for events");

    let router = http::build_router(AppState {
        orchestrator: orchestrator.clone(),
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("draining in-flight turns");
    orchestrator.shutdown(SHUTDOWN_GRACE).await;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
