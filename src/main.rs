// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use evm_chat_agent::{
    agent::{planner::OpenAiPlanner, planner::Planner, Agent},
    api,
    blockchain::{client::ChainClient, EvmClient},
    blockchain::services::market::MarketClient,
    config::Config,
    AppState,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    let chain: Arc<dyn ChainClient> =
        Arc::new(EvmClient::new(&config).context("Failed to initialize EVM client")?);
    let market = MarketClient::new(&config)?;
    let planner: Option<Arc<dyn Planner>> = match OpenAiPlanner::from_config(&config)? {
        Some(planner) => {
            info!("Using model {} at {}", config.openai_model, config.openai_base_url);
            Some(Arc::new(planner))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; only slash commands will be available");
            None
        }
    };

    info!(
        "Network: {} ({}), RPC: {}",
        config.network_name, config.native_symbol, config.rpc_url
    );

    let agent = Agent::new(config.clone(), chain, planner, market);
    let state = AppState::new(config.clone(), agent);
    let sweeper = state.sessions.spawn_sweeper(config.session_sweep_interval());
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_addr, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 HTTP Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    sweeper.abort();
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "evm_chat_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
}
