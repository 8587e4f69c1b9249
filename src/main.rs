use anyhow::{Context, Result};

use tick_relay::config::Config;
use tick_relay::relay::{RelaySettings, TickRelay};
use tick_relay::server;
use tick_relay::upstream::ws::UpstreamWsClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .init();

    tracing::info!(
        symbol = %config.relay.symbol,
        upstream = %config.upstream.ws_url,
        initial_mode = %config.relay.initial_mode,
        "Starting tick relay"
    );

    let settings = RelaySettings::from_config(&config.relay)?;
    let live_source = UpstreamWsClient::new(&config.upstream, &config.relay.symbol);
    let relay = TickRelay::new(settings, Box::new(live_source));
    relay.start();

    let app = server::router(relay.clone());
    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Control API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    relay.shutdown();
    tracing::info!("Tick relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Shutdown signal received");
}
