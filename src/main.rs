use anyhow::Context as _;
use clap::Parser;
use tx_strategies::{Config, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .init();
    tracing::info!("running tx-strategies with configuration:\n{config}");

    let store = Store::connect(&config.database_url)
        .await
        .context("failed to connect to the store")?;
    let app = tx_strategies::router(store);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .context("failed to bind the listen address")?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
