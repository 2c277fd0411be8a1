//! Binary entrypoint for the Sentinel API server.
use anyhow::Context;
use sentinel_api::{run, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // SENTINEL_CONFIG names an optional YAML file; SENTINEL_* vars override it
    let config = ServerConfig::load().context("loading configuration")?;
    run(config).await
}
