//! relayd — the broadcast relay server binary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use relay_core::Topic;
use relay_server::{RelayServer, ServerConfig};
use relay_store::{HistoryStore, MemoryHistoryStore, RedisHistoryStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "relayd", version, about = "Real-time broadcast relay server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind (0 = auto-assign).
    #[arg(long, default_value_t = 9448)]
    port: u16,

    /// Topic to serve.
    #[arg(long, default_value = "room1")]
    topic: String,

    /// Redis URL; omit to run on the in-memory store.
    #[arg(long)]
    redis_url: Option<String>,

    /// Seconds to wait for open sessions when shutting down.
    #[arg(long, default_value_t = 10)]
    shutdown_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let shutdown_timeout = Duration::from_secs(cli.shutdown_timeout_secs);
    let mut config = ServerConfig {
        host: cli.host,
        port: cli.port,
        topic: Topic::from(cli.topic),
        redis_url: cli.redis_url,
        ..ServerConfig::default()
    };
    config.apply_env_overrides();

    let store: Arc<dyn HistoryStore> = match config.redis_url.as_deref() {
        Some(url) => Arc::new(
            RedisHistoryStore::connect(url)
                .await
                .with_context(|| format!("connecting to redis at {url}"))?,
        ),
        None => {
            warn!("no redis url configured, in-memory store serves this process only");
            Arc::new(MemoryHistoryStore::new())
        }
    };

    let metrics = relay_server::metrics::install_recorder();
    let server = RelayServer::new(config, store).with_metrics(metrics);
    let (addr, serving) = server.listen().await.context("binding listen address")?;
    info!(%addr, "relayd ready");

    tokio::signal::ctrl_c()
        .await
        .context("installing ctrl-c handler")?;
    info!("shutdown requested");
    server.shutdown().drain(serving, shutdown_timeout).await;
    Ok(())
}
