use anyhow::Result;
use axum::Router;
use clap::Parser;
use media_core::store::SledStore;
use media_core::{Keyspace, StoreHandle};
use media_provider::{PixabayClient, DEFAULT_BASE_URL};
use server::{build_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Store directory path
    #[arg(long, default_value = "./catalog.db")]
    data: String,
    /// Namespace root for every key
    #[arg(long, default_value = "catalog")]
    namespace: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// How long a feed read collects index entries before resolving them
    #[arg(long, env = "FEED_WINDOW_MS", default_value_t = 250)]
    feed_window_ms: u64,
    /// Media provider base URL
    #[arg(long, env = "PROVIDER_URL", default_value = DEFAULT_BASE_URL)]
    provider_url: String,
    /// Media provider API key
    #[arg(long, env = "PIXABAY_KEY", default_value = "")]
    provider_key: String,
    /// Provider request timeout seconds
    #[arg(long, default_value_t = 12)]
    provider_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    if args.provider_key.is_empty() {
        tracing::warn!("PIXABAY_KEY not set; provider searches will be rejected upstream");
    }

    let store = SledStore::open(&args.data)?;
    let handle = StoreHandle::new(Arc::new(store.clone()), Keyspace::new(&args.namespace));
    let provider = PixabayClient::new(
        &args.provider_url,
        args.provider_key.clone(),
        Duration::from_secs(args.provider_timeout_secs),
    )?;
    let state = AppState::new(handle, Arc::new(provider), Duration::from_millis(args.feed_window_ms));
    let shutdown = state.shutdown.clone();
    let app: Router = build_app(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, data = %args.data, namespace = %args.namespace, feed_window_ms = args.feed_window_ms, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;
    store.flush().await?;
    Ok(())
}
