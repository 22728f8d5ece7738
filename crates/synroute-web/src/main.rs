//! SynRoute Web Server
//!
//! Run with: cargo run -p synroute-web

use synroute_config::Config;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config first so RUST_LOG from .env is visible to the filter
    let config = Config::load()?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting SynRoute Web Server...");
    info!(endpoint = %config.route.endpoint, size = config.depiction.size, "route planning configured");

    let state = synroute_web::state::AppState::from_config(&config)?;
    let app = synroute_web::router::build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
