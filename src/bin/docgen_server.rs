//! docgen_server - HTTP server for form-driven document generation.
//!
//! Configuration comes from the environment (see `docgen::config`);
//! a `.env` file in the working directory is loaded first.

use anyhow::Context;
use docgen::documents::ArtifactSweeper;
use docgen::{create_doc_router, AppState, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docgen=debug,docgen_server=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env().context("invalid server configuration")?;
    tracing::info!("Loading template catalog from {}", config.template_config.display());

    let state = AppState::from_config(&config).context("failed to load template catalog")?;
    tracing::info!(
        "Loaded {} template(s): {}",
        state.catalog.len(),
        state.catalog.kinds().collect::<Vec<_>>().join(", ")
    );

    match config.retention {
        Some(retention) => {
            let sweeper = ArtifactSweeper::new(state.store.clone(), retention);
            tokio::spawn(async move {
                sweeper.run().await;
            });
            tracing::info!(
                "Artifact sweeper spawned (ttl={}s, interval={}s)",
                retention.ttl.as_secs(),
                retention.sweep_interval.as_secs()
            );
        }
        None => tracing::info!("Artifact retention sweep disabled"),
    }

    let app = create_doc_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!(
        "docgen listening on {} (downloads at {})",
        config.bind_addr,
        config.download_base_url()
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
