use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use floodwatch_api::{build_pipeline, log_filter, router, AppState};
use floodwatch_common::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env())?)
        .init();

    let config = AppConfig::from_env()?;

    let state = Arc::new(AppState {
        pipeline: build_pipeline(&config),
    });
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Floodwatch API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
