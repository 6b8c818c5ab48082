// call-dashboard-rs/src/main.rs
// Call Dashboard - call outcome ingestion and statistics
// Port 8000 - HTTP entry point

use std::sync::Arc;

use axum::extract::Request;
use axum::ServiceExt;
use tracing_subscriber::EnvFilter;

use call_dashboard::config::DashboardConfig;
use call_dashboard::event_store::{EventStore, JsonFileStore};
use call_dashboard::CallDashboard;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let dotenv_loaded = config_rs::load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("Loaded settings from .env");
    }

    let config = DashboardConfig::from_env();
    tracing::info!("Using event store: {}", config.store_path.display());

    let store = Arc::new(JsonFileStore::new(&config.store_path));
    store.ensure()?;

    let dashboard = Arc::new(CallDashboard::new(store, config.api_key.clone()));
    let app = dashboard.into_app();

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Call dashboard listening on {}", config.bind_addr);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}
