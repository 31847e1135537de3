//! # Hotel Search Frontend - Main Application Entry Point
//!
//! Loads configuration, builds the search client and serves the front-end.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -- --port 5000 --variant hotel-travel
//! ```
//!
//! ## Environment Variables
//!
//! `SEARCH_SERVICE_ENDPOINT` and `SEARCH_SERVICE_QUERY_KEY` are always
//! required. `SEARCH_INDEX_NAME` is required for `--variant hotel-travel` and
//! defaults to `hotels-index` for `--variant margies-travel`. Values may also
//! come from a `.env` file.

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use hotel_search_frontend::{create_router, AppState, Args, Config, SearchService};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Main application entry point.
///
/// Initializes logging, loads configuration, creates the search client,
/// and starts the HTTP server. Missing configuration stops the process
/// before it binds a port.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    info!(
        "Starting {} front-end on port {}",
        args.variant.site_title(),
        args.port
    );

    let config = Arc::new(Config::from_env(args.variant)?);
    info!(
        "Loaded configuration for environment: {} (index '{}')",
        config.environment, config.search.index_name
    );

    let search_service = Arc::new(SearchService::new(config.clone())?);

    let app_state = AppState {
        config,
        search_service,
    };

    let app = create_router(app_state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", args.port)).await?;
    info!("Server listening on http://0.0.0.0:{}", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
