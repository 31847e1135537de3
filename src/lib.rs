//! # Hotel Search Frontend
//!
//! A thin web front-end over an Azure Cognitive Search hotel index. It takes a
//! free-text query from the request, translates the selected facet and sort
//! key into the service's OData filter and order-by expressions, runs a single
//! search and renders the ranked hotels as HTML. Relevance, faceting and
//! highlighting all happen inside the search service.
//!
//! ## Architecture
//!
//! - [`Config`]: Connection settings read once from the environment
//! - [`query`]: Translation of request parameters into search expressions
//! - [`SearchService`]: The single remote call to the search service
//! - [`pages`]: HTML rendering
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hotel_search_frontend::{create_router, AppState, Config, SearchService, Variant};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env(Variant::HotelTravel)?);
//!     let search_service = Arc::new(SearchService::new(config.clone())?);
//!
//!     let app = create_router(AppState {
//!         config,
//!         search_service,
//!     });
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```

use axum::{
    extract::{RawQuery, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use clap::Parser;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info, warn};

mod config;
pub mod pages;
pub mod query;
mod search;

pub use config::{Config, ConfigError, IndexNamePolicy, Variant, DEFAULT_INDEX_NAME};
pub use query::{translate, QueryError, SearchParams, TranslatedQuery};
pub use search::{SearchResultPage, SearchService, SearchServiceError, RESULT_CAP, SELECTED_FIELDS};

/// Extra time an inbound request gets beyond the outbound search deadline.
const RENDER_MARGIN: Duration = Duration::from_secs(5);

/// Shown instead of raw search service errors in production.
const SERVICE_UNAVAILABLE_MESSAGE: &str =
    "The search service is unavailable right now. Please try again later.";

/// Command-line arguments for the hotel search front-end.
#[derive(Parser)]
#[command(name = "hotel-search")]
#[command(about = "A hotel search web front-end backed by Azure Cognitive Search")]
pub struct Args {
    /// Port number to run the HTTP server on
    #[arg(short, long, default_value = "5000")]
    pub port: u16,

    /// Which front-end to serve
    #[arg(long, value_enum, default_value_t = Variant::HotelTravel)]
    pub variant: Variant,
}

/// Application state shared by every handler.
///
/// Both members are immutable after startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Client for the search service
    pub search_service: Arc<SearchService>,
}

impl AppState {
    fn site_title(&self) -> &'static str {
        self.config.application.variant.site_title()
    }

    fn example_searches(&self) -> &[String] {
        &self.config.application.example_searches
    }

    fn error_response(&self, status: StatusCode, message: &str) -> Response {
        (status, Html(pages::error_page(self.site_title(), message))).into_response()
    }

    /// Longest an inbound request may run before the error page is served.
    fn request_deadline(&self) -> Duration {
        self.config.request_timeout() + RENDER_MARGIN
    }
}

/// HTTP handler for the landing page.
pub async fn home_handler(State(state): State<AppState>) -> Html<String> {
    Html(pages::home_page(state.site_title(), state.example_searches()))
}

/// HTTP handler for search operations.
///
/// # Query Parameters
/// - `search`: Free-text search term (required)
/// - `facet`: Facet value to filter on (optional)
/// - `facet_type`: `Category` (default), `Tags` or `Rating` (optional)
/// - `sort`: `name`, `rating`, `date` or `price` (optional, default: relevance)
///
/// A repeated parameter keeps its first value.
///
/// # Returns
/// - `200 OK`: Results page, or the search prompt when no term was given
/// - `400 Bad Request`: Error page for an unusable facet value
/// - `502 Bad Gateway`: Error page when the search service call fails
///
/// # Example
/// ```text
/// GET /search?search=pool&facet=Luxury&facet_type=Category&sort=rating
/// ```
pub async fn search_handler(
    RawQuery(raw): RawQuery,
    State(state): State<AppState>,
) -> Response {
    let params = SearchParams::from_query_string(raw.as_deref().unwrap_or_default());
    let query = match translate(&params) {
        Ok(query) => query,
        Err(QueryError::MissingQuery) => {
            return Html(pages::prompt_page(
                state.site_title(),
                &QueryError::MissingQuery.to_string(),
                state.example_searches(),
            ))
            .into_response();
        }
        Err(e) => {
            warn!("Rejected search request: {}", e);
            return state.error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    match state.search_service.search(&query).await {
        Ok(page) => Html(pages::results_page(
            state.site_title(),
            &query,
            &page,
            state.example_searches(),
        ))
        .into_response(),
        Err(e) => {
            error!("Search route error: {}", e);
            let message = if state.config.is_production() {
                SERVICE_UNAVAILABLE_MESSAGE.to_string()
            } else {
                e.to_string()
            };
            state.error_response(StatusCode::BAD_GATEWAY, &message)
        }
    }
}

/// HTTP handler for health check operations.
///
/// Runs a one-document wildcard search against the configured index.
///
/// # Returns
/// - `200 OK`: `{"status": "healthy", "search_service": "connected"}`
/// - `500 Internal Server Error`: `{"status": "unhealthy", "error": "..."}`
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.search_service.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "search_service": "connected"
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found_handler(State(state): State<AppState>) -> Response {
    info!("Page not found");
    state.error_response(StatusCode::NOT_FOUND, "Page not found")
}

/// Serves the error page when a request outlives [`AppState::request_deadline`].
async fn enforce_deadline(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let deadline = state.request_deadline();
    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!("Request exceeded {}s deadline", deadline.as_secs());
            state.error_response(
                StatusCode::REQUEST_TIMEOUT,
                "The request took too long to complete",
            )
        }
    }
}

fn panic_response(site_title: &'static str, err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Internal server error: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(pages::error_page(site_title, "Internal server error")),
    )
        .into_response()
}

/// Creates the main application router with all endpoints configured.
///
/// - `GET /` - Landing page
/// - `GET /search` - Search results page
/// - `GET /health` - Health check endpoint
///
/// Unknown paths render the error page with `404`, handler panics render it
/// with `500`, and every request is bounded by the search deadline plus a
/// small rendering margin.
pub fn create_router(state: AppState) -> Router {
    let site_title = state.site_title();

    Router::new()
        .route("/", get(home_handler))
        .route("/search", get(search_handler))
        .route("/health", get(health_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), enforce_deadline))
        .layer(CatchPanicLayer::custom(
            move |err: Box<dyn Any + Send + 'static>| panic_response(site_title, err),
        ))
        .with_state(state)
}
