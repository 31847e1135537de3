//! # Search Service
//!
//! This module talks to Azure Cognitive Search on behalf of the front-end.
//! Every search is a single `POST .../docs/search` call with a fixed shape:
//! any-term matching, total count, facets on `Category`, `Tags` and `Rating`,
//! highlighting on the hotel name and description, a fixed field projection
//! and a cap of [`RESULT_CAP`] documents. There is no retry; one failure fails
//! the request.
//!
//! ## Key Components
//!
//! - [`SearchService`]: Client for the search endpoint
//! - [`SearchRequest`]: JSON body sent to the service
//! - [`SearchResultPage`]: Decoded response
//! - [`SearchServiceError`]: Everything that can go wrong with the remote call
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hotel_search_frontend::{translate, Config, SearchParams, SearchService, Variant};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env(Variant::HotelTravel)?);
//!     let search_service = SearchService::new(config)?;
//!
//!     let params = SearchParams {
//!         search: Some("pool".to_string()),
//!         ..Default::default()
//!     };
//!     let page = search_service.search(&translate(&params)?).await?;
//!     println!("{} hotels", page.hits.len());
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::query::{FacetType, FilterExpression, OrderExpression, TranslatedQuery};
use crate::Config;

/// Maximum number of documents returned for one search.
pub const RESULT_CAP: usize = 20;

/// Fields returned for every document.
pub const SELECTED_FIELDS: [&str; 14] = [
    "HotelId",
    "HotelName",
    "Description",
    "Category",
    "Tags",
    "ParkingIncluded",
    "LastRenovationDate",
    "Rating",
    "Address",
    "people",
    "organizations",
    "locations",
    "keyphrases",
    "masked_text",
];

const HIGHLIGHT_FIELDS: &str = "HotelName,Description";

#[derive(Debug, Error)]
pub enum SearchServiceError {
    #[error("Search request timed out after {0} seconds")]
    Timeout(u64),
    #[error("Failed to reach the search service: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Search service returned {status}: {message}")]
    Service { status: StatusCode, message: String },
    #[error("Failed to parse search response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// JSON body for the Azure Cognitive Search `docs/search` endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub search: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<&'a FilterExpression>,
    #[serde(rename = "orderby", skip_serializing_if = "Option::is_none")]
    pub order_by: Option<&'a OrderExpression>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    pub top: usize,
}

impl<'a> SearchRequest<'a> {
    /// The fixed request shape used for user searches.
    pub fn for_query(query: &'a TranslatedQuery) -> Self {
        Self {
            search: &query.search_text,
            search_mode: Some("any"),
            count: Some(true),
            filter: query.filter.as_ref(),
            order_by: query.order_by.as_ref(),
            facets: FacetType::ALL.iter().map(|facet| facet.as_str()).collect(),
            highlight: Some(HIGHLIGHT_FIELDS),
            select: Some(SELECTED_FIELDS.join(",")),
            top: RESULT_CAP,
        }
    }

    /// Cheapest possible request, used to check connectivity.
    pub fn probe() -> Self {
        Self {
            search: "*",
            search_mode: None,
            count: None,
            filter: None,
            order_by: None,
            facets: Vec::new(),
            highlight: None,
            select: None,
            top: 1,
        }
    }
}

/// One page of results as returned by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResultPage {
    #[serde(rename = "@odata.count")]
    pub total_count: Option<u64>,
    #[serde(rename = "@search.facets", default)]
    pub facets: HashMap<String, Vec<FacetBucket>>,
    #[serde(rename = "value", default)]
    pub hits: Vec<SearchHit>,
}

impl SearchResultPage {
    /// Facet buckets for `facet_type`, empty if the service returned none.
    pub fn facet(&self, facet_type: FacetType) -> &[FacetBucket] {
        self.facets
            .get(facet_type.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacetBucket {
    /// String for `Category`/`Tags`, number for `Rating`
    pub value: serde_json::Value,
    pub count: u64,
}

impl FacetBucket {
    /// The bucket value as it would be passed back in a `facet` parameter.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "@search.score", default)]
    pub score: f64,
    #[serde(rename = "@search.highlights")]
    pub highlights: Option<HashMap<String, Vec<String>>>,
    #[serde(flatten)]
    pub hotel: HotelDocument,
}

impl SearchHit {
    /// First highlight fragment for `field`, if the service produced one.
    pub fn highlight(&self, field: &str) -> Option<&str> {
        self.highlights
            .as_ref()?
            .get(field)?
            .first()
            .map(String::as_str)
    }
}

/// A hotel document projected to [`SELECTED_FIELDS`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HotelDocument {
    pub hotel_id: Option<String>,
    pub hotel_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub parking_included: Option<bool>,
    pub last_renovation_date: Option<DateTime<Utc>>,
    pub rating: Option<f64>,
    pub address: Option<Address>,
    #[serde(rename = "people", default)]
    pub people: Vec<String>,
    #[serde(rename = "organizations", default)]
    pub organizations: Vec<String>,
    #[serde(rename = "locations", default)]
    pub locations: Vec<String>,
    #[serde(rename = "keyphrases", default)]
    pub keyphrases: Vec<String>,
    #[serde(rename = "masked_text")]
    pub masked_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// Non-empty address parts joined with commas.
    pub fn one_line(&self) -> String {
        [
            &self.street_address,
            &self.city,
            &self.state_province,
            &self.postal_code,
            &self.country,
        ]
        .into_iter()
        .filter_map(|part| part.as_deref().filter(|p| !p.is_empty()))
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: ServiceErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorDetail {
    message: String,
}

pub struct SearchService {
    client: Client,
    config: Arc<Config>,
    search_url: Url,
}

impl SearchService {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.application.user_agent)
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let search_url = Self::build_search_url(&config)?;
        info!(
            "🔌 SEARCH SERVICE: Using index '{}' at {}",
            config.search.index_name, config.search.endpoint
        );

        Ok(Self {
            client,
            config,
            search_url,
        })
    }

    /// `{endpoint}/indexes/{index}/docs/search?api-version={version}`
    fn build_search_url(config: &Config) -> Result<Url> {
        let mut url = Url::parse(&config.search.endpoint)
            .with_context(|| format!("Invalid search endpoint '{}'", config.search.endpoint))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("Search endpoint '{}' cannot be a base URL", config.search.endpoint))?
            .pop_if_empty()
            .extend(["indexes", config.search.index_name.as_str(), "docs", "search"]);
        url.query_pairs_mut()
            .append_pair("api-version", &config.search.api_version);
        Ok(url)
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }

    pub async fn search(
        &self,
        query: &TranslatedQuery,
    ) -> Result<SearchResultPage, SearchServiceError> {
        info!(
            "🔍 SEARCH REQUEST: Query='{}', filter={:?}, orderby={:?}",
            query.search_text,
            query.filter.as_ref().map(FilterExpression::as_str),
            query.order_by.as_ref().map(OrderExpression::as_str)
        );

        let start_time = std::time::Instant::now();
        let page = self.execute(&SearchRequest::for_query(query)).await;
        let elapsed = start_time.elapsed();

        match &page {
            Ok(page) => info!(
                "🎯 SEARCH COMPLETE: Query='{}' returned {} results (total {}) in {}ms",
                query.search_text,
                page.hits.len(),
                page.total_count.unwrap_or(page.hits.len() as u64),
                elapsed.as_millis()
            ),
            Err(e) => error!(
                "❌ SEARCH FAILED: Query='{}' failed in {}ms - {}",
                query.search_text,
                elapsed.as_millis(),
                e
            ),
        }

        page
    }

    /// Runs a wildcard search capped at one document.
    pub async fn health_check(&self) -> Result<(), SearchServiceError> {
        self.execute(&SearchRequest::probe()).await.map(|_| ())
    }

    async fn execute(
        &self,
        request: &SearchRequest<'_>,
    ) -> Result<SearchResultPage, SearchServiceError> {
        debug!("📡 SEARCH API: Sending request to {}", self.search_url);

        let response = self
            .client
            .post(self.search_url.clone())
            .header("api-key", &self.config.search.query_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchServiceError::Service {
                status,
                message: service_error_message(&body),
            });
        }

        response.json::<SearchResultPage>().await.map_err(|e| {
            if e.is_timeout() {
                SearchServiceError::Timeout(self.config.search.request_timeout_secs)
            } else {
                SearchServiceError::Decode(e)
            }
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> SearchServiceError {
        if e.is_timeout() {
            SearchServiceError::Timeout(self.config.search.request_timeout_secs)
        } else {
            SearchServiceError::Transport(e)
        }
    }
}

/// Pulls `error.message` out of an Azure error body, falling back to the raw text.
fn service_error_message(body: &str) -> String {
    serde_json::from_str::<ServiceErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
