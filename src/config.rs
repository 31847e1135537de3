//! # Configuration Management
//!
//! This module handles application configuration loading from environment variables
//! and provides structured configuration for the Azure Cognitive Search connection
//! and front-end settings.
//!
//! Configuration is read exactly once at process start and shared immutably
//! afterwards; request handlers never consult the environment.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Index name used by the margies-travel front-end when `SEARCH_INDEX_NAME` is unset.
pub const DEFAULT_INDEX_NAME: &str = "hotels-index";

const DEFAULT_API_VERSION: &str = "2023-11-01";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors raised while assembling the startup configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}. Please set them in your .env file.", .0.join(", "))]
    MissingVariables(Vec<String>),
    #[error("{name} is invalid: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Which of the two front-ends this process is serving.
///
/// The variants share every code path and only differ in how the index name
/// is resolved and whether example searches are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Requires `SEARCH_INDEX_NAME` and shows example searches.
    HotelTravel,
    /// Falls back to [`DEFAULT_INDEX_NAME`].
    MargiesTravel,
}

/// How the target index name is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexNamePolicy {
    Required,
    DefaultTo(String),
}

impl Variant {
    pub fn index_name_policy(self) -> IndexNamePolicy {
        match self {
            Variant::HotelTravel => IndexNamePolicy::Required,
            Variant::MargiesTravel => IndexNamePolicy::DefaultTo(DEFAULT_INDEX_NAME.to_string()),
        }
    }

    /// Suggested queries shown on the results page.
    pub fn example_searches(self) -> Vec<String> {
        match self {
            Variant::HotelTravel => [
                "pool",
                "spa",
                "gym",
                "breakfast",
                "gaming",
                "restaurant",
                "luxury spa resort",
                "family pool hotel",
                "business downtown",
                "airport",
                "beach",
                "4 star",
                "renovated",
            ]
            .into_iter()
            .map(|s| s.to_string())
            .collect(),
            Variant::MargiesTravel => Vec::new(),
        }
    }

    pub fn site_title(self) -> &'static str {
        match self {
            Variant::HotelTravel => "Hotel Travel",
            Variant::MargiesTravel => "Margie's Travel",
        }
    }
}

/// Main application configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Environment name (e.g., "development", "production")
    pub environment: String,
    /// Azure Cognitive Search connection settings
    pub search: SearchServiceConfig,
    /// Front-end settings
    pub application: ApplicationConfig,
}

/// Azure Cognitive Search connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchServiceConfig {
    /// Base URL of the search service, e.g. `https://my-service.search.windows.net`
    pub endpoint: String,
    /// Read-only query key sent as the `api-key` header
    pub query_key: String,
    /// Name of the index to query
    pub index_name: String,
    /// REST API version
    pub api_version: String,
    /// Deadline for a single call to the search service
    pub request_timeout_secs: u64,
}

/// Front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub variant: Variant,
    /// User-Agent string for outbound requests
    pub user_agent: String,
    pub example_searches: Vec<String>,
}

impl Config {
    /// Creates a new configuration instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// ## Required
    /// - `SEARCH_SERVICE_ENDPOINT`: base URL of the search service
    /// - `SEARCH_SERVICE_QUERY_KEY`: query key
    /// - `SEARCH_INDEX_NAME`: index name (hotel-travel only; margies-travel
    ///   defaults to `hotels-index`)
    ///
    /// ## Optional (with defaults)
    /// - `ENVIRONMENT`: Environment name (default: "development")
    /// - `SEARCH_API_VERSION`: REST API version (default: "2023-11-01")
    /// - `SEARCH_REQUEST_TIMEOUT_SECS`: per-call deadline (default: 30)
    /// - `USER_AGENT`: outbound User-Agent (default: "HotelSearchFrontend/0.1.0")
    ///
    /// # Errors
    /// Returns [`ConfigError::MissingVariables`] naming every absent required
    /// variable, or [`ConfigError::InvalidValue`] for malformed values.
    pub fn from_env(variant: Variant) -> Result<Self, ConfigError> {
        Self::from_lookup(variant, |name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(variant: Variant, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let endpoint = get("SEARCH_SERVICE_ENDPOINT");
        let query_key = get("SEARCH_SERVICE_QUERY_KEY");
        let index_name = match variant.index_name_policy() {
            IndexNamePolicy::Required => get("SEARCH_INDEX_NAME"),
            IndexNamePolicy::DefaultTo(default) => Some(get("SEARCH_INDEX_NAME").unwrap_or(default)),
        };

        let missing: Vec<String> = [
            ("SEARCH_SERVICE_ENDPOINT", endpoint.is_none()),
            ("SEARCH_SERVICE_QUERY_KEY", query_key.is_none()),
            ("SEARCH_INDEX_NAME", index_name.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(name, _)| name.to_string())
        .collect();

        let (Some(endpoint), Some(query_key), Some(index_name)) = (endpoint, query_key, index_name)
        else {
            return Err(ConfigError::MissingVariables(missing));
        };

        let parsed = url::Url::parse(&endpoint).map_err(|e| ConfigError::InvalidValue {
            name: "SEARCH_SERVICE_ENDPOINT",
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                name: "SEARCH_SERVICE_ENDPOINT",
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let request_timeout_secs = match get("SEARCH_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "SEARCH_REQUEST_TIMEOUT_SECS",
                        reason: format!("'{}' is not a positive number of seconds", raw),
                    })
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Config {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            search: SearchServiceConfig {
                endpoint,
                query_key,
                index_name,
                api_version: get("SEARCH_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                request_timeout_secs,
            },
            application: ApplicationConfig {
                variant,
                user_agent: get("USER_AGENT")
                    .unwrap_or_else(|| "HotelSearchFrontend/0.1.0".to_string()),
                example_searches: variant.example_searches(),
            },
        })
    }

    /// Checks if the application is running in production environment.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Deadline applied to each outbound search call.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.search.request_timeout_secs)
    }
}
