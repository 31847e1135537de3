//! # Query Translation
//!
//! Turns the raw `/search` query-string parameters into the pieces the Azure
//! Cognitive Search REST API expects: the search text, an OData `$filter`
//! expression for the selected facet and an `$orderby` expression for the
//! selected sort key.
//!
//! Facet values are never concatenated verbatim into the filter grammar.
//! String values become OData string literals with embedded quotes doubled,
//! and rating thresholds must parse as finite numbers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;
use url::form_urlencoded;

/// Raw query-string parameters accepted by `GET /search`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchParams {
    /// Free-text search term
    pub search: Option<String>,
    /// Selected facet value
    pub facet: Option<String>,
    /// Field the facet value applies to (`Category`, `Tags` or `Rating`)
    pub facet_type: Option<String>,
    /// Sort key (`name`, `rating`, `date` or `price`)
    pub sort: Option<String>,
}

impl SearchParams {
    /// Parses a raw query string. A repeated key keeps its first value.
    pub fn from_query_string(raw: &str) -> Self {
        let mut params = SearchParams::default();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let slot = match key.as_ref() {
                "search" => &mut params.search,
                "facet" => &mut params.facet,
                "facet_type" => &mut params.facet_type,
                "sort" => &mut params.sort,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Please enter a search term")]
    MissingQuery,
    #[error("Invalid value '{value}' for facet {facet_type}")]
    InvalidFacetValue { facet_type: FacetType, value: String },
}

/// Facetable fields that can be used to narrow a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FacetType {
    #[default]
    Category,
    Tags,
    Rating,
}

impl FacetType {
    pub const ALL: [FacetType; 3] = [FacetType::Category, FacetType::Tags, FacetType::Rating];

    pub fn as_str(self) -> &'static str {
        match self {
            FacetType::Category => "Category",
            FacetType::Tags => "Tags",
            FacetType::Rating => "Rating",
        }
    }
}

impl fmt::Display for FacetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FacetType::ALL
            .into_iter()
            .find(|facet| facet.as_str() == s)
            .ok_or(())
    }
}

/// Result ordering requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Relevance,
    Name,
    Rating,
    Date,
    Price,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Relevance,
        SortKey::Name,
        SortKey::Rating,
        SortKey::Date,
        SortKey::Price,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::Name => "name",
            SortKey::Rating => "rating",
            SortKey::Date => "date",
            SortKey::Price => "price",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Relevance => "Relevance",
            SortKey::Name => "Name",
            SortKey::Rating => "Rating",
            SortKey::Date => "Renovation date",
            SortKey::Price => "Price",
        }
    }

    /// `$orderby` clause for this key; `None` lets the service rank by relevance.
    pub fn order_expression(self) -> Option<OrderExpression> {
        let clause = match self {
            SortKey::Relevance => return None,
            SortKey::Name => "HotelName asc",
            SortKey::Rating => "Rating desc",
            SortKey::Date => "LastRenovationDate desc",
            // Room prices are not in the index, so price falls back to rating.
            SortKey::Price => "Rating desc",
        };
        Some(OrderExpression(clause.to_string()))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or(())
    }
}

/// An OData boolean predicate for the `filter` request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterExpression(String);

impl FilterExpression {
    /// Builds the filter for `facet_type` matching `value`.
    pub fn for_facet(facet_type: FacetType, value: &str) -> Result<Self, QueryError> {
        let expression = match facet_type {
            FacetType::Category => format!("Category eq {}", odata_string_literal(value)),
            FacetType::Tags => format!("Tags/any(t: t eq {})", odata_string_literal(value)),
            FacetType::Rating => format!("Rating ge {}", rating_threshold(value)?),
        };
        Ok(FilterExpression(expression))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An OData `$orderby` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OrderExpression(String);

impl OrderExpression {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated search ready to be sent to the search service.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub search_text: String,
    pub filter: Option<FilterExpression>,
    pub order_by: Option<OrderExpression>,
    /// Sort key reported back to the results page
    pub sort_key: SortKey,
    /// The facet selection that produced `filter`, kept for rendering
    pub facet: Option<(FacetType, String)>,
}

/// Translates raw request parameters into a [`TranslatedQuery`].
///
/// # Errors
/// - [`QueryError::MissingQuery`] when the search text is absent or blank
/// - [`QueryError::InvalidFacetValue`] when a rating facet is not a number
pub fn translate(params: &SearchParams) -> Result<TranslatedQuery, QueryError> {
    let search_text = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(QueryError::MissingQuery)?
        .to_string();

    let mut facet = None;
    let mut filter = None;
    if let Some(value) = params.facet.as_deref() {
        let raw_type = params.facet_type.as_deref().unwrap_or("Category");
        match raw_type.parse::<FacetType>() {
            Ok(facet_type) => {
                filter = Some(FilterExpression::for_facet(facet_type, value)?);
                facet = Some((facet_type, value.to_string()));
            }
            Err(()) => warn!("⚠️ QUERY: Ignoring unknown facet type '{}'", raw_type),
        }
    }

    let sort_key = match params.sort.as_deref() {
        Some(raw) => raw.parse::<SortKey>().unwrap_or_else(|()| {
            warn!("⚠️ QUERY: Unknown sort key '{}', ranking by relevance", raw);
            SortKey::Relevance
        }),
        None => SortKey::Relevance,
    };

    Ok(TranslatedQuery {
        search_text,
        filter,
        order_by: sort_key.order_expression(),
        sort_key,
        facet,
    })
}

/// Quotes `value` as an OData string literal.
fn odata_string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Validates a rating threshold and renders it in canonical numeric form.
fn rating_threshold(value: &str) -> Result<String, QueryError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|rating| rating.is_finite())
        .map(|rating| rating.to_string())
        .ok_or_else(|| QueryError::InvalidFacetValue {
            facet_type: FacetType::Rating,
            value: value.to_string(),
        })
}
