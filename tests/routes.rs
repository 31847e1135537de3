//! End-to-end route tests against a mock search service.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use hotel_search_frontend::{create_router, AppState, Config, SearchService, Variant};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;

const SEARCH_PATH: &str = "/indexes/test-index/docs/search";

fn app_with_env(
    endpoint: &str,
    variant: Variant,
    with_index: bool,
    extra: &'static [(&'static str, &'static str)],
) -> Router {
    let endpoint = endpoint.to_string();
    let config = Arc::new(
        Config::from_lookup(variant, move |name| match name {
            "SEARCH_SERVICE_ENDPOINT" => Some(endpoint.clone()),
            "SEARCH_SERVICE_QUERY_KEY" => Some("test-key".to_string()),
            "SEARCH_INDEX_NAME" if with_index => Some("test-index".to_string()),
            _ => extra
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string()),
        })
        .unwrap(),
    );
    let search_service = Arc::new(SearchService::new(config.clone()).unwrap());
    create_router(AppState {
        config,
        search_service,
    })
}

fn app_for(endpoint: &str, variant: Variant, with_index: bool) -> Router {
    app_with_env(endpoint, variant, with_index, &[])
}

fn app(endpoint: &str) -> Router {
    app_for(endpoint, Variant::HotelTravel, true)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn results_body() -> String {
    json!({
        "@odata.count": 1,
        "@search.facets": {
            "Category": [{ "value": "Luxury", "count": 1 }],
            "Tags": [{ "value": "pool", "count": 1 }],
            "Rating": [{ "value": 4.8, "count": 1 }]
        },
        "value": [{
            "@search.score": 3.2,
            "@search.highlights": { "Description": ["Infinity <em>pool</em> over the bay"] },
            "HotelId": "13",
            "HotelName": "Luxury Lion Resort",
            "Description": "Infinity pool over the bay",
            "Category": "Luxury",
            "Tags": ["pool", "view"],
            "ParkingIncluded": true,
            "LastRenovationDate": "2020-02-14T00:00:00Z",
            "Rating": 4.8,
            "Address": { "City": "St. Louis", "StateProvince": "MO", "Country": "USA" }
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_home_page_makes_no_remote_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (status, body) = get(app(&server.url()), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"<form class="search" action="/search""#));
    assert!(body.contains("Hotel Travel"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_blank_search_shows_prompt_without_remote_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    for uri in ["/search", "/search?search=", "/search?search=%20%20%09"] {
        let (status, body) = get(app(&server.url()), uri).await;
        assert_eq!(status, StatusCode::OK, "unexpected status for {}", uri);
        assert!(body.contains("Please enter a search term"));
        assert!(body.contains("luxury spa resort"));
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_plain_search_sends_fixed_request_shape() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::UrlEncoded(
            "api-version".into(),
            "2023-11-01".into(),
        ))
        .match_header("api-key", "test-key")
        .match_body(Matcher::Json(json!({
            "search": "pool",
            "searchMode": "any",
            "count": true,
            "facets": ["Category", "Tags", "Rating"],
            "highlight": "HotelName,Description",
            "select": "HotelId,HotelName,Description,Category,Tags,ParkingIncluded,\
                       LastRenovationDate,Rating,Address,people,organizations,locations,\
                       keyphrases,masked_text",
            "top": 20
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(results_body())
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(app(&server.url()), "/search?search=pool").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Luxury Lion Resort"));
    assert!(body.contains("Infinity <em>pool</em> over the bay"));
    assert!(body.contains("St. Louis, MO, USA"));
    assert!(body.contains("/search?search=pool&amp;facet=4.8&amp;facet_type=Rating"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_facet_and_sort_are_translated() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "search": "hotel",
            "filter": "Category eq 'Luxury'",
            "orderby": "Rating desc"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(results_body())
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(
        app(&server.url()),
        "/search?search=hotel&facet=Luxury&facet_type=Category&sort=price",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Filtered by Category: <strong>Luxury</strong>"));
    assert!(body.contains(r#"class="active" href="/search?search=hotel&amp;facet=Luxury&amp;facet_type=Category&amp;sort=price""#));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_quotes_in_facet_values_are_escaped() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "filter": "Tags/any(t: t eq 'kid''s pool')"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": []}"#)
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(
        app(&server.url()),
        "/search?search=family&facet=kid%27s%20pool&facet_type=Tags",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("No hotels matched your search."));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invalid_rating_facet_is_rejected_before_remote_call() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (status, body) = get(
        app(&server.url()),
        "/search?search=hotel&facet=4%20or%20true&facet_type=Rating",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Invalid value &#39;4 or true&#39; for facet Rating"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_search_service_failure_renders_error_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":"","message":"Invalid expression: syntax error"}}"#)
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(app(&server.url()), "/search?search=pool").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("Something went wrong"));
    assert!(body.contains("Invalid expression: syntax error"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_health_reports_connected() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::Json(json!({ "search": "*", "top": 1 })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"value": [{"HotelId": "1"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(app(&server.url()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        health,
        json!({ "status": "healthy", "search_service": "connected" })
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_health_reports_service_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body("Forbidden")
        .create_async()
        .await;

    let (status, body) = get(app(&server.url()), "/health").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(
        health["error"],
        "Search service returned 403 Forbidden: Forbidden"
    );
}

#[tokio::test]
async fn test_health_reports_unreachable_service() {
    let (status, body) = get(app("http://127.0.0.1:1"), "/health").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
    assert!(health["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to reach the search service"));
}

#[tokio::test]
async fn test_unknown_route_renders_not_found_page() {
    let server = mockito::Server::new_async().await;

    let (status, body) = get(app(&server.url()), "/no-such-page").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Page not found"));
}

#[tokio::test]
async fn test_margies_travel_uses_default_index() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/indexes/hotels-index/docs/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(results_body())
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(
        app_for(&server.url(), Variant::MargiesTravel, false),
        "/search?search=pool",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Margie&#39;s Travel"));
    assert!(!body.contains("Try one of these searches"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_repeated_query_keys_use_first_value() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({
            "search": "pool",
            "orderby": "HotelName asc"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(results_body())
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(
        app(&server.url()),
        "/search?search=pool&search=spa&sort=name&sort=date",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("1 result(s) for <strong>pool</strong>"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unresponsive_search_service_times_out() {
    // Accepts connections but never writes a response.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    let holder = tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    let app = app_with_env(
        &endpoint,
        Variant::HotelTravel,
        true,
        &[("SEARCH_REQUEST_TIMEOUT_SECS", "1")],
    );
    let (status, body) = get(app, "/search?search=pool").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("Search request timed out after 1 seconds"));
    holder.abort();
}

#[tokio::test]
async fn test_undecodable_response_renders_error_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>maintenance</html>")
        .expect(1)
        .create_async()
        .await;

    let (status, body) = get(app(&server.url()), "/search?search=pool").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("Failed to parse search response"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_production_hides_service_error_details() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", SEARCH_PATH)
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body("invalid api-key test-key")
        .expect(1)
        .create_async()
        .await;

    let app = app_with_env(
        &server.url(),
        Variant::HotelTravel,
        true,
        &[("ENVIRONMENT", "production")],
    );
    let (status, body) = get(app, "/search?search=pool").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.contains("The search service is unavailable right now."));
    assert!(!body.contains("invalid api-key"));
    mock.assert_async().await;
}
