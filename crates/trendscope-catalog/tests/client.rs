//! Integration tests for `CatalogClient` using wiremock HTTP mocks.

use trendscope_catalog::{CatalogClient, CatalogError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> CatalogClient {
    CatalogClient::new(base_url, 30, "trendscope-test/0.1", 2, 0)
        .expect("client construction should not fail")
}

#[tokio::test]
async fn fetch_trending_returns_parsed_items() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "status": "ok",
        "items": [
            {
                "id": "sku-veste-01",
                "title": "Veste workwear",
                "brand": "Maison Rive",
                "category": "outerwear",
                "style": "workwear",
                "popularity": 82.0,
                "velocity": 14.5,
                "updated_at": "2026-03-01T08:00:00Z"
            },
            {
                "id": "sku-chemise-02",
                "title": "Chemise oxford",
                "popularity": 40.0,
                "velocity": 2.0
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/products/trending"))
        .and(query_param("segment", "homme"))
        .and(query_param("zone", "EU"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let items = client
        .fetch_trending("homme", "EU")
        .await
        .expect("should parse items");

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "sku-veste-01");
    assert_eq!(items[0].brand.as_deref(), Some("Maison Rive"));
    assert!(items[1].brand.is_none());
    assert_eq!(items[1].popularity, 40.0);
}

#[tokio::test]
async fn fetch_trending_surfaces_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/products/trending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "error",
            "message": "unknown market zone"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_trending("homme", "XX")
        .await
        .expect_err("error envelope should fail");
    assert!(matches!(err, CatalogError::Api(m) if m == "unknown market zone"));
}

#[tokio::test]
async fn fetch_trending_retries_server_errors() {
    let server = MockServer::start().await;

    // First attempt fails with 500, second succeeds.
    Mock::given(method("GET"))
        .and(path("/v1/products/trending"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/products/trending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "items": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let items = client
        .fetch_trending("homme", "EU")
        .await
        .expect("retry should recover");
    assert!(items.is_empty());
}

#[tokio::test]
async fn malformed_body_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/products/trending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "items": "not-a-list"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .fetch_trending("homme", "EU")
        .await
        .expect_err("malformed items should fail");
    assert!(matches!(err, CatalogError::Deserialize { .. }));
}
