//! Response shapes of a running API server.
//!
//! These tests require:
//! - A migrated database (`bazaar-cli migrate`)
//! - The API server running (`cargo run -p bazaar-api`)
//!
//! Set `BAZAAR_API_URL` to target a server other than `http://localhost:8000`.

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

fn base_url() -> String {
    std::env::var("BAZAAR_API_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

async fn get_json(client: &Client, path: &str) -> (StatusCode, Value) {
    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = reqwest::get(format!("{}/health", base_url())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_list_endpoints_are_paginated() {
    let client = Client::new();
    for path in ["/categories?limit=5", "/shops?limit=5", "/products?limit=5"] {
        let (status, body) = get_json(&client, path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert!(body["count"].is_i64(), "{path}: {body}");
        assert!(body["results"].as_array().unwrap().len() <= 5, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_unknown_product_is_404() {
    let (status, body) = get_json(&Client::new(), "/products/2147483647").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["Status"], json!(false));
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_seller_endpoints_require_token() {
    let client = Client::new();
    let resp = client
        .post(format!("{}/seller/update", base_url()))
        .json(&json!({"url": "https://example.com/shop.yaml"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["Status"], json!(false));
    assert!(body["Error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_unknown_token_is_rejected() {
    let resp = Client::new()
        .get(format!("{}/basket", base_url()))
        .header("Authorization", "Token not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

/// Needs `BAZAAR_TEST_SELLER_TOKEN` from `bazaar-cli user create -k shop`.
#[tokio::test]
#[ignore = "Requires running API server and a seller token"]
async fn test_seller_state_requires_state_argument() {
    let token = std::env::var("BAZAAR_TEST_SELLER_TOKEN").unwrap();
    let resp = Client::new()
        .post(format!("{}/seller/state", base_url()))
        .header("Authorization", format!("Token {token}"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["Status"], json!(false));
    assert!(body["Errors"].is_string());
}
