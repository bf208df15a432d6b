//! End-to-end tests for the offer feed.
//!
//! The affiliate API is stubbed with wiremock; mock expectations double as
//! call-count assertions and are verified when each `MockServer` drops.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cupaoferta::config::{AffiliateConfig, ProductFilters, UpstreamConfig};
use cupaoferta::metrics::Metrics;
use cupaoferta::response::CachePolicy;
use cupaoferta::upstream::UpstreamClient;
use cupaoferta::{router, AppState};

const PUBLISHER: &str = "424242";

fn app(api_base: &str, token: Option<&str>, publisher: Option<&str>) -> Router {
    let client = UpstreamClient::try_new(UpstreamConfig {
        user_agent: "CupaOferta-App/1.0".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    router(AppState {
        fetcher: Arc::new(client),
        affiliate: AffiliateConfig {
            api_base: api_base.to_string(),
            api_token: token.map(str::to_string),
            api_key: None,
            publisher_id: publisher.map(str::to_string),
        },
        filters: ProductFilters::default(),
        cache: CachePolicy::default(),
        metrics: Metrics::new().unwrap(),
    })
}

fn configured(server: &MockServer) -> Router {
    app(&server.uri(), Some("secret-token"), Some(PUBLISHER))
}

fn promotions(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|i| {
                let code = if i % 2 == 0 {
                    Value::String(format!("CODE{i}"))
                } else {
                    Value::Null
                };
                json!({
                    "promotionId": 5000 + i,
                    "advertiser": {"id": 10 + i, "name": format!("Loja {i}"), "logoUrl": null},
                    "code": code,
                    "title": format!("Promo {i}"),
                    "clickUrl": format!("https://www.awin1.com/cread.php?p={i}"),
                    "endDate": "2026-12-31"
                })
            })
            .collect(),
    )
}

fn products(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "productId": 9000 + i,
                "productName": format!("Produto {i}"),
                "price": 10.5 + i as f64,
                "currency": "BRL",
                "merchantName": "Mega Store",
                "deepLink": format!("https://www.awin1.com/pclick.php?p={i}")
            })
        })
        .collect();
    json!({ "products": items })
}

async fn mount_promotions(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/publisher/{PUBLISHER}/promotions")))
        .and(query_param("relationship", "joined"))
        .and(header_eq("authorization", "Bearer secret-token"))
        .and(header_eq("x-api-key", "secret-token"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_products(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/publisher/{PUBLISHER}/products")))
        .and(query_param("region", "BR"))
        .and(query_param("currency", "BRL"))
        .and(query_param("limit", "20"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

async fn get_feed(app: Router) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/coupons")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

fn kinds(body: &[u8]) -> Vec<String> {
    let offers: Vec<Value> = serde_json::from_slice(body).unwrap();
    offers
        .iter()
        .map(|o| o["kind"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn few_coupons_are_topped_up_with_products() {
    let server = MockServer::start().await;
    mount_promotions(&server, ResponseTemplate::new(200).set_body_json(promotions(3)), 1).await;
    mount_products(&server, ResponseTemplate::new(200).set_body_json(products(10)), 1).await;

    let (status, headers, body) = get_feed(configured(&server)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "s-maxage=3600, stale-while-revalidate=59"
    );

    let kinds = kinds(&body);
    assert_eq!(kinds.len(), 13);
    assert!(kinds[..3].iter().all(|k| k == "coupon"));
    assert!(kinds[3..].iter().all(|k| k == "product"));

    let offers: Vec<Value> = serde_json::from_slice(&body).unwrap();
    assert_eq!(offers[0]["code"], "CODE0");
    assert_eq!(offers[1]["code"], Value::Null);
    assert_eq!(offers[3]["code"], "OFFER");
    assert_eq!(offers[3]["description"], "Produto 0 - BRL 10.50");
    assert_eq!(offers[3]["expiry"], "while stocks last");
}

#[tokio::test]
async fn enough_coupons_never_call_product_search() {
    let server = MockServer::start().await;
    mount_promotions(&server, ResponseTemplate::new(200).set_body_json(promotions(8)), 1).await;
    mount_products(&server, ResponseTemplate::new(200).set_body_json(products(10)), 0).await;

    let (status, _, body) = get_feed(configured(&server)).await;

    assert_eq!(status, StatusCode::OK);
    let kinds = kinds(&body);
    assert_eq!(kinds.len(), 8);
    assert!(kinds.iter().all(|k| k == "coupon"));
}

#[tokio::test]
async fn exactly_threshold_coupons_skip_product_search() {
    let server = MockServer::start().await;
    mount_promotions(&server, ResponseTemplate::new(200).set_body_json(promotions(6)), 1).await;
    mount_products(&server, ResponseTemplate::new(200).set_body_json(products(1)), 0).await;

    let (_, _, body) = get_feed(configured(&server)).await;

    assert_eq!(kinds(&body).len(), 6);
}

#[tokio::test]
async fn both_sources_failing_returns_empty_list() {
    let server = MockServer::start().await;
    mount_promotions(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({"description": "invalid token"})),
        1,
    )
    .await;
    mount_products(&server, ResponseTemplate::new(500).set_body_string("oops"), 1).await;

    let (status, _, body) = get_feed(configured(&server)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn malformed_promotions_fall_back_to_products() {
    let server = MockServer::start().await;
    mount_promotions(&server, ResponseTemplate::new(200).set_body_string("<html>"), 1).await;
    mount_products(&server, ResponseTemplate::new(200).set_body_json(products(2)), 1).await;
    let app = configured(&server);

    let (status, _, body) = get_feed(app.clone()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(kinds(&body), vec!["product", "product"]);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let exported = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let exported = String::from_utf8(exported.to_vec()).unwrap();
    assert!(exported.contains(r#"cupaoferta_upstream_failures_total{source="promotions"} 1"#));
    assert!(!exported.contains(r#"cupaoferta_upstream_failures_total{source="product_search"}"#));
}

#[tokio::test]
async fn missing_publisher_id_is_config_error_without_upstream_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let (status, headers, body) = get_feed(app(&server.uri(), Some("secret-token"), None)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "CONFIG_MISSING");
    assert!(body["message"].as_str().unwrap().contains("AWIN_PUBLISHER_ID"));
}

#[tokio::test]
async fn missing_token_is_config_error() {
    let server = MockServer::start().await;

    let (status, _, body) = get_feed(app(&server.uri(), None, Some(PUBLISHER))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["error"], "CONFIG_MISSING");
}

#[tokio::test]
async fn every_offer_has_merchant_name_and_tracking_url() {
    let server = MockServer::start().await;
    let sparse = json!([
        {"promotionId": 1, "title": "no advertiser", "trackingUrl": "https://t/1"},
        {"promotionId": 2, "title": "no url at all"},
        {"promotionId": 3, "advertiser": {"name": ""}, "clickUrl": "https://c/3"}
    ]);
    mount_promotions(&server, ResponseTemplate::new(200).set_body_json(sparse), 1).await;
    mount_products(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({"products": [
            {"productId": 1, "productName": "sem link"},
            {"productId": 2, "productName": "ok", "deepLink": "https://d/2"}
        ]})),
        1,
    )
    .await;

    let (_, _, body) = get_feed(configured(&server)).await;
    let offers: Vec<Value> = serde_json::from_slice(&body).unwrap();

    assert_eq!(offers.len(), 3);
    for offer in &offers {
        assert!(!offer["merchant"]["name"].as_str().unwrap().is_empty());
        assert!(!offer["trackingUrl"].as_str().unwrap().is_empty());
    }
    assert_eq!(offers[0]["merchant"]["name"], "Partner");
}

#[tokio::test]
async fn repeated_requests_are_byte_identical() {
    let server = MockServer::start().await;
    mount_promotions(&server, ResponseTemplate::new(200).set_body_json(promotions(2)), 2).await;
    mount_products(&server, ResponseTemplate::new(200).set_body_json(products(3)), 2).await;

    let app = configured(&server);
    let (_, _, first) = get_feed(app.clone()).await;
    let (_, _, second) = get_feed(app).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let server = MockServer::start().await;
    mount_promotions(&server, ResponseTemplate::new(200).set_body_json(promotions(6)), 1).await;

    let response = configured(&server)
        .oneshot(
            Request::builder()
                .uri("/api/coupons")
                .header(header::ORIGIN, "https://cupaoferta.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn health_reports_service() {
    let server = MockServer::start().await;
    let response = configured(&server)
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["service"], "cupaoferta");
}
