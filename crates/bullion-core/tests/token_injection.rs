mod common;

use std::sync::Arc;

use bullion_core::api::{Middleware, Next};
use bullion_core::models::LoginCredentials;
use bullion_core::{ApiError, ApiRequest, ApiResponse, TokenStore};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use common::{api_path, harness, harness_with};

#[tokio::test]
async fn test_private_request_carries_stored_token() {
    let h = harness(Some("abc")).await;
    Mock::given(method("GET"))
        .and(path(api_path("/cost-centers")))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&h.server)
        .await;

    let centers: Vec<Value> = h
        .client
        .send_data(ApiRequest::get("/cost-centers"))
        .await
        .unwrap();
    assert!(centers.is_empty());
}

#[tokio::test]
async fn test_no_authorization_without_token() {
    let h = harness(None).await;
    Mock::given(method("GET"))
        .and(path(api_path("/branch")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&h.server)
        .await;

    h.client.send(ApiRequest::get("/branch")).await.unwrap();

    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_login_is_sent_without_token_and_stores_new_one() {
    let h = harness(Some("abc")).await;
    Mock::given(method("POST"))
        .and(path(api_path("/login")))
        .and(body_json(json!({ "username": "desk", "password": "s3cret" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "accessToken": "fresh" } })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.client
        .login(&LoginCredentials {
            username: "desk".to_string(),
            password: "s3cret".to_string(),
        })
        .await
        .unwrap();

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(h.token().as_deref(), Some("fresh"));
    assert!(h.client.is_authenticated());
}

#[tokio::test]
async fn test_wrong_password_does_not_refresh() {
    let h = harness(None).await;
    Mock::given(method("POST"))
        .and(path(api_path("/login")))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "code": "INVALID_CREDENTIALS", "message": "Invalid username or password" })),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("/refresh")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h
        .client
        .login(&LoginCredentials {
            username: "desk".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        ApiError::Validation { code, message, .. } => {
            assert_eq!(code.as_deref(), Some("INVALID_CREDENTIALS"));
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(h.presenter.warning_count(), 0);
    assert!(!h.client.is_authenticated());
}

#[tokio::test]
async fn test_public_path_without_leading_slash() {
    let h = harness(Some("abc")).await;
    Mock::given(method("POST"))
        .and(path(api_path("/login")))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "code": "INVALID_CREDENTIALS", "message": "Invalid username or password" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("/refresh")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "code": "MISSING_REFRESH_TOKEN" })))
        .expect(0)
        .mount(&h.server)
        .await;

    let response = h
        .client
        .send(ApiRequest::post("login").json_value(json!({ "username": "desk", "password": "wrong" })))
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    // A rejected login leaves the existing session alone
    assert_eq!(h.token().as_deref(), Some("abc"));
    assert_eq!(h.presenter.warning_count(), 0);
}

#[tokio::test]
async fn test_register_is_public() {
    let h = harness(Some("abc")).await;
    Mock::given(method("POST"))
        .and(path(api_path("/register")))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": 42 } })))
        .mount(&h.server)
        .await;

    let created: Value = h
        .client
        .register(&json!({ "username": "new-desk", "password": "pw" }))
        .await
        .unwrap();
    assert_eq!(created["id"], 42);

    let requests = h.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_default_headers_and_query() {
    let h = harness(Some("abc")).await;
    Mock::given(method("GET"))
        .and(path(api_path("/registry")))
        .and(query_param("page", "2"))
        .and(query_param("search", "gold bar"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [], "total": 0 })))
        .expect(1)
        .mount(&h.server)
        .await;

    let body: Value = h
        .client
        .get_with_query("/registry", &[("page", "2"), ("search", "gold bar")])
        .await
        .unwrap();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_error_statuses_pass_through_send() {
    let h = harness(Some("abc")).await;
    Mock::given(method("PUT"))
        .and(path(api_path("/voucher/7")))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "message": "Voucher date is required" })),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(api_path("/branch/3")))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&h.server)
        .await;

    let raw = h
        .client
        .send(ApiRequest::put("/voucher/7").json_value(json!({})))
        .await
        .unwrap();
    assert_eq!(raw.status().as_u16(), 422);

    let err = h
        .client
        .put::<Value, _>("/voucher/7", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation { ref message, .. } if message == "Voucher date is required"));

    let err = h.client.delete::<Value>("/branch/3").await.unwrap_err();
    assert!(matches!(err, ApiError::ServerError { ref body, .. } if body == "database unavailable"));

    // Business errors never touch the session
    assert_eq!(h.token().as_deref(), Some("abc"));
    assert_eq!(h.presenter.warning_count(), 0);
}

#[tokio::test]
async fn test_delete_with_empty_body() {
    let h = harness(Some("abc")).await;
    Mock::given(method("DELETE"))
        .and(path(api_path("/metal-stocks/9")))
        .respond_with(ResponseTemplate::new(204))
        .mount(&h.server)
        .await;

    h.client.delete::<()>("/metal-stocks/9").await.unwrap();
}

#[tokio::test]
async fn test_absolute_url_is_rejected() {
    let h = harness(Some("abc")).await;
    let err = h
        .client
        .send(ApiRequest::get("https://elsewhere.example/steal"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));
    assert!(h.received_paths().await.is_empty());
}

#[tokio::test]
async fn test_network_error() {
    let h = harness_with(Some("abc"), |config| {
        // Nothing listens on port 1
        config.api_base_url = "http://127.0.0.1:1/api/v1".to_string();
    })
    .await;

    let err = h.client.send(ApiRequest::get("/commodity")).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(h.token().as_deref(), Some("abc"));
}

struct BranchHeader;

impl Middleware for BranchHeader {
    fn handle<'a>(
        &'a self,
        request: ApiRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        async move {
            // Runs after bearer injection
            assert_eq!(request.bearer(), Some("abc"));
            let request = request.header(
                HeaderName::from_static("x-branch"),
                HeaderValue::from_static("DXB"),
            );
            next.run(request).await
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_custom_middleware() {
    let server = wiremock::MockServer::start().await;
    let store = Arc::new(bullion_core::MemoryTokenStore::with_token("abc"));
    let client = bullion_core::ApiClient::builder(common::config_for(&server))
        .token_store(store.clone())
        .middleware(Arc::new(BranchHeader))
        .build()
        .unwrap();

    Mock::given(method("GET"))
        .and(path(api_path("/reports/stock-balance")))
        .and(header("x-branch", "DXB"))
        .and(header("authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    client.send(ApiRequest::get("/reports/stock-balance")).await.unwrap();
    assert!(store.has_token());
}
