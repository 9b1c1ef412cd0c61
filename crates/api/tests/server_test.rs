use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use traffic_ops_api::{default_table, ApiServer};
use traffic_ops_core::config::{AuthConfig, ServerConfig};
use traffic_ops_store::InMemoryDatastore;

fn app() -> Router {
    let server = ApiServer::new(
        ServerConfig::default(),
        AuthConfig::default()
            .with_user("admin", "twelve")
            .with_api_token("ops-token", "ops"),
        default_table().unwrap(),
        Arc::new(InMemoryDatastore::new()),
    );
    server.build_router()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Log in as the default admin and return the `Cookie` header value.
async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/user/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"u": "admin", "p": "twelve"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("mojolicious="));

    let body = json_body(response).await;
    assert_eq!(body["alerts"][0]["level"], "success");
    assert_eq!(body["alerts"][0]["text"], "Successfully logged in.");

    set_cookie.split(';').next().unwrap().to_string()
}

fn authed(method: &str, uri: &str, cookie: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie);
    match body {
        Some(b) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_ping_is_public() {
    let response = app()
        .oneshot(Request::builder().uri("/api/2.0/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"ping": "pong"}));
}

#[tokio::test]
async fn test_protected_route_requires_session() {
    let app = app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/2.0/cdn").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert!(body.get("response").is_none());
    assert_eq!(body["alerts"][0]["level"], "error");

    let cookie = login(&app).await;
    let response = app
        .oneshot(authed("GET", "/api/2.0/cdn", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["response"], json!([]));
    assert_eq!(body["alerts"][0]["text"], "0 rows returned");
}

#[tokio::test]
async fn test_bearer_token_is_accepted() {
    let app = app();
    let cookie = login(&app).await;
    let token = cookie.trim_start_matches("mojolicious=");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/2.0/status")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bad_credentials_are_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/login")
                .body(Body::from(json!({"username": "admin", "password": "nope"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = json_body(response).await;
    assert_eq!(body["alerts"][0]["level"], "error");
}

#[tokio::test]
async fn test_token_login_issues_a_session() {
    let app = app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/user/login/token")
                .body(Body::from(json!({"t": "ops-token"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let body = json_body(response).await;
    assert_eq!(body["alerts"][0]["text"], "Successfully logged in.");

    let response = app
        .oneshot(authed("GET", "/api/2.0/asn", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/user/login/token")
                .body(Body::from(json!({"t": "admin"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let body = json_body(response).await;
    assert_eq!(body["alerts"][0]["level"], "error");
}

#[tokio::test]
async fn test_default_auth_config_admits_nobody() {
    let app = ApiServer::new(
        ServerConfig::default(),
        AuthConfig::default(),
        default_table().unwrap(),
        Arc::new(InMemoryDatastore::new()),
    )
    .build_router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/user/login")
                .body(Body::from(json!({"u": "admin", "p": "twelve"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_the_session() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(authed("POST", "/api/2.0/user/logout", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed("GET", "/api/2.0/cdn", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_options_lists_registered_methods() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/2.0/asn/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "GET,PUT,DELETE");
    assert_eq!(
        headers["access-control-allow-headers"],
        "Origin, Authorization, X-Requested-With, Content-Type"
    );
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/2.0/no_such_resource")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["alerts"][0]["level"], "error");
}

#[tokio::test]
async fn test_unregistered_method_is_not_allowed() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .oneshot(authed("PATCH", "/api/2.0/cdn", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET,POST");
}

#[tokio::test]
async fn test_unregistered_api_method_is_not_found() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .oneshot(authed("DELETE", "/api/2.0/cdn", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body.get("response").is_none());
    assert_eq!(body["alerts"][0]["level"], "error");
}

#[tokio::test]
async fn test_crud_round_through_the_router() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/2.0/asn",
            &cookie,
            Some(json!({"asn": 64512, "cachegroup": "edge-east"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["response"]["id"], 1);
    assert_eq!(body["alerts"][0]["text"], "1 rows affected");

    let response = app
        .clone()
        .oneshot(authed(
            "PUT",
            "/api/2.0/asn/1",
            &cookie,
            Some(json!({"asn": 64513, "cachegroup": "edge-west"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/2.0/asn/1", &cookie, None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["response"][0]["asn"], 64513);
    assert_eq!(body["alerts"][0]["text"], "1 rows returned");

    let response = app
        .clone()
        .oneshot(authed("DELETE", "/api/2.0/asn/1", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(authed("GET", "/api/2.0/asn/1", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_key_is_a_bad_request() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .oneshot(authed("GET", "/api/2.0/status/online", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["alerts"][0]["text"], "key is not an int64: online");
}

#[tokio::test]
async fn test_malformed_body_names_the_resource() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/2.0/cachegroup")
                .header(header::COOKIE, cookie)
                .body(Body::from("{\"name\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body.get("response").is_none());
    assert!(body["alerts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("malformed cachegroup body"));
}

#[tokio::test]
async fn test_validation_failure_is_a_bad_request() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .oneshot(authed(
            "POST",
            "/api/2.0/cdn",
            &cookie,
            Some(json!({"name": "bad name", "domainName": "example.com"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_association_routes_use_both_keys() {
    let app = app();
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/2.0/deliveryservice_server",
            &cookie,
            Some(json!({"deliveryservice": "demo1", "server": "edge01"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(authed("GET", "/api/2.0/deliveryservice_server/demo1/edge01", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["response"][0]["server"], "edge01");

    let response = app
        .oneshot(authed("DELETE", "/api/2.0/deliveryservice_server/demo1/edge01", &cookie, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
