use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, AccessKey, ServerInfo, API_PORT};
use serde_json::Value;
use tower::ServiceExt;

const SECRET: &str = "s3cr3t";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn uri(path: &str) -> String {
    format!("/{SECRET}{path}")
}

fn empty_request(method: &str, path: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri(path))
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, path: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri(path))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- routing ---

#[tokio::test]
async fn wrong_secret_is_not_found() {
    let resp = app(SECRET)
        .oneshot(Request::builder().uri("/other/server").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- server ---

#[tokio::test]
async fn get_server_returns_info() {
    let resp = app(SECRET).oneshot(empty_request("GET", "/server")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let info: ServerInfo = body_json(resp).await;
    assert_eq!(info.port_for_new_access_keys, 8388);
    assert!(!info.metrics_enabled);
}

#[tokio::test]
async fn hostname_validation_returns_400() {
    let resp = app(SECRET)
        .oneshot(json_request(
            "PUT",
            "/server/hostname-for-access-keys",
            r#"{"hostname":"bad host"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn port_statuses() {
    let cases = [
        (r#"{"port":9000}"#.to_string(), StatusCode::NO_CONTENT),
        (r#"{"port":0}"#.to_string(), StatusCode::BAD_REQUEST),
        (r#"{"port":70000}"#.to_string(), StatusCode::BAD_REQUEST),
        ("{}".to_string(), StatusCode::BAD_REQUEST),
        (format!(r#"{{"port":{API_PORT}}}"#), StatusCode::CONFLICT),
    ];
    for (body, expected) in cases {
        let resp = app(SECRET)
            .oneshot(json_request("PUT", "/server/port-for-new-access-keys", &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), expected, "{body}");
    }
}

#[tokio::test]
async fn empty_name_returns_400() {
    let resp = app(SECRET)
        .oneshot(json_request("PUT", "/name", r#"{"name":"  "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_enabled_requires_bool() {
    let resp = app(SECRET)
        .oneshot(json_request("PUT", "/metrics/enabled", r#"{"metricsEnabled":"yes"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn experimental_metrics_requires_since() {
    let resp = app(SECRET)
        .oneshot(empty_request("GET", "/experimental/server/metrics"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app(SECRET)
        .oneshot(empty_request("GET", "/experimental/server/metrics?since=1h"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert!(body["accessKeys"].as_array().unwrap().is_empty());
}

// --- access keys ---

#[tokio::test]
async fn missing_key_returns_404() {
    for (method, path) in [
        ("GET", "/access-keys/99"),
        ("DELETE", "/access-keys/99"),
        ("DELETE", "/access-keys/99/data-limit"),
    ] {
        let resp = app(SECRET).oneshot(empty_request(method, path)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{method} {path}");
    }
    let resp = app(SECRET)
        .oneshot(json_request("PUT", "/access-keys/99/name", r#"{"name":"x"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn access_key_lifecycle() {
    use tower::Service;

    let mut app = app(SECRET).into_service();

    // create with an empty body
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("POST", "/access-keys"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: AccessKey = body_json(resp).await;
    assert_eq!(created.method, mock_server::DEFAULT_METHOD);
    let id = created.id.clone();

    // set a data limit
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/access-keys/{id}/data-limit"),
            r#"{"limit":{"bytes":1000}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // list shows the limit
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/access-keys"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["accessKeys"][0]["dataLimit"]["bytes"], 1000);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/access-keys/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/access-keys/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
