//! In-memory stand-in for the Outline server management API.
//!
//! Every route lives under `/{secret}`, like a real server's API URL. The
//! DTOs here are defined independently from the client crate so integration
//! tests catch schema drift.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_METHOD: &str = "chacha20-ietf-poly1305";

/// Port the mock pretends its own API listens on; asking to hand it out to
/// access keys yields 409.
pub const API_PORT: u16 = 8081;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub server_id: String,
    pub metrics_enabled: bool,
    pub created_timestamp_ms: i64,
    pub version: String,
    pub port_for_new_access_keys: u16,
    pub hostname_for_access_keys: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_data_limit: Option<Limit>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Limit {
    pub bytes: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub id: String,
    pub name: String,
    pub password: String,
    pub port: u16,
    pub method: String,
    pub access_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_limit: Option<Limit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateAccessKey {
    pub method: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
    pub limit: Option<Limit>,
}

#[derive(Debug)]
pub struct Server {
    pub info: ServerInfo,
    pub keys: BTreeMap<String, AccessKey>,
    next_id: u64,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            info: ServerInfo {
                name: "Outline Server".to_string(),
                server_id: Uuid::new_v4().to_string(),
                metrics_enabled: false,
                created_timestamp_ms: 1_536_613_192_052,
                version: "1.0.0".to_string(),
                port_for_new_access_keys: 8388,
                hostname_for_access_keys: "127.0.0.1".to_string(),
                access_key_data_limit: None,
            },
            keys: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl Server {
    fn build_key(&self, id: String, input: CreateAccessKey) -> AccessKey {
        let method = input.method.unwrap_or_else(|| DEFAULT_METHOD.to_string());
        let password = input.password.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let port = input.port.unwrap_or(self.info.port_for_new_access_keys);
        let access_url = format!(
            "ss://{method}:{password}@{}:{port}/?outline=1",
            self.info.hostname_for_access_keys
        );
        AccessKey {
            id,
            name: input.name.unwrap_or_default(),
            password,
            port,
            method,
            access_url,
            data_limit: input.limit,
        }
    }
}

pub type Db = Arc<RwLock<Server>>;

pub fn app(secret: &str) -> Router {
    let db: Db = Arc::new(RwLock::new(Server::default()));
    let api = Router::new()
        .route("/server", get(get_server))
        .route("/server/hostname-for-access-keys", put(put_hostname))
        .route("/server/port-for-new-access-keys", put(put_port))
        .route(
            "/server/access-key-data-limit",
            put(put_server_limit).delete(delete_server_limit),
        )
        .route("/name", put(put_name))
        .route("/metrics/enabled", get(get_metrics_enabled).put(put_metrics_enabled))
        .route("/metrics/transfer", get(get_metrics_transfer))
        .route("/experimental/server/metrics", get(get_experimental_metrics))
        .route("/access-keys", get(list_keys).post(create_key))
        .route("/access-keys/{id}", get(get_key).put(put_key).delete(delete_key))
        .route("/access-keys/{id}/name", put(put_key_name))
        .route(
            "/access-keys/{id}/data-limit",
            put(put_key_limit).delete(delete_key_limit),
        )
        .with_state(db);
    Router::new().nest(&format!("/{secret}"), api)
}

pub async fn run(listener: TcpListener, secret: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(secret)).await
}

/// Parse a JSON body, treating malformed input as 400 like the real server.
fn parse<T: for<'de> Deserialize<'de>>(body: &Bytes) -> Result<T, StatusCode> {
    serde_json::from_slice(body).map_err(|_| StatusCode::BAD_REQUEST)
}

fn valid_hostname(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
}

fn limit_from(body: &Bytes) -> Result<Limit, StatusCode> {
    #[derive(Deserialize)]
    struct LimitBody {
        limit: Limit,
    }
    parse::<LimitBody>(body).map(|b| b.limit)
}

// --- server ---

async fn get_server(State(db): State<Db>) -> Json<ServerInfo> {
    Json(db.read().await.info.clone())
}

async fn put_hostname(State(db): State<Db>, body: Bytes) -> StatusCode {
    #[derive(Deserialize)]
    struct HostnameBody {
        hostname: String,
    }
    match parse::<HostnameBody>(&body) {
        Ok(b) if valid_hostname(&b.hostname) => {
            db.write().await.info.hostname_for_access_keys = b.hostname;
            StatusCode::NO_CONTENT
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

async fn put_port(State(db): State<Db>, body: Bytes) -> StatusCode {
    let port = parse::<Value>(&body)
        .ok()
        .and_then(|v| v.get("port").and_then(Value::as_u64));
    match port {
        Some(p) if p == u64::from(API_PORT) => StatusCode::CONFLICT,
        Some(p @ 1..=65535) => {
            db.write().await.info.port_for_new_access_keys = p as u16;
            StatusCode::NO_CONTENT
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

async fn put_server_limit(State(db): State<Db>, body: Bytes) -> StatusCode {
    match limit_from(&body) {
        Ok(limit) => {
            db.write().await.info.access_key_data_limit = Some(limit);
            StatusCode::NO_CONTENT
        }
        Err(status) => status,
    }
}

async fn delete_server_limit(State(db): State<Db>) -> StatusCode {
    db.write().await.info.access_key_data_limit = None;
    StatusCode::NO_CONTENT
}

async fn put_name(State(db): State<Db>, body: Bytes) -> StatusCode {
    #[derive(Deserialize)]
    struct NameBody {
        name: String,
    }
    match parse::<NameBody>(&body) {
        Ok(b) if !b.name.trim().is_empty() => {
            db.write().await.info.name = b.name;
            StatusCode::NO_CONTENT
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

// --- metrics ---

async fn get_metrics_enabled(State(db): State<Db>) -> Json<Value> {
    Json(json!({ "metricsEnabled": db.read().await.info.metrics_enabled }))
}

async fn put_metrics_enabled(State(db): State<Db>, body: Bytes) -> StatusCode {
    let enabled = parse::<Value>(&body)
        .ok()
        .and_then(|v| v.get("metricsEnabled").and_then(Value::as_bool));
    match enabled {
        Some(enabled) => {
            db.write().await.info.metrics_enabled = enabled;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::BAD_REQUEST,
    }
}

async fn get_metrics_transfer(State(db): State<Db>) -> Json<Value> {
    let server = db.read().await;
    let by_id: BTreeMap<&str, u64> = server.keys.keys().map(|id| (id.as_str(), 0)).collect();
    Json(json!({ "bytesTransferredByUserId": by_id }))
}

async fn get_experimental_metrics(
    State(db): State<Db>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    if !params.contains_key("since") {
        return Err(StatusCode::BAD_REQUEST);
    }
    let server = db.read().await;
    let keys: Vec<Value> = server
        .keys
        .keys()
        .filter_map(|id| id.parse::<i64>().ok())
        .map(|id| {
            json!({
                "accessKeyId": id,
                "tunnelTime": { "seconds": 0.0 },
                "dataTransferred": { "bytes": 0.0 },
                "connection": {
                    "lastTrafficSeen": 0,
                    "peakDeviceCount": { "data": 0, "timestamp": 0 }
                }
            })
        })
        .collect();
    Ok(Json(json!({
        "server": {
            "locations": [{
                "location": "DE",
                "asn": null,
                "asOrg": null,
                "dataTransferred": { "bytes": 0.0 },
                "tunnelTime": { "seconds": 0.0 }
            }]
        },
        "accessKeys": keys,
    })))
}

// --- access keys ---

async fn list_keys(State(db): State<Db>) -> Json<Value> {
    let server = db.read().await;
    let keys: Vec<&AccessKey> = server.keys.values().collect();
    Json(json!({ "accessKeys": keys }))
}

async fn create_key(
    State(db): State<Db>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccessKey>), StatusCode> {
    let input = if body.is_empty() {
        CreateAccessKey::default()
    } else {
        parse(&body)?
    };
    let mut server = db.write().await;
    let id = server.next_id.to_string();
    server.next_id += 1;
    let key = server.build_key(id.clone(), input);
    server.keys.insert(id, key.clone());
    Ok((StatusCode::CREATED, Json(key)))
}

async fn get_key(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<AccessKey>, StatusCode> {
    let server = db.read().await;
    server.keys.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn put_key(
    State(db): State<Db>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<AccessKey>), StatusCode> {
    let input = if body.is_empty() {
        CreateAccessKey::default()
    } else {
        parse(&body)?
    };
    let mut server = db.write().await;
    let key = server.build_key(id.clone(), input);
    server.keys.insert(id, key.clone());
    Ok((StatusCode::CREATED, Json(key)))
}

async fn delete_key(State(db): State<Db>, Path(id): Path<String>) -> StatusCode {
    match db.write().await.keys.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn put_key_name(State(db): State<Db>, Path(id): Path<String>, body: Bytes) -> StatusCode {
    #[derive(Deserialize)]
    struct NameBody {
        name: String,
    }
    let mut server = db.write().await;
    let Some(key) = server.keys.get_mut(&id) else {
        return StatusCode::NOT_FOUND;
    };
    match parse::<NameBody>(&body) {
        Ok(b) => {
            key.name = b.name;
            StatusCode::NO_CONTENT
        }
        Err(status) => status,
    }
}

async fn put_key_limit(State(db): State<Db>, Path(id): Path<String>, body: Bytes) -> StatusCode {
    let mut server = db.write().await;
    let Some(key) = server.keys.get_mut(&id) else {
        return StatusCode::NOT_FOUND;
    };
    match limit_from(&body) {
        Ok(limit) => {
            key.data_limit = Some(limit);
            StatusCode::NO_CONTENT
        }
        Err(status) => status,
    }
}

async fn delete_key_limit(State(db): State<Db>, Path(id): Path<String>) -> StatusCode {
    match db.write().await.keys.get_mut(&id) {
        Some(key) => {
            key.data_limit = None;
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}
