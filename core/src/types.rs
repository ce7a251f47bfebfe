//! Outline management API payloads.
//!
//! Field names follow the server's camelCase JSON. Request-only types skip
//! unset optional fields so the server applies its own defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const METHOD_AES_128_GCM: &str = "aes-128-gcm";
pub const METHOD_AES_256_GCM: &str = "aes-256-gcm";
pub const METHOD_CHACHA20_IETF_POLY1305: &str = "chacha20-ietf-poly1305";

/// Supported ciphers, most preferred first.
pub const VALID_ENCRYPTION_METHODS: [&str; 3] = [
    METHOD_CHACHA20_IETF_POLY1305,
    METHOD_AES_128_GCM,
    METHOD_AES_256_GCM,
];

pub fn is_valid_encryption_method(method: &str) -> bool {
    VALID_ENCRYPTION_METHODS.contains(&method)
}

/// The cipher Outline uses when none is requested.
pub fn default_encryption_method() -> &'static str {
    METHOD_CHACHA20_IETF_POLY1305
}

/// `GET /server`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub server_id: String,
    pub metrics_enabled: bool,
    pub created_timestamp_ms: i64,
    pub version: String,
    pub port_for_new_access_keys: u16,
    #[serde(default)]
    pub hostname_for_access_keys: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_data_limit: Option<DataLimit>,
}

/// A transfer limit in bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataLimit {
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub id: String,
    pub name: String,
    pub password: String,
    pub port: u16,
    pub method: String,
    pub access_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_limit: Option<DataLimit>,
}

/// Body of `POST /access-keys`. Everything but `method` is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateAccessKey {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<DataLimit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyList {
    pub access_keys: Vec<AccessKey>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsEnabled {
    pub metrics_enabled: bool,
}

/// Bytes transferred per access key id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsTransfer {
    pub bytes_transferred_by_user_id: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentalMetrics {
    pub server: ServerMetrics,
    pub access_keys: Vec<AccessKeyMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMetrics {
    pub locations: Vec<LocationMetrics>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeMetric {
    pub seconds: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DataMetric {
    pub bytes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationMetrics {
    pub location: String,
    pub asn: Option<i64>,
    pub as_org: Option<String>,
    pub data_transferred: DataMetric,
    pub tunnel_time: TimeMetric,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyMetrics {
    pub access_key_id: i64,
    pub tunnel_time: TimeMetric,
    pub data_transferred: DataMetric,
    pub connection: ConnectionMetrics,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetrics {
    pub last_traffic_seen: i64,
    pub peak_device_count: PeakDeviceCount,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeakDeviceCount {
    pub data: i64,
    pub timestamp: i64,
}
