//! Tunables for [`HttpTransport`](crate::transport::HttpTransport).

use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "outline-rust-client/1.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub user_agent: String,
    pub max_conns_per_host: usize,
    pub max_idle_conn_duration: Duration,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    /// Upper bound for a whole exchange, connect to last body byte.
    pub max_conn_duration: Duration,
    /// Initial capacity of pooled request/response buffers.
    pub buffer_size: usize,
    pub max_idle_buffers: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_conns_per_host: 256,
            max_idle_conn_duration: Duration::from_secs(30),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(5),
            max_conn_duration: Duration::from_secs(60),
            buffer_size: 4096,
            max_idle_buffers: 64,
        }
    }
}
