//! Async client for the Outline VPN server management API.
//!
//! # Overview
//! `OutlineClient` turns each management operation into one HTTP exchange,
//! dispatched through a [`Doer`] under a cancellable [`Context`], and maps the
//! outcome onto a closed error taxonomy.
//!
//! # Design
//! - `transport` runs the blocking `ureq` exchange on the tokio blocking pool
//!   with pooled body buffers; cancellation returns early without ever
//!   releasing buffers the exchange still uses.
//! - `error` defines the sentinel `ErrorKind`s and the four wrapper errors.
//!   Every error matches `ErrorKind::ClientOutline` plus a specific kind.
//! - The transport returns raw errors; handlers in `client` classify them.
//! - `decode` is the only place response bodies are decoded.

pub mod client;
pub mod config;
pub mod context;
pub mod decode;
pub mod error;
pub mod http;
pub mod logger;
pub mod path;
pub mod pool;
pub mod transport;
pub mod types;

pub use client::{ClientBuilder, OutlineClient};
pub use config::TransportConfig;
pub use context::{Context, ContextError};
pub use error::{
    is_kind, ClientError, DoError, Error, ErrorKind, Operation, ParseUrlError, UnmarshalError,
};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use logger::{Logger, NoopLogger, TracingLogger};
pub use transport::{BoxFuture, Doer, HttpTransport, TransportError};
pub use types::{
    AccessKey, CreateAccessKey, DataLimit, ExperimentalMetrics, MetricsEnabled, MetricsTransfer,
    ServerInfo,
};
