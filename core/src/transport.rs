//! One request/response exchange per call, under a cancellable [`Context`].
//!
//! # Design
//! `ureq` is blocking and has no cancellation hook, so `HttpTransport` runs
//! each exchange on the tokio blocking pool and waits on either the task's
//! single-slot completion channel or `ctx.done()`, whichever fires first.
//!
//! Pooled buffers belong to the blocking task. The request buffer is filled
//! and moved into the task before anything can return early; the response
//! buffer is acquired inside it. The task copies the body out into a fresh
//! `Vec<u8>`, drops both guards, and only then reports. If the caller gave up
//! on cancellation, the task still finishes on its own and releases the
//! buffers itself; the dispatcher never holds a reference into pool memory.
//!
//! Errors come back unclassified. Handlers wrap them in
//! [`DoError`](crate::error::DoError).

use std::fmt;
use std::future::Future;
use std::io::Read;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::debug;

use crate::config::TransportConfig;
use crate::context::{Context, ContextError};
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::pool::{BufferPool, PooledBuffer};

/// Boxed future returned by dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw dispatch failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The context was cancelled or timed out before the exchange completed.
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Http(#[from] ureq::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("exchange task ended without reporting a result")]
    TaskAborted,
}

/// Executes one HTTP exchange.
pub trait Doer: Send + Sync {
    /// # Errors
    ///
    /// Returns the context's error if it is done first, otherwise the
    /// transport failure as is.
    fn execute<'a>(
        &'a self,
        ctx: &'a Context,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>>;
}

/// `ureq`-backed [`Doer`] with pooled body buffers.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    pool: Arc<BufferPool>,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").field("pool", &self.pool).finish_non_exhaustive()
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(config.user_agent.as_str())
            .max_idle_connections_per_host(config.max_conns_per_host)
            .max_idle_age(config.max_idle_conn_duration)
            .timeout_send_body(Some(config.write_timeout))
            .timeout_recv_response(Some(config.read_timeout))
            .timeout_recv_body(Some(config.read_timeout))
            .timeout_global(Some(config.max_conn_duration))
            .build()
            .new_agent();
        Self {
            agent,
            pool: BufferPool::new(config.buffer_size, config.max_idle_buffers),
        }
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }
}

impl Doer for HttpTransport {
    fn execute<'a>(
        &'a self,
        ctx: &'a Context,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            if let Some(err) = ctx.err() {
                debug!(method = %request.method, error = %err, "context done before dispatch");
                return Err(err.into());
            }
            if request.url.is_empty() {
                return Err(TransportError::InvalidRequest("empty url".to_string()));
            }

            let call = Call::prepare(&self.pool, request);
            let agent = self.agent.clone();
            let pool = Arc::clone(&self.pool);
            let (tx, rx) = oneshot::channel();
            let started = Instant::now();

            tokio::task::spawn_blocking(move || {
                let outcome = exchange(&agent, &pool, call);
                // Both buffers are back in the pool at this point.
                debug!(idle = pool.idle_count(), "exchange buffers released");
                let _ = tx.send(outcome);
            });

            tokio::select! {
                outcome = rx => {
                    let outcome = outcome.unwrap_or_else(|_| Err(TransportError::TaskAborted));
                    match &outcome {
                        Ok(response) => debug!(
                            method = %request.method,
                            status = response.status,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "exchange completed"
                        ),
                        Err(err) => debug!(method = %request.method, error = %err, "exchange failed"),
                    }
                    outcome
                }
                err = ctx.done() => {
                    debug!(
                        method = %request.method,
                        error = %err,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "context done while exchange in flight"
                    );
                    Err(err.into())
                }
            }
        })
    }
}

/// Everything the blocking task needs, owned.
struct Call {
    method: HttpMethod,
    url: String,
    headers: Headers,
    body: Option<PooledBuffer>,
}

impl Call {
    fn prepare(pool: &Arc<BufferPool>, request: &HttpRequest) -> Self {
        let body = request.body.as_deref().map(|bytes| {
            let mut buf = pool.acquire();
            buf.extend_from_slice(bytes);
            buf
        });
        Self {
            method: request.method,
            url: request.url.clone(),
            headers: request.headers.clone(),
            body,
        }
    }
}

fn exchange(
    agent: &ureq::Agent,
    pool: &Arc<BufferPool>,
    call: Call,
) -> Result<HttpResponse, TransportError> {
    let mut builder = ureq::http::Request::builder()
        .method(call.method.as_str())
        .uri(call.url.as_str());
    for (name, value) in call.headers.iter() {
        builder = builder.header(name, value);
    }

    let invalid = |e: ureq::http::Error| TransportError::InvalidRequest(e.to_string());
    let mut response = match &call.body {
        Some(body) => agent.run(builder.body(body.as_slice()).map_err(invalid)?)?,
        None => agent.run(builder.body(()).map_err(invalid)?)?,
    };
    drop(call);

    let mut headers = Headers::new();
    for (name, value) in response.headers() {
        headers.insert(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    let mut buf = pool.acquire();
    response.body_mut().as_reader().read_to_end(&mut buf)?;
    // The pool hands this memory to the next caller once `buf` drops.
    let body = buf.to_vec();
    drop(buf);

    Ok(HttpResponse {
        status: response.status().as_u16(),
        headers,
        body,
    })
}
