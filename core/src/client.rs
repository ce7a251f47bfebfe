//! Outline management API client.
//!
//! # Design
//! `OutlineClient` holds the resolved API root (base URL plus the secret
//! path segment), a [`Doer`] and a [`Logger`]. Every handler follows the same
//! shape: build an `HttpRequest`, log it, dispatch it, wrap transport errors
//! in `DoError`, then map the status code. Which status means what is known
//! only here; the transport never classifies.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::config::TransportConfig;
use crate::context::Context;
use crate::decode::{decode_json, decode_json_as, short_type_name};
use crate::error::{ClientError, DoError, Error, Operation, ParseUrlError};
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::logger::{Logger, TracingLogger};
use crate::path::{format_duration, mask_secret_path};
use crate::transport::{Doer, HttpTransport};
use crate::types::{
    AccessKey, AccessKeyList, CreateAccessKey, ExperimentalMetrics, MetricsEnabled,
    MetricsTransfer, ServerInfo,
};

/// Configures an [`OutlineClient`] before the base URL is resolved.
pub struct ClientBuilder {
    base_url: String,
    secret: String,
    doer: Option<Arc<dyn Doer>>,
    logger: Option<Arc<dyn Logger>>,
    transport_config: TransportConfig,
}

impl ClientBuilder {
    /// Use `doer` instead of the default [`HttpTransport`].
    pub fn doer(mut self, doer: Arc<dyn Doer>) -> Self {
        self.doer = Some(doer);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Settings for the default transport. Ignored when a custom
    /// [`doer`](Self::doer) is supplied.
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// # Errors
    ///
    /// [`ParseUrlError`] if the base URL does not parse or cannot carry path
    /// segments.
    pub fn build(self) -> Result<OutlineClient, Error> {
        let mut root =
            Url::parse(&self.base_url).map_err(|e| ParseUrlError::new(&self.base_url, e))?;
        {
            let mut segments = root
                .path_segments_mut()
                .map_err(|()| ParseUrlError::without_source(&self.base_url))?;
            segments.pop_if_empty();
            if !self.secret.is_empty() {
                segments.push(&self.secret);
            }
        }

        let doer = self
            .doer
            .unwrap_or_else(|| Arc::new(HttpTransport::new(&self.transport_config)));
        let logger = self.logger.unwrap_or_else(|| Arc::new(TracingLogger));

        Ok(OutlineClient {
            secret: self.secret,
            root,
            doer,
            logger,
        })
    }
}

/// Async client for one Outline server. Cheap to clone.
#[derive(Clone)]
pub struct OutlineClient {
    secret: String,
    root: Url,
    doer: Arc<dyn Doer>,
    logger: Arc<dyn Logger>,
}

impl fmt::Debug for OutlineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineClient")
            .field("root", &mask_secret_path(self.root.as_str(), &self.secret))
            .finish_non_exhaustive()
    }
}

impl OutlineClient {
    /// Client with the default transport and logger.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::build`].
    pub fn new(base_url: &str, secret: &str) -> Result<Self, Error> {
        Self::builder(base_url, secret).build()
    }

    pub fn builder(base_url: &str, secret: &str) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.to_string(),
            secret: secret.to_string(),
            doer: None,
            logger: None,
            transport_config: TransportConfig::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Server
    // -----------------------------------------------------------------------

    pub async fn get_server_info(&self, ctx: &Context) -> Result<ServerInfo, Error> {
        let op = Operation::GetServerInfo;
        let request = self.request(HttpMethod::Get, self.endpoint(&["server"]), None);
        let response = self.dispatch(ctx, op, request).await?;
        match response.status {
            200 => Ok(decode_json(&response.body)?),
            _ => Err(unexpected(response)),
        }
    }

    /// Change the hostname embedded in access keys. DNS for a hostname must
    /// be set up separately.
    pub async fn update_server_hostname(
        &self,
        ctx: &Context,
        hostname_or_ip: &str,
    ) -> Result<(), Error> {
        let op = Operation::UpdateServerHostname;
        let body = encode(op, &serde_json::json!({ "hostname": hostname_or_ip }))?;
        let url = self.endpoint(&["server", "hostname-for-access-keys"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            204 => Ok(()),
            400 => Err(ClientError::invalid_hostname(response.status, hostname_or_ip).into()),
            500 => Err(ClientError::internal_hostname(response.status, hostname_or_ip).into()),
            _ => Err(unexpected(response)),
        }
    }

    /// Change the default port for newly created access keys.
    pub async fn update_port_new_access_keys(&self, ctx: &Context, port: u16) -> Result<(), Error> {
        let op = Operation::UpdatePortNewAccessKeys;
        let body = encode(op, &serde_json::json!({ "port": port }))?;
        let url = self.endpoint(&["server", "port-for-new-access-keys"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            204 => Ok(()),
            400 => Err(ClientError::invalid_port(response.status, port).into()),
            409 => Err(ClientError::port_already_in_use(response.status, port).into()),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn update_server_name(&self, ctx: &Context, name: &str) -> Result<(), Error> {
        let op = Operation::UpdateServerName;
        let body = encode(op, &serde_json::json!({ "name": name }))?;
        let url = self.endpoint(&["name"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            204 => Ok(()),
            400 => Err(ClientError::invalid_server_name(response.status, name).into()),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn get_metrics_enabled(&self, ctx: &Context) -> Result<MetricsEnabled, Error> {
        let op = Operation::GetMetricsEnabled;
        let request = self.request(HttpMethod::Get, self.endpoint(&["metrics", "enabled"]), None);
        let response = self.dispatch(ctx, op, request).await?;
        match response.status {
            200 => Ok(decode_json(&response.body)?),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn update_metrics_enabled(&self, ctx: &Context, enabled: bool) -> Result<(), Error> {
        let op = Operation::UpdateMetricsEnabled;
        let body = encode(op, &MetricsEnabled { metrics_enabled: enabled })?;
        let url = self.endpoint(&["metrics", "enabled"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            204 => Ok(()),
            400 => Err(ClientError::invalid_request(
                response.status,
                &String::from_utf8_lossy(&response.body),
            )
            .into()),
            _ => Err(unexpected(response)),
        }
    }

    /// Set a transfer limit applied to every access key.
    pub async fn update_key_limit_bytes(&self, ctx: &Context, bytes: u64) -> Result<(), Error> {
        let op = Operation::UpdateKeyLimitBytes;
        let body = encode(op, &serde_json::json!({ "limit": { "bytes": bytes } }))?;
        let url = self.endpoint(&["server", "access-key-data-limit"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            204 => Ok(()),
            400 => Err(ClientError::invalid_data_limit(response.status, bytes).into()),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn delete_key_limit_bytes(&self, ctx: &Context) -> Result<(), Error> {
        let op = Operation::DeleteKeyLimitBytes;
        let url = self.endpoint(&["server", "access-key-data-limit"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Delete, url, None)).await?;
        match response.status {
            204 => Ok(()),
            _ => Err(unexpected(response)),
        }
    }

    // -----------------------------------------------------------------------
    // Access keys
    // -----------------------------------------------------------------------

    /// Create an access key. `None` lets the server pick every field.
    pub async fn create_access_key(
        &self,
        ctx: &Context,
        input: Option<&CreateAccessKey>,
    ) -> Result<AccessKey, Error> {
        let op = Operation::CreateAccessKey;
        let body = input.map(|input| encode(op, input)).transpose()?;
        let url = self.endpoint(&["access-keys"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Post, url, body)).await?;
        match response.status {
            201 => Ok(decode_json(&response.body)?),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn get_access_keys(&self, ctx: &Context) -> Result<Vec<AccessKey>, Error> {
        let op = Operation::GetAccessKeys;
        let request = self.request(HttpMethod::Get, self.endpoint(&["access-keys"]), None);
        let response = self.dispatch(ctx, op, request).await?;
        match response.status {
            200 => {
                let type_name = short_type_name::<Vec<AccessKey>>();
                Ok(decode_json_as::<AccessKeyList>(&response.body, &type_name)?.access_keys)
            }
            _ => Err(unexpected(response)),
        }
    }

    pub async fn get_access_key(&self, ctx: &Context, id: &str) -> Result<AccessKey, Error> {
        let op = Operation::GetAccessKey;
        let request = self.request(HttpMethod::Get, self.endpoint(&["access-keys", id]), None);
        let response = self.dispatch(ctx, op, request).await?;
        match response.status {
            200 => Ok(decode_json(&response.body)?),
            404 => Err(ClientError::access_key_not_found(response.status, id).into()),
            _ => Err(unexpected(response)),
        }
    }

    /// Create or replace the access key with the given `id`.
    pub async fn update_access_key(
        &self,
        ctx: &Context,
        id: &str,
        input: &CreateAccessKey,
    ) -> Result<AccessKey, Error> {
        let op = Operation::UpdateAccessKey;
        let body = encode(op, input)?;
        let url = self.endpoint(&["access-keys", id]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            201 => Ok(decode_json(&response.body)?),
            404 => Err(ClientError::access_key_not_found(response.status, id).into()),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn delete_access_key(&self, ctx: &Context, id: &str) -> Result<(), Error> {
        let op = Operation::DeleteAccessKey;
        let url = self.endpoint(&["access-keys", id]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Delete, url, None)).await?;
        match response.status {
            204 => Ok(()),
            404 => Err(ClientError::access_key_not_found(response.status, id).into()),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn update_name_access_key(
        &self,
        ctx: &Context,
        id: &str,
        name: &str,
    ) -> Result<(), Error> {
        let op = Operation::UpdateNameAccessKey;
        let body = encode(op, &serde_json::json!({ "name": name }))?;
        let url = self.endpoint(&["access-keys", id, "name"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            204 => Ok(()),
            404 => Err(ClientError::access_key_not_found(response.status, id).into()),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn update_data_limit_access_key(
        &self,
        ctx: &Context,
        id: &str,
        bytes: u64,
    ) -> Result<(), Error> {
        let op = Operation::UpdateDataLimitAccessKey;
        let body = encode(op, &serde_json::json!({ "limit": { "bytes": bytes } }))?;
        let url = self.endpoint(&["access-keys", id, "data-limit"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Put, url, Some(body))).await?;
        match response.status {
            204 => Ok(()),
            400 => Err(ClientError::invalid_data_limit(response.status, bytes).into()),
            404 => Err(ClientError::access_key_not_found(response.status, id).into()),
            _ => Err(unexpected(response)),
        }
    }

    pub async fn delete_data_limit_access_key(&self, ctx: &Context, id: &str) -> Result<(), Error> {
        let op = Operation::DeleteDataLimitAccessKey;
        let url = self.endpoint(&["access-keys", id, "data-limit"]);
        let response = self.dispatch(ctx, op, self.request(HttpMethod::Delete, url, None)).await?;
        match response.status {
            204 => Ok(()),
            404 => Err(ClientError::access_key_not_found(response.status, id).into()),
            _ => Err(unexpected(response)),
        }
    }

    // -----------------------------------------------------------------------
    // Metrics
    // -----------------------------------------------------------------------

    pub async fn get_metrics_transfer(&self, ctx: &Context) -> Result<MetricsTransfer, Error> {
        let op = Operation::GetMetricsTransfer;
        let request = self.request(HttpMethod::Get, self.endpoint(&["metrics", "transfer"]), None);
        let response = self.dispatch(ctx, op, request).await?;
        match response.status {
            200 => Ok(decode_json(&response.body)?),
            _ => Err(unexpected(response)),
        }
    }

    /// Server and per-key metrics over the trailing `since` window.
    pub async fn get_experimental_metrics(
        &self,
        ctx: &Context,
        since: Duration,
    ) -> Result<ExperimentalMetrics, Error> {
        let op = Operation::GetExperimentalMetrics;
        let mut url = self.endpoint_url(&["experimental", "server", "metrics"]);
        url.query_pairs_mut().append_pair("since", &format_duration(since));
        let request = self.request(HttpMethod::Get, url.into(), None);
        let response = self.dispatch(ctx, op, request).await?;
        match response.status {
            200 => Ok(decode_json(&response.body)?),
            _ => Err(unexpected(response)),
        }
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn endpoint_url(&self, segments: &[&str]) -> Url {
        let mut url = self.root.clone();
        // `build` already proved the root can carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        self.endpoint_url(segments).into()
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<Vec<u8>>) -> HttpRequest {
        HttpRequest {
            method,
            url,
            headers: Headers::json(),
            body,
        }
    }

    async fn dispatch(
        &self,
        ctx: &Context,
        op: Operation,
        request: HttpRequest,
    ) -> Result<HttpResponse, Error> {
        self.log_request(ctx, op, &request);
        self.doer
            .execute(ctx, &request)
            .await
            .map_err(|err| DoError::new(op, err).into())
    }

    /// Info gets the URL with the secret masked; debug gets it verbatim.
    fn log_request(&self, ctx: &Context, op: Operation, request: &HttpRequest) {
        let masked = mask_secret_path(&request.url, &self.secret);
        self.logger.info(
            ctx,
            format_args!(
                "{op}: sending request: method={} url={masked} headers={}",
                request.method, request.headers
            ),
        );
        self.logger.debug(
            ctx,
            format_args!(
                "{op}: sending request: method={} url={} headers={}",
                request.method, request.url, request.headers
            ),
        );
    }
}

fn encode<T: Serialize>(op: Operation, value: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value).map_err(|err| DoError::new(op, err).into())
}

fn unexpected(response: HttpResponse) -> Error {
    ClientError::unexpected_status_code(response.status, response.body).into()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::{BoxFuture, TransportError};

    /// Answers every request with one canned outcome and records requests.
    struct FakeDoer {
        status: u16,
        body: Vec<u8>,
        fail: bool,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl FakeDoer {
        fn responding(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: body.as_bytes().to_vec(),
                fail: false,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                status: 0,
                body: Vec::new(),
                fail: true,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Doer for FakeDoer {
        fn execute<'a>(
            &'a self,
            _ctx: &'a Context,
            request: &'a HttpRequest,
        ) -> BoxFuture<'a, Result<HttpResponse, TransportError>> {
            self.seen.lock().unwrap().push(request.clone());
            let outcome = if self.fail {
                Err(TransportError::Io(std::io::Error::other("network error")))
            } else {
                Ok(HttpResponse {
                    status: self.status,
                    headers: Headers::new(),
                    body: self.body.clone(),
                })
            };
            Box::pin(async move { outcome })
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        info: Mutex<Vec<String>>,
        debug: Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn debug(&self, _ctx: &Context, message: fmt::Arguments<'_>) {
            self.debug.lock().unwrap().push(message.to_string());
        }

        fn info(&self, _ctx: &Context, message: fmt::Arguments<'_>) {
            self.info.lock().unwrap().push(message.to_string());
        }
    }

    fn client(doer: Arc<FakeDoer>) -> OutlineClient {
        OutlineClient::builder("https://localhost:8081/api/", "test-secret")
            .doer(doer)
            .build()
            .unwrap()
    }

    fn body_json(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_deref().unwrap()).unwrap()
    }

    const SERVER_JSON: &str = r#"{"name":"Test Server","serverId":"server-123","metricsEnabled":true,"createdTimestampMs":1234567890,"version":"1.0.0","portForNewAccessKeys":8000,"hostnameForAccessKeys":"example.com"}"#;

    const KEY_JSON: &str = r#"{"id":"7","name":"k","password":"p","port":8388,"method":"aes-192-gcm","accessUrl":"ss://x"}"#;

    #[tokio::test]
    async fn get_server_info_success() {
        let doer = FakeDoer::responding(200, SERVER_JSON);
        let info = client(doer.clone()).get_server_info(&Context::background()).await.unwrap();
        assert_eq!(info.name, "Test Server");
        assert_eq!(info.port_for_new_access_keys, 8000);

        let req = doer.last();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://localhost:8081/api/test-secret/server");
        assert_eq!(req.headers, Headers::json());
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn transport_failure_becomes_do_error() {
        let err = client(FakeDoer::failing())
            .get_server_info(&Context::background())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::ClientOutline));
        assert!(err.is(ErrorKind::DoOperation));
        assert_eq!(err.as_do_error().map(DoError::operation), Some(Operation::GetServerInfo));
        assert!(matches!(err.find_cause::<TransportError>(), Some(TransportError::Io(_))));
        assert_eq!(
            err.to_string(),
            "outline client error: do operation error; operation: get server info; reason: network error."
        );
    }

    #[tokio::test]
    async fn invalid_json_becomes_unmarshal_error() {
        let err = client(FakeDoer::responding(200, "invalid json"))
            .get_server_info(&Context::background())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::UnmarshalFailed));
        assert_eq!(err.as_unmarshal_error().map(|e| e.type_name()), Some("ServerInfo"));
    }

    #[tokio::test]
    async fn empty_success_body_becomes_empty_body_error() {
        let err = client(FakeDoer::responding(200, ""))
            .get_metrics_enabled(&Context::background())
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::UnmarshalEmptyBody));
    }

    #[tokio::test]
    async fn update_server_hostname_maps_statuses() {
        let ctx = Context::background();

        let doer = FakeDoer::responding(204, "");
        client(doer.clone()).update_server_hostname(&ctx, "new-hostname.com").await.unwrap();
        let req = doer.last();
        assert_eq!(req.method, HttpMethod::Put);
        assert!(req.url.ends_with("/test-secret/server/hostname-for-access-keys"));
        assert_eq!(body_json(&req), serde_json::json!({"hostname": "new-hostname.com"}));

        let err = client(FakeDoer::responding(400, "Invalid hostname"))
            .update_server_hostname(&ctx, "invalid@hostname")
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidHostname));
        assert_eq!(err.as_client_error().map(ClientError::status_code), Some(400));

        let err = client(FakeDoer::responding(500, "Server error"))
            .update_server_hostname(&ctx, "valid-hostname.com")
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InternalHostname));

        let err = client(FakeDoer::responding(418, "teapot"))
            .update_server_hostname(&ctx, "valid-hostname.com")
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::UnexpectedStatusCode));
        assert_eq!(err.as_client_error().map(ClientError::data), Some(b"teapot".as_slice()));
    }

    #[tokio::test]
    async fn update_port_maps_statuses() {
        let ctx = Context::background();
        let doer = FakeDoer::responding(204, "");
        client(doer.clone()).update_port_new_access_keys(&ctx, 8388).await.unwrap();
        assert_eq!(body_json(&doer.last()), serde_json::json!({"port": 8388}));

        let err = client(FakeDoer::responding(400, ""))
            .update_port_new_access_keys(&ctx, 0)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidPort));

        let err = client(FakeDoer::responding(409, ""))
            .update_port_new_access_keys(&ctx, 22)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::PortAlreadyInUse));
        assert_eq!(
            err.to_string(),
            "outline client error: (port: 22); status code: 409; reason: requested port was already in use by another service."
        );
    }

    #[tokio::test]
    async fn metrics_enabled_round() {
        let ctx = Context::background();
        let enabled = client(FakeDoer::responding(200, r#"{"metricsEnabled":true}"#))
            .get_metrics_enabled(&ctx)
            .await
            .unwrap();
        assert!(enabled.metrics_enabled);

        let doer = FakeDoer::responding(204, "");
        client(doer.clone()).update_metrics_enabled(&ctx, false).await.unwrap();
        assert_eq!(body_json(&doer.last()), serde_json::json!({"metricsEnabled": false}));

        let err = client(FakeDoer::responding(400, "bad body"))
            .update_metrics_enabled(&ctx, true)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidRequest));
        assert!(err.to_string().contains("(response body: bad body)"));
    }

    #[tokio::test]
    async fn server_data_limit() {
        let ctx = Context::background();
        let doer = FakeDoer::responding(204, "");
        client(doer.clone()).update_key_limit_bytes(&ctx, 10_000).await.unwrap();
        let req = doer.last();
        assert!(req.url.ends_with("/server/access-key-data-limit"));
        assert_eq!(body_json(&req), serde_json::json!({"limit": {"bytes": 10000}}));

        let err = client(FakeDoer::responding(400, ""))
            .update_key_limit_bytes(&ctx, 1)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidDataLimit));

        let doer = FakeDoer::responding(204, "");
        client(doer.clone()).delete_key_limit_bytes(&ctx).await.unwrap();
        assert_eq!(doer.last().method, HttpMethod::Delete);
    }

    #[tokio::test]
    async fn create_access_key_without_input_sends_no_body() {
        let doer = FakeDoer::responding(201, KEY_JSON);
        let key = client(doer.clone())
            .create_access_key(&Context::background(), None)
            .await
            .unwrap();
        assert_eq!(key.id, "7");
        let req = doer.last();
        assert_eq!(req.method, HttpMethod::Post);
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn create_access_key_with_input_and_wrong_status() {
        let input = CreateAccessKey {
            method: "aes-192-gcm".to_string(),
            port: Some(8388),
            ..Default::default()
        };
        let doer = FakeDoer::responding(200, KEY_JSON);
        let err = client(doer.clone())
            .create_access_key(&Context::background(), Some(&input))
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::UnexpectedStatusCode));
        assert_eq!(
            body_json(&doer.last()),
            serde_json::json!({"method": "aes-192-gcm", "port": 8388})
        );
    }

    #[tokio::test]
    async fn get_access_keys_unwraps_list() {
        let body = format!(r#"{{"accessKeys":[{KEY_JSON}]}}"#);
        let keys = client(FakeDoer::responding(200, &body))
            .get_access_keys(&Context::background())
            .await
            .unwrap();
        assert_eq!(keys.len(), 1);

        let err = client(FakeDoer::responding(200, "[]"))
            .get_access_keys(&Context::background())
            .await
            .unwrap_err();
        assert_eq!(err.as_unmarshal_error().map(|e| e.type_name()), Some("Vec<AccessKey>"));
    }

    #[tokio::test]
    async fn access_key_not_found_is_classified_everywhere() {
        let ctx = Context::background();
        let c = client(FakeDoer::responding(404, "Not Found"));
        let input = CreateAccessKey::default();
        let errors = vec![
            c.get_access_key(&ctx, "42").await.unwrap_err(),
            c.update_access_key(&ctx, "42", &input).await.unwrap_err(),
            c.delete_access_key(&ctx, "42").await.unwrap_err(),
            c.update_name_access_key(&ctx, "42", "n").await.unwrap_err(),
            c.update_data_limit_access_key(&ctx, "42", 1).await.unwrap_err(),
            c.delete_data_limit_access_key(&ctx, "42").await.unwrap_err(),
        ];
        for err in errors {
            assert!(err.is(ErrorKind::AccessKeyNotFound), "{err}");
            assert!(err.to_string().contains("(access key id: 42)"));
        }
    }

    #[tokio::test]
    async fn access_key_paths_encode_ids() {
        let doer = FakeDoer::responding(204, "");
        client(doer.clone())
            .update_name_access_key(&Context::background(), "a/b", "Laptop")
            .await
            .unwrap();
        let req = doer.last();
        assert_eq!(
            req.url,
            "https://localhost:8081/api/test-secret/access-keys/a%2Fb/name"
        );
        assert_eq!(body_json(&req), serde_json::json!({"name": "Laptop"}));
    }

    #[tokio::test]
    async fn update_data_limit_access_key_rejects_limit() {
        let err = client(FakeDoer::responding(400, ""))
            .update_data_limit_access_key(&Context::background(), "1", 5)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::InvalidDataLimit));
        assert!(!err.is(ErrorKind::AccessKeyNotFound));
    }

    #[tokio::test]
    async fn experimental_metrics_sends_since_query() {
        let body = r#"{"server":{"locations":[]},"accessKeys":[]}"#;
        let doer = FakeDoer::responding(200, body);
        let metrics = client(doer.clone())
            .get_experimental_metrics(&Context::background(), Duration::from_secs(2 * 3600))
            .await
            .unwrap();
        assert!(metrics.access_keys.is_empty());
        assert_eq!(
            doer.last().url,
            "https://localhost:8081/api/test-secret/experimental/server/metrics?since=2h"
        );
    }

    #[tokio::test]
    async fn metrics_transfer_decodes_map() {
        let transfer = client(FakeDoer::responding(200, r#"{"bytesTransferredByUserId":{"1":1024}}"#))
            .get_metrics_transfer(&Context::background())
            .await
            .unwrap();
        assert_eq!(transfer.bytes_transferred_by_user_id.get("1"), Some(&1024));
    }

    #[tokio::test]
    async fn requests_are_logged_with_masked_secret_at_info() {
        let logger = Arc::new(RecordingLogger::default());
        let c = OutlineClient::builder("https://localhost:8081/", "test-secret")
            .doer(FakeDoer::responding(200, SERVER_JSON))
            .logger(logger.clone())
            .build()
            .unwrap();
        c.get_server_info(&Context::background()).await.unwrap();

        let info = logger.info.lock().unwrap();
        let debug = logger.debug.lock().unwrap();
        assert_eq!(
            info[0],
            "get server info: sending request: method=GET url=https://localhost:8081/*****/server headers={Content-Type: application/json, Accept: application/json}"
        );
        assert!(debug[0].contains("url=https://localhost:8081/test-secret/server"));
    }

    #[test]
    fn malformed_base_url_is_parse_url_error() {
        let err = OutlineClient::new("", "secret").unwrap_err();
        assert!(err.is(ErrorKind::InvalidBaseUrl));
        assert!(err.find_cause::<url::ParseError>().is_some());
        assert!(err.to_string().starts_with("outline client error: invalid baseURL; baseUrl is empty; reason: "));

        let err = OutlineClient::new("mailto:admin@example.com", "secret").unwrap_err();
        assert!(err.is(ErrorKind::InvalidBaseUrl));
        assert_eq!(
            err.to_string(),
            "outline client error: invalid baseURL; (base url: mailto:admin@example.com); reason: invalid baseURL."
        );
    }

    #[test]
    fn debug_output_hides_secret() {
        let c = client(FakeDoer::responding(200, ""));
        let rendered = format!("{c:?}");
        assert!(!rendered.contains("test-secret"));
        assert!(rendered.contains("*****"));
    }
}
