//! Error taxonomy for the Outline client.
//!
//! # Design
//! Every failure surfaces as one of four wrapper types: `ClientError` (the
//! server answered with a status the handler classifies), `ParseUrlError`
//! (the base URL is unusable), `UnmarshalError` (the response body could not
//! be decoded) and `DoError` (the exchange itself failed). Each wrapper keeps
//! its context fields, a prefix message and a `Join` of causes:
//! `ErrorKind::ClientOutline`, the specific kind(s) and, where there is one,
//! the upstream error. The join is ordered, the last element being the most
//! specific cause, and only that element is rendered as the `reason` clause.
//!
//! Callers branch with `is(kind)` / [`is_kind`] and recover upstream errors
//! with [`find_cause`]; the rendered string is for logs only.

use std::error::Error as StdError;
use std::fmt;

/// Boxed upstream error stored inside a [`Join`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Closed set of sentinel failure kinds.
///
/// `ClientOutline` is the umbrella kind: every error produced by this crate
/// matches it in addition to at least one specific kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ClientOutline,
    InvalidBaseUrl,
    UnmarshalFailed,
    UnmarshalEmptyBody,
    InvalidHostname,
    InternalHostname,
    InvalidPort,
    PortAlreadyInUse,
    InvalidServerName,
    InvalidRequest,
    InvalidDataLimit,
    AccessKeyNotFound,
    UnexpectedStatusCode,
    DoOperation,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ClientOutline => "outline client error",
            ErrorKind::InvalidBaseUrl => "invalid baseURL",
            ErrorKind::UnmarshalFailed => "unmarshal failed",
            ErrorKind::UnmarshalEmptyBody => "empty body",
            ErrorKind::InvalidHostname => "invalid hostname or IP address",
            ErrorKind::InternalHostname => {
                "internal error occurred while validating hostname or IP address"
            }
            ErrorKind::InvalidPort => {
                "requested port wasn't integer from 1 through 65535, or request had no port parameter"
            }
            ErrorKind::PortAlreadyInUse => "requested port was already in use by another service",
            ErrorKind::InvalidServerName => "invalid server name",
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::InvalidDataLimit => "invalid data limit",
            ErrorKind::AccessKeyNotFound => "access key not found",
            ErrorKind::UnexpectedStatusCode => "unexpected status code",
            ErrorKind::DoOperation => "do operation error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl StdError for ErrorKind {}

/// An ordered list of causes combined into one error value.
///
/// Displays every cause on its own line. The multi-cause view is
/// [`Join::causes`].
#[derive(Debug)]
pub struct Join {
    causes: Vec<BoxError>,
}

impl Join {
    pub fn new(causes: Vec<BoxError>) -> Self {
        Self { causes }
    }

    /// Umbrella kind, then `kinds` in order, then `source` if present.
    fn of_kinds(kinds: &[ErrorKind], source: Option<BoxError>) -> Self {
        let mut causes: Vec<BoxError> = Vec::with_capacity(kinds.len() + 2);
        causes.push(Box::new(ErrorKind::ClientOutline));
        causes.extend(kinds.iter().map(|kind| Box::new(*kind) as BoxError));
        causes.extend(source);
        Self { causes }
    }

    pub fn causes(&self) -> &[BoxError] {
        &self.causes
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cause) in self.causes.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{cause}")?;
        }
        Ok(())
    }
}

impl StdError for Join {}

/// Report whether `err` is, or wraps, the sentinel `kind`.
///
/// Follows the `source()` chain and descends into every element of a
/// [`Join`].
pub fn is_kind(err: &(dyn StdError + 'static), kind: ErrorKind) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<ErrorKind>() == Some(&kind) {
            return true;
        }
        if let Some(join) = e.downcast_ref::<Join>() {
            return join.causes.iter().any(|cause| is_kind(cause.as_ref(), kind));
        }
        current = e.source();
    }
    false
}

/// Find the first error of type `E` in `err`'s cause tree.
pub fn find_cause<'a, E>(err: &'a (dyn StdError + 'static)) -> Option<&'a E>
where
    E: StdError + 'static,
{
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(found) = e.downcast_ref::<E>() {
            return Some(found);
        }
        if let Some(join) = e.downcast_ref::<Join>() {
            return join.causes.iter().find_map(|cause| find_cause::<E>(cause.as_ref()));
        }
        current = e.source();
    }
    None
}

/// Append the last joined cause as a `reason` clause and terminate with a
/// period. Only the immediate cause list is inspected; a `cause` that is not
/// a [`Join`] adds no clause.
pub(crate) fn with_last_error(message: String, cause: &(dyn StdError + 'static)) -> String {
    match cause.downcast_ref::<Join>().and_then(|join| join.causes.last()) {
        Some(last) => format!("{message}; reason: {last}."),
        None => format!("{message}."),
    }
}

fn prefixed(detail: impl fmt::Display) -> String {
    format!("{}: {detail}", ErrorKind::ClientOutline)
}

// ---------------------------------------------------------------------------
// ClientError
// ---------------------------------------------------------------------------

/// The server answered with a status the calling handler classified.
#[derive(Debug)]
pub struct ClientError {
    status_code: u16,
    data: Vec<u8>,
    message: String,
    cause: Join,
}

impl ClientError {
    fn classified(status_code: u16, detail: String, kind: ErrorKind) -> Self {
        Self {
            status_code,
            data: Vec::new(),
            message: prefixed(detail),
            cause: Join::of_kinds(&[kind], None),
        }
    }

    pub fn invalid_hostname(status_code: u16, hostname_or_ip: &str) -> Self {
        Self::classified(
            status_code,
            format!("(host name or ip: {hostname_or_ip})"),
            ErrorKind::InvalidHostname,
        )
    }

    pub fn internal_hostname(status_code: u16, hostname_or_ip: &str) -> Self {
        Self::classified(
            status_code,
            format!("(host name or ip: {hostname_or_ip})"),
            ErrorKind::InternalHostname,
        )
    }

    pub fn invalid_port(status_code: u16, port: u16) -> Self {
        Self::classified(status_code, format!("(port: {port})"), ErrorKind::InvalidPort)
    }

    pub fn port_already_in_use(status_code: u16, port: u16) -> Self {
        Self::classified(status_code, format!("(port: {port})"), ErrorKind::PortAlreadyInUse)
    }

    pub fn invalid_server_name(status_code: u16, name: &str) -> Self {
        Self::classified(
            status_code,
            format!("(server name: {name})"),
            ErrorKind::InvalidServerName,
        )
    }

    pub fn invalid_request(status_code: u16, body: &str) -> Self {
        Self::classified(
            status_code,
            format!("(response body: {body})"),
            ErrorKind::InvalidRequest,
        )
    }

    pub fn invalid_data_limit(status_code: u16, bytes: u64) -> Self {
        Self::classified(
            status_code,
            format!("(data limit bytes: {bytes})"),
            ErrorKind::InvalidDataLimit,
        )
    }

    pub fn access_key_not_found(status_code: u16, access_key_id: &str) -> Self {
        Self::classified(
            status_code,
            format!("(access key id: {access_key_id})"),
            ErrorKind::AccessKeyNotFound,
        )
    }

    /// The server returned a status the handler does not anticipate. `data`
    /// is the raw response body, rendered only when non-empty.
    pub fn unexpected_status_code(status_code: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code,
            data: data.into(),
            message: prefixed(ErrorKind::UnexpectedStatusCode),
            cause: Join::of_kinds(&[ErrorKind::UnexpectedStatusCode], None),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        is_kind(self, kind)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut msg = format!("{}; status code: {}", self.message, self.status_code);
        if !self.data.is_empty() {
            msg = format!("{msg}; data: {}", String::from_utf8_lossy(&self.data));
        }
        f.write_str(&with_last_error(msg, &self.cause))
    }
}

impl StdError for ClientError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

// ---------------------------------------------------------------------------
// ParseUrlError
// ---------------------------------------------------------------------------

/// The base URL handed to the client is empty or malformed.
#[derive(Debug)]
pub struct ParseUrlError {
    base_url: String,
    message: String,
    cause: Join,
}

impl ParseUrlError {
    pub fn new(base_url: &str, source: impl Into<BoxError>) -> Self {
        Self::build(base_url, Some(source.into()))
    }

    /// The URL parsed but cannot carry path segments.
    pub fn without_source(base_url: &str) -> Self {
        Self::build(base_url, None)
    }

    fn build(base_url: &str, source: Option<BoxError>) -> Self {
        Self {
            base_url: base_url.to_string(),
            message: prefixed(ErrorKind::InvalidBaseUrl),
            cause: Join::of_kinds(&[ErrorKind::InvalidBaseUrl], source),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        is_kind(self, kind)
    }
}

impl fmt::Display for ParseUrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = if self.base_url.is_empty() {
            format!("{}; baseUrl is empty", self.message)
        } else {
            format!("{}; (base url: {})", self.message, self.base_url)
        };
        f.write_str(&with_last_error(msg, &self.cause))
    }
}

impl StdError for ParseUrlError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

// ---------------------------------------------------------------------------
// UnmarshalError
// ---------------------------------------------------------------------------

/// A response body could not be decoded into the expected type.
#[derive(Debug)]
pub struct UnmarshalError {
    data: Vec<u8>,
    type_name: String,
    message: String,
    cause: Join,
}

impl UnmarshalError {
    pub fn new(data: impl Into<Vec<u8>>, type_name: &str, source: impl Into<BoxError>) -> Self {
        Self::build(data.into(), type_name, &[], Some(source.into()))
    }

    pub fn without_source(data: impl Into<Vec<u8>>, type_name: &str) -> Self {
        Self::build(data.into(), type_name, &[], None)
    }

    /// The body was empty where a `type_name` value was expected.
    pub fn empty_body(type_name: &str) -> Self {
        Self::build(Vec::new(), type_name, &[ErrorKind::UnmarshalEmptyBody], None)
    }

    fn build(data: Vec<u8>, type_name: &str, extra: &[ErrorKind], source: Option<BoxError>) -> Self {
        let mut kinds = vec![ErrorKind::UnmarshalFailed];
        kinds.extend_from_slice(extra);
        Self {
            data,
            type_name: type_name.to_string(),
            message: prefixed(ErrorKind::UnmarshalFailed),
            cause: Join::of_kinds(&kinds, source),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        is_kind(self, kind)
    }
}

impl fmt::Display for UnmarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut msg = self.message.clone();
        if !self.type_name.is_empty() {
            msg = format!("{msg}; (type: {})", self.type_name);
        }
        if !self.data.is_empty() {
            msg = format!("{msg}; data: {}", String::from_utf8_lossy(&self.data));
        }
        f.write_str(&with_last_error(msg, &self.cause))
    }
}

impl StdError for UnmarshalError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

// ---------------------------------------------------------------------------
// DoError
// ---------------------------------------------------------------------------

/// Client operations, named in `DoError` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetServerInfo,
    UpdateServerHostname,
    UpdatePortNewAccessKeys,
    UpdateServerName,
    GetMetricsEnabled,
    UpdateMetricsEnabled,
    UpdateKeyLimitBytes,
    DeleteKeyLimitBytes,
    CreateAccessKey,
    GetAccessKeys,
    GetAccessKey,
    UpdateAccessKey,
    DeleteAccessKey,
    UpdateNameAccessKey,
    UpdateDataLimitAccessKey,
    DeleteDataLimitAccessKey,
    GetMetricsTransfer,
    GetExperimentalMetrics,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GetServerInfo => "get server info",
            Operation::UpdateServerHostname => "update server hostname",
            Operation::UpdatePortNewAccessKeys => "update port for new access keys",
            Operation::UpdateServerName => "update server name",
            Operation::GetMetricsEnabled => "get metrics enabled",
            Operation::UpdateMetricsEnabled => "update metrics enabled",
            Operation::UpdateKeyLimitBytes => "update key limit bytes",
            Operation::DeleteKeyLimitBytes => "delete key limit bytes",
            Operation::CreateAccessKey => "create access key",
            Operation::GetAccessKeys => "get access keys",
            Operation::GetAccessKey => "get access key",
            Operation::UpdateAccessKey => "update access key",
            Operation::DeleteAccessKey => "delete access key",
            Operation::UpdateNameAccessKey => "update name access key",
            Operation::UpdateDataLimitAccessKey => "update data limit access key",
            Operation::DeleteDataLimitAccessKey => "delete data limit access key",
            Operation::GetMetricsTransfer => "get metrics transfer",
            Operation::GetExperimentalMetrics => "get experimental metrics",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request/response exchange for `operation` failed before a status
/// code was available.
#[derive(Debug)]
pub struct DoError {
    operation: Operation,
    message: String,
    cause: Join,
}

impl DoError {
    pub fn new(operation: Operation, source: impl Into<BoxError>) -> Self {
        Self::build(operation, Some(source.into()))
    }

    pub fn without_source(operation: Operation) -> Self {
        Self::build(operation, None)
    }

    fn build(operation: Operation, source: Option<BoxError>) -> Self {
        Self {
            operation,
            message: prefixed(ErrorKind::DoOperation),
            cause: Join::of_kinds(&[ErrorKind::DoOperation], source),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        is_kind(self, kind)
    }
}

impl fmt::Display for DoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = format!("{}; operation: {}", self.message, self.operation);
        f.write_str(&with_last_error(msg, &self.cause))
    }
}

impl StdError for DoError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.cause)
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Any error returned by `OutlineClient`.
///
/// Displays as the wrapped error. `source()` is the wrapper itself, so the
/// wrapper stays reachable through `find_cause` even behind `dyn Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Client(#[from] ClientError),
    #[error("{0}")]
    ParseUrl(#[from] ParseUrlError),
    #[error("{0}")]
    Unmarshal(#[from] UnmarshalError),
    #[error("{0}")]
    Do(#[from] DoError),
}

impl Error {
    pub fn is(&self, kind: ErrorKind) -> bool {
        is_kind(self, kind)
    }

    /// The first upstream error of type `E`, e.g. the transport error behind
    /// a `DoError`.
    pub fn find_cause<E: StdError + 'static>(&self) -> Option<&E> {
        find_cause::<E>(self)
    }

    pub fn as_client_error(&self) -> Option<&ClientError> {
        match self {
            Error::Client(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_parse_url_error(&self) -> Option<&ParseUrlError> {
        match self {
            Error::ParseUrl(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_unmarshal_error(&self) -> Option<&UnmarshalError> {
        match self {
            Error::Unmarshal(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_do_error(&self) -> Option<&DoError> {
        match self {
            Error::Do(e) => Some(e),
            _ => None,
        }
    }
}
