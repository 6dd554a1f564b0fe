//! Minimal HTTP client with safe logging and OAuth 1.0a signing.
//!
//! - Request options: `Auth`, query params, form body
//! - Redacts sensitive query params and never logs secret values
//! - One attempt per call; resilience is left to the caller
//! - Long-lived responses are exposed as raw byte streams ([`HttpClient::open_stream`])
//! - Optional *raw* request/response logging via `MURMUR_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), murmur_http::HttpError> {
//! let client = murmur_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", murmur_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Security: logs only ever include the auth kind (oauth1/none), never the
//! signed header or the secrets behind it.
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), final errors, stream opening,
//! and (optionally) raw request/response lines (target `http.raw`).

pub mod oauth;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

pub use oauth::{OAuth1Keys, OAuth1Signer};
pub use reqwest::{Method, StatusCode};

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "MURMUR_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(method: &Method, url: &Url, form: &[(String, String)]) -> String {
    let mut parts = vec![
        "curl".to_string(),
        format!("-X{}", method),
        "-H 'Authorization: OAuth <redacted>'".to_string(),
    ];
    for (k, v) in form {
        parts.push(format!(
            "--data-urlencode '{}={}'",
            k,
            v.replace('\'', r"'\''")
        ));
    }
    let (host_path, query) = redact_query(url);
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        parts.push(format!("'{}://{}'", url.scheme(), host_path));
    } else {
        parts.push(format!("'{}://{}?{}'", url.scheme(), host_path, query));
    }
    parts.join(" ")
}

/// Redact sensitive headers for logging
fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let mut val = v.to_str().unwrap_or("").to_string();
            if key.eq_ignore_ascii_case("authorization") || key.eq_ignore_ascii_case("set-cookie") {
                val = "<redacted>".into();
            }
            (key, val)
        })
        .collect()
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for API errors, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ==============================
// Auth & Request Options
// ==============================

/// Authentication strategies supported by the HTTP client helpers.
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// `Authorization: OAuth ...` signed per request.
    OAuth1(&'a OAuth1Signer),
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use murmur_http::RequestOpts;
/// use std::borrow::Cow;
///
/// let opts = RequestOpts {
///     query: Some(vec![("count", Cow::Borrowed("200"))]),
///     ..Default::default()
/// };
///
/// assert!(opts.auth.is_none());
/// assert!(opts.form.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub auth: Option<Auth<'a>>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>, // e.g. [("screen_name", "dota2".into())]
    /// Form-encoded body; also takes part in the OAuth signature.
    pub form: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

/// Body of a long-lived response, chunked as the server flushes it.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use murmur_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    /// Override the default timeout returned by [`HttpClient::new`].
    ///
    /// ```no_run
    /// use murmur_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// GET JSON with per-request options (query/auth), bounded by the default timeout.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::GET, path, opts).await
    }

    /// Open a long-lived response and hand back its body as raw chunks.
    ///
    /// No total timeout is applied (only the connect timeout), since the
    /// connection is expected to stay open. Non-2xx answers are returned as
    /// [`HttpError::Api`] before any body is streamed.
    pub async fn open_stream(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<ByteStream, HttpError> {
        let url = self.resolve(path)?;
        let (rb, form) = self.build(method.clone(), &url, &opts, None)?;
        let req_id = request_id();
        let form_keys: Vec<&str> = form.iter().map(|(k, _)| k.as_str()).collect();

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%redact_query(&url).0,
            form_keys=?form_keys,
            auth_kind=auth_kind(&opts),
            "http.stream.open"
        );
        if raw_enabled() {
            let curl = make_curl(&method, &url, &form);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.stream");
            HttpError::Network(message)
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        log_response_headers(&req_id, status, &headers, None);

        if !status.is_success() {
            let bytes = resp.bytes().await.unwrap_or_default();
            return Err(api_error(&req_id, status, &headers, &bytes));
        }

        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| HttpError::Network(e.to_string())));
        Ok(Box::pin(body))
    }

    // ==============================
    // Core request implementation
    // ==============================

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    fn build(
        &self,
        method: Method,
        url: &Url,
        opts: &RequestOpts<'_>,
        timeout: Option<Duration>,
    ) -> Result<(RequestBuilder, Vec<(String, String)>), HttpError> {
        let mut rb = self.inner.request(method.clone(), url.clone());

        if let Some(timeout) = timeout {
            rb = rb.timeout(timeout);
        }

        let query: Vec<(&str, &str)> = opts
            .query
            .as_ref()
            .map(|q| q.iter().map(|(k, v)| (*k, v.as_ref())).collect())
            .unwrap_or_default();
        if !query.is_empty() {
            rb = rb.query(&query);
        }

        let form: Vec<(String, String)> = opts
            .form
            .as_ref()
            .map(|f| {
                f.iter()
                    .map(|(k, v)| ((*k).to_string(), v.as_ref().to_string()))
                    .collect()
            })
            .unwrap_or_default();
        if !form.is_empty() {
            rb = rb.form(&form);
        }

        if let Some(Auth::OAuth1(signer)) = &opts.auth {
            let mut signed: Vec<(&str, &str)> = query.clone();
            signed.extend(form.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            let header = signer.authorization(&method, url, &signed);
            let value = HeaderValue::from_str(&header)
                .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
            rb = rb.header(AUTHORIZATION, value);
        }

        Ok((rb, form))
    }

    async fn request_json_internal<T>(
        &self,
        method: Method,
        path: &str,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self.resolve(path)?;
        let timeout = self.default_timeout;
        let (rb, form) = self.build(method.clone(), &url, &opts, Some(timeout))?;

        // ----- Safe request logging (pre-send) -----
        let redacted_q: Vec<(String, String)> = opts
            .query
            .as_ref()
            .map(|q| {
                q.iter()
                    .map(|(k, v)| {
                        let v = if is_secret_param(k) {
                            "<redacted>".to_string()
                        } else {
                            v.as_ref().to_string()
                        };
                        ((*k).to_string(), v)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let req_id = request_id();
        let has_form = !form.is_empty();

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%redact_query(&url).0,
            query=?redacted_q,
            timeout_ms=timeout.as_millis() as u64,
            auth_kind=auth_kind(&opts),
            has_form,
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, &url, &form);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            HttpError::Network(message)
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let message = err.to_string();
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        log_response_headers(&req_id, status, &headers, Some((dur_ms, bytes.len())));

        if raw_enabled() {
            let hdrs = redact_headers(&headers);
            let mut body_snip = bytes.to_vec();
            let truncated = body_snip.len() > RAW_MAX_BODY;
            if truncated {
                body_snip.truncate(RAW_MAX_BODY);
            }
            let text = String::from_utf8_lossy(&body_snip);
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                headers=?hdrs,
                body=%text,
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snippet,
            "http.response.body_snippet"
        );

        if !status.is_success() {
            return Err(api_error(&req_id, status, &headers, &bytes));
        }

        serde_json::from_slice::<T>(&bytes).map_err(|e| {
            tracing::warn!(
                req_id=%req_id,
                serde_line=%e.line(),
                serde_col=%e.column(),
                serde_err=%e.to_string(),
                body_snippet=%snippet,
                "http.response.decode_error"
            );
            HttpError::Decode(e.to_string(), snippet)
        })
    }
}

// ==============================
// Helpers
// ==============================

fn auth_kind(opts: &RequestOpts<'_>) -> &'static str {
    match &opts.auth {
        Some(Auth::OAuth1(_)) => "oauth1",
        None => "none",
    }
}

fn request_id() -> String {
    format!("r{}", uuid::Uuid::new_v4().simple())
}

fn log_response_headers(
    req_id: &str,
    status: StatusCode,
    headers: &HeaderMap,
    timing: Option<(u64, usize)>,
) {
    let req_hdr_id = header_str(headers, "x-request-id")
        .or_else(|| header_str(headers, "x-transaction-id"))
        .unwrap_or("-");

    tracing::debug!(
        req_id=%req_id,
        %status,
        duration_ms=?timing.map(|t| t.0),
        body_len=?timing.map(|t| t.1),
        x_request_id=%req_hdr_id,
        rate_limit.limit=?header_str(headers, "x-rate-limit-limit"),
        rate_limit.remaining=?header_str(headers, "x-rate-limit-remaining"),
        rate_limit.reset=?header_str(headers, "x-rate-limit-reset"),
        "http.response.headers"
    );
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn api_error(req_id: &str, status: StatusCode, headers: &HeaderMap, body: &[u8]) -> HttpError {
    let message = extract_error_message(body);
    let request_id = header_str(headers, "x-request-id")
        .or_else(|| header_str(headers, "x-transaction-id"))
        .unwrap_or("-")
        .to_string();
    tracing::warn!(
        req_id=%req_id,
        %status,
        message=%message,
        x_request_id=%request_id,
        body_snippet=%snip_body(body),
        "http.error"
    );
    HttpError::Api {
        status,
        message,
        request_id,
    }
}

fn extract_error_message(body: &[u8]) -> String {
    // Twitter: {"errors":[{"code": 32, "message":"..."}]}
    #[derive(Deserialize)]
    struct TwErrors {
        errors: Vec<TwErr>,
    }
    #[derive(Deserialize)]
    struct TwErr {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        title: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(tw) = serde_json::from_slice::<TwErrors>(body) {
        if let Some(first) = tw.errors.into_iter().next() {
            for candidate in [first.message, first.detail, first.title] {
                if !candidate.is_empty() {
                    return candidate;
                }
            }
        }
    }
    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).to_string();
    if snip.len() > 500 {
        let mut cut = 500;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

fn is_secret_param(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "access_token"
            | "authorization"
            | "auth"
            | "key"
            | "api_key"
            | "token"
            | "secret"
            | "client_secret"
            | "oauth_token"
            | "oauth_signature"
    )
}

fn redact_query(url: &Url) -> (String, Vec<(String, String)>) {
    // Return "host + path" string and redacted query list for logging
    let host_path = format!("{}{}", url.host_str().unwrap_or("-"), url.path());
    let redacted = url
        .query_pairs()
        .map(|(k, v)| {
            let k = k.to_string();
            let v = if is_secret_param(&k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            (k, v)
        })
        .collect::<Vec<_>>();
    (host_path, redacted)
}
