//! Authenticated HTTP session against a Traffic Ops server.

use bytes::Bytes;
use reqwest::{header, Method, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{de::DeserializeOwned, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use traffic_ops_core::{
    types::{Alerts, AlertLevel, ApiEnvelope, ReqInf, API_BASE, LOGIN_SUCCESS_TEXT},
    Error, HttpError,
};

use crate::cache::{Clock, ResponseCache};
use crate::error::{ClientResult, RequestError};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection options for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Server base URL, e.g. `https://trafficops.example.net`.
    pub url: String,
    pub user_agent: String,
    /// Accept invalid TLS certificates.
    pub insecure: bool,
    /// Keep responses of `*_cached` reads in memory.
    pub use_cache: bool,
    pub timeout: Duration,
}

impl SessionOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_agent: format!("traffic-ops-client/{}", env!("CARGO_PKG_VERSION")),
            insecure: false,
            use_cache: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// What the session logs in with, kept for re-login.
#[derive(Debug)]
enum Credentials {
    Password {
        username: String,
        password: Secret<String>,
    },
    Token(Secret<String>),
}

impl Credentials {
    fn login_path(&self) -> String {
        match self {
            Self::Password { .. } => format!("{}/user/login", API_BASE),
            Self::Token(_) => format!("{}/user/login/token", API_BASE),
        }
    }

    fn login_body(&self) -> serde_json::Value {
        match self {
            Self::Password { username, password } => serde_json::json!({
                "u": username,
                "p": password.expose_secret(),
            }),
            Self::Token(token) => serde_json::json!({ "t": token.expose_secret() }),
        }
    }

    fn principal(&self) -> &str {
        match self {
            Self::Password { username, .. } => username.as_str(),
            Self::Token(_) => "<token>",
        }
    }
}

/// A response of any status, as received.
#[derive(Debug)]
struct RawResponse {
    status: StatusCode,
    url: String,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

/// A cookie-authenticated connection to Traffic Ops.
///
/// Cloning is cheap; clones share the connection pool, cookie store and
/// response cache.
#[derive(Debug, Clone)]
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Arc<Credentials>>,
    cache: Option<Arc<ResponseCache>>,
    cancel: CancellationToken,
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Transport(e.to_string())
    }
}

impl Session {
    fn build(options: &SessionOptions, credentials: Option<Credentials>) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(options.insecure)
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: options.url.trim_end_matches('/').to_string(),
            credentials: credentials.map(Arc::new),
            cache: options.use_cache.then(|| Arc::new(ResponseCache::new())),
            cancel: CancellationToken::new(),
        })
    }

    /// Connect and log in. Returns the session and the address of the
    /// server that answered the login.
    pub async fn login(
        options: SessionOptions,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ClientResult<(Self, Option<SocketAddr>)> {
        let credentials = Credentials::Password {
            username: username.into(),
            password: Secret::new(password.into()),
        };
        let session = Self::build(&options, Some(credentials))?;
        let remote_addr = session.relogin().await?;
        Ok((session, remote_addr))
    }

    /// Connect and log in with an API token instead of a password.
    ///
    /// Re-logins after a 401/403 reuse the same token.
    pub async fn login_with_token(
        options: SessionOptions,
        token: impl Into<String>,
    ) -> ClientResult<(Self, Option<SocketAddr>)> {
        let credentials = Credentials::Token(Secret::new(token.into()));
        let session = Self::build(&options, Some(credentials))?;
        let remote_addr = session.relogin().await?;
        Ok((session, remote_addr))
    }

    /// A session that never logs in, for public endpoints such as ping.
    pub fn new_no_auth(options: SessionOptions) -> ClientResult<Self> {
        Self::build(&options, None)
    }

    /// Abort in-flight and future requests when `token` is cancelled.
    ///
    /// A cancelled token stays cancelled, so this governs every request made
    /// through the returned session. To cancel a single call, scope a clone:
    /// `session.clone().with_cancel_token(parent.child_token())`. Clones share
    /// the connection pool and cache.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the response cache with one reading time from `clock`.
    pub fn with_cache_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.cache = Some(Arc::new(ResponseCache::with_clock(clock)));
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Log in again with the stored credentials.
    ///
    /// Any answer other than the success alert, including a non-2xx status,
    /// is an [`Error::Authentication`].
    pub async fn relogin(&self) -> ClientResult<Option<SocketAddr>> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| Error::Authentication("session has no credentials".into()))?;

        let body = serde_json::to_vec(&credentials.login_body()).map_err(Error::from)?;
        let path = credentials.login_path();
        let raw = self.raw_request(Method::POST, &path, Some(body)).await?;
        let remote_addr = raw.remote_addr;
        let bytes = Self::err_unless_ok(raw)
            .map_err(|e| RequestError::new(Error::Authentication(e.source.to_string()), e.remote_addr))?;

        let alerts: Alerts = serde_json::from_slice(&bytes)
            .map_err(|e| RequestError::new(Error::Authentication(format!("unreadable login response: {}", e)), remote_addr))?;
        if !alerts.contains(AlertLevel::Success, LOGIN_SUCCESS_TEXT) {
            let texts: Vec<&str> = alerts.alerts.iter().map(|a| a.text.as_str()).collect();
            return Err(RequestError::new(
                Error::Authentication(format!("{:?}", texts)),
                remote_addr,
            ));
        }

        tracing::debug!(user = %credentials.principal(), remote_addr = ?remote_addr, "Logged in to Traffic Ops");
        Ok(remote_addr)
    }

    /// Log out and forget the session cookie server-side.
    pub async fn logout(&self) -> ClientResult<(Alerts, ReqInf)> {
        let path = format!("{}/user/logout", API_BASE);
        let raw = self.raw_request(Method::POST, &path, None).await?;
        let remote_addr = raw.remote_addr;
        let bytes = Self::err_unless_ok(raw)?;
        let alerts = serde_json::from_slice(&bytes)
            .map_err(|e| RequestError::new(Error::from(e), remote_addr))?;
        Ok((alerts, ReqInf::live(remote_addr)))
    }

    /// Resolve the configured server to an address, for errors raised
    /// before any response arrived.
    async fn resolve_remote(&self) -> Option<SocketAddr> {
        let url = url::Url::parse(&self.base_url).ok()?;
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        tokio::net::lookup_host(format!("{}:{}", host, port))
            .await
            .ok()?
            .next()
    }

    /// Send one request and read the whole body, whatever the status.
    async fn raw_request(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> ClientResult<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let sent = tokio::select! {
            _ = self.cancel.cancelled() => return Err(RequestError::new(Error::Cancelled, None)),
            sent = request.send() => sent,
        };
        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                let remote_addr = self.resolve_remote().await;
                tracing::debug!(method = %method, url = %url, error = %e, "Request failed");
                return Err(RequestError::new(transport_error(e), remote_addr));
            }
        };

        let status = response.status();
        let remote_addr = response.remote_addr();
        let body = tokio::select! {
            _ = self.cancel.cancelled() => return Err(RequestError::new(Error::Cancelled, remote_addr)),
            body = response.bytes() => body.map_err(|e| RequestError::new(transport_error(e), remote_addr))?,
        };

        tracing::debug!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            remote_addr = ?remote_addr,
            "Traffic Ops request"
        );

        Ok(RawResponse {
            status,
            url,
            body,
            remote_addr,
        })
    }

    /// Turn a non-2xx response into an error.
    fn err_unless_ok(raw: RawResponse) -> ClientResult<Bytes> {
        if raw.status.is_success() {
            return Ok(raw.body);
        }
        if raw.status == StatusCode::NOT_IMPLEMENTED {
            return Err(RequestError::new(Error::NotImplemented, raw.remote_addr));
        }

        let err = HttpError {
            status_code: raw.status.as_u16(),
            status: raw.status.canonical_reason().unwrap_or("").to_string(),
            url: raw.url,
            body: String::from_utf8_lossy(&raw.body).into_owned(),
        };
        Err(RequestError::new(Error::Http(err), raw.remote_addr))
    }

    /// Send a request, logging in again and retrying once on 401/403.
    ///
    /// If the re-login fails the original response is reported. If it
    /// succeeds the retried response is reported, whatever its status.
    pub async fn request(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> ClientResult<(Bytes, ReqInf)> {
        let first = self.raw_request(method.clone(), path, body.clone()).await?;
        if !is_auth_failure(first.status) || self.credentials.is_none() {
            let remote_addr = first.remote_addr;
            return Ok((Self::err_unless_ok(first)?, ReqInf::live(remote_addr)));
        }

        metrics::counter!("traffic_ops_client_relogin_total").increment(1);
        if let Err(e) = self.relogin().await {
            tracing::warn!(path = path, error = %e, "Re-login failed, reporting original response");
            let remote_addr = first.remote_addr;
            return Ok((Self::err_unless_ok(first)?, ReqInf::live(remote_addr)));
        }

        let retried = self.raw_request(method, path, body).await?;
        let remote_addr = retried.remote_addr;
        Ok((Self::err_unless_ok(retried)?, ReqInf::live(remote_addr)))
    }

    /// GET `path`, serving it from the cache while younger than `ttl`.
    ///
    /// Without a cache this is a plain GET reported as a miss.
    pub async fn get_with_ttl(&self, path: &str, ttl: Duration) -> ClientResult<(Bytes, ReqInf)> {
        let Some(cache) = &self.cache else {
            return self.request(Method::GET, path, None).await;
        };

        let (entry, cache_hit_status) = cache
            .get_or_fetch(path, ttl, || async {
                let (bytes, info) = self.request(Method::GET, path, None).await?;
                Ok::<_, RequestError>((bytes, info.remote_addr))
            })
            .await?;
        Ok((
            entry.bytes,
            ReqInf {
                cache_hit_status,
                remote_addr: entry.remote_addr,
            },
        ))
    }

    // =========================================================================
    // Envelope helpers
    // =========================================================================

    fn decode<T: DeserializeOwned>(bytes: &[u8], info: &ReqInf) -> ClientResult<ApiEnvelope<T>> {
        serde_json::from_slice(bytes).map_err(|e| RequestError::new(Error::from(e), info.remote_addr))
    }

    fn payload<T: DeserializeOwned>(bytes: &[u8], info: ReqInf) -> ClientResult<(T, ReqInf)> {
        let envelope = Self::decode::<T>(bytes, &info)?;
        match envelope.response {
            Some(response) => Ok((response, info)),
            None => Err(RequestError::new(
                Error::internal("response envelope carries no payload"),
                info.remote_addr,
            )),
        }
    }

    fn encode<B: Serialize>(body: &B) -> ClientResult<Vec<u8>> {
        Ok(serde_json::to_vec(body).map_err(Error::from)?)
    }

    /// GET `path` and decode the envelope payload.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<(T, ReqInf)> {
        let (bytes, info) = self.request(Method::GET, path, None).await?;
        Self::payload(&bytes, info)
    }

    /// Cached variant of [`get`](Self::get).
    pub async fn get_cached<T: DeserializeOwned>(&self, path: &str, ttl: Duration) -> ClientResult<(T, ReqInf)> {
        let (bytes, info) = self.get_with_ttl(path, ttl).await?;
        Self::payload(&bytes, info)
    }

    /// POST a JSON body, returning the response alerts.
    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<(Alerts, ReqInf)> {
        self.mutate(Method::POST, path, Some(Self::encode(body)?)).await
    }

    /// PUT a JSON body, returning the response alerts.
    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<(Alerts, ReqInf)> {
        self.mutate(Method::PUT, path, Some(Self::encode(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<(Alerts, ReqInf)> {
        self.mutate(Method::DELETE, path, None).await
    }

    async fn mutate(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> ClientResult<(Alerts, ReqInf)> {
        let (bytes, info) = self.request(method, path, body).await?;
        let envelope = Self::decode::<serde_json::Value>(&bytes, &info)?;
        Ok((envelope.alerts(), info))
    }
}
