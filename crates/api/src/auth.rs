//! Login, logout and session-token checks.

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use dashmap::DashMap;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use traffic_ops_core::{
    config::AuthConfig,
    types::{Alert, Alerts, LOGIN_SUCCESS_TEXT},
    Error,
};

use crate::metrics::track_login;
use crate::server::{error_response, AppState};

#[derive(Debug, Clone)]
struct SessionEntry {
    username: String,
    issued_at: Instant,
}

/// Opaque session tokens handed out at login.
///
/// Tokens expire `ttl` after issue; expired entries are dropped lazily on
/// lookup.
#[derive(Debug)]
pub struct SessionTokens {
    entries: DashMap<String, SessionEntry>,
    ttl: Duration,
}

impl SessionTokens {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Issue a fresh token for `username`.
    pub fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.entries.insert(
            token.clone(),
            SessionEntry {
                username: username.to_string(),
                issued_at: Instant::now(),
            },
        );
        token
    }

    /// The user a live token belongs to.
    pub fn validate(&self, token: &str) -> Option<String> {
        let expired = match self.entries.get(token) {
            Some(entry) if entry.issued_at.elapsed() < self.ttl => return Some(entry.username.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(token);
        }
        None
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.entries.remove(token).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Login body. Both the short (`u`/`p`) and long field names are accepted.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub u: String,
    #[serde(alias = "password")]
    pub p: String,
}

/// Token from the session cookie, else from `Authorization: Bearer`.
fn session_token(jar: &CookieJar, headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    if let Some(cookie) = jar.get(cookie_name) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Token login body.
#[derive(Debug, Deserialize)]
pub struct TokenLoginRequest {
    pub t: String,
}

fn credentials_match(auth: &AuthConfig, login: &LoginRequest) -> bool {
    auth.users
        .iter()
        .any(|user| user.username == login.u && user.password.expose_secret() == &login.p)
}

/// The user an API token logs in as.
fn token_owner<'a>(auth: &'a AuthConfig, token: &str) -> Option<&'a str> {
    auth.api_tokens
        .iter()
        .find(|t| t.token.expose_secret() == token)
        .map(|t| t.username.as_str())
}

fn login_rejected(kind: &'static str, text: &str) -> Response {
    track_login(kind, false);
    (StatusCode::UNAUTHORIZED, Json(Alerts::single(Alert::error(text)))).into_response()
}

/// Issue a session for `username` and hand it back as a cookie.
fn logged_in(state: &AppState, jar: CookieJar, kind: &'static str, username: &str) -> Response {
    let token = state.sessions.issue(username);
    tracing::info!(user = %username, kind = kind, "User logged in");
    track_login(kind, true);

    let cookie = Cookie::build((state.auth.cookie_name.clone(), token))
        .path("/")
        .http_only(true);
    (
        jar.add(cookie),
        Json(Alerts::single(Alert::success(LOGIN_SUCCESS_TEXT))),
    )
        .into_response()
}

/// `POST /api/2.0/user/login` and `POST /api/2.0/login`.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let login: LoginRequest = match serde_json::from_slice(&body) {
        Ok(login) => login,
        Err(e) => {
            return error_response(&Error::invalid_request(format!("malformed login body: {}", e)));
        }
    };

    if !credentials_match(&state.auth, &login) {
        tracing::warn!(user = %login.u, "Login rejected");
        return login_rejected("password", "Invalid username or password.");
    }
    logged_in(&state, jar, "password", &login.u)
}

/// `POST /api/2.0/user/login/token`.
pub async fn token_login_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Response {
    let login: TokenLoginRequest = match serde_json::from_slice(&body) {
        Ok(login) => login,
        Err(e) => {
            return error_response(&Error::invalid_request(format!("malformed token login body: {}", e)));
        }
    };

    match token_owner(&state.auth, &login.t) {
        Some(username) => logged_in(&state, jar, "token", username),
        None => {
            tracing::warn!("Token login rejected");
            login_rejected("token", "Invalid token. Please contact your administrator.")
        }
    }
}

/// `POST /api/2.0/user/logout`. Always succeeds.
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Some(token) = session_token(&jar, &headers, &state.auth.cookie_name) {
        if state.sessions.revoke(&token) {
            tracing::info!("User logged out");
        }
    }

    let jar = jar.remove(Cookie::build((state.auth.cookie_name.clone(), "")).path("/"));
    (jar, Json(Alerts::single(Alert::success("You are logged out.")))).into_response()
}

/// Middleware rejecting requests without a live session token.
///
/// Preflight `OPTIONS` requests pass through unauthenticated.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    match session_token(&jar, req.headers(), &state.auth.cookie_name) {
        Some(token) => match state.sessions.validate(&token) {
            Some(user) => {
                tracing::trace!(user = %user, path = %req.uri().path(), "Session accepted");
                next.run(req).await
            }
            None => error_response(&Error::unauthorized("session expired or invalid")),
        },
        None => error_response(&Error::unauthorized("no session token")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_validate_until_revoked() {
        let sessions = SessionTokens::new(Duration::from_secs(60));
        let token = sessions.issue("admin");
        assert_eq!(sessions.validate(&token).as_deref(), Some("admin"));
        assert!(sessions.revoke(&token));
        assert!(sessions.validate(&token).is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn expired_tokens_are_dropped() {
        let sessions = SessionTokens::new(Duration::ZERO);
        let token = sessions.issue("admin");
        assert!(sessions.validate(&token).is_none());
        assert_eq!(sessions.len(), 0);
    }

    #[test]
    fn login_accepts_both_field_spellings() {
        let short: LoginRequest = serde_json::from_str(r#"{"u":"admin","p":"twelve"}"#).unwrap();
        let long: LoginRequest =
            serde_json::from_str(r#"{"username":"admin","password":"twelve"}"#).unwrap();
        assert_eq!(short.u, long.u);
        assert_eq!(short.p, long.p);
    }

    #[test]
    fn api_tokens_map_to_their_owner() {
        let auth = AuthConfig::default().with_api_token("tok-1", "ops");
        assert_eq!(token_owner(&auth, "tok-1"), Some("ops"));
        assert_eq!(token_owner(&auth, "tok-2"), None);
        assert_eq!(token_owner(&AuthConfig::default(), ""), None);
    }

    #[test]
    fn bearer_header_is_a_fallback_for_the_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_token(&jar, &headers, "mojolicious").as_deref(), Some("abc"));

        headers.insert(header::COOKIE, "mojolicious=xyz".parse().unwrap());
        let jar = CookieJar::from_headers(&headers);
        assert_eq!(session_token(&jar, &headers, "mojolicious").as_deref(), Some("xyz"));
    }
}
